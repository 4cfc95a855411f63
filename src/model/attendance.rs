use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One employee's derived attendance window for a single calendar day.
/// Rows are written exclusively by the ingestion engine; `(employee_id, date)`
/// is unique at the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Attendance {
    pub id: u64,
    pub employee_id: u64,

    #[schema(example = "2025-01-14", value_type = String, format = "date")]
    pub date: NaiveDate,

    #[schema(example = "2025-01-14T10:55:36", value_type = String, format = "date-time")]
    pub check_in: NaiveDateTime,

    /// Absent when the log carried a single timestamp for the day.
    #[schema(example = "2025-01-14T17:45:27", value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<NaiveDateTime>,

    #[schema(example = 6.83, nullable = true)]
    pub hours_worked: Option<f64>,
}
