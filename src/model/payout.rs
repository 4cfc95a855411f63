use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One payable period for one employee. `(employee_id, period_start, period_end)`
/// is unique; `amount` is set when the row is created and only changed
/// explicitly, while `is_paid`, `comment` and `payment_date` are operator-owned.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Payout {
    pub id: u64,
    pub employee_id: u64,

    #[schema(example = "2025-01-01", value_type = String, format = "date")]
    pub period_start: NaiveDate,

    #[schema(example = "2025-01-31", value_type = String, format = "date")]
    pub period_end: NaiveDate,

    #[schema(example = 7000.0)]
    pub amount: f64,

    pub is_paid: bool,

    #[schema(example = "Paid in cash", nullable = true)]
    pub comment: Option<String>,

    /// Set exactly when `is_paid` transitions false to true, cleared on the
    /// reverse transition.
    #[schema(example = "2025-02-01T12:00:00", value_type = String, format = "date-time", nullable = true)]
    pub payment_date: Option<NaiveDateTime>,
}
