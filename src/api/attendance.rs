use crate::auth::auth::AuthUser;
use crate::engine::ingest::{self, IngestSummary, SkipStats};
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::MySqlPool;
use tracing::error;
use utoipa::{IntoParams, ToSchema};

/// Device logs run to tens of thousands of lines; the actix default payload
/// cap (256 KiB) would reject them with 413 before the handler runs.
pub const UPLOAD_LIMIT_BYTES: usize = 16 * 1024 * 1024;

#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    #[schema(example = "Successfully processed 42 attendance records.")]
    pub message: String,
    #[schema(example = 42)]
    pub processed: u64,
    pub skipped: SkipStats,
}

/// Upload a raw attendance device log
///
/// Body is plain text, one record per line:
/// `<employeeId> <YYYY-MM-DD> <HH:MM:SS> [device flags...]`.
/// Invalid lines and unknown employees reduce the yield but never fail the
/// request; the response reports processed and skipped counts.
#[utoipa::path(
    post,
    path = "/api/v1/attendance/upload",
    request_body(content = String, content_type = "text/plain"),
    responses(
        (status = 200, description = "Log processed", body = UploadResponse),
        (status = 400, description = "Empty or non-text body"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn upload_log(
    _auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Bytes,
) -> actix_web::Result<impl Responder> {
    let text = match std::str::from_utf8(&body) {
        Ok(t) => t,
        Err(_) => {
            return Ok(HttpResponse::BadRequest().json(serde_json::json!({
                "error": "Log file is not valid text"
            })));
        }
    };

    if text.trim().is_empty() {
        return Ok(HttpResponse::BadRequest().json(serde_json::json!({
            "error": "No log content uploaded"
        })));
    }

    let IngestSummary { processed, skipped } = ingest::ingest_log(pool.get_ref(), text).await;

    Ok(HttpResponse::Ok().json(UploadResponse {
        message: format!("Successfully processed {} attendance records.", processed),
        processed,
        skipped,
    }))
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct AttendanceQuery {
    #[schema(example = 1)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
    #[param(example = "2025-01-01", value_type = String, format = "date")]
    #[schema(example = "2025-01-01", value_type = String, format = "date")]
    /// Records on or after this date
    pub start_date: Option<NaiveDate>,
    #[param(example = "2025-01-31", value_type = String, format = "date")]
    #[schema(example = "2025-01-31", value_type = String, format = "date")]
    /// Records on or before this date
    pub end_date: Option<NaiveDate>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct AttendanceWithName {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "John Doe")]
    pub employee_name: String,
    #[schema(example = "2025-01-14", value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(example = "2025-01-14T10:55:36", value_type = String, format = "date-time")]
    pub check_in: chrono::NaiveDateTime,
    #[schema(example = "2025-01-14T17:45:27", value_type = String, format = "date-time", nullable = true)]
    pub check_out: Option<chrono::NaiveDateTime>,
    #[schema(example = 6.83, nullable = true)]
    pub hours_worked: Option<f64>,
}

/// List recent attendance records
#[utoipa::path(
    get,
    path = "/api/v1/attendance",
    params(AttendanceQuery),
    responses(
        (status = 200, description = "Most recent matching records, capped at 100", body = [AttendanceWithName]),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn list_attendance(
    pool: web::Data<MySqlPool>,
    query: web::Query<AttendanceQuery>,
) -> actix_web::Result<impl Responder> {
    let mut conditions = Vec::new();

    if query.employee_id.is_some() {
        conditions.push("a.employee_id = ?");
    }
    if query.start_date.is_some() {
        conditions.push("a.date >= ?");
    }
    if query.end_date.is_some() {
        conditions.push("a.date <= ?");
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let sql = format!(
        r#"
        SELECT a.id, a.employee_id, e.name AS employee_name,
               a.date, a.check_in, a.check_out, a.hours_worked
        FROM attendance a
        JOIN employees e ON e.id = a.employee_id
        {}
        ORDER BY a.date DESC
        LIMIT 100
        "#,
        where_clause
    );

    let mut data_query = sqlx::query_as::<_, AttendanceWithName>(&sql);
    if let Some(employee_id) = query.employee_id {
        data_query = data_query.bind(employee_id);
    }
    if let Some(start_date) = query.start_date {
        data_query = data_query.bind(start_date);
    }
    if let Some(end_date) = query.end_date {
        data_query = data_query.bind(end_date);
    }

    let records = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch attendance records");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(records))
}

/// List one employee's attendance history
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}/attendance",
    params(
        ("employee_id", description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Attendance records, most recent first", body = [crate::model::attendance::Attendance]),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Attendance"
)]
pub async fn employee_attendance(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    let exists = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM employees WHERE id = ? LIMIT 1)",
    )
    .bind(employee_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to check employee");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    if !exists {
        return Ok(HttpResponse::NotFound().json(serde_json::json!({
            "message": "Employee not found"
        })));
    }

    let records = sqlx::query_as::<_, crate::model::attendance::Attendance>(
        r#"
        SELECT id, employee_id, date, check_in, check_out, hours_worked
        FROM attendance
        WHERE employee_id = ?
        ORDER BY date DESC
        "#,
    )
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch employee attendance");
        actix_web::error::ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(records))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_limit_fits_a_large_device_log() {
        // A 200k-line dump must stay inside the configured payload cap,
        // which in turn must exceed the 256 KiB actix default.
        let line = "12345 2025-01-14 10:55:36 2 0 1 0\n";
        assert!(line.len() * 200_000 < UPLOAD_LIMIT_BYTES);
        assert!(UPLOAD_LIMIT_BYTES > 256 * 1024);
    }
}
