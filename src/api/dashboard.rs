use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use serde::Serialize;
use sqlx::MySqlPool;
use tracing::error;
use utoipa::ToSchema;

/// One bar of the past-week attendance chart.
#[derive(Serialize, ToSchema)]
pub struct DailyAttendanceCount {
    #[schema(example = "Jan 14")]
    pub date: String,
    #[schema(example = 12)]
    pub count: i64,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct PresentEmployee {
    pub employee_id: u64,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "Technician")]
    pub position: String,
    #[schema(example = "2025-01-14T08:55:36", value_type = String, format = "date-time")]
    pub check_in: NaiveDateTime,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct PaymentBasisCount {
    #[schema(example = "Monthly")]
    pub payment_basis: String,
    #[schema(example = 31)]
    pub count: i64,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct TopRateEmployee {
    pub id: u64,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "Technician")]
    pub position: String,
    #[schema(example = 350.0)]
    pub daily_rate: f64,
}

#[derive(Serialize, ToSchema)]
pub struct DashboardStats {
    #[schema(example = 57)]
    pub total_employees: i64,
    #[schema(example = 42)]
    pub today_attendance: i64,
    #[schema(example = 44)]
    pub yesterday_attendance: i64,
    #[schema(example = 251)]
    pub last_7_days_attendance: i64,
    /// Share of employees with an attendance row today, rounded percent.
    #[schema(example = 74)]
    pub attendance_percentage: u32,
    pub attendance_by_day: Vec<DailyAttendanceCount>,
    /// Today's first five arrivals.
    pub present_employees: Vec<PresentEmployee>,
    pub payment_basis_distribution: Vec<PaymentBasisCount>,
    /// Five highest daily rates.
    pub top_employees_by_rate: Vec<TopRateEmployee>,
}

fn attendance_percentage(present: i64, total: i64) -> u32 {
    if total > 0 {
        ((present as f64 / total as f64) * 100.0).round() as u32
    } else {
        0
    }
}

fn chart_label(date: NaiveDate) -> String {
    date.format("%b %d").to_string()
}

/// Dashboard statistics
///
/// Aggregate counts over employees and the last week of attendance, shaped
/// for the operator dashboard's summary cards and charts.
#[utoipa::path(
    get,
    path = "/api/v1/dashboard/stats",
    responses(
        (status = 200, description = "Aggregate dashboard statistics", body = DashboardStats),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Dashboard"
)]
pub async fn dashboard_stats(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let today = Local::now().date_naive();
    let yesterday = today - Duration::days(1);
    let week_start = today - Duration::days(7);

    let pool = pool.get_ref();
    let internal = |e: sqlx::Error| {
        error!(error = %e, "Failed to compute dashboard stats");
        ErrorInternalServerError("Internal Server Error")
    };

    let total_employees = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM employees")
        .fetch_one(pool)
        .await
        .map_err(internal)?;

    let today_attendance =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendance WHERE date = ?")
            .bind(today)
            .fetch_one(pool)
            .await
            .map_err(internal)?;

    let yesterday_attendance =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendance WHERE date = ?")
            .bind(yesterday)
            .fetch_one(pool)
            .await
            .map_err(internal)?;

    let last_7_days_attendance = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendance WHERE date BETWEEN ? AND ?",
    )
    .bind(week_start)
    .bind(today)
    .fetch_one(pool)
    .await
    .map_err(internal)?;

    let by_day = sqlx::query_as::<_, (NaiveDate, i64)>(
        r#"
        SELECT date, COUNT(*) AS count
        FROM attendance
        WHERE date BETWEEN ? AND ?
        GROUP BY date
        ORDER BY date ASC
        "#,
    )
    .bind(week_start)
    .bind(today)
    .fetch_all(pool)
    .await
    .map_err(internal)?;

    let attendance_by_day = by_day
        .into_iter()
        .map(|(date, count)| DailyAttendanceCount {
            date: chart_label(date),
            count,
        })
        .collect();

    let present_employees = sqlx::query_as::<_, PresentEmployee>(
        r#"
        SELECT a.employee_id, e.name, e.position, a.check_in
        FROM attendance a
        JOIN employees e ON e.id = a.employee_id
        WHERE a.date = ?
        ORDER BY a.check_in ASC
        LIMIT 5
        "#,
    )
    .bind(today)
    .fetch_all(pool)
    .await
    .map_err(internal)?;

    let payment_basis_distribution = sqlx::query_as::<_, PaymentBasisCount>(
        r#"
        SELECT payment_basis, COUNT(*) AS count
        FROM employees
        GROUP BY payment_basis
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(internal)?;

    let top_employees_by_rate = sqlx::query_as::<_, TopRateEmployee>(
        r#"
        SELECT id, name, position, daily_rate
        FROM employees
        ORDER BY daily_rate DESC
        LIMIT 5
        "#,
    )
    .fetch_all(pool)
    .await
    .map_err(internal)?;

    Ok(HttpResponse::Ok().json(DashboardStats {
        total_employees,
        today_attendance,
        yesterday_attendance,
        last_7_days_attendance,
        attendance_percentage: attendance_percentage(today_attendance, total_employees),
        attendance_by_day,
        present_employees,
        payment_basis_distribution,
        top_employees_by_rate,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_rounds_and_handles_zero_employees() {
        assert_eq!(attendance_percentage(0, 0), 0);
        assert_eq!(attendance_percentage(5, 10), 50);
        assert_eq!(attendance_percentage(1, 3), 33);
        assert_eq!(attendance_percentage(2, 3), 67);
        assert_eq!(attendance_percentage(10, 10), 100);
    }

    #[test]
    fn chart_labels_use_short_month_and_padded_day() {
        assert_eq!(
            chart_label(NaiveDate::from_ymd_opt(2025, 1, 5).unwrap()),
            "Jan 05"
        );
        assert_eq!(
            chart_label(NaiveDate::from_ymd_opt(2025, 12, 14).unwrap()),
            "Dec 14"
        );
    }
}
