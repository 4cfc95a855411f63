use crate::{
    api::settings::get_or_create_settings,
    engine::payout::{PayPeriod, calculate_period_payout, paid_transition_date, payment_periods},
    model::{attendance::Attendance, employee::Employee, payout::Payout},
};
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error};
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct PayoutQuery {
    #[schema(example = 1)]
    /// Filter by employee ID
    pub employee_id: Option<u64>,
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct PayoutWithEmployee {
    pub id: u64,
    pub employee_id: u64,
    #[schema(example = "John Doe")]
    pub employee_name: String,
    #[schema(example = "Monthly")]
    pub payment_basis: String,
    #[schema(example = "2025-01-01", value_type = String, format = "date")]
    pub period_start: NaiveDate,
    #[schema(example = "2025-01-31", value_type = String, format = "date")]
    pub period_end: NaiveDate,
    #[schema(example = 7000.0)]
    pub amount: f64,
    pub is_paid: bool,
    #[schema(nullable = true)]
    pub comment: Option<String>,
    #[schema(value_type = String, format = "date-time", nullable = true)]
    pub payment_date: Option<NaiveDateTime>,
}

/// One candidate payment period with its computed totals and, when the period
/// has been saved before, the persisted payout row.
#[derive(Serialize, ToSchema)]
pub struct PeriodReport {
    #[schema(example = "January 2025")]
    pub label: String,
    #[schema(example = "2025-01-01", value_type = String, format = "date")]
    pub period_start: NaiveDate,
    #[schema(example = "2025-01-31", value_type = String, format = "date")]
    pub period_end: NaiveDate,
    #[schema(example = 20)]
    pub days_worked: u32,
    #[schema(example = 23)]
    pub working_days_in_period: u32,
    #[schema(example = 161.5)]
    pub total_hours_worked: f64,
    #[schema(example = 184.0)]
    pub expected_hours: f64,
    #[schema(example = 7000.0)]
    pub amount: f64,
    pub payout: Option<Payout>,
}

#[derive(Serialize, ToSchema)]
pub struct PayoutPeriodsResponse {
    pub employee_id: u64,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = 350.0)]
    pub daily_rate: f64,
    #[schema(example = "Monthly")]
    pub payment_basis: String,
    pub periods: Vec<PeriodReport>,
}

#[derive(Deserialize, ToSchema)]
pub struct SavePayout {
    #[schema(example = "2025-01-01", value_type = String, format = "date")]
    pub period_start: NaiveDate,
    #[schema(example = "2025-01-31", value_type = String, format = "date")]
    pub period_end: NaiveDate,
    pub is_paid: bool,
    #[schema(example = "Paid in cash", nullable = true)]
    pub comment: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct UpdatePayout {
    pub is_paid: Option<bool>,
    /// Omitted keeps the stored comment; an explicit `null` clears it.
    #[serde(default, deserialize_with = "comment_patch")]
    #[schema(example = "Paid in cash", value_type = Option<String>, nullable = true)]
    pub comment: Option<Option<String>>,
}

// Distinguishes an absent `comment` field (outer None) from `"comment": null`
// (inner None), which plain Option<String> collapses.
fn comment_patch<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

async fn fetch_employee(
    pool: &MySqlPool,
    employee_id: u64,
) -> Result<Option<Employee>, actix_web::Error> {
    sqlx::query_as::<_, Employee>("SELECT * FROM employees WHERE id = ?")
        .bind(employee_id)
        .fetch_optional(pool)
        .await
        .map_err(|e| {
            error!(error = %e, employee_id, "Failed to fetch employee");
            ErrorInternalServerError("Internal Server Error")
        })
}

/// Preview payout periods for an employee
///
/// Pure computation over attendance and settings; never writes. Periods are
/// derived from the employee's payment basis, most recent first.
#[utoipa::path(
    get,
    path = "/api/v1/employees/{employee_id}/payouts",
    params(
        ("employee_id", description = "Employee ID")
    ),
    responses(
        (status = 200, description = "Candidate periods with computed totals", body = PayoutPeriodsResponse),
        (status = 404, description = "Employee not found"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Payout"
)]
pub async fn preview_periods(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    let employee = match fetch_employee(pool.get_ref(), employee_id).await? {
        Some(e) => e,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Employee not found"
            })));
        }
    };

    let settings = get_or_create_settings(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to load settings");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let periods = payment_periods(employee.basis(), Local::now().date_naive());

    // One window covers every candidate period; filtering per period is
    // done in memory by the engine.
    let earliest = periods.iter().map(|p| p.start).min().unwrap();
    let latest = periods.iter().map(|p| p.end).max().unwrap();

    let records = sqlx::query_as::<_, Attendance>(
        r#"
        SELECT id, employee_id, date, check_in, check_out, hours_worked
        FROM attendance
        WHERE employee_id = ? AND date BETWEEN ? AND ?
        "#,
    )
    .bind(employee_id)
    .bind(earliest)
    .bind(latest)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch attendance for payout preview");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let saved = sqlx::query_as::<_, Payout>(
        r#"
        SELECT id, employee_id, period_start, period_end, amount, is_paid, comment, payment_date
        FROM payouts
        WHERE employee_id = ?
        "#,
    )
    .bind(employee_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to fetch saved payouts");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let reports = periods
        .iter()
        .map(|period: &PayPeriod| {
            let totals =
                calculate_period_payout(&records, employee.daily_rate, period, &settings);
            let existing = saved
                .iter()
                .find(|p| p.period_start == period.start && p.period_end == period.end)
                .cloned();

            PeriodReport {
                label: period.label.clone(),
                period_start: period.start,
                period_end: period.end,
                days_worked: totals.days_worked,
                working_days_in_period: totals.working_days_in_period,
                total_hours_worked: totals.total_hours_worked,
                expected_hours: totals.expected_hours,
                amount: totals.payout_amount,
                payout: existing,
            }
        })
        .collect();

    Ok(HttpResponse::Ok().json(PayoutPeriodsResponse {
        employee_id: employee.id,
        name: employee.name,
        daily_rate: employee.daily_rate,
        payment_basis: employee.payment_basis,
        periods: reports,
    }))
}

/// Save one payout period
///
/// Upsert keyed on (employee, period_start, period_end). An existing row only
/// has its operator fields merged: `is_paid` flipping false to true stamps
/// `payment_date`, true to false clears it; the stored amount is untouched.
/// A new row gets a server-computed amount from attendance.
#[utoipa::path(
    post,
    path = "/api/v1/employees/{employee_id}/payouts",
    params(
        ("employee_id", description = "Employee ID")
    ),
    request_body = SavePayout,
    responses(
        (status = 200, description = "Existing payout updated", body = Payout),
        (status = 201, description = "Payout created", body = Payout),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "Concurrent save for the same period"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Payout"
)]
pub async fn save_payout(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<SavePayout>,
) -> actix_web::Result<impl Responder> {
    let employee_id = path.into_inner();

    let employee = match fetch_employee(pool.get_ref(), employee_id).await? {
        Some(e) => e,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Employee not found"
            })));
        }
    };

    let existing = sqlx::query_as::<_, Payout>(
        r#"
        SELECT id, employee_id, period_start, period_end, amount, is_paid, comment, payment_date
        FROM payouts
        WHERE employee_id = ? AND period_start = ? AND period_end = ?
        "#,
    )
    .bind(employee_id)
    .bind(body.period_start)
    .bind(body.period_end)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to look up payout");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let now = Local::now().naive_local();

    if let Some(current) = existing {
        let payment_date =
            paid_transition_date(current.is_paid, current.payment_date, body.is_paid, now);

        sqlx::query(
            r#"
            UPDATE payouts
            SET is_paid = ?, comment = ?, payment_date = ?
            WHERE id = ?
            "#,
        )
        .bind(body.is_paid)
        .bind(&body.comment)
        .bind(payment_date)
        .bind(current.id)
        .execute(pool.get_ref())
        .await
        .map_err(|e| {
            error!(error = %e, payout_id = current.id, "Failed to update payout");
            ErrorInternalServerError("Internal Server Error")
        })?;

        debug!(payout_id = current.id, is_paid = body.is_paid, "Payout updated");

        return Ok(HttpResponse::Ok().json(Payout {
            is_paid: body.is_paid,
            comment: body.comment.clone(),
            payment_date,
            ..current
        }));
    }

    // First save for this period: amount is computed from attendance, not
    // taken from the client.
    let days_worked = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendance WHERE employee_id = ? AND date BETWEEN ? AND ?",
    )
    .bind(employee_id)
    .bind(body.period_start)
    .bind(body.period_end)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, employee_id, "Failed to count attendance for payout");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let amount = days_worked as f64 * employee.daily_rate;
    let payment_date = paid_transition_date(false, None, body.is_paid, now);

    let result = sqlx::query(
        r#"
        INSERT INTO payouts (employee_id, period_start, period_end, amount, is_paid, comment, payment_date)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(employee_id)
    .bind(body.period_start)
    .bind(body.period_end)
    .bind(amount)
    .bind(body.is_paid)
    .bind(&body.comment)
    .bind(payment_date)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(res) => Ok(HttpResponse::Created().json(Payout {
            id: res.last_insert_id(),
            employee_id,
            period_start: body.period_start,
            period_end: body.period_end,
            amount,
            is_paid: body.is_paid,
            comment: body.comment.clone(),
            payment_date,
        })),
        Err(e) => {
            // Unique key on (employee_id, period_start, period_end): a
            // concurrent save got there first.
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.code().as_deref() == Some("23000") {
                    return Ok(HttpResponse::Conflict().json(json!({
                        "message": "A payout for this period was just saved; reload and retry"
                    })));
                }
            }

            error!(error = %e, employee_id, "Failed to insert payout");
            Err(ErrorInternalServerError("Internal Server Error"))
        }
    }
}

/// List payouts
#[utoipa::path(
    get,
    path = "/api/v1/payouts",
    params(PayoutQuery),
    responses(
        (status = 200, description = "Payouts, most recent period first", body = [PayoutWithEmployee]),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Payout"
)]
pub async fn list_payouts(
    pool: web::Data<MySqlPool>,
    query: web::Query<PayoutQuery>,
) -> actix_web::Result<impl Responder> {
    let where_clause = if query.employee_id.is_some() {
        "WHERE p.employee_id = ?"
    } else {
        ""
    };

    let sql = format!(
        r#"
        SELECT p.id, p.employee_id, e.name AS employee_name, e.payment_basis,
               p.period_start, p.period_end, p.amount, p.is_paid, p.comment, p.payment_date
        FROM payouts p
        JOIN employees e ON e.id = p.employee_id
        {}
        ORDER BY p.period_end DESC
        "#,
        where_clause
    );

    let mut data_query = sqlx::query_as::<_, PayoutWithEmployee>(&sql);
    if let Some(employee_id) = query.employee_id {
        data_query = data_query.bind(employee_id);
    }

    let payouts = data_query.fetch_all(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch payouts");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(payouts))
}

/// Get a payout by ID
#[utoipa::path(
    get,
    path = "/api/v1/payouts/{payout_id}",
    params(
        ("payout_id", description = "Payout ID")
    ),
    responses(
        (status = 200, body = PayoutWithEmployee),
        (status = 404, description = "Payout not found"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Payout"
)]
pub async fn get_payout(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let payout_id = path.into_inner();

    let payout = sqlx::query_as::<_, PayoutWithEmployee>(
        r#"
        SELECT p.id, p.employee_id, e.name AS employee_name, e.payment_basis,
               p.period_start, p.period_end, p.amount, p.is_paid, p.comment, p.payment_date
        FROM payouts p
        JOIN employees e ON e.id = p.employee_id
        WHERE p.id = ?
        "#,
    )
    .bind(payout_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, payout_id, "Failed to fetch payout");
        ErrorInternalServerError("Internal Server Error")
    })?;

    match payout {
        Some(p) => Ok(HttpResponse::Ok().json(p)),
        None => Ok(HttpResponse::NotFound().json(json!({
            "message": "Payout not found"
        }))),
    }
}

/// Update a payout's paid status and comment
#[utoipa::path(
    patch,
    path = "/api/v1/payouts/{payout_id}",
    params(
        ("payout_id", description = "Payout ID")
    ),
    request_body = UpdatePayout,
    responses(
        (status = 200, description = "Payout updated", body = Payout),
        (status = 404, description = "Payout not found"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Payout"
)]
pub async fn update_payout(
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    body: web::Json<UpdatePayout>,
) -> actix_web::Result<impl Responder> {
    let payout_id = path.into_inner();

    let current = sqlx::query_as::<_, Payout>(
        r#"
        SELECT id, employee_id, period_start, period_end, amount, is_paid, comment, payment_date
        FROM payouts
        WHERE id = ?
        "#,
    )
    .bind(payout_id)
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, payout_id, "Failed to fetch payout");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let current = match current {
        Some(c) => c,
        None => {
            return Ok(HttpResponse::NotFound().json(json!({
                "message": "Payout record not found"
            })));
        }
    };

    let is_paid = body.is_paid.unwrap_or(current.is_paid);
    let comment = match &body.comment {
        Some(patch) => patch.clone(), // explicit value, or explicit null to clear
        None => current.comment.clone(),
    };
    let payment_date = paid_transition_date(
        current.is_paid,
        current.payment_date,
        is_paid,
        Local::now().naive_local(),
    );

    sqlx::query(
        r#"
        UPDATE payouts
        SET is_paid = ?, comment = ?, payment_date = ?
        WHERE id = ?
        "#,
    )
    .bind(is_paid)
    .bind(&comment)
    .bind(payment_date)
    .bind(payout_id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, payout_id, "Failed to update payout");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(Payout {
        is_paid,
        comment,
        payment_date,
        ..current
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn patch_without_comment_field_keeps_stored_comment() {
        let body: UpdatePayout = serde_json::from_value(json!({ "is_paid": true })).unwrap();
        assert_eq!(body.comment, None);
    }

    #[test]
    fn patch_with_null_comment_clears_it() {
        let body: UpdatePayout =
            serde_json::from_value(json!({ "is_paid": true, "comment": null })).unwrap();
        assert_eq!(body.comment, Some(None));
    }

    #[test]
    fn patch_with_comment_value_replaces_it() {
        let body: UpdatePayout =
            serde_json::from_value(json!({ "comment": "Paid in cash" })).unwrap();
        assert_eq!(body.comment, Some(Some("Paid in cash".to_string())));
        assert_eq!(body.is_paid, None);
    }
}
