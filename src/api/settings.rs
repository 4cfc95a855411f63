use crate::model::settings::SystemSettings;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::Deserialize;
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info};
use utoipa::ToSchema;

/// Loads the singleton settings row, inserting the defaults if the table is
/// empty. Callers always get a usable value.
pub async fn get_or_create_settings(pool: &MySqlPool) -> Result<SystemSettings, sqlx::Error> {
    let existing = sqlx::query_as::<_, SystemSettings>("SELECT * FROM system_settings LIMIT 1")
        .fetch_optional(pool)
        .await?;

    if let Some(settings) = existing {
        return Ok(settings);
    }

    let defaults = SystemSettings::default();

    let result = sqlx::query(
        r#"
        INSERT INTO system_settings
            (late_allowance_minutes,
             work_day_sunday, work_day_monday, work_day_tuesday, work_day_wednesday,
             work_day_thursday, work_day_friday, work_day_saturday,
             working_hours_per_day, working_hours_start, working_hours_end,
             overtime_multiplier, weekend_overtime_multiplier)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(defaults.late_allowance_minutes)
    .bind(defaults.work_day_sunday)
    .bind(defaults.work_day_monday)
    .bind(defaults.work_day_tuesday)
    .bind(defaults.work_day_wednesday)
    .bind(defaults.work_day_thursday)
    .bind(defaults.work_day_friday)
    .bind(defaults.work_day_saturday)
    .bind(defaults.working_hours_per_day)
    .bind(&defaults.working_hours_start)
    .bind(&defaults.working_hours_end)
    .bind(defaults.overtime_multiplier)
    .bind(defaults.weekend_overtime_multiplier)
    .execute(pool)
    .await?;

    info!("Created default system settings row");

    Ok(SystemSettings {
        id: result.last_insert_id(),
        ..defaults
    })
}

#[derive(Deserialize, ToSchema)]
pub struct UpdateSettings {
    pub late_allowance_minutes: Option<i32>,
    pub work_day_sunday: Option<bool>,
    pub work_day_monday: Option<bool>,
    pub work_day_tuesday: Option<bool>,
    pub work_day_wednesday: Option<bool>,
    pub work_day_thursday: Option<bool>,
    pub work_day_friday: Option<bool>,
    pub work_day_saturday: Option<bool>,
    #[schema(example = 8.0)]
    pub working_hours_per_day: Option<f64>,
    #[schema(example = "09:00")]
    pub working_hours_start: Option<String>,
    #[schema(example = "17:00")]
    pub working_hours_end: Option<String>,
    #[schema(example = 1.5)]
    pub overtime_multiplier: Option<f64>,
    #[schema(example = 2.0)]
    pub weekend_overtime_multiplier: Option<f64>,
}

/// Get system settings
#[utoipa::path(
    get,
    path = "/api/v1/settings",
    responses(
        (status = 200, description = "Current settings (defaults on first read)", body = SystemSettings),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Settings"
)]
pub async fn get_settings(pool: web::Data<MySqlPool>) -> actix_web::Result<impl Responder> {
    let settings = get_or_create_settings(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to fetch settings");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(settings))
}

/// Update system settings
///
/// Partial update; omitted fields keep their current values.
#[utoipa::path(
    put,
    path = "/api/v1/settings",
    request_body = UpdateSettings,
    responses(
        (status = 200, description = "Settings updated", body = SystemSettings),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Internal server error")
    ),
    security(
        ("bearer_auth" = [])
    ),
    tag = "Settings"
)]
pub async fn update_settings(
    pool: web::Data<MySqlPool>,
    body: web::Json<UpdateSettings>,
) -> actix_web::Result<impl Responder> {
    let current = get_or_create_settings(pool.get_ref()).await.map_err(|e| {
        error!(error = %e, "Failed to load settings for update");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let merged = SystemSettings {
        id: current.id,
        late_allowance_minutes: body
            .late_allowance_minutes
            .unwrap_or(current.late_allowance_minutes),
        work_day_sunday: body.work_day_sunday.unwrap_or(current.work_day_sunday),
        work_day_monday: body.work_day_monday.unwrap_or(current.work_day_monday),
        work_day_tuesday: body.work_day_tuesday.unwrap_or(current.work_day_tuesday),
        work_day_wednesday: body.work_day_wednesday.unwrap_or(current.work_day_wednesday),
        work_day_thursday: body.work_day_thursday.unwrap_or(current.work_day_thursday),
        work_day_friday: body.work_day_friday.unwrap_or(current.work_day_friday),
        work_day_saturday: body.work_day_saturday.unwrap_or(current.work_day_saturday),
        working_hours_per_day: body
            .working_hours_per_day
            .unwrap_or(current.working_hours_per_day),
        working_hours_start: body
            .working_hours_start
            .clone()
            .unwrap_or(current.working_hours_start),
        working_hours_end: body
            .working_hours_end
            .clone()
            .unwrap_or(current.working_hours_end),
        overtime_multiplier: body
            .overtime_multiplier
            .unwrap_or(current.overtime_multiplier),
        weekend_overtime_multiplier: body
            .weekend_overtime_multiplier
            .unwrap_or(current.weekend_overtime_multiplier),
    };

    sqlx::query(
        r#"
        UPDATE system_settings
        SET late_allowance_minutes = ?,
            work_day_sunday = ?, work_day_monday = ?, work_day_tuesday = ?,
            work_day_wednesday = ?, work_day_thursday = ?, work_day_friday = ?,
            work_day_saturday = ?,
            working_hours_per_day = ?, working_hours_start = ?, working_hours_end = ?,
            overtime_multiplier = ?, weekend_overtime_multiplier = ?
        WHERE id = ?
        "#,
    )
    .bind(merged.late_allowance_minutes)
    .bind(merged.work_day_sunday)
    .bind(merged.work_day_monday)
    .bind(merged.work_day_tuesday)
    .bind(merged.work_day_wednesday)
    .bind(merged.work_day_thursday)
    .bind(merged.work_day_friday)
    .bind(merged.work_day_saturday)
    .bind(merged.working_hours_per_day)
    .bind(&merged.working_hours_start)
    .bind(&merged.working_hours_end)
    .bind(merged.overtime_multiplier)
    .bind(merged.weekend_overtime_multiplier)
    .bind(merged.id)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to update settings");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(json!({
        "message": "Settings updated successfully",
        "settings": merged
    })))
}
