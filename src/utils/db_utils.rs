use actix_web::error::ErrorBadRequest;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::MySqlPool;

/// Value bound into a dynamically built UPDATE.
#[derive(Debug)]
pub enum PatchValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

#[derive(Debug)]
pub struct SqlPatch {
    pub sql: String,
    pub values: Vec<PatchValue>,
}

/// Builds a partial UPDATE from a JSON body. Only columns named in `allowed`
/// may be patched; anything else is rejected with 400 rather than interpolated
/// into SQL.
pub fn build_patch(
    table: &str,
    allowed: &[&str],
    payload: &Value,
    id_column: &str,
    id_value: u64,
) -> Result<SqlPatch, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    let mut columns = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    // Sorted keys keep the generated SQL deterministic.
    let mut entries: Vec<(&String, &Value)> = obj.iter().collect();
    entries.sort_by_key(|(key, _)| key.as_str());

    for (key, value) in entries {
        if !allowed.contains(&key.as_str()) {
            return Err(ErrorBadRequest(format!("Unknown field: {}", key)));
        }

        let bound = match value {
            Value::String(s) => {
                // Date-shaped strings bind as dates so DATE/DATETIME columns accept them.
                if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    PatchValue::Date(d)
                } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                    PatchValue::DateTime(dt)
                } else {
                    PatchValue::Text(s.clone())
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    PatchValue::Int(i)
                } else if let Some(f) = n.as_f64() {
                    PatchValue::Float(f)
                } else {
                    return Err(ErrorBadRequest(format!("Unsupported number in field: {}", key)));
                }
            }
            Value::Bool(b) => PatchValue::Bool(*b),
            Value::Null => PatchValue::Null,
            _ => return Err(ErrorBadRequest(format!("Unsupported value for field: {}", key))),
        };

        columns.push(format!("{} = ?", key));
        values.push(bound);
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        columns.join(", "),
        id_column
    );
    values.push(PatchValue::Int(id_value as i64));

    Ok(SqlPatch { sql, values })
}

/// Executes a built patch, returning the number of affected rows.
pub async fn apply_patch(pool: &MySqlPool, patch: SqlPatch) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&patch.sql);

    for value in patch.values {
        query = match value {
            PatchValue::Text(v) => query.bind(v),
            PatchValue::Int(v) => query.bind(v),
            PatchValue::Float(v) => query.bind(v),
            PatchValue::Bool(v) => query.bind(v),
            PatchValue::Date(v) => query.bind(v),
            PatchValue::DateTime(v) => query.bind(v),
            PatchValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const EMPLOYEE_COLUMNS: &[&str] = &["name", "email", "daily_rate"];

    #[test]
    fn builds_update_for_allowed_columns() {
        let payload = json!({ "name": "Jane Doe", "daily_rate": 400.0 });
        let patch = build_patch("employees", EMPLOYEE_COLUMNS, &payload, "id", 7).unwrap();

        assert_eq!(
            patch.sql,
            "UPDATE employees SET daily_rate = ?, name = ? WHERE id = ?"
        );
        assert_eq!(patch.values.len(), 3);
    }

    #[test]
    fn rejects_unknown_columns() {
        let payload = json!({ "name": "x", "role": "admin" });
        assert!(build_patch("employees", EMPLOYEE_COLUMNS, &payload, "id", 7).is_err());
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(build_patch("employees", EMPLOYEE_COLUMNS, &json!({}), "id", 7).is_err());
        assert!(build_patch("employees", EMPLOYEE_COLUMNS, &json!([1]), "id", 7).is_err());
    }
}
