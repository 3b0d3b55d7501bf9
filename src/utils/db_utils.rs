use actix_web::error::ErrorBadRequest;
use chrono::{NaiveDate, NaiveDateTime};
use serde_json::Value;
use sqlx::MySqlPool;

/// SQL bindable value enum
#[derive(Debug)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Bool(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Null,
}

/// Dynamic UPDATE statement with its bind values
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// Build a dynamic UPDATE from a JSON payload. Only keys present in
/// `allowed_columns` may appear; column names are never taken from the
/// payload verbatim, the allowlist entry is what lands in the SQL.
pub fn build_update_sql(
    table: &str,
    payload: &Value,
    allowed_columns: &[&str],
    id_column: &str,
    id_value: i64,
) -> Result<SqlUpdate, actix_web::Error> {
    let obj = payload
        .as_object()
        .ok_or_else(|| ErrorBadRequest("Payload must be a JSON object"))?;

    if obj.is_empty() {
        return Err(ErrorBadRequest("No fields provided for update"));
    }

    let mut columns = Vec::with_capacity(obj.len());
    let mut values = Vec::with_capacity(obj.len() + 1);

    for (key, value) in obj {
        let column = allowed_columns
            .iter()
            .find(|c| *c == key)
            .ok_or_else(|| ErrorBadRequest(format!("Unknown field: {}", key)))?;
        columns.push(format!("{} = ?", column));

        match value {
            Value::String(s) => {
                if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
                    values.push(SqlValue::Date(d));
                } else if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
                    values.push(SqlValue::DateTime(dt));
                } else {
                    values.push(SqlValue::String(s.clone()));
                }
            }
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    values.push(SqlValue::I64(i));
                } else if let Some(f) = n.as_f64() {
                    values.push(SqlValue::F64(f));
                }
            }
            Value::Bool(b) => values.push(SqlValue::Bool(*b)),
            Value::Null => values.push(SqlValue::Null),
            _ => return Err(ErrorBadRequest("Unsupported JSON value type")),
        }
    }

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table,
        columns.join(", "),
        id_column
    );

    // WHERE id = ?
    values.push(SqlValue::I64(id_value));

    Ok(SqlUpdate { sql, values })
}

/// Execute the update
pub async fn execute_update(pool: &MySqlPool, update: SqlUpdate) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::I64(v) => query.bind(v),
            SqlValue::F64(v) => query.bind(v),
            SqlValue::Bool(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_update_from_allowed_fields() {
        let update = build_update_sql(
            "locations",
            &json!({"name": "Annex", "latitude": 40.7128}),
            &["name", "latitude", "longitude"],
            "id",
            9,
        )
        .unwrap();
        assert_eq!(
            update.sql,
            "UPDATE locations SET latitude = ?, name = ? WHERE id = ?"
        );
        assert_eq!(update.values.len(), 3);
    }

    #[test]
    fn rejects_unknown_fields() {
        let err = build_update_sql(
            "locations",
            &json!({"name; DROP TABLE users": "x"}),
            &["name"],
            "id",
            1,
        );
        assert!(err.is_err());
    }

    #[test]
    fn rejects_empty_payload() {
        assert!(build_update_sql("locations", &json!({}), &["name"], "id", 1).is_err());
    }
}
