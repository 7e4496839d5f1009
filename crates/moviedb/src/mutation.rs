//! INSERT / UPDATE statements from JSON payloads.
//!
//! Payload keys are checked against the schema's writable fields; only those
//! canonical column names reach the statement text and every value is bound.
//! Statements return the primary key so callers can read the stored row back
//! through the entity's select statement.

use crate::error::{DbError, DbResult};
use crate::query::FilterValue;
use crate::schema::{EntitySchema, FieldType, WritableField};
use crate::sql::Sql;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_postgres::types::ToSql;

/// JSON object accepted by create and update.
pub type Payload = Map<String, Value>;

/// Build `INSERT INTO <table> (...) VALUES (...) RETURNING <id>`.
///
/// # Errors
/// [`DbError::Validation`] on unknown keys, a missing or null required field,
/// or a value that does not fit its field type.
pub fn insert_statement(schema: &EntitySchema, payload: &Payload) -> DbResult<Sql> {
    reject_unknown_keys(schema, payload)?;

    let mut columns = Vec::new();
    for field in schema.writable_fields() {
        match payload.get(field.name()) {
            Some(value) => columns.push((field, value)),
            None if field.is_required() => {
                return Err(DbError::validation(format!(
                    "{}: field '{}' is required",
                    schema.entity_name(),
                    field.name()
                )));
            }
            None => {}
        }
    }

    let mut q = Sql::new("INSERT INTO ");
    q.push_ident(schema.table());
    if columns.is_empty() {
        q.push(" DEFAULT VALUES");
    } else {
        q.push(" (");
        for (i, (field, _)) in columns.iter().enumerate() {
            if i > 0 {
                q.push(", ");
            }
            q.push_ident(field.ident());
        }
        q.push(") VALUES (");
        for (i, (field, value)) in columns.iter().enumerate() {
            if i > 0 {
                q.push(", ");
            }
            q.push_bind_value(bind_value(schema, field, value)?);
        }
        q.push(")");
    }
    q.push(" RETURNING ");
    q.push_ident(schema.id_field());
    Ok(q)
}

/// Build `UPDATE <table> SET ... WHERE <id> = $n RETURNING <id>`.
///
/// # Errors
/// [`DbError::Validation`] on an empty payload, unknown keys, nulling a
/// required field, or a value that does not fit its field type.
pub fn update_statement(schema: &EntitySchema, id: i32, payload: &Payload) -> DbResult<Sql> {
    if payload.is_empty() {
        return Err(DbError::validation(format!(
            "{}: update requires at least one field",
            schema.entity_name()
        )));
    }
    reject_unknown_keys(schema, payload)?;

    let mut q = Sql::new("UPDATE ");
    q.push_ident(schema.table()).push(" SET ");
    let mut first = true;
    for field in schema.writable_fields() {
        let Some(value) = payload.get(field.name()) else {
            continue;
        };
        if !first {
            q.push(", ");
        }
        first = false;
        q.push_ident(field.ident()).push(" = ");
        q.push_bind_value(bind_value(schema, field, value)?);
    }
    q.push(" WHERE ");
    q.push_ident(schema.id_field()).push(" = ").push_bind(id);
    q.push(" RETURNING ");
    q.push_ident(schema.id_field());
    Ok(q)
}

fn reject_unknown_keys(schema: &EntitySchema, payload: &Payload) -> DbResult<()> {
    if let Some(key) = payload.keys().find(|k| schema.writable(k).is_none()) {
        return Err(DbError::validation(format!(
            "{}: field '{key}' is not writable",
            schema.entity_name()
        )));
    }
    Ok(())
}

fn bind_value(
    schema: &EntitySchema,
    field: &WritableField,
    value: &Value,
) -> DbResult<Arc<dyn ToSql + Sync + Send>> {
    let invalid = |reason: String| {
        DbError::validation(format!(
            "{}: invalid value for '{}': {reason}",
            schema.entity_name(),
            field.name()
        ))
    };

    let raw = match value {
        Value::Null if field.is_required() => return Err(invalid("must not be null".into())),
        Value::Null => return Ok(typed_null(field.field_type())),
        Value::String(s) if field.field_type() == FieldType::Text => {
            if field.is_required() && s.trim().is_empty() {
                return Err(invalid("must not be blank".into()));
            }
            s.clone()
        }
        Value::String(s) => s.clone(),
        Value::Number(n) if field.field_type().is_numeric() => n.to_string(),
        other => return Err(invalid(format!("unexpected {}", json_kind(other)))),
    };

    FilterValue::parse(field.field_type(), &raw)
        .map(|v| v.to_param())
        .map_err(invalid)
}

fn typed_null(ty: FieldType) -> Arc<dyn ToSql + Sync + Send> {
    match ty {
        FieldType::Integer | FieldType::Year => Arc::new(None::<i32>),
        FieldType::Decimal => Arc::new(None::<Decimal>),
        FieldType::Text => Arc::new(None::<String>),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Entity;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    #[test]
    fn insert_uses_schema_order_and_binds_values() {
        let schema = Entity::Movie.schema();
        let q = insert_statement(
            schema,
            &payload(json!({
                "director_id": 1,
                "movie_title": "Oppenheimer",
                "movie_rating": "8.3",
                "movie_release_year": 2023,
            })),
        )
        .unwrap();

        assert_eq!(
            q.to_sql(),
            "INSERT INTO movie (movie_title, movie_release_year, movie_rating, director_id) \
             VALUES ($1, $2, $3, $4) RETURNING movie_id"
        );
        assert_eq!(q.param_count(), 4);
    }

    #[test]
    fn insert_requires_required_fields() {
        let schema = Entity::Actor.schema();
        let err = insert_statement(schema, &payload(json!({ "actor_birth_year": 1970 })))
            .unwrap_err();
        assert!(err.to_string().contains("'actor_name' is required"), "{err}");

        let err = insert_statement(schema, &payload(json!({ "actor_name": null }))).unwrap_err();
        assert!(err.to_string().contains("must not be null"), "{err}");

        let err = insert_statement(schema, &payload(json!({ "actor_name": "  " }))).unwrap_err();
        assert!(err.to_string().contains("must not be blank"), "{err}");
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let schema = Entity::Genre.schema();
        for key in ["genre_id", "genre_name; DROP TABLE genre", "GENRE_NAME"] {
            let mut body = payload(json!({ "genre_name": "Horror" }));
            body.insert(key.to_string(), json!("x"));
            let err = insert_statement(schema, &body).unwrap_err();
            assert!(matches!(err, DbError::Validation(_)), "{key}");
            assert!(update_statement(schema, 1, &body).is_err(), "{key}");
        }
    }

    #[test]
    fn values_are_type_checked() {
        let schema = Entity::StreamingPlatform.schema();
        for body in [
            json!({ "streaming_platform_name": 42 }),
            json!({ "streaming_platform_name": "Max", "streaming_platform_launch_year": "soon" }),
            json!({ "streaming_platform_name": "Max", "streaming_platform_launch_year": 20.5 }),
            json!({ "streaming_platform_name": "Max", "streaming_platform_subscription_cost": true }),
            json!({ "streaming_platform_name": "Max", "streaming_platform_subscription_cost": [1] }),
            json!({ "streaming_platform_name": "Ma\u{0}x" }),
        ] {
            assert!(insert_statement(schema, &payload(body.clone())).is_err(), "{body}");
        }

        let q = insert_statement(
            schema,
            &payload(json!({
                "streaming_platform_name": "Max",
                "streaming_platform_launch_year": "2020",
                "streaming_platform_subscription_cost": 9.99,
            })),
        )
        .unwrap();
        assert_eq!(q.param_count(), 3);
    }

    #[test]
    fn optional_fields_accept_null() {
        let schema = Entity::Production.schema();
        let q = update_statement(
            schema,
            5,
            &payload(json!({ "production_headquarters": null })),
        )
        .unwrap();
        assert_eq!(
            q.to_sql(),
            "UPDATE production SET production_headquarters = $1 \
             WHERE production_id = $2 RETURNING production_id"
        );
        assert_eq!(q.param_count(), 2);
    }

    #[test]
    fn update_requires_fields_and_keeps_required_non_null() {
        let schema = Entity::Director.schema();
        let err = update_statement(schema, 1, &Payload::new()).unwrap_err();
        assert!(err.to_string().contains("at least one field"), "{err}");

        let err =
            update_statement(schema, 1, &payload(json!({ "director_name": null }))).unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));
    }
}
