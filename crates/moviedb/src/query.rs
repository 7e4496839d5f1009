//! Allow-listed sort and filter specifications.
//!
//! Client input reaches SQL text through exactly two doors, both in this
//! module:
//!
//! - [`build_sort_spec`] turns a requested sort field and direction into a
//!   [`QuerySpec`]. Unknown fields and directions fall back to the schema
//!   default and `ASC`; it never fails.
//! - [`build_filter_spec`] turns a requested filter into a [`FilterClause`],
//!   failing with [`DbError::InvalidFilterField`] or
//!   [`DbError::InvalidRangeBounds`] instead of guessing.
//!
//! The resulting specs hold `&SortField` / `&FilterField` references into the
//! static schema, so the identifiers spliced into a statement can only come
//! from the allow-list. Client values are carried as [`FilterValue`]s and
//! bound as parameters.
//!
//! # Example
//! ```ignore
//! use moviedb::{Entity, FilterInput, build_filter_spec, build_sort_spec};
//!
//! let schema = Entity::Movie.schema();
//! let spec = build_sort_spec(schema, Some("movie_rating"), Some("desc"))
//!     .with_filter(build_filter_spec(
//!         schema,
//!         "movie_release_year",
//!         FilterInput::range(Some("1990"), Some("2010")),
//!     )?);
//! ```

use crate::error::{DbError, DbResult};
use crate::schema::{EntitySchema, FieldType, FilterField, FilterMode, SortField};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tokio_postgres::types::ToSql;

// ==================== Sorting ====================

/// Sort direction for `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SortDir {
    #[default]
    #[serde(rename = "ASC")]
    Asc,
    #[serde(rename = "DESC")]
    Desc,
}

impl SortDir {
    /// Parse a client-supplied direction, case-insensitively.
    ///
    /// Returns `None` for anything other than `asc` / `desc`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }

    /// SQL keyword.
    pub fn to_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_sql())
    }
}

/// Raw sort parameters as they arrive from a request (`?sortBy=&order=`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SortRequest {
    #[serde(rename = "sortBy", default)]
    pub field: Option<String>,
    #[serde(default)]
    pub order: Option<String>,
}

impl SortRequest {
    pub fn new(field: Option<&str>, order: Option<&str>) -> Self {
        Self {
            field: field.map(str::to_string),
            order: order.map(str::to_string),
        }
    }

    /// Resolve against `schema`; see [`build_sort_spec`].
    pub fn resolve<'s>(&self, schema: &'s EntitySchema) -> QuerySpec<'s> {
        build_sort_spec(schema, self.field.as_deref(), self.order.as_deref())
    }
}

/// Validated ordering plus an optional filter, ready for a statement template.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec<'s> {
    order_by: &'s SortField,
    direction: SortDir,
    filter: Option<FilterClause<'s>>,
    fallback: bool,
}

impl<'s> QuerySpec<'s> {
    /// Sort by the schema default, ascending, with no filter.
    pub fn default_for(schema: &'s EntitySchema) -> Self {
        Self {
            order_by: schema.default_sort_field(),
            direction: SortDir::Asc,
            filter: None,
            fallback: false,
        }
    }

    /// The allow-listed field placed in `ORDER BY`.
    pub fn order_by_field(&self) -> &'s SortField {
        self.order_by
    }

    pub fn order_direction(&self) -> SortDir {
        self.direction
    }

    pub fn filter(&self) -> Option<&FilterClause<'s>> {
        self.filter.as_ref()
    }

    /// Whether a requested sort field or direction was replaced by a default.
    pub fn used_fallback(&self) -> bool {
        self.fallback
    }

    /// Attach a filter clause.
    pub fn with_filter(mut self, filter: FilterClause<'s>) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Resolve a requested sort field and direction against `schema`.
///
/// The field is accepted only on a case-sensitive exact match with a sortable
/// field; otherwise the schema default is used. The direction is accepted if
/// it upper-cases to `ASC` or `DESC`; otherwise `ASC`. Never fails.
pub fn build_sort_spec<'s>(
    schema: &'s EntitySchema,
    requested_field: Option<&str>,
    requested_order: Option<&str>,
) -> QuerySpec<'s> {
    let mut fallback = false;

    let order_by = match requested_field {
        Some(name) => schema.sortable(name).unwrap_or_else(|| {
            fallback = true;
            schema.default_sort_field()
        }),
        None => schema.default_sort_field(),
    };

    let direction = match requested_order {
        Some(raw) => SortDir::parse(raw).unwrap_or_else(|| {
            fallback = true;
            SortDir::Asc
        }),
        None => SortDir::Asc,
    };

    QuerySpec {
        order_by,
        direction,
        filter: None,
        fallback,
    }
}

// ==================== Filtering ====================

/// Raw filter value(s) from a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterInput<'a> {
    /// A single value, for substring and exact-match fields.
    Value(&'a str),
    /// Two bounds, for range fields. Either may be missing.
    Range {
        low: Option<&'a str>,
        high: Option<&'a str>,
    },
}

impl<'a> FilterInput<'a> {
    pub fn value(raw: &'a str) -> Self {
        Self::Value(raw)
    }

    pub fn range(low: Option<&'a str>, high: Option<&'a str>) -> Self {
        Self::Range { low, high }
    }
}

/// A client value parsed to a field's semantic type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterValue {
    Integer(i32),
    Decimal(Decimal),
    Text(String),
}

impl FilterValue {
    /// Parse `raw` as a value of type `ty`.
    ///
    /// Numeric input is trimmed; text is kept as-is. The error is a
    /// human-readable reason.
    pub fn parse(ty: FieldType, raw: &str) -> Result<Self, String> {
        match ty {
            FieldType::Integer => raw
                .trim()
                .parse::<i32>()
                .map(Self::Integer)
                .map_err(|_| format!("'{raw}' is not an integer")),
            FieldType::Year => {
                let year = raw
                    .trim()
                    .parse::<i32>()
                    .map_err(|_| format!("'{raw}' is not a year"))?;
                if !(1000..=9999).contains(&year) {
                    return Err(format!("{year} is not a four-digit year"));
                }
                Ok(Self::Integer(year))
            }
            FieldType::Decimal => Decimal::from_str(raw.trim())
                .map(Self::Decimal)
                .map_err(|_| format!("'{raw}' is not a decimal number")),
            FieldType::Text if raw.contains('\0') => Err("text must not contain NUL".to_string()),
            FieldType::Text => Ok(Self::Text(raw.to_string())),
        }
    }

    /// Box the value as a bind parameter.
    pub fn to_param(&self) -> Arc<dyn ToSql + Sync + Send> {
        match self {
            Self::Integer(v) => Arc::new(*v),
            Self::Decimal(v) => Arc::new(*v),
            Self::Text(v) => Arc::new(v.clone()),
        }
    }

    fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Decimal(a), Self::Decimal(b)) => Some(a.cmp(b)),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

/// Comparison applied by a [`FilterClause`].
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `ILIKE` against an escaped `%value%` pattern.
    Contains(FilterValue),
    /// `= value`.
    Equals(FilterValue),
    /// `BETWEEN low AND high`, inclusive.
    Between(FilterValue, FilterValue),
}

/// A validated `WHERE` predicate on an allow-listed field.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause<'s> {
    field: &'s FilterField,
    predicate: Predicate,
}

impl<'s> FilterClause<'s> {
    pub fn field(&self) -> &'s FilterField {
        self.field
    }

    pub fn mode(&self) -> FilterMode {
        self.field.mode()
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Values bound as parameters, in placeholder order.
    pub fn bound_values(&self) -> Vec<&FilterValue> {
        match &self.predicate {
            Predicate::Contains(v) | Predicate::Equals(v) => vec![v],
            Predicate::Between(low, high) => vec![low, high],
        }
    }
}

/// Validate a filter request against `schema`.
///
/// # Errors
/// - [`DbError::InvalidFilterField`] if `field` is not filterable (exact,
///   case-sensitive match).
/// - [`DbError::InvalidRangeBounds`] if a range field is missing a bound, a
///   bound does not parse, or `low > high`.
/// - [`DbError::InvalidFilterValue`] if a single value is empty or does not
///   parse, or a range is given for a non-range field.
pub fn build_filter_spec<'s>(
    schema: &'s EntitySchema,
    field: &str,
    input: FilterInput<'_>,
) -> DbResult<FilterClause<'s>> {
    let Some(filter_field) = schema.filterable(field) else {
        return Err(DbError::invalid_filter_field(schema.entity_name(), field));
    };
    let name = filter_field.name();
    let ty = filter_field.field_type();

    let predicate = match (filter_field.mode(), input) {
        (FilterMode::Substring, FilterInput::Value(raw)) => {
            let raw = non_empty(name, raw)?;
            Predicate::Contains(FilterValue::Text(contains_pattern(raw)))
        }
        (FilterMode::Exact, FilterInput::Value(raw)) => {
            let raw = non_empty(name, raw)?;
            let value = FilterValue::parse(ty, raw).map_err(|e| DbError::invalid_value(name, e))?;
            Predicate::Equals(value)
        }
        (FilterMode::Range, FilterInput::Range { low, high }) => {
            let low = range_bound(name, ty, "low", low)?;
            let high = range_bound(name, ty, "high", high)?;
            if low.compare(&high) == Some(Ordering::Greater) {
                return Err(DbError::invalid_range(name, "low bound exceeds high bound"));
            }
            Predicate::Between(low, high)
        }
        (FilterMode::Range, FilterInput::Value(_)) => {
            return Err(DbError::invalid_range(name, "both low and high bounds are required"));
        }
        (_, FilterInput::Range { .. }) => {
            return Err(DbError::invalid_value(name, "field does not accept a range"));
        }
    };

    Ok(FilterClause {
        field: filter_field,
        predicate,
    })
}

fn non_empty<'a>(field: &str, raw: &'a str) -> DbResult<&'a str> {
    if raw.trim().is_empty() {
        return Err(DbError::invalid_value(field, "value is required"));
    }
    if raw.contains('\0') {
        return Err(DbError::invalid_value(field, "value must not contain NUL"));
    }
    Ok(raw)
}

fn range_bound(
    field: &str,
    ty: FieldType,
    which: &str,
    raw: Option<&str>,
) -> DbResult<FilterValue> {
    let raw = match raw {
        Some(raw) if !raw.trim().is_empty() => raw,
        _ => return Err(DbError::invalid_range(field, format!("missing {which} bound"))),
    };
    FilterValue::parse(ty, raw).map_err(|e| DbError::invalid_range(field, format!("{which} bound: {e}")))
}

/// Wrap `raw` as an `ILIKE` contains pattern, escaping `\`, `%` and `_`.
fn contains_pattern(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('%');
    for c in raw.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Entity;

    const HOSTILE: &[&str] = &[
        "",
        " ",
        "not_a_real_field",
        "MOVIE_TITLE",
        "movie_title ",
        "movie_title; DROP TABLE movie",
        "actor_name; DROP TABLE actor",
        "movie_rating DESC, (SELECT 1)",
        "1; --",
        "m.movie_title",
        "\"movie_title\"",
        "movie_title/**/",
        "movie_id",
        "actor_id",
        "' OR '1'='1",
    ];

    #[test]
    fn sort_field_always_in_allow_list() {
        for entity in Entity::ALL {
            let schema = entity.schema();
            let mut inputs: Vec<&str> = HOSTILE.to_vec();
            inputs.extend(schema.sortable_fields().iter().map(SortField::name));
            inputs.extend(schema.filterable_fields().iter().map(FilterField::name));

            for input in inputs {
                for order in [None, Some("asc"), Some("DESC"), Some("sideways")] {
                    let spec = build_sort_spec(schema, Some(input), order);
                    let chosen = spec.order_by_field();
                    assert!(
                        schema.sortable_fields().iter().any(|f| f == chosen),
                        "{}: '{input}' resolved outside allow-list",
                        schema.entity_name()
                    );
                }
            }
        }
    }

    #[test]
    fn absent_and_invalid_sort_resolve_to_default() {
        for entity in Entity::ALL {
            let schema = entity.schema();
            let absent = build_sort_spec(schema, None, None);
            let invalid = build_sort_spec(schema, Some("not_a_real_field"), Some("sideways"));

            assert_eq!(absent.order_by_field(), invalid.order_by_field());
            assert_eq!(absent.order_direction(), invalid.order_direction());
            assert_eq!(absent.order_by_field(), schema.default_sort_field());
            assert_eq!(absent.order_direction(), SortDir::Asc);
            assert!(!absent.used_fallback());
            assert!(invalid.used_fallback());
        }
    }

    #[test]
    fn sort_direction_is_case_insensitive() {
        let schema = Entity::Movie.schema();
        let dir = |order| build_sort_spec(schema, None, Some(order)).order_direction();

        assert_eq!(dir("asc"), SortDir::Asc);
        assert_eq!(dir("ASC"), SortDir::Asc);
        assert_eq!(dir("desc"), SortDir::Desc);
        assert_eq!(dir("DeSc"), SortDir::Desc);
        assert_eq!(dir("banana"), SortDir::Asc);
        assert_eq!(dir(""), SortDir::Asc);
        assert_eq!(dir("desc; DROP TABLE movie"), SortDir::Asc);
    }

    #[test]
    fn movie_sort_scenario() {
        let schema = Entity::Movie.schema();
        let names: Vec<&str> = schema.sortable_fields().iter().map(SortField::name).collect();
        assert_eq!(
            names,
            ["movie_title", "movie_release_year", "movie_runtime", "movie_rating"]
        );
        assert_eq!(schema.default_sort_field().name(), "movie_title");

        let spec = build_sort_spec(schema, Some("movie_rating"), Some("desc"));
        assert_eq!(spec.order_by_field().name(), "movie_rating");
        assert_eq!(spec.order_direction(), SortDir::Desc);

        let spec = build_sort_spec(schema, Some("movie_id"), None);
        assert_eq!(spec.order_by_field().name(), "movie_title");
        assert_eq!(spec.order_direction(), SortDir::Asc);
    }

    #[test]
    fn sort_request_resolves_like_build_sort_spec() {
        let schema = Entity::Director.schema();
        let req = SortRequest::new(Some("director_birth_year"), Some("desc"));
        assert_eq!(
            req.resolve(schema),
            build_sort_spec(schema, Some("director_birth_year"), Some("desc"))
        );
        assert_eq!(SortRequest::default().resolve(schema), QuerySpec::default_for(schema));
    }

    #[test]
    fn unknown_filter_field_is_rejected() {
        for entity in Entity::ALL {
            let schema = entity.schema();
            for field in HOSTILE {
                if schema.filterable(field).is_some() {
                    continue;
                }
                let err = build_filter_spec(schema, field, FilterInput::value("x")).unwrap_err();
                assert!(
                    matches!(err, DbError::InvalidFilterField { .. }),
                    "{}: '{field}' gave {err:?}",
                    schema.entity_name()
                );
            }
        }
    }

    #[test]
    fn filter_field_name_plus_injection_is_rejected() {
        let schema = Entity::Actor.schema();
        let err = build_filter_spec(
            schema,
            "actor_name; DROP TABLE actor",
            FilterInput::value("Tom"),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            DbError::InvalidFilterField { ref entity, ref field }
                if entity == "actor" && field == "actor_name; DROP TABLE actor"
        ));
    }

    #[test]
    fn range_filter_binds_both_bounds() {
        let schema = Entity::Movie.schema();
        let clause = build_filter_spec(
            schema,
            "movie_release_year",
            FilterInput::range(Some("2000"), Some("2010")),
        )
        .unwrap();

        assert_eq!(clause.field().name(), "movie_release_year");
        assert_eq!(clause.mode(), FilterMode::Range);
        assert_eq!(
            clause.bound_values(),
            vec![&FilterValue::Integer(2000), &FilterValue::Integer(2010)]
        );
    }

    #[test]
    fn range_filter_missing_bound_fails() {
        let schema = Entity::Movie.schema();
        for input in [
            FilterInput::range(Some("2000"), None),
            FilterInput::range(None, Some("2010")),
            FilterInput::range(None, None),
            FilterInput::range(Some("2000"), Some("  ")),
            FilterInput::value("2000"),
        ] {
            let err = build_filter_spec(schema, "movie_release_year", input).unwrap_err();
            assert!(matches!(err, DbError::InvalidRangeBounds { .. }), "{input:?}");
        }
    }

    #[test]
    fn range_filter_rejects_unparsable_and_inverted_bounds() {
        let schema = Entity::Movie.schema();
        let cases = [
            ("movie_release_year", "abc", "2010"),
            ("movie_release_year", "2000", "20x0"),
            ("movie_release_year", "12", "2010"),
            ("movie_release_year", "2010", "2000"),
            ("movie_rating", "eight", "9"),
            ("movie_rating", "9.5", "7.0"),
        ];
        for (field, low, high) in cases {
            let err = build_filter_spec(schema, field, FilterInput::range(Some(low), Some(high)))
                .unwrap_err();
            assert!(
                matches!(err, DbError::InvalidRangeBounds { .. }),
                "{field} {low}..{high}"
            );
        }
    }

    #[test]
    fn decimal_range_parses_bounds() {
        let schema = Entity::StreamingPlatform.schema();
        let clause = build_filter_spec(
            schema,
            "streaming_platform_subscription_cost",
            FilterInput::range(Some("7.99"), Some(" 12.99 ")),
        )
        .unwrap();
        assert_eq!(
            clause.bound_values(),
            vec![
                &FilterValue::Decimal(Decimal::new(799, 2)),
                &FilterValue::Decimal(Decimal::new(1299, 2)),
            ]
        );
    }

    #[test]
    fn substring_filter_escapes_like_metacharacters() {
        let schema = Entity::Actor.schema();
        let clause =
            build_filter_spec(schema, "actor_nationality", FilterInput::value("Amer")).unwrap();
        assert_eq!(
            clause.predicate(),
            &Predicate::Contains(FilterValue::Text("%Amer%".into()))
        );

        let clause =
            build_filter_spec(schema, "actor_name", FilterInput::value(r"100%_\x")).unwrap();
        assert_eq!(
            clause.bound_values(),
            vec![&FilterValue::Text(r"%100\%\_\\x%".into())]
        );
    }

    #[test]
    fn exact_filter_parses_to_field_type() {
        let schema = Entity::Movie.schema();
        let clause = build_filter_spec(schema, "director_id", FilterInput::value(" 3 ")).unwrap();
        assert_eq!(clause.predicate(), &Predicate::Equals(FilterValue::Integer(3)));

        let err = build_filter_spec(schema, "director_id", FilterInput::value("3 OR 1=1"))
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidFilterValue { .. }));
    }

    #[test]
    fn single_value_fields_reject_ranges_and_blanks() {
        let schema = Entity::Actor.schema();
        let err = build_filter_spec(
            schema,
            "actor_name",
            FilterInput::range(Some("a"), Some("b")),
        )
        .unwrap_err();
        assert!(matches!(err, DbError::InvalidFilterValue { .. }));

        let err = build_filter_spec(schema, "actor_name", FilterInput::value("   ")).unwrap_err();
        assert!(matches!(err, DbError::InvalidFilterValue { .. }));
    }

    #[test]
    fn nul_bytes_never_reach_a_bind() {
        let schema = Entity::Actor.schema();
        for (field, raw) in [
            ("actor_name", "Ann\0e"),
            ("actor_nationality", "\0"),
            ("actor_id", "1\0"),
        ] {
            let err = build_filter_spec(schema, field, FilterInput::value(raw)).unwrap_err();
            assert!(matches!(err, DbError::InvalidFilterValue { .. }), "{field}: {err}");
        }
        assert!(FilterValue::parse(FieldType::Text, "a\0b").is_err());
    }

    #[test]
    fn filter_clause_borrows_canonical_field() {
        let schema = Entity::Genre.schema();
        let requested = String::from("genre_name");
        let clause = build_filter_spec(schema, &requested, FilterInput::value("dra")).unwrap();
        let canonical = schema.filterable("genre_name").unwrap();
        assert!(std::ptr::eq(clause.field(), canonical));
    }

    #[test]
    fn with_filter_keeps_ordering() {
        let schema = Entity::Production.schema();
        let clause = build_filter_spec(
            schema,
            "production_founded_year",
            FilterInput::range(Some("1900"), Some("1950")),
        )
        .unwrap();
        let spec = build_sort_spec(schema, Some("production_founded_year"), Some("desc"))
            .with_filter(clause.clone());

        assert_eq!(spec.order_by_field().name(), "production_founded_year");
        assert_eq!(spec.order_direction(), SortDir::Desc);
        assert_eq!(spec.filter(), Some(&clause));
    }
}
