//! Static per-entity schema descriptors.
//!
//! An [`EntitySchema`] is the allow-list the query builder validates client
//! input against: which fields may appear in `ORDER BY`, which may be
//! filtered and how, and which may be written. Schemas are built once through
//! [`EntitySchemaBuilder`], which rejects descriptors that break the
//! invariants below, and are never mutated afterwards.
//!
//! - the default sort field is one of the sortable fields;
//! - table, alias and field names are valid unquoted identifiers;
//! - no field name appears twice in the same list;
//! - substring filtering is only declared on text fields.

use crate::error::{DbError, DbResult};
use crate::ident::Ident;
use serde::Serialize;
use std::collections::HashSet;

/// Semantic type of a field, used to parse and bind client values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// `INT` column.
    Integer,
    /// `VARCHAR` / `TEXT` column.
    Text,
    /// `NUMERIC` column.
    Decimal,
    /// `INT` column holding a calendar year.
    Year,
}

impl FieldType {
    /// Whether values of this type have a numeric ordering.
    pub fn is_numeric(self) -> bool {
        !matches!(self, FieldType::Text)
    }
}

/// How a filterable field compares against client values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterMode {
    /// Case-insensitive contains match.
    Substring,
    /// Equality against a single value.
    Exact,
    /// Inclusive `BETWEEN low AND high`.
    Range,
}

/// A field permitted in `ORDER BY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortField {
    ident: Ident,
    column: Ident,
    ty: FieldType,
}

impl SortField {
    /// Canonical field name.
    pub fn name(&self) -> &str {
        self.ident.name()
    }

    /// Semantic type of the field.
    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    /// Column reference as spliced into statements (`m.movie_title`).
    pub fn column(&self) -> &Ident {
        &self.column
    }
}

/// A field permitted in a filter predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterField {
    ident: Ident,
    column: Ident,
    ty: FieldType,
    mode: FilterMode,
}

impl FilterField {
    /// Canonical field name.
    pub fn name(&self) -> &str {
        self.ident.name()
    }

    /// Semantic type of the field.
    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    /// Comparison mode.
    pub fn mode(&self) -> FilterMode {
        self.mode
    }

    /// Column reference as spliced into statements (`m.movie_title`).
    pub fn column(&self) -> &Ident {
        &self.column
    }
}

/// A field accepted in create and update payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WritableField {
    ident: Ident,
    ty: FieldType,
    required: bool,
}

impl WritableField {
    /// Canonical field name.
    pub fn name(&self) -> &str {
        self.ident.name()
    }

    /// Semantic type of the field.
    pub fn field_type(&self) -> FieldType {
        self.ty
    }

    /// Whether the column is `NOT NULL` and must be present on create.
    pub fn is_required(&self) -> bool {
        self.required
    }

    pub(crate) fn ident(&self) -> &Ident {
        &self.ident
    }
}

/// Allow-list descriptor for one logical entity.
#[derive(Debug, Clone)]
pub struct EntitySchema {
    entity_name: String,
    table: Ident,
    alias: Option<Ident>,
    id_field: Ident,
    id_column: Ident,
    sortable: Vec<SortField>,
    default_sort: usize,
    filterable: Vec<FilterField>,
    writable: Vec<WritableField>,
}

impl EntitySchema {
    /// Start describing an entity stored in `table`.
    pub fn builder(entity_name: &str, table: &str) -> EntitySchemaBuilder {
        EntitySchemaBuilder {
            entity_name: entity_name.to_string(),
            table: table.to_string(),
            alias: None,
            id_field: None,
            sortable: Vec::new(),
            default_sort: None,
            filterable: Vec::new(),
            writable: Vec::new(),
        }
    }

    /// Name used in error messages and logs.
    pub fn entity_name(&self) -> &str {
        &self.entity_name
    }

    /// Table identifier.
    pub fn table(&self) -> &Ident {
        &self.table
    }

    /// Alias used to qualify columns in join statements, if any.
    pub fn alias(&self) -> Option<&Ident> {
        self.alias.as_ref()
    }

    /// Primary key column.
    pub fn id_field(&self) -> &Ident {
        &self.id_field
    }

    /// Primary key column qualified with the alias (`m.movie_id`).
    pub fn id_column(&self) -> &Ident {
        &self.id_column
    }

    /// Sortable fields in declaration order.
    pub fn sortable_fields(&self) -> &[SortField] {
        &self.sortable
    }

    /// The field used when a sort request is absent or invalid.
    pub fn default_sort_field(&self) -> &SortField {
        &self.sortable[self.default_sort]
    }

    /// Filterable fields in declaration order.
    pub fn filterable_fields(&self) -> &[FilterField] {
        &self.filterable
    }

    /// Writable fields in declaration order.
    pub fn writable_fields(&self) -> &[WritableField] {
        &self.writable
    }

    /// Look up a sortable field by exact, case-sensitive name.
    pub fn sortable(&self, name: &str) -> Option<&SortField> {
        self.sortable.iter().find(|f| f.name() == name)
    }

    /// Look up a filterable field by exact, case-sensitive name.
    pub fn filterable(&self, name: &str) -> Option<&FilterField> {
        self.filterable.iter().find(|f| f.name() == name)
    }

    /// Look up a writable field by exact, case-sensitive name.
    pub fn writable(&self, name: &str) -> Option<&WritableField> {
        self.writable.iter().find(|f| f.name() == name)
    }
}

/// Builder for [`EntitySchema`]; all validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
#[must_use]
pub struct EntitySchemaBuilder {
    entity_name: String,
    table: String,
    alias: Option<String>,
    id_field: Option<String>,
    sortable: Vec<(String, FieldType)>,
    default_sort: Option<String>,
    filterable: Vec<(String, FieldType, FilterMode)>,
    writable: Vec<(String, FieldType, bool)>,
}

impl EntitySchemaBuilder {
    /// Qualify columns with `alias` in rendered statements.
    pub fn alias(mut self, alias: &str) -> Self {
        self.alias = Some(alias.to_string());
        self
    }

    /// Primary key column.
    pub fn id(mut self, field: &str) -> Self {
        self.id_field = Some(field.to_string());
        self
    }

    /// Allow `field` in `ORDER BY`.
    pub fn sortable(mut self, field: &str, ty: FieldType) -> Self {
        self.sortable.push((field.to_string(), ty));
        self
    }

    /// Sort field used when the client omits or misspells one.
    pub fn default_sort(mut self, field: &str) -> Self {
        self.default_sort = Some(field.to_string());
        self
    }

    /// Allow filtering on `field` with the given comparison mode.
    pub fn filterable(mut self, field: &str, ty: FieldType, mode: FilterMode) -> Self {
        self.filterable.push((field.to_string(), ty, mode));
        self
    }

    /// Accept `field` in create/update payloads.
    pub fn writable(mut self, field: &str, ty: FieldType, required: bool) -> Self {
        self.writable.push((field.to_string(), ty, required));
        self
    }

    /// Validate the descriptor and freeze it.
    pub fn build(self) -> DbResult<EntitySchema> {
        let entity = self.entity_name;
        if entity.trim().is_empty() {
            return Err(DbError::validation("entity name must not be empty"));
        }

        let table = Ident::part(&self.table)?;
        let alias = self.alias.as_deref().map(Ident::part).transpose()?;
        let id_field = match self.id_field.as_deref() {
            Some(id) => Ident::part(id)?,
            None => {
                return Err(DbError::validation(format!(
                    "{entity}: id field is required"
                )));
            }
        };

        if self.sortable.is_empty() {
            return Err(DbError::validation(format!(
                "{entity}: at least one sortable field is required"
            )));
        }

        let mut seen = HashSet::new();
        let mut sortable = Vec::with_capacity(self.sortable.len());
        for (name, ty) in &self.sortable {
            ensure_unique(&entity, "sortable", &mut seen, name)?;
            let ident = Ident::part(name)?;
            sortable.push(SortField {
                column: qualify(alias.as_ref(), &ident),
                ident,
                ty: *ty,
            });
        }

        let default_sort = match self.default_sort.as_deref() {
            Some(name) => sortable
                .iter()
                .position(|f| f.name() == name)
                .ok_or_else(|| {
                    DbError::validation(format!(
                        "{entity}: default sort field '{name}' is not sortable"
                    ))
                })?,
            None => {
                return Err(DbError::validation(format!(
                    "{entity}: default sort field is required"
                )));
            }
        };

        let mut seen = HashSet::new();
        let mut filterable = Vec::with_capacity(self.filterable.len());
        for (name, ty, mode) in &self.filterable {
            ensure_unique(&entity, "filterable", &mut seen, name)?;
            if *mode == FilterMode::Substring && *ty != FieldType::Text {
                return Err(DbError::validation(format!(
                    "{entity}: substring filter on non-text field '{name}'"
                )));
            }
            let ident = Ident::part(name)?;
            filterable.push(FilterField {
                column: qualify(alias.as_ref(), &ident),
                ident,
                ty: *ty,
                mode: *mode,
            });
        }

        let mut seen = HashSet::new();
        let mut writable = Vec::with_capacity(self.writable.len());
        for (name, ty, required) in &self.writable {
            ensure_unique(&entity, "writable", &mut seen, name)?;
            if name == id_field.name() {
                return Err(DbError::validation(format!(
                    "{entity}: id field '{name}' cannot be writable"
                )));
            }
            writable.push(WritableField {
                ident: Ident::part(name)?,
                ty: *ty,
                required: *required,
            });
        }

        Ok(EntitySchema {
            entity_name: entity,
            table,
            id_column: qualify(alias.as_ref(), &id_field),
            alias,
            id_field,
            sortable,
            default_sort,
            filterable,
            writable,
        })
    }
}

fn qualify(alias: Option<&Ident>, column: &Ident) -> Ident {
    match alias {
        Some(alias) => column.qualified_by(alias),
        None => column.clone(),
    }
}

fn ensure_unique<'a>(
    entity: &str,
    list: &str,
    seen: &mut HashSet<&'a str>,
    name: &'a str,
) -> DbResult<()> {
    if !seen.insert(name) {
        return Err(DbError::validation(format!(
            "{entity}: duplicate {list} field '{name}'"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn genre() -> EntitySchemaBuilder {
        EntitySchema::builder("genre", "genre")
            .id("genre_id")
            .sortable("genre_name", FieldType::Text)
            .sortable("genre_description", FieldType::Text)
            .default_sort("genre_name")
    }

    #[test]
    fn builds_valid_schema() {
        let schema = genre()
            .filterable("genre_name", FieldType::Text, FilterMode::Substring)
            .writable("genre_name", FieldType::Text, true)
            .build()
            .unwrap();

        assert_eq!(schema.entity_name(), "genre");
        assert_eq!(schema.default_sort_field().name(), "genre_name");
        assert_eq!(schema.sortable_fields().len(), 2);
        assert!(schema.sortable("genre_description").is_some());
        assert!(schema.sortable("Genre_Name").is_none());
        assert_eq!(
            schema.filterable("genre_name").map(FilterField::mode),
            Some(FilterMode::Substring)
        );
    }

    #[test]
    fn rejects_default_sort_outside_sortable() {
        let err = genre().default_sort("genre_id").build().unwrap_err();
        assert!(err.to_string().contains("is not sortable"));
    }

    #[test]
    fn rejects_missing_default_sort() {
        let builder = EntitySchema::builder("genre", "genre")
            .id("genre_id")
            .sortable("genre_name", FieldType::Text);
        assert!(builder.build().is_err());
    }

    #[test]
    fn rejects_unsafe_field_names() {
        let err = genre()
            .sortable("genre_name; DROP TABLE genre", FieldType::Text)
            .build()
            .unwrap_err();
        assert!(matches!(err, DbError::Validation(_)));

        assert!(
            EntitySchema::builder("genre", "genre table")
                .id("genre_id")
                .sortable("genre_name", FieldType::Text)
                .default_sort("genre_name")
                .build()
                .is_err()
        );
    }

    #[test]
    fn rejects_duplicate_fields() {
        assert!(genre().sortable("genre_name", FieldType::Text).build().is_err());
        assert!(
            genre()
                .filterable("genre_name", FieldType::Text, FilterMode::Exact)
                .filterable("genre_name", FieldType::Text, FilterMode::Substring)
                .build()
                .is_err()
        );
    }

    #[test]
    fn rejects_substring_on_numeric_field() {
        let err = genre()
            .filterable("genre_id", FieldType::Integer, FilterMode::Substring)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("substring filter"));
    }

    #[test]
    fn rejects_writable_id() {
        assert!(genre().writable("genre_id", FieldType::Integer, false).build().is_err());
    }

    #[test]
    fn columns_are_qualified_with_alias() {
        let schema = EntitySchema::builder("movie", "movie")
            .alias("m")
            .id("movie_id")
            .sortable("movie_title", FieldType::Text)
            .default_sort("movie_title")
            .build()
            .unwrap();
        let field = schema.default_sort_field();
        assert_eq!(field.name(), "movie_title");
        assert_eq!(field.column().to_sql(), "m.movie_title");
        assert_eq!(schema.id_column().to_sql(), "m.movie_id");
        assert_eq!(schema.id_field().to_sql(), "movie_id");

        let unaliased = genre().build().unwrap();
        assert_eq!(unaliased.default_sort_field().column().to_sql(), "genre_name");
    }
}
