//! Validated SQL identifiers.
//!
//! Postgres cannot bind identifiers as parameters, so every table, alias and
//! column name that is spliced into statement text goes through [`Ident`].
//! Each part must match `[A-Za-z_][A-Za-z0-9_]*`; parts are joined with `.`
//! (`m.movie_title`). Quoted identifiers are not supported: the catalog only
//! uses plain snake_case names.

use crate::error::{DbError, DbResult};
use std::fmt;

/// A SQL identifier (column, table, or alias-qualified column).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ident {
    parts: Vec<String>,
}

impl Ident {
    /// Parse a single, unqualified identifier part.
    pub fn part(name: &str) -> DbResult<Self> {
        validate_part(name)?;
        Ok(Self {
            parts: vec![name.to_string()],
        })
    }

    /// Parse a possibly dotted identifier (`table.column`).
    pub fn parse(s: &str) -> DbResult<Self> {
        if s.is_empty() {
            return Err(DbError::validation("Identifier cannot be empty"));
        }
        if s.ends_with('.') {
            return Err(DbError::validation("Trailing '.' in identifier"));
        }

        let mut parts = Vec::new();
        for seg in s.split('.') {
            if seg.is_empty() {
                return Err(DbError::validation(format!(
                    "Empty identifier segment in '{s}'"
                )));
            }
            validate_part(seg)?;
            parts.push(seg.to_string());
        }
        Ok(Self { parts })
    }

    /// Qualify this identifier with a table alias: `alias.self`.
    pub fn qualified_by(&self, alias: &Ident) -> Self {
        let mut parts = alias.parts.clone();
        parts.extend(self.parts.iter().cloned());
        Self { parts }
    }

    /// The last part, i.e. the bare column or table name.
    pub fn name(&self) -> &str {
        self.parts.last().map(String::as_str).unwrap_or_default()
    }

    /// Whether this identifier has a single part.
    pub fn is_simple(&self) -> bool {
        self.parts.len() == 1
    }

    /// Render the identifier as SQL.
    pub fn to_sql(&self) -> String {
        let cap = self.parts.iter().map(String::len).sum::<usize>() + self.parts.len();
        let mut out = String::with_capacity(cap);
        self.write_sql(&mut out);
        out
    }

    pub(crate) fn write_sql(&self, out: &mut String) {
        for (i, part) in self.parts.iter().enumerate() {
            if i > 0 {
                out.push('.');
            }
            out.push_str(part);
        }
    }
}

impl fmt::Display for Ident {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_sql())
    }
}

fn validate_part(name: &str) -> DbResult<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(DbError::validation("Identifier cannot be empty"));
    };
    if !(first == '_' || first.is_ascii_alphabetic()) {
        return Err(DbError::validation(format!(
            "Invalid identifier start character '{first}' in '{name}'"
        )));
    }
    if let Some(bad) = chars.find(|c| !(*c == '_' || c.is_ascii_alphanumeric())) {
        return Err(DbError::validation(format!(
            "Invalid character '{bad}' in identifier '{name}'"
        )));
    }
    Ok(())
}
