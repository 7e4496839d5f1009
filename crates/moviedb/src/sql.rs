//! Parameter-safe SQL composition.
//!
//! `Sql` stores SQL pieces and parameters separately and generates
//! `$1, $2, ...` placeholders when rendered, so fragments can be appended in
//! any order without tracking placeholder indices by hand.
//!
//! # Example
//!
//! ```ignore
//! use moviedb::sql;
//!
//! let mut q = sql("SELECT * FROM movie WHERE movie_release_year >= ");
//! q.push_bind(2000_i32);
//! q.push(" ORDER BY movie_title ASC");
//!
//! let movies: Vec<Movie> = q.fetch_all_as(&client).await?;
//! ```

use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use crate::ident::Ident;
use crate::row::FromRow;
use std::sync::Arc;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, ToSql};


#[derive(Debug)]
enum SqlPart {
    Raw(String),
    Param,
}

/// A SQL statement under construction.
pub struct Sql {
    parts: Vec<SqlPart>,
    params: Vec<Arc<dyn ToSql + Sync + Send>>,
}

impl std::fmt::Debug for Sql {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sql")
            .field("sql", &self.to_sql())
            .field("params", &self.params.len())
            .finish()
    }
}

/// Start building a SQL statement.
pub fn sql(initial_sql: impl Into<String>) -> Sql {
    Sql::new(initial_sql)
}

impl Sql {
    /// Create a new builder with an initial SQL fragment.
    pub fn new(initial_sql: impl Into<String>) -> Self {
        Self {
            parts: vec![SqlPart::Raw(initial_sql.into())],
            params: Vec::new(),
        }
    }

    /// Create an empty builder.
    pub fn empty() -> Self {
        Self {
            parts: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Append raw SQL (no parameters).
    pub fn push(&mut self, sql: &str) -> &mut Self {
        if sql.is_empty() {
            return self;
        }

        match self.parts.last_mut() {
            Some(SqlPart::Raw(last)) => last.push_str(sql),
            _ => self.parts.push(SqlPart::Raw(sql.to_string())),
        }
        self
    }

    /// Append a parameter placeholder and bind its value.
    pub fn push_bind<T>(&mut self, value: T) -> &mut Self
    where
        T: ToSql + Sync + Send + 'static,
    {
        self.parts.push(SqlPart::Param);
        self.params.push(Arc::new(value));
        self
    }

    pub(crate) fn push_bind_value(&mut self, value: Arc<dyn ToSql + Sync + Send>) -> &mut Self {
        self.parts.push(SqlPart::Param);
        self.params.push(value);
        self
    }

    /// Append another `Sql` fragment, consuming it.
    pub fn push_sql(&mut self, mut other: Sql) -> &mut Self {
        self.parts.append(&mut other.parts);
        self.params.append(&mut other.params);
        self
    }

    /// Append an already validated identifier.
    ///
    /// Postgres cannot parameterize identifiers; [`Ident`] guarantees every
    /// part matches `[A-Za-z_][A-Za-z0-9_]*`.
    pub fn push_ident(&mut self, ident: &Ident) -> &mut Self {
        let mut buf = String::new();
        ident.write_sql(&mut buf);
        self.push(&buf)
    }

    /// Number of bound parameters.
    pub fn param_count(&self) -> usize {
        self.params.len()
    }

    /// Render SQL with `$1, $2, ...` placeholders.
    pub fn to_sql(&self) -> String {
        let mut out = String::new();
        let mut next = 1;
        for part in &self.parts {
            match part {
                SqlPart::Raw(text) => out.push_str(text),
                SqlPart::Param => {
                    out.push('$');
                    out.push_str(&next.to_string());
                    next += 1;
                }
            }
        }
        out
    }

    /// Parameter refs compatible with `tokio-postgres`.
    pub fn params_ref(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params
            .iter()
            .map(|p| p.as_ref() as &(dyn ToSql + Sync))
            .collect()
    }

    pub(crate) fn validate(&self) -> DbResult<()> {
        let placeholders = self.parts.iter().filter(|p| matches!(p, SqlPart::Param)).count();
        if placeholders != self.params.len() {
            return Err(DbError::validation(format!(
                "Sql: {placeholders} placeholders but {} params",
                self.params.len()
            )));
        }
        Ok(())
    }

    /// Rendered text and parameter refs, after checking they agree.
    fn prepared(&self) -> DbResult<(String, Vec<&(dyn ToSql + Sync)>)> {
        self.validate()?;
        Ok((self.to_sql(), self.params_ref()))
    }

    /// Run the statement and return every row.
    pub async fn fetch_all(&self, conn: &impl GenericClient) -> DbResult<Vec<Row>> {
        let (text, params) = self.prepared()?;
        conn.query(&text, &params).await
    }

    /// Run the statement and map every row to `T`.
    pub async fn fetch_all_as<T: FromRow>(&self, conn: &impl GenericClient) -> DbResult<Vec<T>> {
        self.fetch_all(conn).await?.iter().map(T::from_row).collect()
    }

    /// Run the statement and return its first row, or [`DbError::NotFound`].
    pub async fn fetch_one(&self, conn: &impl GenericClient) -> DbResult<Row> {
        let (text, params) = self.prepared()?;
        conn.query_one(&text, &params).await
    }

    /// Run the statement and return its first row, if any.
    pub async fn fetch_opt(&self, conn: &impl GenericClient) -> DbResult<Option<Row>> {
        let (text, params) = self.prepared()?;
        conn.query_opt(&text, &params).await
    }

    /// Like [`Sql::fetch_opt`], mapping the row to `T`.
    pub async fn fetch_opt_as<T: FromRow>(&self, conn: &impl GenericClient) -> DbResult<Option<T>> {
        match self.fetch_opt(conn).await? {
            Some(row) => T::from_row(&row).map(Some),
            None => Ok(None),
        }
    }

    /// First column of the first row, e.g. an id from `RETURNING`.
    pub async fn fetch_scalar_one<T>(&self, conn: &impl GenericClient) -> DbResult<T>
    where
        T: for<'b> FromSql<'b> + Send + Sync,
    {
        let row = self.fetch_one(conn).await?;
        row.try_get(0).map_err(|e| DbError::decode("0", e.to_string()))
    }

    /// Run the statement and return the affected row count.
    pub async fn execute(&self, conn: &impl GenericClient) -> DbResult<u64> {
        let (text, params) = self.prepared()?;
        conn.execute(&text, &params).await
    }
}
