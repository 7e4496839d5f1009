//! Base retrieval statements with ordering and filter markers.
//!
//! A [`StatementTemplate`] is trusted, static SQL text carrying two markers:
//!
//! - `{order_by}` (required): replaced with `ORDER BY <column> ASC|DESC`.
//! - `{where}` (optional): replaced with `WHERE <predicate>` when the query
//!   has a filter, and removed otherwise.
//!
//! Only allow-listed columns and the two direction keywords are spliced into
//! the text; filter values become `$n` placeholders.
//!
//! ```ignore
//! let template = StatementTemplate::new("SELECT * FROM actor a {where} {order_by}");
//! let q = template.render(&spec)?;
//! // SELECT * FROM actor a WHERE a.actor_name ILIKE $1 ORDER BY a.actor_name ASC
//! ```

use crate::error::{DbError, DbResult};
use crate::ident::Ident;
use crate::query::{FilterClause, Predicate, QuerySpec, SortDir};
use crate::schema::EntitySchema;
use crate::sql::Sql;

const WHERE_MARKER: &str = "{where}";
const ORDER_BY_MARKER: &str = "{order_by}";

/// Static SQL text with `{where}` and `{order_by}` markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatementTemplate {
    text: &'static str,
}

impl StatementTemplate {
    pub const fn new(text: &'static str) -> Self {
        Self { text }
    }

    pub fn text(&self) -> &'static str {
        self.text
    }

    /// Whether the template can carry a filter clause.
    pub fn accepts_filter(&self) -> bool {
        self.text.contains(WHERE_MARKER)
    }

    /// Splice the validated ordering and filter of `spec` into the template.
    ///
    /// # Errors
    /// Returns [`DbError::Validation`] if `{order_by}` is missing or repeated,
    /// `{where}` is repeated or follows `{order_by}`, or `spec` carries a
    /// filter the template has no `{where}` marker for.
    pub fn render(&self, spec: &QuerySpec<'_>) -> DbResult<Sql> {
        let filter = spec.filter().map(|f| move |q: &mut Sql| push_predicate(q, f));
        self.splice(
            filter.as_ref().map(|f| f as &dyn Fn(&mut Sql)),
            spec.order_by_field().column(),
            spec.order_direction(),
        )
    }

    /// Render the template restricted to the row whose primary key is `id`.
    pub fn render_by_id(&self, schema: &EntitySchema, id: i32) -> DbResult<Sql> {
        let by_id = |q: &mut Sql| {
            q.push_ident(schema.id_column()).push(" = ").push_bind(id);
        };
        self.splice(
            Some(&by_id as &dyn Fn(&mut Sql)),
            schema.default_sort_field().column(),
            SortDir::Asc,
        )
    }

    fn splice(
        &self,
        filter: Option<&dyn Fn(&mut Sql)>,
        order_by: &Ident,
        direction: SortDir,
    ) -> DbResult<Sql> {
        let Some((head, tail)) = self.text.split_once(ORDER_BY_MARKER) else {
            return Err(DbError::validation(format!(
                "statement template has no {ORDER_BY_MARKER} marker"
            )));
        };
        if tail.contains(ORDER_BY_MARKER) || tail.contains(WHERE_MARKER) {
            return Err(DbError::validation(
                "statement template markers are repeated or out of order",
            ));
        }

        let mut q = Sql::empty();
        match (head.split_once(WHERE_MARKER), filter) {
            (Some((before, between)), filter) => {
                if between.contains(WHERE_MARKER) {
                    return Err(DbError::validation(
                        "statement template markers are repeated or out of order",
                    ));
                }
                q.push(before.trim_end());
                if let Some(filter) = filter {
                    q.push(" WHERE ");
                    filter(&mut q);
                }
                q.push(between.trim_end());
            }
            (None, Some(_)) => {
                return Err(DbError::validation(format!(
                    "statement template has no {WHERE_MARKER} marker for the filter"
                )));
            }
            (None, None) => {
                q.push(head.trim_end());
            }
        }

        q.push(" ORDER BY ");
        q.push_ident(order_by);
        q.push(" ");
        q.push(direction.to_sql());
        q.push(tail);
        Ok(q)
    }
}

fn push_predicate(q: &mut Sql, filter: &FilterClause<'_>) {
    q.push_ident(filter.field().column());
    match filter.predicate() {
        Predicate::Contains(pattern) => {
            q.push(" ILIKE ").push_bind_value(pattern.to_param());
        }
        Predicate::Equals(value) => {
            q.push(" = ").push_bind_value(value.to_param());
        }
        Predicate::Between(low, high) => {
            q.push(" BETWEEN ")
                .push_bind_value(low.to_param())
                .push(" AND ")
                .push_bind_value(high.to_param());
        }
    }
}
