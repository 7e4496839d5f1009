//! Pooled storage with per-statement logging and timeouts.

use crate::client::GenericClient;
use crate::error::{DbError, DbResult};
use deadpool_postgres::Pool;
use std::time::{Duration, Instant};
use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

/// Maximum SQL length (bytes) written to log events.
const MAX_LOGGED_SQL: usize = 200;

/// The storage collaborator handed to request handlers.
///
/// Cloning is cheap; clones share the pool.
#[derive(Clone)]
pub struct Store {
    pool: Pool,
    query_timeout: Option<Duration>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("pool", &self.pool.status())
            .field("query_timeout", &self.query_timeout)
            .finish()
    }
}

impl Store {
    pub fn new(pool: Pool) -> Self {
        Self {
            pool,
            query_timeout: None,
        }
    }

    /// Fail statements that run longer than `timeout` with [`DbError::Timeout`].
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Check out a pooled connection.
    pub async fn client(&self) -> DbResult<InstrumentedClient<deadpool_postgres::Client>> {
        let client = self.pool.get().await?;
        Ok(InstrumentedClient {
            client,
            query_timeout: self.query_timeout,
        })
    }

    /// Run `SELECT 1` on a pooled connection.
    pub async fn ping(&self) -> DbResult<()> {
        let client = self.client().await?;
        client.query_one("SELECT 1", &[]).await?;
        Ok(())
    }
}

/// A client wrapper that logs every statement on target `moviedb.sql` and
/// applies an optional timeout.
pub struct InstrumentedClient<C> {
    client: C,
    query_timeout: Option<Duration>,
}

impl<C: GenericClient> InstrumentedClient<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            query_timeout: None,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = Some(timeout);
        self
    }

    pub fn inner(&self) -> &C {
        &self.client
    }

    async fn run<T, F>(&self, sql: &str, param_count: usize, future: F) -> DbResult<T>
    where
        F: std::future::Future<Output = DbResult<T>> + Send,
    {
        tracing::debug!(
            target: "moviedb.sql",
            param_count,
            sql = %truncate_sql(sql),
            "executing statement"
        );

        let start = Instant::now();
        let result = match self.query_timeout {
            Some(timeout) => match tokio::time::timeout(timeout, future).await {
                Ok(result) => result,
                Err(_) => {
                    if let Some(cancel_token) = self.client.cancel_token() {
                        tokio::spawn(async move {
                            if let Err(e) = cancel_token.cancel_query(tokio_postgres::NoTls).await {
                                tracing::warn!(
                                    target: "moviedb.sql",
                                    error = %e,
                                    "failed to cancel timed-out statement"
                                );
                            }
                        });
                    }
                    Err(DbError::Timeout(timeout))
                }
            },
            None => future.await,
        };
        let elapsed_ms = millis(start.elapsed());

        match &result {
            Ok(_) => tracing::debug!(target: "moviedb.sql", elapsed_ms, "statement finished"),
            Err(e) => tracing::warn!(
                target: "moviedb.sql",
                elapsed_ms,
                error = %e,
                sql = %truncate_sql(sql),
                "statement failed"
            ),
        }
        result
    }
}

impl<C: GenericClient> GenericClient for InstrumentedClient<C> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<Vec<Row>> {
        self.run(sql, params.len(), self.client.query(sql, params))
            .await
    }

    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> DbResult<u64> {
        self.run(sql, params.len(), self.client.execute(sql, params))
            .await
    }

    async fn batch_execute(&self, sql: &str) -> DbResult<()> {
        self.run(sql, 0, self.client.batch_execute(sql)).await
    }

    fn cancel_token(&self) -> Option<tokio_postgres::CancelToken> {
        self.client.cancel_token()
    }
}

/// Whole milliseconds, saturating at `u64::MAX`.
fn millis(elapsed: Duration) -> u64 {
    u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
}

fn truncate_sql(sql: &str) -> String {
    if sql.len() <= MAX_LOGGED_SQL {
        return sql.to_string();
    }
    let mut end = MAX_LOGGED_SQL;
    while end > 0 && !sql.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &sql[..end])
}
