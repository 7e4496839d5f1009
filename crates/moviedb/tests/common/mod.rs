use moviedb::{DbError, DbResult, bootstrap};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio_postgres::NoTls;

/// A connection whose `search_path` points at a throwaway, seeded schema.
pub struct TestDb {
    pub client: tokio_postgres::Client,
    schema: String,
}

impl TestDb {
    /// Connect to `DATABASE_URL`, or return `None` when it is unset.
    pub async fn connect(test: &str) -> DbResult<Option<Self>> {
        let _ = dotenvy::dotenv();
        let database_url = match std::env::var("DATABASE_URL") {
            Ok(v) => v,
            Err(_) => {
                eprintln!("DATABASE_URL is not set; skipping {test}");
                return Ok(None);
            }
        };

        let (client, connection) = tokio_postgres::connect(&database_url, NoTls)
            .await
            .map_err(DbError::from_db_error)?;
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                eprintln!("tokio-postgres connection error: {e}");
            }
        });

        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock before UNIX_EPOCH")
            .as_nanos();
        let schema = format!("moviedb_test_{}_{}", std::process::id(), nanos);
        client
            .batch_execute(&format!(
                "CREATE SCHEMA {schema}; SET search_path TO {schema}"
            ))
            .await?;
        bootstrap::run(&client, true).await?;

        Ok(Some(Self { client, schema }))
    }

    pub async fn teardown(self) -> DbResult<()> {
        self.client
            .batch_execute(&format!("DROP SCHEMA {} CASCADE", self.schema))
            .await?;
        Ok(())
    }
}
