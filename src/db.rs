use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::job_storage::JobStorage;

pub struct Database {
    pub pool: PgPool,
}

impl Database {
    /// Connects and makes sure the jobs table exists.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::query("SELECT 1").execute(&pool).await?;
        JobStorage::new(pool.clone())
            .ensure_schema()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to prepare job schema: {}", e))?;

        Ok(Self { pool })
    }
}
