use crate::errors::{AppError, ResultExt};
use crate::models::{JobRecord, JobStatus, ProcessedLead};
use serde_json::Value;
use sqlx::PgPool;
use uuid::Uuid;

/// Persistence of scraping jobs and their processed leads, keyed by job id.
pub struct JobStorage {
    pool: PgPool,
}

impl JobStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn ensure_schema(&self) -> Result<(), AppError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS lead_jobs (
                job_id UUID PRIMARY KEY,
                status TEXT NOT NULL,
                request_data JSONB NOT NULL,
                results JSONB,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Creating lead_jobs table")?;

        tracing::info!("✓ Job schema ready");
        Ok(())
    }

    /// Inserts a new job in `started` state and returns its id.
    pub async fn create_job(&self, request_data: &Value) -> Result<Uuid, AppError> {
        let job_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO lead_jobs (job_id, status, request_data)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(job_id)
        .bind(JobStatus::Started.as_str())
        .bind(request_data)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Creating job {}", job_id))?;

        tracing::info!("✓ Job created: {}", job_id);
        Ok(job_id)
    }

    /// Sets the status of a job and, when given, its results.
    pub async fn update_job(
        &self,
        job_id: Uuid,
        status: JobStatus,
        results: Option<&[ProcessedLead]>,
    ) -> Result<(), AppError> {
        let results_json = results.map(serde_json::to_value).transpose()?;

        let updated = sqlx::query(
            r#"
            UPDATE lead_jobs
            SET status = $1, results = $2, updated_at = NOW()
            WHERE job_id = $3
            "#,
        )
        .bind(status.as_str())
        .bind(results_json)
        .bind(job_id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("Updating job {}", job_id))?;

        if updated.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Job {} not found", job_id)));
        }

        tracing::info!("✓ Job updated: {} -> {}", job_id, status.as_str());
        Ok(())
    }

    pub async fn get_job(&self, job_id: Uuid) -> Result<Option<JobRecord>, AppError> {
        let job = sqlx::query_as::<_, JobRecord>(
            r#"
            SELECT job_id, status, request_data, results, created_at, updated_at
            FROM lead_jobs
            WHERE job_id = $1
            "#,
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("Loading job {}", job_id))?;

        Ok(job)
    }
}
