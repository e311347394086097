use crate::config::Config;
use crate::crm_client::CrmClient;
use crate::errors::{AppError, ResultExt};
use crate::export;
use crate::job_storage::JobStorage;
use crate::models::*;
use crate::processor::LeadProcessor;
use crate::results_cache::{load_results, store_results, ResultsCache};
use crate::summary::BatchSummary;
use crate::webhook_client::WebhookClient;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Stateless lead pipeline, shared by every request.
    pub processor: Arc<LeadProcessor>,
    /// Completion webhook client.
    pub webhook_client: Option<WebhookClient>,
    /// CRM client (optional, requires Chatwoot settings).
    pub crm_client: Option<CrmClient>,
    /// Checksummed results of completed jobs.
    pub results_cache: ResultsCache,
}

/// Health check endpoint.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "lead-processor",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// POST /api/v1/leads/process
///
/// Runs the pipeline synchronously and returns the ranked leads.
pub async fn process_leads(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ProcessLeadsRequest>,
) -> Result<Json<ProcessLeadsResponse>, AppError> {
    tracing::info!("POST /leads/process - {} raw leads", request.leads.len());

    let leads = state
        .processor
        .process_values(request.leads, request.filters.as_ref());

    Ok(Json(ProcessLeadsResponse {
        total_leads: leads.len(),
        summary: BatchSummary::from_leads(&leads),
        leads,
    }))
}

/// POST /api/v1/jobs
///
/// Persists the job and processes it in the background. Results are stored under
/// the returned job id and pushed to the configured sinks.
pub async fn create_job(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateJobRequest>,
) -> Result<(StatusCode, Json<CreateJobResponse>), AppError> {
    tracing::info!("POST /jobs - {} raw leads", request.leads.len());

    if request.leads.is_empty() {
        return Err(AppError::BadRequest("At least one lead required".to_string()));
    }
    if let Some(ref url) = request.webhook_url {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(AppError::BadRequest(
                "webhook_url must start with http:// or https://".to_string(),
            ));
        }
    }
    if request.push_to_crm && state.crm_client.is_none() {
        return Err(AppError::BadRequest("CRM integration not configured".to_string()));
    }

    let storage = JobStorage::new(state.db.clone());
    let job_id = storage
        .create_job(&serde_json::to_value(&request)?)
        .await
        .context("Starting lead job")?;

    let received_leads = request.leads.len();
    let background_state = state.clone();
    tokio::spawn(async move {
        run_job(background_state, job_id, request).await;
    });

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateJobResponse {
            job_id,
            status: JobStatus::Started,
            message: "Lead processing started".to_string(),
            received_leads,
        }),
    ))
}

/// Processes a stored job and fans the results out to the sinks.
///
/// Sink failures are logged; only a failure to store results marks the job failed.
pub async fn run_job(state: Arc<AppState>, job_id: Uuid, request: CreateJobRequest) {
    tracing::info!("Starting lead job: {}", job_id);
    let storage = JobStorage::new(state.db.clone());

    let leads = state
        .processor
        .process_values(request.leads, request.filters.as_ref());

    if let Err(e) = storage
        .update_job(job_id, JobStatus::Completed, Some(&leads))
        .await
    {
        tracing::error!("✗ Failed to store results for job {}: {}", job_id, e);
        if let Err(e) = storage.update_job(job_id, JobStatus::Failed, None).await {
            tracing::error!("✗ Failed to mark job {} as failed: {}", job_id, e);
        }
        return;
    }
    store_results(&state.results_cache, job_id, &leads).await;
    tracing::info!("Job completed: {} with {} leads", job_id, leads.len());

    if let Some(ref dir) = state.config.export_dir {
        let path = dir.join(format!("leads_{}.csv", job_id));
        if let Err(e) = export::write_csv(&path, &leads) {
            tracing::error!("✗ Failed to export job {} to CSV: {}", job_id, e);
        }
    }

    if let Some(ref client) = state.webhook_client {
        let url = request
            .webhook_url
            .as_deref()
            .or_else(|| client.default_url());
        if let Some(url) = url {
            if let Err(e) = client
                .send_completion(url, &job_id.to_string(), &leads)
                .await
            {
                tracing::error!("✗ Completion webhook failed for job {}: {}", job_id, e);
            }
        }
    }

    if request.push_to_crm {
        if let Some(ref crm) = state.crm_client {
            crm.create_contacts_from_leads(&leads).await;
        }
    }
}

async fn load_job(state: &AppState, job_id: Uuid) -> Result<JobRecord, AppError> {
    JobStorage::new(state.db.clone())
        .get_job(job_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Job {} not found", job_id)))
}

/// Leads of a completed job, from the cache when possible.
async fn completed_leads(state: &AppState, job: &JobRecord) -> Vec<ProcessedLead> {
    if let Some(leads) = load_results(&state.results_cache, job.job_id).await {
        return leads;
    }

    let leads = job.processed_leads();
    store_results(&state.results_cache, job.job_id, &leads).await;
    leads
}

/// GET /api/v1/jobs/:id/status
pub async fn job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusResponse>, AppError> {
    let job = load_job(&state, job_id).await?;

    Ok(Json(JobStatusResponse {
        job_id: job.job_id,
        status: job.job_status(),
        created_at: job.created_at,
        updated_at: job.updated_at,
    }))
}

/// GET /api/v1/jobs/:id/results
pub async fn job_results(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResultsResponse>, AppError> {
    let job = load_job(&state, job_id).await?;

    let response = match job.job_status() {
        JobStatus::Started => JobResultsResponse::Processing {
            job_id,
            message: "Job still processing".to_string(),
        },
        JobStatus::Failed => JobResultsResponse::Failed {
            job_id,
            message: "Job failed".to_string(),
        },
        JobStatus::Completed => {
            let leads = completed_leads(&state, &job).await;
            JobResultsResponse::Completed {
                job_id,
                total_leads: leads.len(),
                leads,
            }
        }
    };

    Ok(Json(response))
}

/// GET /api/v1/jobs/:id/export.csv
pub async fn export_job_csv(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let job = load_job(&state, job_id).await?;
    if job.job_status() != JobStatus::Completed {
        return Err(AppError::BadRequest(format!(
            "Job {} is {}, not completed",
            job_id, job.status
        )));
    }

    let leads = completed_leads(&state, &job).await;
    let csv = export::to_csv_string(&leads);

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"leads_{}.csv\"", job_id),
            ),
        ],
        csv,
    ))
}
