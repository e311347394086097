use crate::errors::AppError;
use crate::models::ProcessedLead;
use crate::summary::BatchSummary;
use chrono::Utc;
use serde_json::{json, Value};
use std::time::Duration;

const USER_AGENT: &str = "Swip-Lead-Scraper/1.0";

/// Client for the N8N automation webhooks fed with processed leads.
#[derive(Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    /// Workflow trigger URL; completion webhooks may go elsewhere.
    webhook_url: Option<String>,
    api_key: Option<String>,
    lead_limit: usize,
}

impl WebhookClient {
    /// Creates a new `WebhookClient`.
    ///
    /// # Arguments
    ///
    /// * `webhook_url` - Default N8N webhook, used by `trigger_workflow`.
    /// * `api_key` - Sent as a bearer token when present.
    /// * `lead_limit` - Maximum number of leads embedded in a completion payload.
    pub fn new(
        webhook_url: Option<String>,
        api_key: Option<String>,
        lead_limit: usize,
    ) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create webhook client: {}", e))
            })?;

        Ok(Self {
            client,
            webhook_url,
            api_key,
            lead_limit,
        })
    }

    pub fn default_url(&self) -> Option<&str> {
        self.webhook_url.as_deref()
    }

    /// Build the `scraping_completed` payload for a job.
    pub fn completion_payload(&self, job_id: &str, leads: &[ProcessedLead]) -> Value {
        let summary = BatchSummary::from_leads(leads);
        let shown = &leads[..leads.len().min(self.lead_limit)];

        json!({
            "event": "scraping_completed",
            "job_id": job_id,
            "timestamp": Utc::now().to_rfc3339(),
            "summary": summary,
            "leads": shown,
        })
    }

    /// Notifies `url` that a job finished.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` on HTTP 200, `Ok(false)` on any other status.
    pub async fn send_completion(
        &self,
        url: &str,
        job_id: &str,
        leads: &[ProcessedLead],
    ) -> Result<bool, AppError> {
        let payload = self.completion_payload(job_id, leads);
        tracing::info!(
            "Sending completion webhook for job {} ({} leads)",
            job_id,
            leads.len()
        );

        let response = self
            .authorized(self.client.post(url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Webhook request failed: {}", e)))?;

        if response.status() == reqwest::StatusCode::OK {
            tracing::info!("✓ Completion webhook delivered for job {}", job_id);
            Ok(true)
        } else {
            tracing::warn!("⚠ Completion webhook returned {}", response.status());
            Ok(false)
        }
    }

    /// Triggers a named workflow on the default webhook.
    ///
    /// Returns `Ok(None)` when no webhook is configured or the call is refused.
    pub async fn trigger_workflow(
        &self,
        workflow_name: &str,
        data: Value,
    ) -> Result<Option<Value>, AppError> {
        let Some(ref url) = self.webhook_url else {
            tracing::warn!("N8N webhook URL not configured");
            return Ok(None);
        };

        let payload = json!({
            "workflow": workflow_name,
            "data": data,
            "timestamp": Utc::now().to_rfc3339(),
        });

        let response = self
            .authorized(self.client.post(url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("Workflow request failed: {}", e)))?;

        if response.status() != reqwest::StatusCode::OK {
            tracing::warn!(
                "⚠ Workflow {} returned {}",
                workflow_name,
                response.status()
            );
            return Ok(None);
        }

        let result = response.json().await.map_err(|e| {
            AppError::ExternalApiError(format!("Failed to parse workflow response: {}", e))
        })?;

        tracing::info!("✓ Workflow {} triggered", workflow_name);
        Ok(Some(result))
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.api_key {
            Some(ref key) => request.header("Authorization", format!("Bearer {}", key)),
            None => request,
        }
    }
}
