use crate::circuit_breaker::create_sink_circuit_breaker;
use crate::errors::AppError;
use crate::models::ProcessedLead;
use failsafe::futures::CircuitBreaker;
use serde_json::{json, Map, Value};
use std::time::Duration;

/// Client for creating CRM (Chatwoot) contacts from processed leads.
#[derive(Clone)]
pub struct CrmClient {
    client: reqwest::Client,
    api_url: String,
    api_token: String,
    account_id: String,
    /// Pause between contacts in a batch push.
    pacing: Duration,
}

/// Outcome of a single contact creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactOutcome {
    Created,
    AlreadyExists,
    Rejected(u16),
}

impl CrmClient {
    pub fn new(api_url: String, api_token: String, account_id: String) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                AppError::ExternalApiError(format!("Failed to create CRM client: {}", e))
            })?;

        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_token,
            account_id,
            pacing: Duration::from_millis(500),
        })
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Map a lead to a Chatwoot contact body.
    pub fn contact_payload(lead: &ProcessedLead) -> Value {
        let l = &lead.lead;
        let text = |v: &Option<String>| v.clone().unwrap_or_default();

        let mut contact = Map::new();
        contact.insert(
            "name".to_string(),
            json!(l.name.as_deref().unwrap_or("Lead sin nombre")),
        );
        contact.insert(
            "custom_attributes".to_string(),
            json!({
                "sector": text(&l.sector),
                "ubicacion": text(&l.location),
                "potencial_credito": text(&l.credit_potential),
                "puntuacion_lead": lead.final_score,
                "fuente": text(&l.source),
                "prioridad_contacto": lead.contact_urgency.as_str(),
                "metodo_contacto_preferido": lead.preferred_contact.as_str(),
                "fecha_extraccion": text(&l.extracted_at),
                "direccion": text(&l.address),
                "sitio_web": text(&l.website),
            }),
        );

        if let Some(ref phone) = l.phone {
            contact.insert("phone_number".to_string(), json!(phone));
        }
        if let Some(ref email) = l.email {
            contact.insert("email".to_string(), json!(email));
        }

        Value::Object(contact)
    }

    /// Creates one contact.
    ///
    /// A transport failure or a 5xx reply is an error; other statuses are outcomes.
    pub async fn create_contact(&self, lead: &ProcessedLead) -> Result<ContactOutcome, AppError> {
        let url = format!(
            "{}/api/v1/accounts/{}/contacts",
            self.api_url, self.account_id
        );

        let response = self
            .client
            .post(&url)
            .header("api_access_token", &self.api_token)
            .json(&Self::contact_payload(lead))
            .send()
            .await
            .map_err(|e| AppError::ExternalApiError(format!("CRM request failed: {}", e)))?;

        let status = response.status();
        match status.as_u16() {
            200 | 201 => Ok(ContactOutcome::Created),
            422 => {
                tracing::info!(
                    "Contact already exists: {}",
                    lead.lead.name.as_deref().unwrap_or("")
                );
                Ok(ContactOutcome::AlreadyExists)
            }
            code if status.is_server_error() => Err(AppError::ExternalApiError(format!(
                "CRM returned status {}",
                code
            ))),
            code => {
                tracing::warn!("CRM refused contact with status {}", code);
                Ok(ContactOutcome::Rejected(code))
            }
        }
    }

    /// Pushes leads one by one and returns how many contacts were created.
    ///
    /// Stops early once the circuit breaker opens after repeated failures.
    pub async fn create_contacts_from_leads(&self, leads: &[ProcessedLead]) -> usize {
        let breaker = create_sink_circuit_breaker();
        let mut created = 0;

        for (idx, lead) in leads.iter().enumerate() {
            if idx > 0 && !self.pacing.is_zero() {
                tokio::time::sleep(self.pacing).await;
            }

            match breaker.call(self.create_contact(lead)).await {
                Ok(ContactOutcome::Created) => {
                    created += 1;
                    tracing::info!(
                        "✓ Contact created: {}",
                        lead.lead.name.as_deref().unwrap_or("Lead sin nombre")
                    );
                }
                Ok(_) => {}
                Err(failsafe::Error::Inner(e)) => {
                    tracing::warn!(
                        "Failed to create contact {}: {}",
                        lead.lead.name.as_deref().unwrap_or(""),
                        e
                    );
                }
                Err(failsafe::Error::Rejected) => {
                    tracing::error!(
                        "CRM circuit open; skipping remaining {} leads",
                        leads.len() - idx
                    );
                    break;
                }
            }
        }

        tracing::info!("Created {} contacts in CRM", created);
        created
    }
}
