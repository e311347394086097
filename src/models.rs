use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use uuid::Uuid;

use crate::errors::RecordError;
use crate::summary::BatchSummary;

// ============ Lead Models ============

/// Credit potential tier assigned by the scraper that produced the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CreditPotential {
    Alto,
    Medio,
    Bajo,
}

impl CreditPotential {
    /// Parses a producer label case-insensitively. Unknown labels yield `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_uppercase().as_str() {
            "ALTO" => Some(CreditPotential::Alto),
            "MEDIO" => Some(CreditPotential::Medio),
            "BAJO" => Some(CreditPotential::Bajo),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CreditPotential::Alto => "ALTO",
            CreditPotential::Medio => "MEDIO",
            CreditPotential::Bajo => "BAJO",
        }
    }
}

/// A lead exactly as a scraper handed it over.
///
/// Every key is optional. Non-string values and empty strings are read as absent,
/// and unknown keys are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLeadRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub sector: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location: Option<String>,
    /// Provenance label, e.g. "google_maps".
    #[serde(default, deserialize_with = "lenient_string")]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub website: Option<String>,
    /// Producer's own guess: ALTO, MEDIO or BAJO.
    #[serde(default, deserialize_with = "lenient_string")]
    pub credit_potential: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub extracted_at: Option<String>,
}

impl RawLeadRecord {
    /// Reads one untyped JSON element. Anything other than an object is malformed.
    pub fn from_value(value: Value) -> Result<Self, RecordError> {
        if !value.is_object() {
            return Err(RecordError::Malformed(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        }

        serde_json::from_value(value).map_err(|e| RecordError::Malformed(e.to_string()))
    }
}

/// A lead after field validation. Invalid fields are `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CleanedLead {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub sector: Option<String>,
    pub location: Option<String>,
    pub source: Option<String>,
    pub website: Option<String>,
    pub credit_potential: Option<String>,
    pub extracted_at: Option<String>,
}

impl CleanedLead {
    pub fn has_name(&self) -> bool {
        present(&self.name)
    }

    pub fn has_phone(&self) -> bool {
        present(&self.phone)
    }

    pub fn has_email(&self) -> bool {
        present(&self.email)
    }

    pub fn has_address(&self) -> bool {
        present(&self.address)
    }

    pub fn has_website(&self) -> bool {
        present(&self.website)
    }

    /// Parsed credit tier, `None` when absent or unrecognized.
    pub fn credit_tier(&self) -> Option<CreditPotential> {
        self.credit_potential
            .as_deref()
            .and_then(CreditPotential::parse)
    }

    /// The six fields counted towards data completeness.
    pub fn tracked_fields(&self) -> [&Option<String>; 6] {
        [
            &self.name,
            &self.phone,
            &self.email,
            &self.address,
            &self.sector,
            &self.location,
        ]
    }
}

/// Best channel to reach a lead, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PreferredContact {
    WhatsApp,
    Email,
    Website,
    #[serde(rename = "Visita presencial")]
    VisitaPresencial,
}

impl PreferredContact {
    pub fn as_str(&self) -> &'static str {
        match self {
            PreferredContact::WhatsApp => "WhatsApp",
            PreferredContact::Email => "Email",
            PreferredContact::Website => "Website",
            PreferredContact::VisitaPresencial => "Visita presencial",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ContactUrgency {
    Alta,
    Media,
    Baja,
}

impl ContactUrgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContactUrgency::Alta => "ALTA",
            ContactUrgency::Media => "MEDIA",
            ContactUrgency::Baja => "BAJA",
        }
    }
}

/// Cleaned lead plus the fields computed by enrichment and scoring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedLead {
    #[serde(flatten)]
    pub lead: CleanedLead,
    /// Percentage of tracked fields present, one decimal.
    pub data_completeness: f64,
    pub preferred_contact: PreferredContact,
    pub contact_urgency: ContactUrgency,
    /// Ranking key in 0..=100.
    pub final_score: f64,
}

/// Optional constraints applied after the viability filter.
///
/// A missing or empty list means no constraint on that dimension.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSpec {
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub sectors: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_string_list")]
    pub locations: Option<Vec<String>>,
}

impl FilterSpec {
    /// Reads filters from untyped JSON. Non-object input means "no filters".
    pub fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            return None;
        }
        if !value.is_object() {
            tracing::warn!(
                "Ignoring filters: expected a JSON object, got {}",
                json_kind(value)
            );
            return None;
        }

        match serde_json::from_value::<FilterSpec>(value.clone()) {
            Ok(spec) => Some(spec),
            Err(e) => {
                tracing::warn!("Ignoring unreadable filters: {}", e);
                None
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.as_ref().map_or(true, |s| s.is_empty())
            && self.locations.as_ref().map_or(true, |l| l.is_empty())
    }
}

fn present(field: &Option<String>) -> bool {
    field.as_deref().is_some_and(|v| !v.is_empty())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    })
}

fn lenient_string_list<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let Some(value) = value else {
        return Ok(None);
    };
    if value.is_null() {
        return Ok(None);
    }

    let list = value.as_array().and_then(|items| {
        items
            .iter()
            .map(|item| item.as_str().map(str::to_string))
            .collect::<Option<Vec<String>>>()
    });

    if list.is_none() {
        tracing::warn!("Ignoring malformed filter list: {}", value);
    }
    Ok(list)
}

// ============ API Request/Response Models ============

/// Body of `POST /api/v1/leads/process`.
#[derive(Debug, Deserialize)]
pub struct ProcessLeadsRequest {
    /// Raw records; each element is read leniently.
    #[serde(default)]
    pub leads: Vec<Value>,
    #[serde(default)]
    pub filters: Option<Value>,
}

/// Ranked leads plus a breakdown of the batch.
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessLeadsResponse {
    pub total_leads: usize,
    pub summary: BatchSummary,
    pub leads: Vec<ProcessedLead>,
}

/// Body of `POST /api/v1/jobs`.
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateJobRequest {
    #[serde(default)]
    pub leads: Vec<Value>,
    #[serde(default)]
    pub filters: Option<Value>,
    /// Overrides the configured completion webhook for this job.
    #[serde(default)]
    pub webhook_url: Option<String>,
    /// Push the ranked leads to the CRM once processed.
    #[serde(default)]
    pub push_to_crm: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateJobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub message: String,
    pub received_leads: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Results of a job, shaped by its status.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobResultsResponse {
    Processing {
        job_id: Uuid,
        message: String,
    },
    Failed {
        job_id: Uuid,
        message: String,
    },
    Completed {
        job_id: Uuid,
        total_leads: usize,
        leads: Vec<ProcessedLead>,
    },
}

// ============ Job Models ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Started,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Started => "started",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "started" => Some(JobStatus::Started),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// Row of the `lead_jobs` table.
#[derive(Debug, Clone, FromRow)]
pub struct JobRecord {
    pub job_id: Uuid,
    pub status: String,
    pub request_data: Value,
    pub results: Option<Value>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl JobRecord {
    /// Unknown status strings are reported as failed.
    pub fn job_status(&self) -> JobStatus {
        JobStatus::parse(&self.status).unwrap_or(JobStatus::Failed)
    }

    /// Decodes stored results, skipping entries that no longer parse.
    pub fn processed_leads(&self) -> Vec<ProcessedLead> {
        let Some(Value::Array(items)) = &self.results else {
            return Vec::new();
        };

        items
            .iter()
            .filter_map(|item| match serde_json::from_value(item.clone()) {
                Ok(lead) => Some(lead),
                Err(e) => {
                    tracing::warn!("Skipping unreadable stored lead for job {}: {}", self.job_id, e);
                    None
                }
            })
            .collect()
    }
}
