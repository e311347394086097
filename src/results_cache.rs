use crate::models::ProcessedLead;
use moka::future::Cache;
use sha2::{Digest, Sha256};
use std::time::Duration;
use uuid::Uuid;

/// In-memory cache of completed job results.
///
/// Entries are stored as JSON with a SHA-256 checksum; an entry that fails
/// validation is evicted and the caller falls back to the database.
pub type ResultsCache = Cache<Uuid, String>;

/// Creates the job results cache (1 hour TTL, 1k jobs).
pub fn create_results_cache() -> ResultsCache {
    Cache::builder()
        .time_to_live(Duration::from_secs(3600))
        .max_capacity(1_000)
        .build()
}

/// Serialized leads plus the checksum of that serialization.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CachedResults {
    /// JSON array of processed leads.
    pub data: String,
    /// SHA-256 of `data`, hex encoded.
    pub checksum: String,
}

impl CachedResults {
    pub fn new(leads: &[ProcessedLead]) -> Self {
        let data = serde_json::to_string(leads).unwrap_or_else(|_| "[]".to_string());
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.data) == self.checksum
    }

    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Returns the leads if the entry parses and its checksum matches.
    pub fn decode(serialized: &str) -> Option<Vec<ProcessedLead>> {
        let entry: CachedResults = serde_json::from_str(serialized).ok()?;

        if !entry.is_valid() {
            tracing::warn!(
                "Cached results failed validation: checksum mismatch. Expected: {}, Data length: {}",
                entry.checksum,
                entry.data.len()
            );
            return None;
        }

        serde_json::from_str(&entry.data).ok()
    }
}

pub async fn store_results(cache: &ResultsCache, job_id: Uuid, leads: &[ProcessedLead]) {
    cache
        .insert(job_id, CachedResults::new(leads).serialize())
        .await;
}

/// Cached leads for a job, or `None` on a miss or a corrupt entry.
pub async fn load_results(cache: &ResultsCache, job_id: Uuid) -> Option<Vec<ProcessedLead>> {
    let cached = cache.get(&job_id).await?;

    match CachedResults::decode(&cached) {
        Some(leads) => Some(leads),
        None => {
            cache.invalidate(&job_id).await;
            None
        }
    }
}
