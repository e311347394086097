use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Service configuration read from the environment.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    /// Default completion webhook (N8N). Jobs may override it.
    pub n8n_webhook_url: Option<String>,
    pub n8n_api_key: Option<String>,
    pub chatwoot_api_url: Option<String>,
    pub chatwoot_api_token: Option<String>,
    pub chatwoot_account_id: String,
    /// Maximum number of leads embedded in a completion webhook.
    pub webhook_lead_limit: usize,
    /// Directory where completed jobs are also saved as CSV.
    pub export_dir: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Self {
            database_url: std::env::var("DATABASE_URL")
                .or_else(|_| std::env::var("DB_URL"))
                .map_err(|_| {
                    anyhow::anyhow!("DATABASE_URL or DB_URL environment variable required")
                })
                .and_then(|url| {
                    if url.trim().is_empty() {
                        anyhow::bail!("DATABASE_URL cannot be empty");
                    }
                    if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                        anyhow::bail!("DATABASE_URL must start with postgresql:// or postgres://");
                    }
                    Ok(url)
                })?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?,
            n8n_webhook_url: optional_url("N8N_WEBHOOK_URL")?,
            n8n_api_key: optional_var("N8N_API_KEY"),
            chatwoot_api_url: optional_url("CHATWOOT_API_URL")?
                .map(|url| url.trim_end_matches('/').to_string()),
            chatwoot_api_token: optional_var("CHATWOOT_API_TOKEN"),
            chatwoot_account_id: optional_var("CHATWOOT_ACCOUNT_ID")
                .unwrap_or_else(|| "1".to_string()),
            webhook_lead_limit: std::env::var("WEBHOOK_LEAD_LIMIT")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("WEBHOOK_LEAD_LIMIT must be a positive number"))?,
            export_dir: optional_var("EXPORT_DIR").map(PathBuf::from),
        };

        // Never log tokens or full connection strings
        tracing::info!("Configuration loaded successfully");
        tracing::debug!(
            "Database URL: {}...",
            config.database_url.chars().take(20).collect::<String>()
        );
        tracing::debug!("Server Port: {}", config.port);
        match config.n8n_webhook_url {
            Some(ref url) => tracing::info!("N8N webhook configured: {}", url),
            None => tracing::warn!("N8N_WEBHOOK_URL not set; completion webhooks only sent per job"),
        }
        if !config.crm_enabled() {
            tracing::warn!("Chatwoot not configured; CRM push disabled");
        }

        Ok(config)
    }

    /// Both the Chatwoot URL and token are needed to push contacts.
    pub fn crm_enabled(&self) -> bool {
        self.chatwoot_api_url.is_some() && self.chatwoot_api_token.is_some()
    }
}

fn optional_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}

fn optional_url(name: &str) -> anyhow::Result<Option<String>> {
    match optional_var(name) {
        Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => {
            anyhow::bail!("{} must start with http:// or https://", name)
        }
        other => Ok(other),
    }
}

/// Weights of the final score. The defaults add up to 100.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub phone: f64,
    pub email: f64,
    pub address: f64,
    pub credit_alto: f64,
    pub credit_medio: f64,
    /// Also used when the credit potential is absent or unrecognized.
    pub credit_bajo: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            phone: 40.0,
            email: 20.0,
            address: 10.0,
            credit_alto: 30.0,
            credit_medio: 20.0,
            credit_bajo: 10.0,
        }
    }
}

/// Immutable rules the lead processor is built with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Lower-case brand fragments of national chains and banks that never qualify.
    pub big_company_keywords: Vec<String>,
    /// Words kept lower-case inside business names.
    pub name_stopwords: Vec<String>,
    pub min_name_chars: usize,
    pub score_weights: ScoreWeights,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            big_company_keywords: to_strings(&[
                "oxxo",
                "seven eleven",
                "7-eleven",
                "soriana",
                "walmart",
                "chedraui",
                "liverpool",
                "palacio de hierro",
                "suburbia",
                "coppel",
                "elektra",
                "bancomer",
                "banamex",
                "santander",
                "hsbc",
                "scotiabank",
                "bbva",
            ]),
            name_stopwords: to_strings(&["de", "del", "la", "las", "el", "los", "y", "e", "o"]),
            min_name_chars: 3,
            score_weights: ScoreWeights::default(),
        }
    }
}

impl ProcessorConfig {
    /// Denylist matching is case-insensitive, so keywords are stored lower-cased.
    pub fn with_big_company_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.big_company_keywords = keywords
            .into_iter()
            .map(|k| k.into().to_lowercase())
            .collect();
        self
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
