use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::{cors::CorsLayer, limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lead_processor::config::{Config, ProcessorConfig};
use lead_processor::crm_client::CrmClient;
use lead_processor::db::Database;
use lead_processor::handlers::{self, AppState};
use lead_processor::processor::LeadProcessor;
use lead_processor::results_cache::create_results_cache;
use lead_processor::webhook_client::WebhookClient;

/// Main entry point for the application.
///
/// Initializes tracing, configuration, the database, the lead processor and the
/// outbound sink clients, then serves the HTTP API.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lead_processor=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let db = Database::new(&config.database_url).await?;
    tracing::info!("Database connection pool established");

    let processor = Arc::new(LeadProcessor::new(ProcessorConfig::default()));
    tracing::info!(
        "Lead processor ready ({} big-company keywords)",
        processor.config().big_company_keywords.len()
    );

    let results_cache = create_results_cache();
    tracing::info!("Job results cache initialized (1h TTL, 1k capacity)");

    let webhook_client = match WebhookClient::new(
        config.n8n_webhook_url.clone(),
        config.n8n_api_key.clone(),
        config.webhook_lead_limit,
    ) {
        Ok(client) => Some(client),
        Err(e) => {
            tracing::error!("Failed to initialize webhook client: {}", e);
            None
        }
    };

    let crm_client = match (&config.chatwoot_api_url, &config.chatwoot_api_token) {
        (Some(url), Some(token)) => {
            match CrmClient::new(url.clone(), token.clone(), config.chatwoot_account_id.clone()) {
                Ok(client) => {
                    tracing::info!("✓ CRM client initialized: {}", url);
                    Some(client)
                }
                Err(e) => {
                    tracing::error!("Failed to initialize CRM client: {}", e);
                    None
                }
            }
        }
        _ => None,
    };

    let app_state = Arc::new(AppState {
        db: db.pool.clone(),
        config: config.clone(),
        processor,
        webhook_client,
        crm_client,
        results_cache,
    });

    // 10 requests/second per IP, burst of 20
    let governor_conf = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(10)
            .burst_size(20)
            .key_extractor(SmartIpKeyExtractor)
            .finish()
            .ok_or_else(|| anyhow::anyhow!("Invalid rate limiter configuration"))?,
    );

    let protected_routes = Router::new()
        .route("/api/v1/leads/process", post(handlers::process_leads))
        .route("/api/v1/jobs", post(handlers::create_job))
        .route("/api/v1/jobs/:id/status", get(handlers::job_status))
        .route("/api/v1/jobs/:id/results", get(handlers::job_results))
        .route("/api/v1/jobs/:id/export.csv", get(handlers::export_job_csv))
        .layer(
            ServiceBuilder::new()
                // Large scrape batches are accepted up to 10MB
                .layer(RequestBodyLimitLayer::new(10 * 1024 * 1024))
                .layer(GovernorLayer {
                    config: governor_conf,
                }),
        );

    // Health check bypasses rate limiting
    let app = Router::new()
        .route("/health", get(handlers::health))
        .merge(protected_routes)
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await?;

    Ok(())
}
