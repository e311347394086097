//! Lead Processor Library
//!
//! Cleans, deduplicates, filters, scores and ranks small-business leads produced by
//! directory scrapers, and provides the glue that exposes the pipeline over HTTP,
//! persists jobs and pushes results to webhooks, CSV files and the CRM.
//!
//! # Modules
//!
//! - `circuit_breaker`: Circuit breaker for outbound sink calls.
//! - `config`: Service and processor configuration.
//! - `crm_client`: Chatwoot contact creation.
//! - `db`: Database connection and pool management.
//! - `errors`: Error handling types.
//! - `export`: CSV export of processed leads.
//! - `handlers`: HTTP request handlers.
//! - `job_storage`: Job persistence.
//! - `models`: Lead, filter, API and job models.
//! - `processor`: The lead normalization and scoring pipeline.
//! - `results_cache`: Checksummed cache of completed job results.
//! - `summary`: Batch breakdowns by sector, location and credit potential.
//! - `validation`: Name, phone and email cleaners.
//! - `webhook_client`: Completion webhook (N8N) client.

pub mod circuit_breaker;
pub mod config;
pub mod crm_client;
pub mod db;
pub mod errors;
pub mod export;
pub mod handlers;
pub mod job_storage;
pub mod models;
pub mod processor;
pub mod results_cache;
pub mod summary;
pub mod validation;
pub mod webhook_client;
