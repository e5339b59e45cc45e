//! Core query-serving pipeline for semantic product search: request
//! normalization, embedding, vector/fuzzy retrieval, adaptive result
//! improvement, result caching, rate limiting, and the offline
//! baseline/pattern-mining/retention jobs that learn from it over time.
//!
//! This crate defines the pipeline and the storage/embedding capability
//! traits it runs against ([`store::VectorStore`], [`store::ResultCache`],
//! [`store::AnalyticsStore`], [`store::EmbeddingProvider`]); concrete
//! backends live in sibling crates (`search-store-vector`,
//! `search-store-cache`) and are wired in at the edge via
//! [`orchestrator::SearchOrchestratorBuilder`].

pub mod adaptive;
pub mod analytics;
pub mod cache;
pub mod embedding;
pub mod error;
pub mod facets;
pub mod fingerprint;
pub mod intent;
pub mod learning;
pub mod orchestrator;
pub mod ratelimit;
pub mod retention;
pub mod retry;
pub mod store;
pub mod types;

pub use error::{Error, Result};
pub use fingerprint::Fingerprint;
pub use orchestrator::{SearchOrchestrator, SearchOrchestratorBuilder};
