//! libSQL/Turso-backed implementation of [`search_core::store::VectorStore`]
//! and [`search_core::store::AnalyticsStore`].

mod analytics;
mod connection;
mod products;
mod schema;

pub use connection::VectorTursoStore;
pub use products::cosine_similarity;
