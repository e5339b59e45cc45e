//! Shared test fixtures and in-memory fakes for `search-core`'s capability
//! traits (`VectorStore`, `ResultCache`, `AnalyticsStore`, `EmbeddingProvider`),
//! grounded on the teacher's `test-utils` crate (`test-utils/src/lib.rs`):
//! plain builder functions for the domain types, plus fakes cheap enough to
//! construct in every test that needs a full collaborator set.

mod fakes;
mod fixtures;

pub use fakes::{InMemoryAnalyticsStore, InMemoryResultCache, InMemoryVectorStore, MockEmbeddingProvider};
pub use fixtures::{test_filters, test_product};
