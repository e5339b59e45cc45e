//! On-disk cache entry: the cached response plus its expiry.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use search_core::types::SearchResponse;

/// A cached response and the instant it stops being valid.
///
/// TTL is enforced by the reader comparing `expires_at` against the current
/// time, not by redb itself (the teacher's cache layer follows the same
/// split: storage is dumb, expiry is a property of the stored value).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub response: SearchResponse,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}
