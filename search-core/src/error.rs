//! Error kinds for the search-serving pipeline (spec §7).
//!
//! Every kind maps to a stable, user-safe error code; internal identifiers
//! (row ids, connection strings) must never leak into `Display` output.

/// Result type alias used throughout `search-core`.
pub type Result<T> = std::result::Result<T, Error>;

/// Failure kinds produced by the query-serving pipeline and its offline jobs.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    /// Empty/oversized query, bad price range, bad image URL, control chars.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Inbound or outbound rate limiter denial. `retry_after` is a hint, not
    /// a guarantee.
    #[error("throttled: {reason}")]
    Throttled {
        /// Human-readable reason for the denial.
        reason: String,
        /// Suggested wait before retrying.
        retry_after: std::time::Duration,
    },

    /// Embedding provider exhausted its retry budget. The orchestrator falls
    /// through to fuzzy search on this variant; it is not fatal.
    #[error("embedding provider unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Vector store or result cache unreachable.
    #[error("storage unavailable: {0}")]
    StoreUnavailable(String),

    /// A storage operation exceeded its deadline.
    #[error("query timed out")]
    QueryTimeout,

    /// A filter predicate was malformed (e.g. inverted price range reaching
    /// the storage layer after validation should have caught it).
    #[error("bad filter: {0}")]
    BadFilter(String),

    /// Fatal configuration/data-drift error: dimension mismatch, missing
    /// required vector. Never recovered from within a request.
    #[error("integrity error: {0}")]
    IntegrityError(String),

    /// Caller deadline elapsed or the client disconnected. Not counted as an
    /// error for metrics purposes.
    #[error("cancelled")]
    Cancelled,

    /// Requested entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization failure for a cached or persisted blob.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Whether `C1`'s retry policy should attempt another pass for an error
    /// of this kind (transient upstream/storage failure), as opposed to a
    /// programmer- or caller-facing error that retrying cannot fix.
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Throttled { .. } | Error::UpstreamUnavailable(_) | Error::StoreUnavailable(_)
        )
    }

    /// Stable, user-facing error code (never an internal identifier).
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Error::InvalidInput(_) => "invalid_input",
            Error::Throttled { .. } => "throttled",
            Error::UpstreamUnavailable(_) => "upstream_unavailable",
            Error::StoreUnavailable(_) => "store_unavailable",
            Error::QueryTimeout => "query_timeout",
            Error::BadFilter(_) => "bad_filter",
            Error::IntegrityError(_) => "integrity_error",
            Error::Cancelled => "cancelled",
            Error::NotFound(_) => "not_found",
            Error::Serialization(_) => "serialization_error",
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<postcard::Error> for Error {
    fn from(e: postcard::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
