//! Structured filters accepted by a search request (spec §4.2, §4.5).

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::product::{ProductStatus, StockStatus};

/// Structured filters a caller may attach to a search request.
///
/// `Filters` is canonicalized (field order is irrelevant, `None` and
/// `Some(default)` are not conflated) before it participates in a
/// [`crate::fingerprint::Fingerprint`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Filters {
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub store_scope: Option<String>,
    pub status: Option<ProductStatus>,
    pub stock_status: Option<StockStatus>,
}

impl Filters {
    /// Validate the price range is not inverted (spec §4.5 step 1, §8
    /// boundary behavior `min_price > max_price`).
    pub fn validate(&self) -> Result<()> {
        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err(Error::InvalidInput(
                    "min_price must not exceed max_price".into(),
                ));
            }
        }
        if self.min_price.is_some_and(|p| p < 0.0) || self.max_price.is_some_and(|p| p < 0.0) {
            return Err(Error::InvalidInput("price bounds must be non-negative".into()));
        }
        Ok(())
    }

    /// Produce a canonical clone suitable for hashing: `store_scope` is
    /// lower-cased, all other fields are passed through unchanged (they are
    /// already closed types with a single serialized shape).
    #[must_use]
    pub fn canonicalize(&self) -> Self {
        let mut c = self.clone();
        c.store_scope = c.store_scope.map(|s| s.trim().to_lowercase());
        c
    }

    /// Return a broadened copy of these filters: widen the price range by
    /// the given absolute margins, used by C7's `price_broaden` strategy.
    #[must_use]
    pub fn broaden_price(&self, min: Option<f64>, max: Option<f64>) -> Self {
        let mut c = self.clone();
        c.min_price = min;
        c.max_price = max;
        c
    }

    /// Drop every filter (C7's emergency `remove_all_filters` strategy).
    #[must_use]
    pub fn cleared() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inverted_price_range_is_rejected() {
        let f = Filters {
            min_price: Some(10.0),
            max_price: Some(5.0),
            ..Default::default()
        };
        assert!(f.validate().is_err());
    }

    #[test]
    fn canonicalize_lowercases_store_scope() {
        let f = Filters {
            store_scope: Some(" Acme-Store ".into()),
            ..Default::default()
        };
        assert_eq!(f.canonicalize().store_scope.as_deref(), Some("acme-store"));
    }

    #[test]
    fn negative_price_is_rejected() {
        let f = Filters {
            min_price: Some(-1.0),
            ..Default::default()
        };
        assert!(f.validate().is_err());
    }
}
