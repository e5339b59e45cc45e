//! Result-set scoring metrics consulted by the adaptive filter engine.

use std::collections::HashSet;

use crate::store::ScoredProduct;

/// Per-issue quality signal computed over a result window (spec C7 step 1).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultMetrics {
    pub avg_similarity: f64,
    pub result_count: usize,
    pub category_coverage: f64,
    pub diversity: f64,
    pub price_coherence: f64,
}

impl ResultMetrics {
    /// Composite score used to compare a candidate result set against the
    /// original (spec §8 property 6: replacement requires a strict
    /// improvement beyond the configured threshold).
    #[must_use]
    pub fn composite_score(&self) -> f64 {
        let count_factor = (self.result_count as f64 / 10.0).min(1.0);
        self.avg_similarity * 0.4
            + count_factor * 0.2
            + self.category_coverage * 0.15
            + self.diversity * 0.15
            + self.price_coherence * 0.1
    }
}

/// Detected weaknesses in a result set, each corresponding to a trigger a
/// [`crate::adaptive::strategy_table::FilterStrategyRecord`] may respond to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Issue {
    LowRelevance,
    InsufficientResults,
    LowCategoryCoverage,
    LowDiversity,
    PriceMismatch,
}

/// Compute metrics for a top-k window of a result set.
#[must_use]
pub fn score_metrics(results: &[ScoredProduct], top_k: usize, detected_price: Option<(f64, f64)>) -> ResultMetrics {
    let window = &results[..results.len().min(top_k)];

    let avg_similarity = if window.is_empty() {
        0.0
    } else {
        window.iter().map(|r| f64::from(r.similarity)).sum::<f64>() / window.len() as f64
    };

    let categories: HashSet<&str> = window
        .iter()
        .filter_map(|r| r.product.product_type.as_deref())
        .collect();
    let category_coverage = if window.is_empty() {
        0.0
    } else {
        categories.len() as f64 / window.len() as f64
    };

    let tuples: HashSet<(Option<&str>, i64)> = window
        .iter()
        .map(|r| (r.product.vendor.as_deref(), r.product.internal_id))
        .collect();
    let diversity = if window.is_empty() {
        0.0
    } else {
        tuples.len() as f64 / window.len() as f64
    };

    let price_coherence = match detected_price {
        Some((min, max)) if !window.is_empty() => {
            let within = window
                .iter()
                .filter(|r| r.product.price >= min && r.product.price <= max)
                .count();
            within as f64 / window.len() as f64
        }
        _ => 1.0,
    };

    ResultMetrics {
        avg_similarity,
        result_count: results.len(),
        category_coverage,
        diversity,
        price_coherence,
    }
}

/// Identify the weaknesses present in `metrics` (spec C7 step 2).
#[must_use]
pub fn identify_issues(metrics: &ResultMetrics) -> Vec<Issue> {
    let mut issues = Vec::new();
    if metrics.avg_similarity < 0.5 {
        issues.push(Issue::LowRelevance);
    }
    if metrics.result_count < 3 {
        issues.push(Issue::InsufficientResults);
    }
    if metrics.category_coverage < 0.3 {
        issues.push(Issue::LowCategoryCoverage);
    }
    if metrics.diversity < 0.3 {
        issues.push(Issue::LowDiversity);
    }
    if metrics.price_coherence < 0.5 {
        issues.push(Issue::PriceMismatch);
    }
    issues
}
