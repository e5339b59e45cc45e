//! The adaptive filter engine (spec C7): scores a result set, detects
//! weaknesses, and tries declarative strategies in priority order until one
//! produces a sufficient improvement.

use futures::future::BoxFuture;

use crate::adaptive::metrics::{identify_issues, score_metrics, Issue, ResultMetrics};
use crate::adaptive::strategy_table::{default_strategies, FilterStrategyRecord};
use crate::error::Result;
use crate::store::ScoredProduct;
use crate::types::config::AdaptiveConfig;
use crate::types::filters::Filters;
use crate::types::strategy::StrategyKind;

/// A re-query callback the engine uses to fetch a candidate result set under
/// amended filters. Supplied by the orchestrator, which owns the vector
/// store handle and the query embedding.
pub type Requery<'a> =
    dyn Fn(Filters) -> BoxFuture<'a, Result<(Vec<ScoredProduct>, u64)>> + Send + Sync + 'a;

/// The outcome of running the engine over a result set.
pub struct ImproveOutcome {
    pub results: Vec<ScoredProduct>,
    pub total: u64,
    pub applied_strategies: Vec<StrategyKind>,
}

/// Owns the declarative strategy table and its mutable success-rate stats.
pub struct AdaptiveEngine {
    strategies: Vec<FilterStrategyRecord>,
    config: AdaptiveConfig,
}

impl AdaptiveEngine {
    #[must_use]
    pub fn new(config: AdaptiveConfig) -> Self {
        Self {
            strategies: default_strategies(),
            config,
        }
    }

    fn eligible_strategies(&self, issues: &[Issue]) -> Vec<&FilterStrategyRecord> {
        let mut eligible: Vec<&FilterStrategyRecord> = self
            .strategies
            .iter()
            .filter(|s| s.triggered_by(issues))
            .collect();
        eligible.sort_by_key(|s| s.priority);
        eligible.truncate(self.config.max_strategies_per_query as usize);
        eligible
    }

    /// Build the amended filters a given strategy would search with. Returns
    /// `None` for strategies that re-rank in place rather than re-querying.
    fn amended_filters(kind: StrategyKind, filters: &Filters) -> Option<Filters> {
        match kind {
            StrategyKind::PriceBroadenLow => {
                let widened_min = filters.min_price.map(|m| (m * 0.5).max(0.0));
                Some(filters.broaden_price(widened_min, filters.max_price))
            }
            StrategyKind::PriceBroadenHigh => {
                let widened_max = filters.max_price.map(|m| m * 2.0);
                Some(filters.broaden_price(filters.min_price, widened_max))
            }
            StrategyKind::CategoryBroaden => Some(Filters {
                store_scope: None,
                ..filters.clone()
            }),
            StrategyKind::EmergencyFallback => Some(Filters::cleared()),
            StrategyKind::DiversityImprove
            | StrategyKind::MaterialFallback
            | StrategyKind::ColorFallback => None,
        }
    }

    /// Re-rank in place to favor one result per vendor, used by strategies
    /// that do not change the query (spec C7 step 4 "re-ranking in place").
    fn rerank_for_diversity(results: &[ScoredProduct]) -> Vec<ScoredProduct> {
        let mut seen = std::collections::HashSet::new();
        let mut first_pass = Vec::new();
        let mut rest = Vec::new();
        for r in results {
            if seen.insert(r.product.vendor.clone()) {
                first_pass.push(r.clone());
            } else {
                rest.push(r.clone());
            }
        }
        first_pass.extend(rest);
        first_pass
    }

    /// Run the improvement loop (spec C7 steps 3-6).
    pub async fn improve(
        &self,
        original: Vec<ScoredProduct>,
        original_total: u64,
        filters: &Filters,
        detected_price: Option<(f64, f64)>,
        requery: &Requery<'_>,
    ) -> ImproveOutcome {
        let original_metrics = score_metrics(&original, 10, detected_price);
        let issues = identify_issues(&original_metrics);

        if issues.is_empty() {
            return ImproveOutcome {
                results: original,
                total: original_total,
                applied_strategies: vec![],
            };
        }

        let mut best_results = original;
        let mut best_total = original_total;
        let mut best_score = original_metrics.composite_score();
        let mut applied = Vec::new();

        for strategy in self.eligible_strategies(&issues) {
            let candidate = match Self::amended_filters(strategy.kind, filters) {
                Some(amended) => requery(amended).await.ok(),
                None => Some((Self::rerank_for_diversity(&best_results), best_total)),
            };

            let Some((candidate_results, candidate_total)) = candidate else {
                continue;
            };

            let candidate_metrics = score_metrics(&candidate_results, 10, detected_price);
            let candidate_score = candidate_metrics.composite_score();
            let improved = candidate_score >= best_score * (1.0 + self.config.min_improvement_pct);

            strategy.record_outcome(improved, 0.2);

            if improved {
                best_results = candidate_results;
                best_total = candidate_total;
                best_score = candidate_score;
                applied.push(strategy.kind);
            }
        }

        ImproveOutcome {
            results: best_results,
            total: best_total,
            applied_strategies: applied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::product::{Product, ProductStatus, StockStatus};
    use std::collections::BTreeMap;

    fn product(id: i64, price: f64, similarity: f32) -> ScoredProduct {
        ScoredProduct {
            product: Product {
                external_id: format!("e{id}"),
                internal_id: id,
                store_id: None,
                title: "t".into(),
                description: None,
                vendor: Some(format!("vendor{id}")),
                product_type: Some("boots".into()),
                price,
                tags: vec![],
                seo_title: None,
                seo_description: None,
                attributes: BTreeMap::new(),
                stock_status: StockStatus::InStock,
                sku: None,
                barcode: None,
                status: ProductStatus::Active,
                image_url: None,
                text_embedding: vec![1.0],
                image_embedding: None,
                combined_embedding: vec![1.0],
            },
            similarity,
        }
    }

    #[tokio::test]
    async fn healthy_result_set_is_left_unchanged() {
        let engine = AdaptiveEngine::new(AdaptiveConfig::default());
        let results: Vec<_> = (0..10).map(|i| product(i, 50.0, 0.9)).collect();
        let outcome = engine
            .improve(results.clone(), 10, &Filters::default(), None, &|_| {
                Box::pin(async { Ok((vec![], 0)) })
            })
            .await;
        assert!(outcome.applied_strategies.is_empty());
        assert_eq!(outcome.results.len(), 10);
    }

    #[tokio::test]
    async fn insufficient_results_triggers_a_broadening_strategy() {
        let engine = AdaptiveEngine::new(AdaptiveConfig::default());
        let filters = Filters {
            min_price: Some(0.0),
            max_price: Some(10.0),
            ..Default::default()
        };
        let broadened: Vec<_> = (0..10).map(|i| product(i, 500.0, 0.9)).collect();

        let outcome = engine
            .improve(vec![], 0, &filters, None, &|amended: Filters| {
                let broadened = broadened.clone();
                Box::pin(async move {
                    if amended.max_price.is_some_and(|m| m > 10.0) {
                        Ok((broadened, 10))
                    } else {
                        Ok((vec![], 0))
                    }
                })
            })
            .await;

        assert!(!outcome.applied_strategies.is_empty());
        assert!(!outcome.results.is_empty());
    }
}
