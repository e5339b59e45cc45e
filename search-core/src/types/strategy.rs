//! Adaptive filter strategy declarations (spec C7).
//!
//! Grounded on `original_source/ai_shopify_search/features/adaptive_filters.py`'s
//! `FilterStrategy` dataclass and its concrete strategy table.

use serde::{Deserialize, Serialize};

/// A named, closed strategy the adaptive filter engine may apply when a
/// search returns too few or too poorly distributed results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Lower `min_price` to admit cheaper results.
    PriceBroadenLow,
    /// Raise `max_price` to admit pricier results.
    PriceBroadenHigh,
    /// Drop the `product_type`/category constraint.
    CategoryBroaden,
    /// Re-rank for result diversity rather than pure similarity.
    DiversityImprove,
    /// Relax a material attribute match to a broader family.
    MaterialFallback,
    /// Relax a color attribute match to a broader family.
    ColorFallback,
    /// Drop every filter as a last resort.
    EmergencyFallback,
}

impl StrategyKind {
    /// Stable string form, used as the `applied_strategies` entry in a
    /// response and as the `suggested_strategy` key in a [`super::pattern::LearnedPattern`].
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PriceBroadenLow => "price_broaden_low",
            Self::PriceBroadenHigh => "price_broaden_high",
            Self::CategoryBroaden => "category_broaden",
            Self::DiversityImprove => "diversity_improve",
            Self::MaterialFallback => "material_fallback",
            Self::ColorFallback => "color_fallback",
            Self::EmergencyFallback => "emergency_fallback",
        }
    }
}

/// A declarative rule: when `min_improvement_threshold` worth of extra
/// results can plausibly be gained, `kind` is eligible to be tried.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FilterStrategy {
    pub kind: StrategyKind,
    /// Priority order; lower runs first when multiple strategies are eligible.
    pub priority: u8,
}

/// A strategy recommendation mined from historical patterns (spec C9),
/// offered to C7 as a hint but never applied without C7's own trigger check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSuggestion {
    pub query_template: String,
    pub strategy: StrategyKind,
    pub confidence: f64,
}
