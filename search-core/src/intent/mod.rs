//! Query intent classification (spec C8).
//!
//! Pure, synchronous, deterministic: a closed [`Intent`] enum with an
//! `Other` fallback so an unrecognized lexicon hit never crashes the serving
//! path (spec §9 "String-typed intent categories").

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// A coarse semantic bucket a query may be classified into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Price,
    Color,
    Material,
    Category,
    Brand,
    Size,
    Other,
}

impl Intent {
    const ALL_KNOWN: [Intent; 6] = [
        Intent::Price,
        Intent::Color,
        Intent::Material,
        Intent::Category,
        Intent::Brand,
        Intent::Size,
    ];

    /// Stable string form, used as the `intent` field of a recorded
    /// analytics event and as a baseline grouping key (spec C9 step 2).
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Price => "price",
            Self::Color => "color",
            Self::Material => "material",
            Self::Category => "category",
            Self::Brand => "brand",
            Self::Size => "size",
            Self::Other => "other",
        }
    }

    fn lexicon(self) -> &'static [&'static str] {
        match self {
            Intent::Price => &[
                "cheap", "expensive", "under", "over", "budget", "price", "cost", "affordable",
                "$",
            ],
            Intent::Color => &[
                "red", "blue", "green", "black", "white", "brown", "yellow", "pink", "purple",
                "gray", "grey", "orange",
            ],
            Intent::Material => &[
                "leather", "suede", "canvas", "cotton", "wool", "silk", "denim", "metal", "wood",
                "plastic",
            ],
            Intent::Category => &[
                "boots", "sneakers", "sandals", "jacket", "shirt", "dress", "pants", "hat",
                "bag", "watch",
            ],
            Intent::Brand => &["brand", "nike", "adidas", "made by"],
            Intent::Size => &["small", "medium", "large", "size", "xl", "xs", "petite"],
            Intent::Other => &[],
        }
    }
}

/// Per-intent confidence, derived from lexicon hit density.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct IntentScore {
    pub intent: Intent,
    pub confidence: f64,
}

/// Coarse difficulty label derived from [`Classification::complexity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

/// The full classification of a normalized query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub primary_intent: Intent,
    pub secondary_intents: Vec<Intent>,
    pub scores: Vec<IntentScore>,
    pub complexity: f64,
    pub difficulty: Difficulty,
    /// A `(min, max)` price range parsed out of the query text itself (e.g.
    /// "boots under $80"), independent of any explicit `Filters` the caller
    /// attached. `None` when the query carries no recognizable price intent.
    pub detected_price: Option<(f64, f64)>,
}

fn range_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:between|from)\s*[$€£]?(\d+(?:\.\d+)?)\s*(?:and|-|to)\s*[$€£]?(\d+(?:\.\d+)?)")
            .expect("range_pattern is a valid regex")
    })
}

fn below_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:under|below|less than|cheaper than|up to|at most)\s*[$€£]?(\d+(?:\.\d+)?)")
            .expect("below_pattern is a valid regex")
    })
}

fn above_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(?:over|above|more than|at least)\s*[$€£]?(\d+(?:\.\d+)?)")
            .expect("above_pattern is a valid regex")
    })
}

/// Parse an explicit price range out of free text (spec C8: price intent
/// detection runs alongside, and feeds, C7's price-coherence scoring).
///
/// Grounded on the original service's `price_intent` regex set, trimmed to
/// a deterministic range/below/above match with no network fallback.
#[must_use]
pub fn detect_price_range(query: &str) -> Option<(f64, f64)> {
    if let Some(caps) = range_pattern().captures(query) {
        let a: f64 = caps.get(1)?.as_str().parse().ok()?;
        let b: f64 = caps.get(2)?.as_str().parse().ok()?;
        return Some((a.min(b), a.max(b)));
    }
    if let Some(caps) = below_pattern().captures(query) {
        let max: f64 = caps.get(1)?.as_str().parse().ok()?;
        return Some((0.0, max));
    }
    if let Some(caps) = above_pattern().captures(query) {
        let min: f64 = caps.get(1)?.as_str().parse().ok()?;
        return Some((min, f64::MAX));
    }
    None
}

/// Classify a normalized (lowercased, whitespace-collapsed) query.
///
/// Pure and deterministic: no I/O, callers need not cache the result.
#[must_use]
pub fn classify(query: &str) -> Classification {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    let token_count = tokens.len().max(1);

    let mut scores: Vec<IntentScore> = Intent::ALL_KNOWN
        .iter()
        .map(|&intent| {
            let hits = intent
                .lexicon()
                .iter()
                .filter(|kw| query.contains(**kw))
                .count();
            IntentScore {
                intent,
                confidence: hits as f64 / token_count as f64,
            }
        })
        .filter(|s| s.confidence > 0.0)
        .collect();

    scores.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));

    let primary_intent = scores.first().map_or(Intent::Other, |s| s.intent);
    let secondary_intents: Vec<Intent> = scores.iter().skip(1).map(|s| s.intent).collect();

    let has_numeric = tokens.iter().any(|t| t.chars().any(|c| c.is_ascii_digit()));
    let has_currency = query.contains('$') || query.contains('\u{20ac}') || query.contains('\u{a3}');
    let has_acronym = tokens.iter().any(|t| t.len() > 1 && t.chars().all(|c| c.is_ascii_uppercase()));
    let has_punctuation = query.chars().any(|c| c.is_ascii_punctuation());

    let token_factor = (token_count as f64 / 10.0).min(1.0);
    let intent_factor = (scores.len() as f64 / Intent::ALL_KNOWN.len() as f64).min(1.0);
    let signal_factor = [has_numeric, has_currency, has_acronym, has_punctuation]
        .iter()
        .filter(|b| **b)
        .count() as f64
        / 4.0;

    let complexity = (token_factor * 0.4 + intent_factor * 0.4 + signal_factor * 0.2).clamp(0.0, 1.0);

    let difficulty = if complexity < 0.34 {
        Difficulty::Easy
    } else if complexity < 0.67 {
        Difficulty::Medium
    } else {
        Difficulty::Hard
    };

    Classification {
        primary_intent,
        secondary_intents,
        scores,
        complexity,
        difficulty,
        detected_price: detect_price_range(query),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_query_is_classified_as_color() {
        let c = classify("red boots");
        assert_eq!(c.primary_intent, Intent::Color);
    }

    #[test]
    fn unrecognized_query_falls_back_to_other() {
        let c = classify("xyzzy plugh");
        assert_eq!(c.primary_intent, Intent::Other);
        assert!(c.secondary_intents.is_empty());
    }

    #[test]
    fn price_keywords_are_detected() {
        let c = classify("cheap sneakers under $50");
        assert_eq!(c.primary_intent, Intent::Price);
    }

    #[test]
    fn longer_multi_intent_query_is_more_complex() {
        let simple = classify("boots");
        let complex = classify("red leather boots under $80 size large");
        assert!(complex.complexity > simple.complexity);
    }

    #[test]
    fn classification_is_deterministic() {
        let a = classify("blue jacket");
        let b = classify("blue jacket");
        assert_eq!(a.primary_intent, b.primary_intent);
        assert!((a.complexity - b.complexity).abs() < f64::EPSILON);
    }

    #[test]
    fn below_phrase_detects_a_zero_floor_range() {
        assert_eq!(detect_price_range("boots under $80"), Some((0.0, 80.0)));
    }

    #[test]
    fn above_phrase_detects_an_unbounded_ceiling() {
        assert_eq!(detect_price_range("boots over 50"), Some((50.0, f64::MAX)));
    }

    #[test]
    fn between_phrase_detects_a_closed_range() {
        assert_eq!(detect_price_range("boots between $40 and $80"), Some((40.0, 80.0)));
    }

    #[test]
    fn query_without_price_language_detects_nothing() {
        assert_eq!(detect_price_range("red leather boots"), None);
    }

    #[test]
    fn classify_populates_detected_price_from_the_query() {
        let c = classify("cheap sneakers under $50");
        assert_eq!(c.detected_price, Some((0.0, 50.0)));
    }
}
