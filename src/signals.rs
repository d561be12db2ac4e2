//! Deterministic behavioral signal extraction.
//!
//! Compares the baseline period (`month_1`) with the recent period
//! (`month_3`) of a purchase history and reports facts only: which
//! categories disappeared or emerged, whether basket size moved, and whether
//! the basket drifted between premium and value items. No generative call is
//! made here, so identical input always yields identical output.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::customer::{PurchaseHistory, PurchaseRecord};

/// Period label treated as the baseline.
pub const BASELINE_PERIOD: &str = "month_1";
/// Period label treated as the most recent period.
pub const RECENT_PERIOD: &str = "month_3";

/// Item-name keywords that mark a premium purchase.
pub const PREMIUM_KEYWORDS: &[&str] = &[
    "organic",
    "premium",
    "artisan",
    "wagyu",
    "imported",
    "single origin",
    "fresh",
    "luxury",
];

/// Item-name keywords that mark a value purchase.
pub const VALUE_KEYWORDS: &[&str] = &[
    "value",
    "basic",
    "store brand",
    "instant",
    "budget",
    "frozen",
    "economy",
];

/// Direction of basket size between baseline and recent periods.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VelocityTrend {
    Increasing,
    Decreasing,
    Stable,
}

/// Basket quality class derived from item-name keywords.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QualityClass {
    Premium,
    Value,
    Neutral,
}

impl fmt::Display for QualityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Premium => write!(f, "Premium"),
            Self::Value => write!(f, "Value"),
            Self::Neutral => write!(f, "Neutral"),
        }
    }
}

/// Factual signals about a customer's purchase behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorSignals {
    pub disappeared_categories: BTreeSet<String>,
    pub emerged_categories: BTreeSet<String>,
    pub velocity_trend: VelocityTrend,
    /// `"Stable"` or `"<baseline> → <recent>"`.
    pub quality_shift: String,
    pub baseline_item_count: usize,
    pub recent_item_count: usize,
}

/// Extract behavior signals from a purchase history.
///
/// A missing baseline or recent period is treated as an empty basket.
pub fn analyze(history: &PurchaseHistory) -> BehaviorSignals {
    let baseline = period(history, BASELINE_PERIOD);
    let recent = period(history, RECENT_PERIOD);

    let baseline_categories = categories(baseline);
    let recent_categories = categories(recent);

    let disappeared_categories = baseline_categories
        .difference(&recent_categories)
        .map(|c| c.to_string())
        .collect();
    let emerged_categories = recent_categories
        .difference(&baseline_categories)
        .map(|c| c.to_string())
        .collect();

    let velocity_trend = match recent.len().cmp(&baseline.len()) {
        std::cmp::Ordering::Greater => VelocityTrend::Increasing,
        std::cmp::Ordering::Less => VelocityTrend::Decreasing,
        std::cmp::Ordering::Equal => VelocityTrend::Stable,
    };

    let baseline_quality = classify_quality(baseline);
    let recent_quality = classify_quality(recent);
    let quality_shift = if baseline_quality == recent_quality {
        "Stable".to_string()
    } else {
        format!("{} → {}", baseline_quality, recent_quality)
    };

    let signals = BehaviorSignals {
        disappeared_categories,
        emerged_categories,
        velocity_trend,
        quality_shift,
        baseline_item_count: baseline.len(),
        recent_item_count: recent.len(),
    };

    tracing::debug!(
        "Signals: {} disappeared, {} emerged, velocity {:?}, quality {}",
        signals.disappeared_categories.len(),
        signals.emerged_categories.len(),
        signals.velocity_trend,
        signals.quality_shift
    );

    signals
}

/// Classify a basket as Premium, Value or Neutral.
///
/// Each item counts at most once per keyword set but may count toward both.
/// Equal counts, including zero, classify as Neutral.
pub fn classify_quality(items: &[PurchaseRecord]) -> QualityClass {
    let mut premium_hits = 0usize;
    let mut value_hits = 0usize;

    for item in items {
        let name = item.item.to_lowercase();
        if PREMIUM_KEYWORDS.iter().any(|k| name.contains(*k)) {
            premium_hits += 1;
        }
        if VALUE_KEYWORDS.iter().any(|k| name.contains(*k)) {
            value_hits += 1;
        }
    }

    match premium_hits.cmp(&value_hits) {
        std::cmp::Ordering::Greater => QualityClass::Premium,
        std::cmp::Ordering::Less => QualityClass::Value,
        std::cmp::Ordering::Equal => QualityClass::Neutral,
    }
}

fn period<'a>(history: &'a PurchaseHistory, label: &str) -> &'a [PurchaseRecord] {
    history.get(label).map(Vec::as_slice).unwrap_or(&[])
}

fn categories(items: &[PurchaseRecord]) -> BTreeSet<&str> {
    items.iter().map(|p| p.category.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn history(baseline: &[(&str, &str)], recent: &[(&str, &str)]) -> PurchaseHistory {
        let to_records = |items: &[(&str, &str)]| {
            items
                .iter()
                .map(|(i, c)| PurchaseRecord::new(*i, *c))
                .collect::<Vec<_>>()
        };
        let mut h = PurchaseHistory::new();
        h.insert(BASELINE_PERIOD.to_string(), to_records(baseline));
        h.insert(RECENT_PERIOD.to_string(), to_records(recent));
        h
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn empty_history_is_stable() {
        let signals = analyze(&PurchaseHistory::new());
        assert_eq!(
            signals,
            BehaviorSignals {
                disappeared_categories: BTreeSet::new(),
                emerged_categories: BTreeSet::new(),
                velocity_trend: VelocityTrend::Stable,
                quality_shift: "Stable".to_string(),
                baseline_item_count: 0,
                recent_item_count: 0,
            }
        );
    }

    #[test]
    fn premium_to_value_shift() {
        let h = history(
            &[("organic kale", "produce")],
            &[("frozen pizza", "frozen"), ("frozen fries", "frozen")],
        );
        let signals = analyze(&h);
        assert_eq!(signals.disappeared_categories, set(&["produce"]));
        assert_eq!(signals.emerged_categories, set(&["frozen"]));
        assert_eq!(signals.velocity_trend, VelocityTrend::Increasing);
        assert_eq!(signals.quality_shift, "Premium → Value");
        assert_eq!(signals.baseline_item_count, 1);
        assert_eq!(signals.recent_item_count, 2);
    }

    #[test]
    fn decreasing_velocity() {
        let h = history(
            &[("bread", "bakery"), ("milk", "dairy")],
            &[("milk", "dairy")],
        );
        let signals = analyze(&h);
        assert_eq!(signals.velocity_trend, VelocityTrend::Decreasing);
        assert_eq!(signals.disappeared_categories, set(&["bakery"]));
        assert!(signals.emerged_categories.is_empty());
    }

    #[test]
    fn middle_periods_are_ignored() {
        let mut h = history(&[("milk", "dairy")], &[("milk", "dairy")]);
        h.insert(
            "month_2".to_string(),
            vec![PurchaseRecord::new("wagyu steak", "meat")],
        );
        let signals = analyze(&h);
        assert!(signals.emerged_categories.is_empty());
        assert_eq!(signals.quality_shift, "Stable");
    }

    #[test]
    fn missing_recent_period_counts_as_empty() {
        let mut h = PurchaseHistory::new();
        h.insert(
            BASELINE_PERIOD.to_string(),
            vec![PurchaseRecord::new("artisan bread", "bakery")],
        );
        let signals = analyze(&h);
        assert_eq!(signals.recent_item_count, 0);
        assert_eq!(signals.velocity_trend, VelocityTrend::Decreasing);
        assert_eq!(signals.quality_shift, "Premium → Neutral");
    }

    #[test]
    fn set_differences_never_overlap_the_other_period() {
        let h = history(
            &[("a", "x"), ("b", "y"), ("c", "z")],
            &[("d", "y"), ("e", "w")],
        );
        let signals = analyze(&h);
        let recent = set(&["y", "w"]);
        let baseline = set(&["x", "y", "z"]);
        assert!(signals.disappeared_categories.is_disjoint(&recent));
        assert!(signals.emerged_categories.is_disjoint(&baseline));
    }

    #[test]
    fn analyze_is_deterministic() {
        let h = history(
            &[("Imported Cheese", "deli"), ("basic rice", "pantry")],
            &[("instant noodles", "pantry")],
        );
        assert_eq!(analyze(&h), analyze(&h));
    }

    #[test]
    fn tie_classifies_as_neutral() {
        let basket = vec![
            PurchaseRecord::new("organic apples", "produce"),
            PurchaseRecord::new("budget pasta", "pantry"),
        ];
        assert_eq!(classify_quality(&basket), QualityClass::Neutral);

        // One item hitting both sets is also a tie.
        let both = vec![PurchaseRecord::new("premium frozen peas", "frozen")];
        assert_eq!(classify_quality(&both), QualityClass::Neutral);
    }

    #[test]
    fn keyword_match_is_case_insensitive() {
        let basket = vec![PurchaseRecord::new("Single Origin COFFEE", "beverages")];
        assert_eq!(classify_quality(&basket), QualityClass::Premium);
    }

    #[test]
    fn signals_serialize_with_plain_enum_names() {
        let h = history(&[("organic kale", "produce")], &[]);
        let value = serde_json::to_value(analyze(&h)).unwrap();
        assert_eq!(value["velocity_trend"], "Decreasing");
        assert_eq!(value["disappeared_categories"], serde_json::json!(["produce"]));
    }
}
