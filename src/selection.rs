//! Variant selection.
//!
//! [`select_variant`] applies a campaign's selection mode to its candidate
//! variants. The function is pure given its inputs except for the injected
//! random source used by weighted draws; it performs no I/O and cannot fail.
use rand::{distributions::WeightedIndex, prelude::Distribution, Rng};

use crate::{
    campaigns::{Campaign, Rule, SelectionMode, Variant},
    Signals,
};

/// Pick the variant to serve for `campaign` given the collected `signals`.
///
/// Returns `None` only when the campaign has no variants. Every other
/// configuration (no default flagged, empty rule set, degenerate weights,
/// unrecognized mode) resolves through a defined fallback.
pub fn select_variant<'a, R: Rng + ?Sized>(
    campaign: &'a Campaign,
    signals: &Signals,
    rng: &mut R,
) -> Option<&'a Variant> {
    if campaign.variants.is_empty() {
        return None;
    }

    match campaign.ab_test_mode {
        SelectionMode::Off | SelectionMode::Unknown => default_variant(&campaign.variants),
        SelectionMode::Rules => {
            select_by_rules(campaign, signals).or_else(|| default_variant(&campaign.variants))
        }
        SelectionMode::Weighted => select_by_weight(&campaign.variants, rng),
        SelectionMode::RulesThenWeighted => {
            select_by_rules(campaign, signals).or_else(|| select_by_weight(&campaign.variants, rng))
        }
    }
}

/// The variant flagged as default, else the first in the provided ordering.
fn default_variant(variants: &[Variant]) -> Option<&Variant> {
    variants.iter().find(|v| v.is_default).or_else(|| variants.first())
}

/// Evaluate rules by priority (highest first, ties broken by rule id) and
/// return the target of the first matching rule whose target still exists.
/// A matching rule pointing at a removed variant is skipped, not an error.
fn select_by_rules<'a>(campaign: &'a Campaign, signals: &Signals) -> Option<&'a Variant> {
    let mut rules: Vec<&Rule> = campaign.rules.iter().collect();
    rules.sort_by(|a, b| b.priority.cmp(&a.priority).then_with(|| a.id.cmp(&b.id)));

    rules.iter().find_map(|rule| {
        if !rule.matches(signals) {
            return None;
        }
        campaign.variants.iter().find(|v| v.id == rule.variant_id)
    })
}

/// Weighted random draw over variant weights.
///
/// Negative and NaN weights are clamped to zero. A degenerate distribution
/// (total weight zero) falls back to the first variant without drawing.
fn select_by_weight<'a, R: Rng + ?Sized>(
    variants: &'a [Variant],
    rng: &mut R,
) -> Option<&'a Variant> {
    match WeightedIndex::new(variants.iter().map(|v| v.weight.max(0.0))) {
        Ok(distribution) => variants.get(distribution.sample(rng)),
        Err(_) => variants.first(),
    }
}
