//! Generic (sandbox-mode) reaction matching.
//!
//! The matcher scans a vessel's content entries for an unordered pair of
//! distinct chemicals whose categories match a registered rule. First match
//! wins under the vessel's deterministic entry order (by chemical id). With
//! overlapping rules this policy is nondeterministic in principle; the
//! curated rule set has no overlapping category pairs, so no tie-break is
//! defined. On a match the entire content set is replaced by the rule's
//! products, splitting the prior volume evenly across them.

use crate::fixed::Ticks;
use crate::id::{ChemicalId, RuleId};
use crate::registry::Registry;
use crate::vessel::Vessel;
use serde::{Deserialize, Serialize};

/// Visual/audio effect tags a rule can emit. Each tag carries a fixed
/// display duration; collaborators decide how to render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EffectKind {
    Bubbles,
    Smoke,
    ColourShift,
    Precipitate,
    Steam,
    Glow,
}

impl EffectKind {
    /// Display duration for this effect, in ticks.
    pub fn duration(self) -> Ticks {
        match self {
            EffectKind::Bubbles => 180,
            EffectKind::Smoke => 240,
            EffectKind::ColourShift => 120,
            EffectKind::Precipitate => 300,
            EffectKind::Steam => 200,
            EffectKind::Glow => 90,
        }
    }
}

/// Result of a reaction check on one vessel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReactionReport {
    /// A rule matched and the vessel contents were replaced.
    Matched {
        rule: RuleId,
        products: Vec<ChemicalId>,
        effects: Vec<(EffectKind, Ticks)>,
        exothermic: bool,
    },
    /// No rule matched. A defined non-error outcome; nothing was mutated.
    NoReaction,
}

/// Find the first rule matching any unordered pair of distinct entries.
///
/// Entries are visited in the vessel's deterministic order; rules are probed
/// in registration order for each pair.
pub fn find_match(registry: &Registry, vessel: &Vessel) -> Option<RuleId> {
    let entries: Vec<ChemicalId> = vessel.contents().map(|(c, _)| c).collect();
    for i in 0..entries.len() {
        for j in (i + 1)..entries.len() {
            let (Some(a), Some(b)) = (registry.chemical(entries[i]), registry.chemical(entries[j]))
            else {
                continue;
            };
            for (id, rule) in registry.rules() {
                if rule.pair.matches(a.category, b.category) {
                    return Some(id);
                }
            }
        }
    }
    None
}

/// Apply the matched rule to the vessel and describe the result.
///
/// The vessel's prior volume is split evenly across the rule's products and
/// one timed effect is produced per effect tag. Returns `NoReaction` without
/// mutating anything when no rule matches.
pub fn react(registry: &Registry, vessel: &mut Vessel) -> ReactionReport {
    let Some(rule_id) = find_match(registry, vessel) else {
        return ReactionReport::NoReaction;
    };
    // find_match only returns registered ids.
    let Some(rule) = registry.rule(rule_id) else {
        return ReactionReport::NoReaction;
    };
    vessel.replace_contents(&rule.products);
    ReactionReport::Matched {
        rule: rule_id,
        products: rule.products.clone(),
        effects: rule.effects.iter().map(|&e| (e, e.duration())).collect(),
        exothermic: rule.exothermic,
    }
}
