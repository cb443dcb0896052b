//! Outcome tables with structured signature keys.
//!
//! An experiment's outcome table maps a *signature* of the current session
//! (which chemicals were added, which actions were performed) to observation
//! text and an optional vessel transform. Keys are set-valued: a
//! [`BTreeSet`] of chemical ids plus a [`BTreeSet`] of actions, so the same
//! signature probes once regardless of the order things were added in.
//!
//! # Lookup ranking
//!
//! `lookup` probes exact keys most-specific first: all chemicals plus all
//! actions, then the chemicals plus each single action in the order the
//! actions were performed, then the chemicals alone. Only when no exact key
//! hits does a superset pass run over the table in definition order,
//! accepting the first key whose required chemicals and actions are both
//! subsets of the current session. Exact always outranks superset, so a
//! looser key can never mask a more specific one.

use labsim_core::id::{Action, ChemicalId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A structured signature key: which chemicals and which actions an outcome
/// requires. Order-free by construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeKey {
    pub chemicals: BTreeSet<ChemicalId>,
    pub actions: BTreeSet<Action>,
}

impl OutcomeKey {
    pub fn new(
        chemicals: impl IntoIterator<Item = ChemicalId>,
        actions: impl IntoIterator<Item = Action>,
    ) -> Self {
        Self {
            chemicals: chemicals.into_iter().collect(),
            actions: actions.into_iter().collect(),
        }
    }

    /// Chemicals only, no actions required.
    pub fn chemicals_only(chemicals: impl IntoIterator<Item = ChemicalId>) -> Self {
        Self::new(chemicals, [])
    }

    /// Whether this key's requirements are contained in the given session.
    fn satisfied_by(&self, chemicals: &BTreeSet<ChemicalId>, actions: &BTreeSet<Action>) -> bool {
        self.chemicals.is_subset(chemicals) && self.actions.is_subset(actions)
    }
}

/// A declarative mutation applied to the bench vessel when an outcome hits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum VesselTransform {
    /// Replace the contents with the given products, volume split evenly.
    ReplaceContents(Vec<ChemicalId>),
    /// Remove one chemical entirely (evaporation-style).
    RemoveChemical(ChemicalId),
    /// Empty the vessel.
    Clear,
}

/// What a matched signature produces: display text, a phase attribution,
/// a success flag, and an optional vessel transform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Which phase of the experiment this outcome belongs to (0-indexed).
    pub phase: u8,
    pub observation: String,
    pub explanation: String,
    /// Whether this outcome advances the experiment. Unsuccessful outcomes
    /// still display their text (e.g. "nothing happened yet").
    pub success: bool,
    pub transform: Option<VesselTransform>,
}

/// An ordered outcome table. Definition order is the tie-break for the
/// superset pass, so entries should be listed most-specific first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutcomeTable {
    entries: Vec<(OutcomeKey, Outcome)>,
}

impl OutcomeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry. A duplicate key shadows nothing: the earlier entry
    /// wins every probe.
    pub fn insert(&mut self, key: OutcomeKey, outcome: Outcome) {
        self.entries.push((key, outcome));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn get_exact(&self, probe: &OutcomeKey) -> Option<&Outcome> {
        self.entries
            .iter()
            .find(|(key, _)| key == probe)
            .map(|(_, outcome)| outcome)
    }

    /// Ranked lookup against the current session state. `performed` is the
    /// action list in as-performed order; it decides which single-action
    /// probe is tried first.
    pub fn lookup(&self, chemicals: &BTreeSet<ChemicalId>, performed: &[Action]) -> Option<&Outcome> {
        let actions: BTreeSet<Action> = performed.iter().copied().collect();

        // Exact pass, most specific first.
        if !actions.is_empty() {
            let full = OutcomeKey {
                chemicals: chemicals.clone(),
                actions: actions.clone(),
            };
            if let Some(outcome) = self.get_exact(&full) {
                return Some(outcome);
            }
            for &action in performed {
                let probe = OutcomeKey {
                    chemicals: chemicals.clone(),
                    actions: BTreeSet::from([action]),
                };
                if let Some(outcome) = self.get_exact(&probe) {
                    return Some(outcome);
                }
            }
        }
        let bare = OutcomeKey {
            chemicals: chemicals.clone(),
            actions: BTreeSet::new(),
        };
        if let Some(outcome) = self.get_exact(&bare) {
            return Some(outcome);
        }

        // Superset fallback, definition order.
        self.entries
            .iter()
            .find(|(key, _)| key.satisfied_by(chemicals, &actions))
            .map(|(_, outcome)| outcome)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
