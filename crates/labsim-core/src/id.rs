use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a vessel on the workbench.
    pub struct VesselId;
}

/// Identifies a chemical in the registry. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChemicalId(pub u32);

/// Identifies a reaction rule in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RuleId(pub u32);

/// Identifies a piece of apparatus in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ApparatusId(pub u32);

/// Identifies a guided experiment in the curriculum catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ExperimentId(pub u32);

/// The closed vocabulary of learner actions.
///
/// Outcome lookups distinguish chemical tokens from action tokens by this
/// enum rather than by string matching; anything outside the vocabulary is a
/// chemical by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Stir,
    Heat,
    Filter,
    Evaporate,
    Pour,
}

impl Action {
    /// All actions, in a fixed order.
    pub const ALL: [Action; 5] = [
        Action::Stir,
        Action::Heat,
        Action::Filter,
        Action::Evaporate,
        Action::Pour,
    ];

    /// Stable lowercase name, used in data files and display.
    pub fn as_str(self) -> &'static str {
        match self {
            Action::Stir => "stir",
            Action::Heat => "heat",
            Action::Filter => "filter",
            Action::Evaporate => "evaporate",
            Action::Pour => "pour",
        }
    }

    /// Parse a lowercase action name. Returns None for anything outside the
    /// vocabulary (the token is then a chemical reference).
    pub fn parse(s: &str) -> Option<Action> {
        Action::ALL.into_iter().find(|a| a.as_str() == s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chemical_id_equality() {
        assert_eq!(ChemicalId(0), ChemicalId(0));
        assert_ne!(ChemicalId(0), ChemicalId(1));
    }

    #[test]
    fn ids_are_hashable() {
        use std::collections::HashMap;
        let mut map = HashMap::new();
        map.insert(ChemicalId(0), "water");
        map.insert(ChemicalId(1), "naoh");
        assert_eq!(map[&ChemicalId(0)], "water");
    }

    #[test]
    fn action_round_trips_through_name() {
        for action in Action::ALL {
            assert_eq!(Action::parse(action.as_str()), Some(action));
        }
    }

    #[test]
    fn unknown_token_is_not_an_action() {
        assert_eq!(Action::parse("naoh"), None);
        assert_eq!(Action::parse("Stir"), None);
    }
}
