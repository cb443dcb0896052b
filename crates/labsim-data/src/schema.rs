//! Serde data file structs for lab content definitions.
//!
//! These structs define the on-disk format for chemicals, reaction rules,
//! apparatus, and guided experiments. They are deserialized from RON, JSON,
//! or TOML data files and then resolved into engine types by the loader.
//! Cross-references are by name; the loader turns them into ids.

use labsim_core::id::Action;
use labsim_core::reaction::EffectKind;
use labsim_core::registry::Category;
use serde::Deserialize;

// ===========================================================================
// Chemicals
// ===========================================================================

/// A chemical definition in a data file.
#[derive(Debug, Clone, Deserialize)]
pub struct ChemicalData {
    pub name: String,
    #[serde(default)]
    pub formula: Option<String>,
    /// Display colour as `(r, g, b, a)`. Defaults to near-transparent white.
    #[serde(default = "default_colour")]
    pub colour: [u8; 4],
    pub category: Category,
}

fn default_colour() -> [u8; 4] {
    [255, 255, 255, 40]
}

// ===========================================================================
// Reaction rules
// ===========================================================================

/// A sandbox reaction rule in a data file. The category pair is unordered;
/// products reference chemicals by name.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleData {
    pub name: String,
    pub pair: (Category, Category),
    pub products: Vec<String>,
    #[serde(default)]
    pub effects: Vec<EffectKind>,
    #[serde(default)]
    pub exothermic: bool,
}

// ===========================================================================
// Apparatus
// ===========================================================================

/// A piece of apparatus in a data file. `requires` names an advisory
/// prerequisite that must be declared earlier in the same file.
#[derive(Debug, Clone, Deserialize)]
pub struct ApparatusData {
    pub name: String,
    #[serde(default)]
    pub requires: Option<String>,
}

// ===========================================================================
// Experiments
// ===========================================================================

/// A guided experiment in a data file. Ids are assigned from file order.
#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentData {
    pub name: String,
    pub family: FamilyData,
    #[serde(default)]
    pub apparatus: Vec<String>,
    #[serde(default)]
    pub chemicals: Vec<String>,
    #[serde(default)]
    pub outcomes: Vec<OutcomeData>,
    #[serde(default)]
    pub auto_evaporate_after_heat: bool,
}

/// Which phase-machine family the experiment belongs to.
#[derive(Debug, Clone, Deserialize)]
pub enum FamilyData {
    Comparison,
    MaterialStudy { rounds: [RoundData; 3] },
    Titration { indicator: String, shifted: String },
}

/// One material-study round: the chemical under study and the apparatus
/// that unlocks it.
#[derive(Debug, Clone, Deserialize)]
pub struct RoundData {
    pub chemical: String,
    pub apparatus: String,
}

/// One outcome-table entry: a signature of chemical and action names, the
/// display text, and an optional bench transform.
#[derive(Debug, Clone, Deserialize)]
pub struct OutcomeData {
    #[serde(default)]
    pub chemicals: Vec<String>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub phase: u8,
    pub observation: String,
    #[serde(default)]
    pub explanation: String,
    #[serde(default = "default_true")]
    pub success: bool,
    #[serde(default)]
    pub transform: Option<TransformData>,
}

fn default_true() -> bool {
    true
}

/// Bench mutation applied when the outcome hits.
#[derive(Debug, Clone, Deserialize)]
pub enum TransformData {
    ReplaceContents(Vec<String>),
    RemoveChemical(String),
    Clear,
}

// ===========================================================================
// TOML wrappers (TOML does not support top-level arrays)
// ===========================================================================

/// Wrapper for a list of chemicals in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlChemicals {
    pub chemicals: Vec<ChemicalData>,
}

/// Wrapper for a list of rules in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlRules {
    pub rules: Vec<RuleData>,
}

/// Wrapper for a list of apparatus in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlApparatus {
    pub apparatus: Vec<ApparatusData>,
}

/// Wrapper for a list of experiments in TOML format.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlExperiments {
    pub experiments: Vec<ExperimentData>,
}

// ===========================================================================
// Tests
// ===========================================================================
