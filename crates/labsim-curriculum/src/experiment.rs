//! Experiment definitions and the curriculum catalog.
//!
//! Definitions are registered at startup and immutable afterwards. The
//! catalog lookup is the one place in the system where a missing id yields
//! an explicit `None` the caller must check; every other invalid reference
//! is a silent no-op.

use crate::outcome::OutcomeTable;
use crate::phase::PhaseMachine;
use labsim_core::id::{ApparatusId, ChemicalId, ExperimentId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One round of a material study: which chemical the round examines and
/// which apparatus must be placed before the round's chemical unlocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterialRound {
    pub chemical: ChemicalId,
    pub apparatus: ApparatusId,
}

/// Which phase-machine family an experiment belongs to, with the
/// family-specific data the session needs for gating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperimentFamily {
    /// Two independent sub-procedures compared against each other.
    Comparison,
    /// Three materials studied in a fixed round order.
    MaterialStudy { rounds: [MaterialRound; 3] },
    /// Drop-counted titration. `indicator` is the chemical whose colour
    /// shifts; `shifted` replaces it at the threshold.
    Titration {
        indicator: ChemicalId,
        shifted: ChemicalId,
    },
}

impl ExperimentFamily {
    pub fn fresh_machine(&self) -> PhaseMachine {
        match self {
            ExperimentFamily::Comparison => PhaseMachine::comparison(),
            ExperimentFamily::MaterialStudy { .. } => PhaseMachine::material_study(),
            ExperimentFamily::Titration { .. } => PhaseMachine::titration(),
        }
    }
}

/// A guided experiment. Registered at startup; immutable after registration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentDefinition {
    pub id: ExperimentId,
    pub name: String,
    pub family: ExperimentFamily,

    /// Apparatus the procedure expects. Advisory: consulted by query
    /// predicates, never enforced on mutation.
    pub apparatus: Vec<ApparatusId>,

    /// Chemicals the procedure expects. Advisory, as above.
    pub chemicals: Vec<ChemicalId>,

    pub outcomes: OutcomeTable,

    /// Evaporation-class experiments auto-schedule an evaporate action a
    /// fixed delay after heating begins.
    pub auto_evaporate_after_heat: bool,
}

/// Errors raised while building the curriculum catalog.
#[derive(Debug, thiserror::Error)]
pub enum CurriculumError {
    #[error("duplicate experiment id: {0:?}")]
    DuplicateId(ExperimentId),
}

/// The curriculum catalog: every registered experiment, keyed by id.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Curriculum {
    experiments: HashMap<ExperimentId, ExperimentDefinition>,
}

impl Curriculum {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, def: ExperimentDefinition) -> Result<ExperimentId, CurriculumError> {
        let id = def.id;
        if self.experiments.contains_key(&id) {
            return Err(CurriculumError::DuplicateId(id));
        }
        self.experiments.insert(id, def);
        Ok(id)
    }

    /// The explicit nullable lookup.
    pub fn experiment(&self, id: ExperimentId) -> Option<&ExperimentDefinition> {
        self.experiments.get(&id)
    }

    pub fn experiment_count(&self) -> usize {
        self.experiments.len()
    }

    pub fn experiment_ids(&self) -> impl Iterator<Item = ExperimentId> + '_ {
        self.experiments.keys().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal(id: u32) -> ExperimentDefinition {
        ExperimentDefinition {
            id: ExperimentId(id),
            name: format!("experiment-{id}"),
            family: ExperimentFamily::Comparison,
            apparatus: vec![],
            chemicals: vec![],
            outcomes: OutcomeTable::new(),
            auto_evaporate_after_heat: false,
        }
    }

    #[test]
    fn register_and_lookup() {
        let mut c = Curriculum::new();
        c.register(minimal(0)).unwrap();
        c.register(minimal(1)).unwrap();
        assert_eq!(c.experiment_count(), 2);
        assert!(c.experiment(ExperimentId(0)).is_some());
        assert!(c.experiment(ExperimentId(99)).is_none());
    }

    #[test]
    fn duplicate_id_fails() {
        let mut c = Curriculum::new();
        c.register(minimal(0)).unwrap();
        assert!(matches!(
            c.register(minimal(0)),
            Err(CurriculumError::DuplicateId(ExperimentId(0)))
        ));
    }

    #[test]
    fn family_builds_matching_machine() {
        assert_eq!(
            ExperimentFamily::Comparison.fresh_machine().phase_count(),
            2
        );
        let study = ExperimentFamily::MaterialStudy {
            rounds: [MaterialRound {
                chemical: ChemicalId(0),
                apparatus: ApparatusId(0),
            }; 3],
        };
        assert_eq!(study.fresh_machine().phase_count(), 3);
        let titration = ExperimentFamily::Titration {
            indicator: ChemicalId(0),
            shifted: ChemicalId(1),
        };
        assert_eq!(titration.fresh_machine().phase_count(), 1);
    }
}
