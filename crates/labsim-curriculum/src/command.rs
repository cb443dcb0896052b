//! Input command queue for externally-submitted lab mutations.
//!
//! Commands are queued by the client (UI, scripting) and applied at tick
//! boundaries to keep the simulation deterministic. Each command is a single
//! atomic operation; invalid commands (dangling ids, wrong experiment
//! family) apply as silent no-ops.

use labsim_core::fixed::Fixed64;
use labsim_core::id::{Action, ApparatusId, ChemicalId, ExperimentId, VesselId};
use labsim_thermal::HeatSourceId;

// ---------------------------------------------------------------------------
// Command enum
// ---------------------------------------------------------------------------

/// A single command that can be submitted to the guided lab.
///
/// Commands are queued and applied at the start of the next step to
/// maintain determinism.
#[derive(Debug, Clone)]
pub enum LabCommand {
    /// Switch the session to an experiment. Unknown ids change nothing.
    LoadExperiment { experiment: ExperimentId },
    /// Place a piece of apparatus (idempotent set-insert).
    AddApparatus { apparatus: ApparatusId },
    /// Add a chemical to the session and pour an aliquot into the bench.
    AddChemical { chemical: ChemicalId },
    /// Record a performed action (idempotent set-insert).
    PerformAction { action: Action },
    /// Probe the outcome table against the current session state.
    CheckReaction,
    /// Clear the current attempt; see the session reset semantics.
    ResetExperiment,
    /// Directly add liquid to a vessel (sandbox-style).
    FillVessel {
        vessel: VesselId,
        chemical: ChemicalId,
        amount: Fixed64,
    },
    /// Pour between two vessels (sandbox-style).
    TransferLiquid {
        source: VesselId,
        destination: VesselId,
        amount: Fixed64,
    },
    /// Toggle a heat source on or off.
    ToggleHeatSource { source: HeatSourceId },
    /// Record an experiment as completed (idempotent).
    MarkExperimentComplete { experiment: ExperimentId },
    /// Register one titrant drop on the bench.
    AddTitrationDrop,
}

// ---------------------------------------------------------------------------
// CommandQueue
// ---------------------------------------------------------------------------

/// A queue of commands waiting to be applied at the next step boundary.
///
/// Supports optional history tracking for replay and debugging.
pub struct CommandQueue {
    /// Commands waiting to be applied.
    pending: Vec<LabCommand>,
    /// History of applied commands: (tick, command).
    history: Vec<(u64, LabCommand)>,
    /// Maximum history entries to retain. 0 = no history.
    max_history: usize,
}

impl Default for CommandQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandQueue {
    /// Create a new empty command queue with no history tracking.
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            history: Vec::new(),
            max_history: 0,
        }
    }

    /// Create a new command queue that retains up to `max_history` entries.
    pub fn with_max_history(max_history: usize) -> Self {
        Self {
            pending: Vec::new(),
            history: Vec::new(),
            max_history,
        }
    }

    /// Push a single command onto the queue.
    pub fn push(&mut self, command: LabCommand) {
        self.pending.push(command);
    }

    /// Push multiple commands onto the queue at once.
    pub fn push_batch(&mut self, commands: impl IntoIterator<Item = LabCommand>) {
        self.pending.extend(commands);
    }

    /// Drain all pending commands, moving them to history with the given tick.
    /// Returns the drained commands in submission order.
    pub fn drain(&mut self, tick: u64) -> Vec<LabCommand> {
        let commands: Vec<LabCommand> = self.pending.drain(..).collect();

        if self.max_history > 0 {
            for cmd in &commands {
                self.history.push((tick, cmd.clone()));
            }
            // Trim history if over limit
            let excess = self.history.len().saturating_sub(self.max_history);
            if excess > 0 {
                self.history.drain(..excess);
            }
        }

        commands
    }

    /// Number of commands waiting to be applied.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether the queue has no pending commands.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Get the command history (tick, command) pairs.
    pub fn history(&self) -> &[(u64, LabCommand)] {
        &self.history
    }

    /// Clear all history entries.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    fn load_cmd() -> LabCommand {
        LabCommand::LoadExperiment {
            experiment: ExperimentId(0),
        }
    }

    fn chemical_cmd() -> LabCommand {
        LabCommand::AddChemical {
            chemical: ChemicalId(3),
        }
    }

    fn action_cmd() -> LabCommand {
        LabCommand::PerformAction {
            action: Action::Stir,
        }
    }

    // -----------------------------------------------------------------------
    // Test 1: new_queue_is_empty
    // -----------------------------------------------------------------------
    #[test]
    fn new_queue_is_empty() {
        let queue = CommandQueue::new();
        assert_eq!(queue.pending_count(), 0);
        assert!(queue.is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 2: push_increments_pending
    // -----------------------------------------------------------------------
    #[test]
    fn push_increments_pending() {
        let mut queue = CommandQueue::new();
        queue.push(load_cmd());
        queue.push(chemical_cmd());
        queue.push(action_cmd());
        assert_eq!(queue.pending_count(), 3);
    }

    // -----------------------------------------------------------------------
    // Test 3: push_batch
    // -----------------------------------------------------------------------
    #[test]
    fn push_batch() {
        let mut queue = CommandQueue::new();
        queue.push_batch(vec![
            load_cmd(),
            chemical_cmd(),
            chemical_cmd(),
            action_cmd(),
            LabCommand::CheckReaction,
        ]);
        assert_eq!(queue.pending_count(), 5);
    }

    // -----------------------------------------------------------------------
    // Test 4: drain_preserves_order
    // -----------------------------------------------------------------------
    #[test]
    fn drain_preserves_order() {
        let mut queue = CommandQueue::new();
        queue.push(load_cmd());
        queue.push(chemical_cmd());
        queue.push(LabCommand::CheckReaction);

        let drained = queue.drain(0);
        assert_eq!(drained.len(), 3);
        assert!(matches!(drained[0], LabCommand::LoadExperiment { .. }));
        assert!(matches!(drained[1], LabCommand::AddChemical { .. }));
        assert!(matches!(drained[2], LabCommand::CheckReaction));
        assert!(queue.is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 5: history_tracking
    // -----------------------------------------------------------------------
    #[test]
    fn history_tracking() {
        let mut queue = CommandQueue::with_max_history(100);
        queue.push(load_cmd());
        queue.push(action_cmd());

        let _drained = queue.drain(42);

        let history = queue.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].0, 42);
        assert_eq!(history[1].0, 42);
        assert!(matches!(history[0].1, LabCommand::LoadExperiment { .. }));
        assert!(matches!(history[1].1, LabCommand::PerformAction { .. }));
    }

    // -----------------------------------------------------------------------
    // Test 6: history_trimming
    // -----------------------------------------------------------------------
    #[test]
    fn history_trimming() {
        let mut queue = CommandQueue::with_max_history(3);

        queue.push(load_cmd());
        queue.push(chemical_cmd());
        queue.push(chemical_cmd());
        let _drained = queue.drain(1);

        queue.push(action_cmd());
        queue.push(LabCommand::CheckReaction);
        let _drained = queue.drain(2);

        // Max history is 3, so oldest entries should be trimmed.
        assert_eq!(queue.history().len(), 3);
    }

    // -----------------------------------------------------------------------
    // Test 7: no_history_by_default
    // -----------------------------------------------------------------------
    #[test]
    fn no_history_by_default() {
        let mut queue = CommandQueue::new();
        queue.push(load_cmd());
        let _drained = queue.drain(10);
        assert!(queue.history().is_empty());
    }

    // -----------------------------------------------------------------------
    // Test 8: clear_history
    // -----------------------------------------------------------------------
    #[test]
    fn clear_history() {
        let mut queue = CommandQueue::with_max_history(100);
        queue.push(load_cmd());
        let _drained = queue.drain(5);

        assert!(!queue.history().is_empty());
        queue.clear_history();
        assert!(queue.history().is_empty());
    }
}
