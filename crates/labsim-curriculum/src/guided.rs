//! The guided lab orchestrator.
//!
//! [`GuidedLab`] owns the engine, the heating and filtration modules, the
//! session, and the input command queue, and drives them through a fixed
//! per-step pipeline:
//!
//! 1. advance the tick counter
//! 2. drain and apply queued commands, in submission order
//! 3. tick the heating module
//! 4. tick the filtration rig; a completed filtration records the filter
//!    action and forces a reaction re-check
//! 5. fire due session tasks (stir settling, auto-evaporate, popups)
//! 6. re-check the reaction if steps 4-5 asked for it
//! 7. deliver buffered events to listeners
//!
//! Every mutation in the pipeline is deterministic given the command
//! submission order, so identical command streams replay identically.

use crate::command::{CommandQueue, LabCommand};
use crate::experiment::Curriculum;
use crate::outcome::Outcome;
use crate::session::{RunStateFlags, Session};
use labsim_core::engine::LabEngine;
use labsim_core::fixed::{Fixed64, Ticks};
use labsim_core::id::{Action, ChemicalId, VesselId};
use labsim_core::registry::{Registry, Rgba};
use labsim_core::vessel::{Vessel, VesselKind};
use labsim_filtration::{FiltrationConfig, FiltrationRig};
use labsim_thermal::{ThermalConfig, ThermalModule};

/// Capacity of the bench vessel every guided experiment works in.
pub const BENCH_CAPACITY: Fixed64 = Fixed64::from_bits(500i64 << 32);

/// Volume poured into the bench per added chemical.
pub const CHEMICAL_ALIQUOT: Fixed64 = Fixed64::from_bits(50i64 << 32);

/// Command history retained for replay and debugging.
const COMMAND_HISTORY: usize = 256;

/// Top-level guided-mode facade: engine, modules, session, command queue.
pub struct GuidedLab {
    engine: LabEngine,
    thermal: ThermalModule,
    filtration: Option<FiltrationRig>,
    session: Session,
    /// The vessel guided experiments mix in.
    bench: VesselId,
    commands: CommandQueue,
}

impl GuidedLab {
    pub fn new(registry: Registry, curriculum: Curriculum) -> Self {
        let mut engine = LabEngine::new(registry);
        let bench = engine.add_vessel(Vessel::new(VesselKind::Beaker, BENCH_CAPACITY));
        Self {
            engine,
            thermal: ThermalModule::new(ThermalConfig::default()),
            filtration: None,
            session: Session::new(curriculum),
            bench,
            commands: CommandQueue::with_max_history(COMMAND_HISTORY),
        }
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn engine(&self) -> &LabEngine {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut LabEngine {
        &mut self.engine
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Mutable session access, for restoring a persisted completion record
    /// at startup.
    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn thermal(&self) -> &ThermalModule {
        &self.thermal
    }

    pub fn thermal_mut(&mut self) -> &mut ThermalModule {
        &mut self.thermal
    }

    pub fn bench(&self) -> VesselId {
        self.bench
    }

    pub fn bench_vessel(&self) -> Option<&Vessel> {
        self.engine.vessel(self.bench)
    }

    pub fn filtration(&self) -> Option<&FiltrationRig> {
        self.filtration.as_ref()
    }

    pub fn command_history(&self) -> &[(u64, LabCommand)] {
        self.commands.history()
    }

    pub fn flags(&self) -> RunStateFlags {
        self.session.flags()
    }

    /// Actions currently available for the bench, in a fixed display order.
    pub fn available_actions(&self) -> Vec<Action> {
        match self.engine.vessel(self.bench) {
            Some(bench) => self.session.available_actions(bench),
            None => Vec::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Input
    // -----------------------------------------------------------------------

    /// Queue a command for the next step.
    pub fn submit(&mut self, command: LabCommand) {
        self.commands.push(command);
    }

    /// Install a filtration rig between source vessels and a destination.
    /// Replaces any existing rig.
    pub fn install_filtration(
        &mut self,
        sources: Vec<VesselId>,
        destination: VesselId,
        filtrate: ChemicalId,
    ) {
        self.filtration = Some(FiltrationRig::new(
            FiltrationConfig::default(),
            sources,
            destination,
            filtrate,
        ));
    }

    pub fn remove_filtration(&mut self) {
        self.filtration = None;
    }

    /// Pour from a source vessel into the installed rig. Returns the volume
    /// buffered; zero when no rig is installed.
    pub fn pour_into_filter(&mut self, source: VesselId, amount: Fixed64) -> Fixed64 {
        let Some(rig) = self.filtration.as_mut() else {
            return Fixed64::ZERO;
        };
        rig.pour_from(self.engine.vessels_mut(), source, amount)
    }

    /// Right the pouring vessel; the rig switches to its fast idle drain.
    pub fn end_filter_pour(&mut self) {
        if let Some(rig) = self.filtration.as_mut() {
            rig.end_pour();
        }
    }

    // -----------------------------------------------------------------------
    // The step pipeline
    // -----------------------------------------------------------------------

    /// Advance the lab by one step.
    pub fn step(&mut self) {
        let tick = self.engine.advance_tick();

        for command in self.commands.drain(tick) {
            self.apply(command, tick);
        }

        let mut recheck = false;
        {
            let (vessels, events) = self.engine.vessels_and_events();
            self.thermal.tick(vessels, events, tick);
            if let Some(rig) = self.filtration.as_mut() {
                rig.tick(vessels, events, tick);
                if rig.take_completed() {
                    self.session.perform_action(Action::Filter, tick);
                    recheck = true;
                }
            }
            if self.session.fire_due(self.bench, events, tick) {
                recheck = true;
            }
            if recheck && let Some(bench) = vessels.get_mut(self.bench) {
                self.session.check_reaction(bench, events, tick);
            }
        }

        self.engine.events.deliver();
    }

    fn apply(&mut self, command: LabCommand, tick: Ticks) {
        match command {
            LabCommand::LoadExperiment { experiment } => {
                self.session.load_experiment(experiment);
            }
            LabCommand::AddApparatus { apparatus } => {
                self.session.add_apparatus(apparatus);
            }
            LabCommand::AddChemical { chemical } => {
                self.session.add_chemical(chemical);
                self.engine.fill_vessel(self.bench, chemical, CHEMICAL_ALIQUOT);
            }
            LabCommand::PerformAction { action } => {
                self.session.perform_action(action, tick);
            }
            LabCommand::CheckReaction => {
                self.check_reaction_now(tick);
            }
            LabCommand::ResetExperiment => {
                self.session.reset_experiment();
                self.engine.clear_vessel(self.bench);
            }
            LabCommand::FillVessel {
                vessel,
                chemical,
                amount,
            } => {
                self.engine.fill_vessel(vessel, chemical, amount);
            }
            LabCommand::TransferLiquid {
                source,
                destination,
                amount,
            } => {
                self.engine.transfer(source, destination, amount);
            }
            LabCommand::ToggleHeatSource { source } => {
                self.thermal.toggle_source(source);
            }
            LabCommand::MarkExperimentComplete { experiment } => {
                self.session
                    .mark_complete(experiment, &mut self.engine.events, tick);
            }
            LabCommand::AddTitrationDrop => {
                self.add_drop_now(tick);
            }
        }
    }

    /// Probe the outcome table immediately (outside the queued pipeline).
    pub fn check_reaction_now(&mut self, tick: Ticks) -> Option<Outcome> {
        let (vessels, events) = self.engine.vessels_and_events();
        let bench = vessels.get_mut(self.bench)?;
        self.session.check_reaction(bench, events, tick)
    }

    /// Register one titrant drop immediately. Returns the blended indicator
    /// colour on titration experiments.
    pub fn add_drop_now(&mut self, tick: Ticks) -> Option<Rgba> {
        let (registry, vessels, events) = self.engine.registry_vessels_events();
        let bench_vessel = vessels.get_mut(self.bench)?;
        self.session
            .add_drop(registry, self.bench, bench_vessel, events, tick)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
