//! The guided-experiment run state.
//!
//! A [`Session`] accumulates placed apparatus, added chemicals, and
//! performed actions for the current experiment attempt, drives the outcome
//! lookup, and applies the family side procedure on a hit. Mutations are
//! idempotent set-inserts and silent no-ops on invalid input; the only
//! nullable lookup is the curriculum catalog itself.
//!
//! # Delayed effects
//!
//! Stir settling, auto-evaporate, and the completion popup are one-shot
//! tasks on a generation-guarded [`Scheduler`]: `reset_experiment` bumps the
//! generation, so anything scheduled by the prior attempt is dropped inert
//! when it comes due.
//!
//! # Reset overloading
//!
//! Reset means "retry the current phase" while phases remain, and "start a
//! fresh run" once every phase is complete. The two are disambiguated
//! solely by `all_phases_complete()` on the experiment's phase machine.

use crate::experiment::{Curriculum, ExperimentDefinition, ExperimentFamily};
use crate::outcome::{Outcome, VesselTransform};
use crate::phase::{PhaseMachine, titration_blend};
use labsim_core::event::{Event, EventBus};
use labsim_core::fixed::{Fixed64, Ticks};
use labsim_core::id::{Action, ApparatusId, ChemicalId, ExperimentId, VesselId};
use labsim_core::reaction::EffectKind;
use labsim_core::registry::{Registry, Rgba};
use labsim_core::sched::Scheduler;
use labsim_core::vessel::Vessel;
use std::collections::{BTreeSet, HashMap};

/// Ticks until a stir is visible as complete.
pub const STIR_SETTLE_TICKS: Ticks = 60;
/// Delay between heating and the auto-scheduled evaporate action on
/// evaporation-class experiments.
pub const AUTO_EVAPORATE_DELAY: Ticks = 240;
/// Delay before the completion popup records the experiment as done.
pub const COMPLETION_POPUP_DELAY: Ticks = 90;
/// Bench temperature at which the evaporate action becomes available.
pub const EVAPORATE_TEMP_GATE: Fixed64 = Fixed64::from_bits(90i64 << 32);

/// Deferred session work, fired by the scheduler between ticks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTask {
    /// A stir has settled; visible as complete, reaction re-checked.
    StirSettled,
    /// Evaporation-class follow-up to a heat action; reaction re-checked.
    AutoEvaporate,
    /// The completion popup: records the experiment id as completed.
    CompletionPopup(ExperimentId),
}

/// Read-only run-state flags for the query surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStateFlags {
    pub current: Option<ExperimentId>,
    pub reset_prompt: bool,
    pub resumed_after: Option<u8>,
    pub phases_complete: u8,
    pub phase_count: u8,
    /// Display-only step offset (material studies).
    pub step_offset: u8,
}

/// Run state for the guided curriculum mode.
#[derive(Debug)]
pub struct Session {
    curriculum: Curriculum,
    current: Option<ExperimentId>,

    // The three accumulation sets, in as-added order.
    apparatus: Vec<ApparatusId>,
    chemicals: Vec<ChemicalId>,
    actions: Vec<Action>,

    /// Phase machines survive across resets and experiment switches.
    machines: HashMap<ExperimentId, PhaseMachine>,
    reset_prompt: bool,
    resumed_after: Option<u8>,

    /// Idempotent completion record; persisted by an external collaborator.
    completed: BTreeSet<ExperimentId>,
    tasks: Scheduler<SessionTask>,
}

impl Session {
    pub fn new(curriculum: Curriculum) -> Self {
        Self {
            curriculum,
            current: None,
            apparatus: Vec::new(),
            chemicals: Vec::new(),
            actions: Vec::new(),
            machines: HashMap::new(),
            reset_prompt: false,
            resumed_after: None,
            completed: BTreeSet::new(),
            tasks: Scheduler::new(),
        }
    }

    /// Seed the completion record from the external store at startup.
    pub fn restore_completed(&mut self, ids: impl IntoIterator<Item = ExperimentId>) {
        self.completed.extend(ids);
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    pub fn current(&self) -> Option<ExperimentId> {
        self.current
    }

    pub fn current_definition(&self) -> Option<&ExperimentDefinition> {
        self.curriculum.experiment(self.current?)
    }

    pub fn machine(&self, id: ExperimentId) -> Option<&PhaseMachine> {
        self.machines.get(&id)
    }

    pub fn apparatus(&self) -> &[ApparatusId] {
        &self.apparatus
    }

    pub fn chemicals(&self) -> &[ChemicalId] {
        &self.chemicals
    }

    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub fn has_apparatus(&self, id: ApparatusId) -> bool {
        self.apparatus.contains(&id)
    }

    pub fn has_chemical(&self, id: ChemicalId) -> bool {
        self.chemicals.contains(&id)
    }

    pub fn has_action(&self, action: Action) -> bool {
        self.actions.contains(&action)
    }

    pub fn reset_prompt(&self) -> bool {
        self.reset_prompt
    }

    pub fn resumed_after(&self) -> Option<u8> {
        self.resumed_after
    }

    pub fn completed(&self) -> &BTreeSet<ExperimentId> {
        &self.completed
    }

    pub fn is_completed(&self, id: ExperimentId) -> bool {
        self.completed.contains(&id)
    }

    pub fn flags(&self) -> RunStateFlags {
        let machine = self.current.and_then(|id| self.machines.get(&id));
        RunStateFlags {
            current: self.current,
            reset_prompt: self.reset_prompt,
            resumed_after: self.resumed_after,
            phases_complete: machine.map_or(0, PhaseMachine::completed_count),
            phase_count: machine.map_or(0, PhaseMachine::phase_count),
            step_offset: machine.map_or(0, |m| m.step_offset(self.reset_prompt)),
        }
    }

    /// Advisory prerequisite check: whether the apparatus this one requires
    /// is already placed. Unknown ids report false.
    pub fn apparatus_satisfied(&self, registry: &Registry, id: ApparatusId) -> bool {
        match registry.apparatus(id) {
            Some(def) => def.requires.is_none_or(|req| self.has_apparatus(req)),
            None => false,
        }
    }

    /// Advisory gating for material-study rounds: round r unlocks once the
    /// previous round is tested, its chemical has been cleared from the
    /// session, and the round's apparatus is placed. Chemicals outside the
    /// round list (and all other families) are always enabled.
    pub fn chemical_enabled(&self, id: ChemicalId) -> bool {
        let Some(current) = self.current else {
            return true;
        };
        let Some(def) = self.curriculum.experiment(current) else {
            return true;
        };
        let ExperimentFamily::MaterialStudy { rounds } = &def.family else {
            return true;
        };
        let Some(round) = rounds.iter().position(|r| r.chemical == id) else {
            return true;
        };
        let previous_cleared = round == 0
            || self
                .machines
                .get(&current)
                .is_some_and(|m| m.is_phase_complete(round as u8 - 1))
                && !self.has_chemical(rounds[round - 1].chemical);
        previous_cleared && self.has_apparatus(rounds[round].apparatus)
    }

    /// Pure derived "available next actions" query.
    pub fn available_actions(&self, bench: &Vessel) -> Vec<Action> {
        let mut out = Vec::new();
        let has_liquid = !bench.is_empty();
        if has_liquid {
            out.push(Action::Stir);
        }
        out.push(Action::Heat);
        if let Some(def) = self.current_definition()
            && !def.apparatus.is_empty()
            && def.apparatus.iter().all(|&a| self.has_apparatus(a))
        {
            out.push(Action::Filter);
        }
        if has_liquid && bench.temperature >= EVAPORATE_TEMP_GATE {
            out.push(Action::Evaporate);
        }
        if has_liquid {
            out.push(Action::Pour);
        }
        out
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Load an experiment. Returns false (and changes nothing) for an
    /// unknown id. Clears the three accumulation sets; the experiment's
    /// phase flags are untouched unless it was fully completed, in which
    /// case they clear for a fresh run.
    pub fn load_experiment(&mut self, id: ExperimentId) -> bool {
        let Some(def) = self.curriculum.experiment(id) else {
            return false;
        };
        let family = def.family.clone();

        self.current = Some(id);
        self.apparatus.clear();
        self.chemicals.clear();
        self.actions.clear();
        self.reset_prompt = false;
        self.resumed_after = None;
        self.tasks.bump_generation();

        let machine = self
            .machines
            .entry(id)
            .or_insert_with(|| family.fresh_machine());
        if machine.all_phases_complete() {
            machine.reset_fresh();
        }
        true
    }

    /// Idempotent set-insert. Always succeeds; prerequisites are advisory.
    pub fn add_apparatus(&mut self, id: ApparatusId) {
        if !self.apparatus.contains(&id) {
            self.apparatus.push(id);
        }
    }

    /// Idempotent set-insert. Always succeeds; gating is advisory.
    pub fn add_chemical(&mut self, id: ChemicalId) {
        if !self.chemicals.contains(&id) {
            self.chemicals.push(id);
        }
    }

    /// Idempotent set-insert, with delayed effects on first insert: stir
    /// settles after a fixed duration, and heat auto-schedules evaporate on
    /// evaporation-class experiments. Both re-check reactions on firing.
    pub fn perform_action(&mut self, action: Action, now: Ticks) {
        if self.actions.contains(&action) {
            return;
        }
        self.actions.push(action);
        match action {
            Action::Stir => {
                self.tasks
                    .schedule(now + STIR_SETTLE_TICKS, SessionTask::StirSettled);
            }
            Action::Heat => {
                if self
                    .current_definition()
                    .is_some_and(|d| d.auto_evaporate_after_heat)
                {
                    self.tasks
                        .schedule(now + AUTO_EVAPORATE_DELAY, SessionTask::AutoEvaporate);
                }
            }
            _ => {}
        }
    }

    /// Clear the current attempt. Accumulation sets empty, in-flight tasks
    /// invalidated. Phase flags: preserved (with a resumed-after marker)
    /// while phases remain; cleared entirely once all are complete.
    pub fn reset_experiment(&mut self) {
        self.apparatus.clear();
        self.chemicals.clear();
        self.actions.clear();
        self.tasks.bump_generation();
        self.reset_prompt = false;
        self.resumed_after = None;

        if let Some(id) = self.current
            && let Some(machine) = self.machines.get_mut(&id)
        {
            if machine.all_phases_complete() {
                machine.reset_fresh();
            } else if machine.completed_count() > 0 {
                self.resumed_after = Some(machine.completed_count());
            }
        }
    }

    /// Idempotently record an experiment as completed.
    pub fn mark_complete(&mut self, id: ExperimentId, events: &mut EventBus, tick: Ticks) {
        if self.completed.insert(id) {
            events.emit(Event::ExperimentCompleted {
                experiment: id,
                tick,
            });
        }
    }

    // -----------------------------------------------------------------------
    // The central decision routine
    // -----------------------------------------------------------------------

    /// Probe the current experiment's outcome table with the ranked
    /// signature candidates, apply the hit's vessel transform, and run the
    /// family side procedure. Returns the matched outcome.
    pub fn check_reaction(
        &mut self,
        bench: &mut Vessel,
        events: &mut EventBus,
        tick: Ticks,
    ) -> Option<Outcome> {
        let current = self.current?;
        let def = self.curriculum.experiment(current)?;
        let chemicals: BTreeSet<ChemicalId> = self.chemicals.iter().copied().collect();
        let outcome = def.outcomes.lookup(&chemicals, &self.actions)?.clone();

        if let Some(transform) = &outcome.transform {
            match transform {
                VesselTransform::ReplaceContents(products) => bench.replace_contents(products),
                VesselTransform::RemoveChemical(chemical) => {
                    bench.remove_chemical(*chemical);
                }
                VesselTransform::Clear => bench.clear(),
            }
        }
        if outcome.success {
            self.apply_phase_result(current, outcome.phase, events, tick);
        }
        Some(outcome)
    }

    /// Family side procedure for a successful outcome. Titration is exempt:
    /// its completion belongs to the drop counter alone.
    fn apply_phase_result(
        &mut self,
        id: ExperimentId,
        phase: u8,
        events: &mut EventBus,
        tick: Ticks,
    ) {
        let Some(machine) = self.machines.get_mut(&id) else {
            return;
        };
        if matches!(machine, PhaseMachine::Titration { .. }) {
            return;
        }
        if machine.is_phase_complete(phase) {
            return;
        }
        machine.complete_phase(phase);
        events.emit(Event::PhaseCompleted {
            experiment: id,
            phase,
            tick,
        });
        if machine.all_phases_complete() {
            // No further reset required; the popup records completion.
            self.tasks
                .schedule(tick + COMPLETION_POPUP_DELAY, SessionTask::CompletionPopup(id));
        } else {
            self.reset_prompt = true;
            events.emit(Event::ResetPromptRaised {
                experiment: id,
                tick,
            });
        }
    }

    // -----------------------------------------------------------------------
    // Titration drops
    // -----------------------------------------------------------------------

    /// Register one titrant drop. Returns the blended indicator colour, or
    /// None when the current experiment is not a titration. Crossing the
    /// threshold swaps the indicator for its shifted form in the bench and
    /// schedules completion.
    pub fn add_drop(
        &mut self,
        registry: &Registry,
        bench_id: VesselId,
        bench: &mut Vessel,
        events: &mut EventBus,
        tick: Ticks,
    ) -> Option<Rgba> {
        let current = self.current?;
        let def = self.curriculum.experiment(current)?;
        let ExperimentFamily::Titration { indicator, shifted } = def.family else {
            return None;
        };
        let machine = self.machines.get_mut(&current)?;
        let was_complete = machine.all_phases_complete();
        let drops = machine.add_drop()?;

        let from = registry.chemical(indicator)?.colour;
        let to = registry.chemical(shifted)?.colour;
        let colour = titration_blend(from, to, drops);

        if machine.all_phases_complete() && !was_complete {
            let amount = bench.amount_of(indicator);
            if amount > Fixed64::ZERO {
                bench.remove_chemical(indicator);
                bench.deposit(shifted, amount);
            }
            events.emit(Event::EffectStarted {
                effect: EffectKind::ColourShift,
                vessel: bench_id,
                duration: EffectKind::ColourShift.duration(),
                tick,
            });
            events.emit(Event::PhaseCompleted {
                experiment: current,
                phase: 0,
                tick,
            });
            self.tasks
                .schedule(tick + COMPLETION_POPUP_DELAY, SessionTask::CompletionPopup(current));
        }
        Some(colour)
    }

    // -----------------------------------------------------------------------
    // Deferred tasks
    // -----------------------------------------------------------------------

    /// Fire due tasks for this tick. Returns true when a reaction re-check
    /// is warranted (stir settled or auto-evaporate fired).
    pub fn fire_due(&mut self, bench_id: VesselId, events: &mut EventBus, now: Ticks) -> bool {
        let mut recheck = false;
        for task in self.tasks.fire_due(now) {
            match task {
                SessionTask::StirSettled => {
                    events.emit(Event::StirSettled {
                        vessel: bench_id,
                        tick: now,
                    });
                    recheck = true;
                }
                SessionTask::AutoEvaporate => {
                    if !self.actions.contains(&Action::Evaporate) {
                        self.actions.push(Action::Evaporate);
                    }
                    recheck = true;
                }
                SessionTask::CompletionPopup(id) => {
                    self.mark_complete(id, events, now);
                }
            }
        }
        recheck
    }

    /// Queued (possibly stale) task count; test visibility.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.pending_len()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
