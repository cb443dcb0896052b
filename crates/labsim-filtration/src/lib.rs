//! Filtration buffer for the labsim engine.
//!
//! A pour into the funnel removes liquid from the source vessel with the
//! same proportional algorithm as any transfer, but feeds a *scalar* volume
//! buffer instead of a vessel: the filter paper holds back everything except
//! the filtrate chemical, so composition collapses to a single number. A
//! separate periodic release then moves a capped amount per tick from the
//! buffer into the true destination.
//!
//! # Two-rate pacing
//!
//! The release rate is slower while a pour is active (so liquid visibly
//! accumulates in the funnel) and faster once pouring stops (so it drains
//! quickly). This is an explicit pacing choice, not a physical property.
//!
//! # Edge-triggered completion
//!
//! Filtration counts as finished only on the transition from "was draining"
//! to "isn't", and only when every source vessel is below a near-empty
//! threshold. A merely paused pour therefore never completes the procedure.

use labsim_core::event::{Event, EventBus};
use labsim_core::fixed::{Fixed64, Ticks, VOLUME_EPSILON};
use labsim_core::id::{ChemicalId, VesselId};
use labsim_core::vessel::Vessel;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

/// Fixed pacing and threshold parameters for a rig.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiltrationConfig {
    /// Release per tick while a pour is active.
    pub drain_rate_pouring: Fixed64,
    /// Release per tick once pouring has stopped.
    pub drain_rate_idle: Fixed64,
    /// Source vessels below this volume count as emptied.
    pub near_empty: Fixed64,
}

impl Default for FiltrationConfig {
    fn default() -> Self {
        Self {
            drain_rate_pouring: Fixed64::from_num(1),
            drain_rate_idle: Fixed64::from_num(4),
            near_empty: Fixed64::from_num(2),
        }
    }
}

/// A funnel-and-paper assembly between source vessels and one destination.
#[derive(Debug)]
pub struct FiltrationRig {
    config: FiltrationConfig,
    /// Vessels the learner pours from; watched for the near-empty condition.
    sources: Vec<VesselId>,
    destination: VesselId,
    /// What passes through the paper into the destination.
    filtrate: ChemicalId,
    /// Scalar volume held in the funnel.
    buffered: Fixed64,
    pour_active: bool,
    was_draining: bool,
    /// Set once per completed filtration; consumed by the orchestrator.
    completed: bool,
}

impl FiltrationRig {
    pub fn new(
        config: FiltrationConfig,
        sources: Vec<VesselId>,
        destination: VesselId,
        filtrate: ChemicalId,
    ) -> Self {
        Self {
            config,
            sources,
            destination,
            filtrate,
            buffered: Fixed64::ZERO,
            pour_active: false,
            was_draining: false,
            completed: false,
        }
    }

    pub fn destination(&self) -> VesselId {
        self.destination
    }

    /// Volume currently held in the funnel.
    pub fn buffered(&self) -> Fixed64 {
        self.buffered
    }

    pub fn is_pouring(&self) -> bool {
        self.pour_active
    }

    /// Mark the start of an active pour (tilt begins).
    pub fn begin_pour(&mut self) {
        self.pour_active = true;
    }

    /// Mark the end of the active pour (vessel righted).
    pub fn end_pour(&mut self) {
        self.pour_active = false;
    }

    /// Pour from a source vessel into the funnel. Removes the requested
    /// amount proportionally from the source (clamped to its volume) and
    /// adds the total to the scalar buffer. Unknown vessels are no-ops.
    /// Returns the amount buffered.
    pub fn pour_from(
        &mut self,
        vessels: &mut SlotMap<VesselId, Vessel>,
        source: VesselId,
        requested: Fixed64,
    ) -> Fixed64 {
        let Some(vessel) = vessels.get_mut(source) else {
            return Fixed64::ZERO;
        };
        let removed: Fixed64 = vessel.take(requested).iter().map(|(_, a)| *a).sum();
        if removed > Fixed64::ZERO {
            self.buffered += removed;
            self.pour_active = true;
        }
        removed
    }

    /// Whether the rig finished a filtration since the last call.
    /// Consuming read; the flag is cleared.
    pub fn take_completed(&mut self) -> bool {
        std::mem::take(&mut self.completed)
    }

    /// Run one release step: move a capped amount from the buffer into the
    /// destination, then evaluate the edge-triggered completion condition.
    pub fn tick(&mut self, vessels: &mut SlotMap<VesselId, Vessel>, events: &mut EventBus, tick: Ticks) {
        if self.buffered > Fixed64::ZERO {
            let rate = if self.pour_active {
                self.config.drain_rate_pouring
            } else {
                self.config.drain_rate_idle
            };
            let release = rate.min(self.buffered);
            if let Some(destination) = vessels.get_mut(self.destination) {
                let accepted = destination.fill(self.filtrate, release);
                self.buffered -= accepted;
                if self.buffered < VOLUME_EPSILON {
                    self.buffered = Fixed64::ZERO;
                }
                // A full destination stalls the drain rather than spilling.
            }
        }

        let draining = self.buffered > Fixed64::ZERO;
        let sources_emptied = self
            .sources
            .iter()
            .all(|&s| vessels.get(s).is_none_or(|v| v.volume() < self.config.near_empty));

        if self.was_draining && !draining && sources_emptied {
            self.completed = true;
            events.emit(Event::FiltrationCompleted {
                destination: self.destination,
                tick,
            });
        }
        self.was_draining = draining;
    }
}

// ===========================================================================
// Tests
// ===========================================================================
