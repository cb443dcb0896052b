//! Heating subsystem for the labsim engine.
//!
//! Each tick, vessels within a fixed radius of an active heat source warm
//! toward a temperature cap at a rate that falls off linearly with distance
//! from the source center. Outside the radius, or with every source off,
//! temperature decays toward ambient at a fixed rate.
//!
//! # Design
//!
//! - Heat sources live in this module, not in the core vessel store.
//! - Crossing the boiling threshold while the vessel holds liquid (and is
//!   not in the mutually exclusive ice-melting state) schedules a recurring
//!   boiling event at a fixed cooldown; events fire on the cooldown, not
//!   every tick.
//! - Read-only from the curriculum engine's perspective (it reads vessel
//!   temperature for gating); runs independently of experiment mode.

use labsim_core::event::{Event, EventBus};
use labsim_core::fixed::{Fixed64, Ticks};
use labsim_core::id::VesselId;
use labsim_core::reaction::EffectKind;
use labsim_core::vessel::{Position, Vessel};
use serde::{Deserialize, Serialize};
use slotmap::{SecondaryMap, SlotMap};

// ---------------------------------------------------------------------------
// Heat sources
// ---------------------------------------------------------------------------

/// Identifies a heat source within the module. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HeatSourceId(pub u32);

/// A burner or hot plate on the workbench.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeatSource {
    pub position: Position,
    /// Vessels beyond this distance are unaffected.
    pub radius: Fixed64,
    /// Temperature gain per tick at the source center.
    pub rate: Fixed64,
    pub active: bool,
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Fixed thermal parameters. Educational values, not physical ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThermalConfig {
    /// Temperature everything decays toward with no heating.
    pub ambient: Fixed64,
    /// Decay per tick toward ambient.
    pub decay_rate: Fixed64,
    /// Hard cap on heated temperature.
    pub max_temperature: Fixed64,
    /// Threshold for the recurring boiling effect.
    pub boiling_point: Fixed64,
    /// Ticks between boiling events for one vessel.
    pub boil_cooldown: Ticks,
}

impl Default for ThermalConfig {
    fn default() -> Self {
        Self {
            ambient: Fixed64::from_num(20),
            decay_rate: Fixed64::from_num(0.25),
            max_temperature: Fixed64::from_num(150),
            boiling_point: Fixed64::from_num(100),
            boil_cooldown: 120,
        }
    }
}

// ---------------------------------------------------------------------------
// Module
// ---------------------------------------------------------------------------

/// The heating subsystem. Ticked once per engine step.
#[derive(Debug)]
pub struct ThermalModule {
    config: ThermalConfig,
    sources: Vec<HeatSource>,
    /// Next tick a boiling event may fire per vessel. Absent means the
    /// vessel is below the threshold (so crossing fires immediately).
    next_boil: SecondaryMap<VesselId, Ticks>,
    /// Vessels currently in the ice-melting state; mutually exclusive with
    /// boiling effects.
    melting: SecondaryMap<VesselId, ()>,
}

impl ThermalModule {
    pub fn new(config: ThermalConfig) -> Self {
        Self {
            config,
            sources: Vec::new(),
            next_boil: SecondaryMap::new(),
            melting: SecondaryMap::new(),
        }
    }

    pub fn config(&self) -> &ThermalConfig {
        &self.config
    }

    /// Add a heat source. Returns its id.
    pub fn add_source(&mut self, source: HeatSource) -> HeatSourceId {
        let id = HeatSourceId(self.sources.len() as u32);
        self.sources.push(source);
        id
    }

    pub fn source(&self, id: HeatSourceId) -> Option<&HeatSource> {
        self.sources.get(id.0 as usize)
    }

    /// Toggle a heat source on/off. Unknown ids are silent no-ops.
    /// Returns the new state.
    pub fn toggle_source(&mut self, id: HeatSourceId) -> bool {
        match self.sources.get_mut(id.0 as usize) {
            Some(s) => {
                s.active = !s.active;
                s.active
            }
            None => false,
        }
    }

    /// Whether any source is currently active.
    pub fn any_source_active(&self) -> bool {
        self.sources.iter().any(|s| s.active)
    }

    /// Mark or unmark a vessel as melting ice. Melting vessels never emit
    /// boiling effects.
    pub fn set_melting(&mut self, vessel: VesselId, melting: bool) {
        if melting {
            self.melting.insert(vessel, ());
        } else {
            self.melting.remove(vessel);
        }
    }

    pub fn is_melting(&self, vessel: VesselId) -> bool {
        self.melting.contains_key(vessel)
    }

    /// Effective heating rate for a position: the best linear-falloff rate
    /// across all active sources, zero if none is in range.
    fn heating_rate_at(&self, position: &Position) -> Fixed64 {
        let mut best = Fixed64::ZERO;
        for source in self.sources.iter().filter(|s| s.active) {
            if source.radius <= Fixed64::ZERO {
                continue;
            }
            let distance = position.distance_to(&source.position);
            if distance >= source.radius {
                continue;
            }
            let falloff = Fixed64::from_num(1) - distance / source.radius;
            best = best.max(source.rate * falloff);
        }
        best
    }

    /// Run one thermal update over every vessel.
    pub fn tick(&mut self, vessels: &mut SlotMap<VesselId, Vessel>, events: &mut EventBus, tick: Ticks) {
        for (id, vessel) in vessels.iter_mut() {
            let rate = self.heating_rate_at(&vessel.position);
            if rate > Fixed64::ZERO {
                vessel.temperature =
                    (vessel.temperature + rate).min(self.config.max_temperature);
            } else if vessel.temperature > self.config.ambient {
                vessel.temperature =
                    (vessel.temperature - self.config.decay_rate).max(self.config.ambient);
            } else if vessel.temperature < self.config.ambient {
                vessel.temperature =
                    (vessel.temperature + self.config.decay_rate).min(self.config.ambient);
            }

            self.update_boiling(id, vessel, events, tick);
        }
    }

    fn update_boiling(
        &mut self,
        id: VesselId,
        vessel: &Vessel,
        events: &mut EventBus,
        tick: Ticks,
    ) {
        let boiling = vessel.temperature >= self.config.boiling_point
            && !vessel.is_empty()
            && !self.melting.contains_key(id);

        if !boiling {
            // Dropping below the threshold re-arms the immediate fire on the
            // next crossing.
            self.next_boil.remove(id);
            return;
        }

        let due = self.next_boil.get(id).is_none_or(|&t| tick >= t);
        if due {
            events.emit(Event::Boiling { vessel: id, tick });
            events.emit(Event::EffectStarted {
                effect: EffectKind::Steam,
                vessel: id,
                duration: EffectKind::Steam.duration(),
                tick,
            });
            self.next_boil.insert(id, tick + self.config.boil_cooldown);
        }
    }
}

impl Default for ThermalModule {
    fn default() -> Self {
        Self::new(ThermalConfig::default())
    }
}

// ===========================================================================
// Tests
// ===========================================================================
