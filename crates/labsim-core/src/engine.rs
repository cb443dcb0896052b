//! The lab engine: vessels, registry, events, and the tick counter.
//!
//! All mutation happens on one logical timeline. Within a tick, module
//! updates and reaction checks observe the same committed state; events are
//! buffered during the tick and delivered at post-tick. Invalid operations
//! (over-capacity fill, transfer from an empty source, unknown chemical ids)
//! are silent no-ops, never errors.

use crate::event::{Event, EventBus};
use crate::fixed::{Fixed64, Ticks};
use crate::id::{ChemicalId, VesselId};
use crate::reaction::{self, ReactionReport};
use crate::registry::Registry;
use crate::vessel::{Position, Vessel, VesselKind};
use slotmap::SlotMap;

/// Temperature bump applied to a vessel when an exothermic rule fires.
pub const EXOTHERMIC_TEMP_DELTA: Fixed64 = Fixed64::from_bits(15i64 << 32);

/// Read-only view of a vessel for the query surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VesselSnapshot {
    pub kind: VesselKind,
    pub capacity: Fixed64,
    pub volume: Fixed64,
    pub temperature: Fixed64,
    pub tilt: Fixed64,
    pub contents: Vec<(ChemicalId, Fixed64)>,
    pub position: Position,
}

/// Main simulation engine: owns the frozen registry, the vessel store, the
/// event bus, and the tick counter.
#[derive(Debug)]
pub struct LabEngine {
    registry: Registry,
    vessels: SlotMap<VesselId, Vessel>,
    pub events: EventBus,
    tick: Ticks,
}

impl LabEngine {
    pub fn new(registry: Registry) -> Self {
        Self {
            registry,
            vessels: SlotMap::with_key(),
            events: EventBus::default(),
            tick: 0,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn tick(&self) -> Ticks {
        self.tick
    }

    /// Advance the tick counter by one. Callers run module updates and fire
    /// due tasks after this, then deliver events.
    pub fn advance_tick(&mut self) -> Ticks {
        self.tick += 1;
        self.tick
    }

    // -----------------------------------------------------------------------
    // Vessel store
    // -----------------------------------------------------------------------

    pub fn add_vessel(&mut self, vessel: Vessel) -> VesselId {
        self.vessels.insert(vessel)
    }

    pub fn remove_vessel(&mut self, id: VesselId) -> Option<Vessel> {
        self.vessels.remove(id)
    }

    pub fn vessel(&self, id: VesselId) -> Option<&Vessel> {
        self.vessels.get(id)
    }

    pub fn vessel_mut(&mut self, id: VesselId) -> Option<&mut Vessel> {
        self.vessels.get_mut(id)
    }

    pub fn vessel_ids(&self) -> impl Iterator<Item = VesselId> + '_ {
        self.vessels.keys()
    }

    pub fn vessels_mut(&mut self) -> &mut SlotMap<VesselId, Vessel> {
        &mut self.vessels
    }

    /// Split borrow for module ticks that mutate vessels and emit events.
    pub fn vessels_and_events(&mut self) -> (&mut SlotMap<VesselId, Vessel>, &mut EventBus) {
        (&mut self.vessels, &mut self.events)
    }

    /// Split borrow that additionally exposes the frozen registry.
    pub fn registry_vessels_events(
        &mut self,
    ) -> (&Registry, &mut SlotMap<VesselId, Vessel>, &mut EventBus) {
        (&self.registry, &mut self.vessels, &mut self.events)
    }

    pub fn snapshot(&self, id: VesselId) -> Option<VesselSnapshot> {
        self.vessels.get(id).map(|v| VesselSnapshot {
            kind: v.kind,
            capacity: v.capacity,
            volume: v.volume(),
            temperature: v.temperature,
            tilt: v.tilt,
            contents: v.contents().collect(),
            position: v.position,
        })
    }

    // -----------------------------------------------------------------------
    // Content operations
    // -----------------------------------------------------------------------

    /// Fill a vessel with a registered chemical, clamped to free capacity.
    /// Unknown vessel or chemical ids are silent no-ops (returns zero).
    pub fn fill_vessel(&mut self, id: VesselId, chemical: ChemicalId, amount: Fixed64) -> Fixed64 {
        if self.registry.chemical(chemical).is_none() {
            return Fixed64::ZERO;
        }
        match self.vessels.get_mut(id) {
            Some(v) => v.fill(chemical, amount),
            None => Fixed64::ZERO,
        }
    }

    /// Transfer liquid between two vessels, preserving relative composition.
    ///
    /// The moved amount is `min(requested, source volume, destination free
    /// capacity)`; the same fraction of every source entry is removed and
    /// deposited into the destination, merged by chemical id. Returns the
    /// amount actually moved (zero for any no-op, including src == dst).
    pub fn transfer(&mut self, src: VesselId, dst: VesselId, requested: Fixed64) -> Fixed64 {
        let Some([source, destination]) = self.vessels.get_disjoint_mut([src, dst]) else {
            return Fixed64::ZERO;
        };
        let actual = requested
            .min(source.volume())
            .min(destination.free_capacity());
        if actual <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        for (chemical, part) in source.take(actual) {
            destination.deposit(chemical, part);
        }
        actual
    }

    /// Empty a vessel and reset its tilt.
    pub fn clear_vessel(&mut self, id: VesselId) {
        if let Some(v) = self.vessels.get_mut(id) {
            v.clear();
        }
    }

    // -----------------------------------------------------------------------
    // Sandbox reaction check
    // -----------------------------------------------------------------------

    /// Run the generic matcher against one vessel. On a match the contents
    /// are replaced, effects and a notification are emitted, and exothermic
    /// rules warm the vessel and raise a safety warning.
    pub fn check_reactions(&mut self, id: VesselId) -> ReactionReport {
        let tick = self.tick;
        let Some(vessel) = self.vessels.get_mut(id) else {
            return ReactionReport::NoReaction;
        };

        let report = reaction::react(&self.registry, vessel);
        match &report {
            ReactionReport::Matched {
                rule,
                products,
                effects,
                exothermic,
            } => {
                for &(effect, duration) in effects {
                    self.events.emit(Event::EffectStarted {
                        effect,
                        vessel: id,
                        duration,
                        tick,
                    });
                }
                self.events.emit(Event::ReactionMatched {
                    rule: *rule,
                    vessel: id,
                    products: products.clone(),
                    tick,
                });
                if *exothermic {
                    vessel.temperature += EXOTHERMIC_TEMP_DELTA;
                    let name = self
                        .registry
                        .rule(*rule)
                        .map(|r| r.name.clone())
                        .unwrap_or_default();
                    self.events.emit(Event::SafetyWarning {
                        title: "Exothermic reaction".to_string(),
                        message: format!("{name} releases heat; handle the vessel with care."),
                        tick,
                    });
                }
            }
            ReactionReport::NoReaction => {
                self.events.emit(Event::NoReaction { vessel: id, tick });
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::fixed::f64_to_fixed64 as fx;
    use crate::test_utils::{DemoChemicals, demo_registry};
    use crate::vessel::ROOM_TEMPERATURE;

    fn engine() -> (LabEngine, DemoChemicals) {
        let (registry, chems) = demo_registry();
        (LabEngine::new(registry), chems)
    }

    fn beaker(engine: &mut LabEngine, capacity: f64) -> VesselId {
        engine.add_vessel(Vessel::new(VesselKind::Beaker, fx(capacity)))
    }

    #[test]
    fn fill_scenario_clamps_to_capacity() {
        let (mut e, c) = engine();
        let v = beaker(&mut e, 500.0);
        e.fill_vessel(v, c.water, fx(1000.0));
        let snap = e.snapshot(v).unwrap();
        assert_eq!(snap.volume, fx(500.0));
        assert_eq!(snap.contents, vec![(c.water, fx(500.0))]);
    }

    #[test]
    fn fill_unknown_chemical_is_noop() {
        let (mut e, _) = engine();
        let v = beaker(&mut e, 500.0);
        assert_eq!(e.fill_vessel(v, ChemicalId(999), fx(10.0)), Fixed64::ZERO);
        assert!(e.vessel(v).unwrap().is_empty());
    }

    #[test]
    fn transfer_clamps_to_source_volume() {
        let (mut e, c) = engine();
        let a = beaker(&mut e, 500.0);
        let b = beaker(&mut e, 500.0);
        e.fill_vessel(a, c.water, fx(30.0));

        let moved = e.transfer(a, b, fx(50.0));
        assert_eq!(moved, fx(30.0));
        assert!(e.vessel(a).unwrap().is_empty());
        assert_eq!(e.vessel(b).unwrap().amount_of(c.water), fx(30.0));
    }

    #[test]
    fn transfer_clamps_to_destination_free_capacity() {
        let (mut e, c) = engine();
        let a = beaker(&mut e, 500.0);
        let b = beaker(&mut e, 100.0);
        e.fill_vessel(a, c.water, fx(400.0));
        e.fill_vessel(b, c.water, fx(80.0));

        let moved = e.transfer(a, b, fx(200.0));
        assert_eq!(moved, fx(20.0));
        assert_eq!(e.vessel(b).unwrap().volume(), fx(100.0));
        assert_eq!(e.vessel(a).unwrap().volume(), fx(380.0));
    }

    #[test]
    fn transfer_conserves_total_volume() {
        let (mut e, c) = engine();
        let a = beaker(&mut e, 500.0);
        let b = beaker(&mut e, 500.0);
        e.fill_vessel(a, c.water, fx(200.0));
        e.fill_vessel(a, c.nacl, fx(100.0));

        let before = e.vessel(a).unwrap().volume() + e.vessel(b).unwrap().volume();
        e.transfer(a, b, fx(120.0));
        let after = e.vessel(a).unwrap().volume() + e.vessel(b).unwrap().volume();
        assert!((before - after).abs() < crate::fixed::VOLUME_EPSILON);
    }

    #[test]
    fn transfer_to_self_is_noop() {
        let (mut e, c) = engine();
        let a = beaker(&mut e, 500.0);
        e.fill_vessel(a, c.water, fx(100.0));
        assert_eq!(e.transfer(a, a, fx(50.0)), Fixed64::ZERO);
        assert_eq!(e.vessel(a).unwrap().volume(), fx(100.0));
    }

    #[test]
    fn check_reactions_emits_effects_and_notification() {
        let (mut e, c) = engine();
        let v = beaker(&mut e, 500.0);
        e.fill_vessel(v, c.hcl, fx(100.0));
        e.fill_vessel(v, c.naoh, fx(100.0));

        let report = e.check_reactions(v);
        assert!(matches!(report, ReactionReport::Matched { .. }));
        assert!(e.events.buffered_count(EventKind::EffectStarted) > 0);
        assert_eq!(e.events.buffered_count(EventKind::ReactionMatched), 1);
    }

    #[test]
    fn exothermic_match_warms_vessel_and_warns() {
        let (mut e, c) = engine();
        let v = beaker(&mut e, 500.0);
        e.fill_vessel(v, c.hcl, fx(100.0));
        e.fill_vessel(v, c.naoh, fx(100.0));

        e.check_reactions(v);
        assert_eq!(
            e.vessel(v).unwrap().temperature,
            ROOM_TEMPERATURE + EXOTHERMIC_TEMP_DELTA
        );
        assert_eq!(e.events.buffered_count(EventKind::SafetyWarning), 1);
    }

    #[test]
    fn no_reaction_emits_neutral_event_without_mutation() {
        let (mut e, c) = engine();
        let v = beaker(&mut e, 500.0);
        e.fill_vessel(v, c.water, fx(100.0));

        assert_eq!(e.check_reactions(v), ReactionReport::NoReaction);
        assert_eq!(e.events.buffered_count(EventKind::NoReaction), 1);
        assert_eq!(e.vessel(v).unwrap().amount_of(c.water), fx(100.0));
    }

    #[test]
    fn advance_tick_increments() {
        let (mut e, _) = engine();
        assert_eq!(e.tick(), 0);
        assert_eq!(e.advance_tick(), 1);
        assert_eq!(e.advance_tick(), 2);
    }
}
