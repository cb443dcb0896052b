//! Vessels and the content-conservation model.
//!
//! A vessel holds a set of content entries keyed by chemical id
//! (merge-on-add, no duplicates). The one invariant everything else leans on:
//! the scalar `volume` always equals the sum of the entry amounts, within
//! [`VOLUME_EPSILON`]. Every mutation re-derives the scalar from the map, so
//! the invariant holds exactly rather than drifting through rounding.
//!
//! Partial pours remove the *same fraction* from every entry, preserving
//! relative composition across arbitrarily many transfers. This proportional
//! removal is the core conservation algorithm.

use crate::fixed::{Fixed64, VOLUME_EPSILON};
use crate::id::ChemicalId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The shape of a vessel. Display/curriculum metadata; the conservation
/// model treats all kinds identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VesselKind {
    Beaker,
    ConicalFlask,
    TestTube,
    EvaporatingDish,
}

/// A point in workbench space. Owned by the rendering collaborator; the
/// simulation only reads it (heat-source proximity).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    pub x: Fixed64,
    pub y: Fixed64,
    pub z: Fixed64,
}

impl Position {
    pub const ORIGIN: Position = Position {
        x: Fixed64::ZERO,
        y: Fixed64::ZERO,
        z: Fixed64::ZERO,
    };

    pub fn new(x: Fixed64, y: Fixed64, z: Fixed64) -> Self {
        Position { x, y, z }
    }

    /// Euclidean distance, deterministic via fixed-point sqrt.
    pub fn distance_to(&self, other: &Position) -> Fixed64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        crate::fixed::sqrt64(dx * dx + dy * dy + dz * dz)
    }
}

/// A mutable container of chemical content entries.
///
/// `contents` uses a `BTreeMap` so entry iteration is deterministic by
/// [`ChemicalId`]; the sandbox matcher's first-match-wins policy depends on
/// a stable order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vessel {
    pub kind: VesselKind,
    pub capacity: Fixed64,
    volume: Fixed64,
    pub temperature: Fixed64,
    pub tilt: Fixed64,
    contents: BTreeMap<ChemicalId, Fixed64>,
    pub position: Position,
}

/// Default starting temperature for a fresh vessel (ambient).
pub const ROOM_TEMPERATURE: Fixed64 = Fixed64::from_bits(20i64 << 32);

impl Vessel {
    pub fn new(kind: VesselKind, capacity: Fixed64) -> Self {
        Self {
            kind,
            capacity,
            volume: Fixed64::ZERO,
            temperature: ROOM_TEMPERATURE,
            tilt: Fixed64::ZERO,
            contents: BTreeMap::new(),
            position: Position::ORIGIN,
        }
    }

    pub fn with_position(mut self, position: Position) -> Self {
        self.position = position;
        self
    }

    /// Current total volume. Always equals the sum of entry amounts.
    pub fn volume(&self) -> Fixed64 {
        self.volume
    }

    /// Whether the vessel holds no meaningful liquid.
    pub fn is_empty(&self) -> bool {
        self.volume < VOLUME_EPSILON
    }

    /// Free capacity remaining.
    pub fn free_capacity(&self) -> Fixed64 {
        (self.capacity - self.volume).max(Fixed64::ZERO)
    }

    /// Content entries in deterministic (chemical id) order.
    pub fn contents(&self) -> impl Iterator<Item = (ChemicalId, Fixed64)> + '_ {
        self.contents.iter().map(|(&c, &a)| (c, a))
    }

    /// Number of distinct content entries.
    pub fn entry_count(&self) -> usize {
        self.contents.len()
    }

    /// Amount of a specific chemical, zero if absent.
    pub fn amount_of(&self, chemical: ChemicalId) -> Fixed64 {
        self.contents.get(&chemical).copied().unwrap_or(Fixed64::ZERO)
    }

    /// Add up to `requested` of a chemical, clamped to free capacity.
    /// Over-capacity is not an error: the surplus is silently discarded.
    /// Returns the amount actually added (zero for a no-op).
    pub fn fill(&mut self, chemical: ChemicalId, requested: Fixed64) -> Fixed64 {
        let actual = requested.min(self.free_capacity());
        if actual <= Fixed64::ZERO {
            return Fixed64::ZERO;
        }
        *self.contents.entry(chemical).or_insert(Fixed64::ZERO) += actual;
        self.settle();
        actual
    }

    /// Remove up to `requested` total volume, taking the same fraction from
    /// every entry so relative composition is preserved. Returns the removed
    /// sub-amounts; near-zero residual entries are pruned.
    pub fn take(&mut self, requested: Fixed64) -> Vec<(ChemicalId, Fixed64)> {
        let actual = requested.min(self.volume);
        if actual <= Fixed64::ZERO || self.volume <= Fixed64::ZERO {
            return Vec::new();
        }
        let fraction = actual / self.volume;
        let mut removed = Vec::with_capacity(self.contents.len());
        for (&chemical, amount) in self.contents.iter_mut() {
            let part = *amount * fraction;
            *amount -= part;
            removed.push((chemical, part));
        }
        self.settle();
        removed
    }

    /// Merge a pre-clamped sub-amount into this vessel. Used by transfer,
    /// where the total was already clamped against free capacity.
    pub fn deposit(&mut self, chemical: ChemicalId, amount: Fixed64) {
        if amount <= Fixed64::ZERO {
            return;
        }
        *self.contents.entry(chemical).or_insert(Fixed64::ZERO) += amount;
        self.settle();
    }

    /// Replace the entire content set with `products`, splitting the current
    /// volume evenly across them. Equal-split is not per-species
    /// mass-conserving; it is a deliberate educational simplification and
    /// must stay that way.
    pub fn replace_contents(&mut self, products: &[ChemicalId]) {
        let total = self.volume;
        self.contents.clear();
        if products.is_empty() || total <= Fixed64::ZERO {
            self.settle();
            return;
        }
        let n = Fixed64::from_num(products.len() as u32);
        let share = total / n;
        let mut assigned = Fixed64::ZERO;
        for (i, &product) in products.iter().enumerate() {
            // Last product absorbs rounding so total volume is conserved.
            let amount = if i + 1 == products.len() {
                total - assigned
            } else {
                assigned += share;
                share
            };
            *self.contents.entry(product).or_insert(Fixed64::ZERO) += amount;
        }
        self.settle();
    }

    /// Remove one chemical entirely (evaporation-style transforms).
    pub fn remove_chemical(&mut self, chemical: ChemicalId) -> Fixed64 {
        let removed = self.contents.remove(&chemical).unwrap_or(Fixed64::ZERO);
        self.settle();
        removed
    }

    /// Empty the vessel and reset its tilt.
    pub fn clear(&mut self) {
        self.contents.clear();
        self.tilt = Fixed64::ZERO;
        self.settle();
    }

    /// Prune near-zero entries and re-derive the volume scalar from the map.
    fn settle(&mut self) {
        self.contents.retain(|_, amount| *amount >= VOLUME_EPSILON);
        self.volume = self
            .contents
            .values()
            .fold(Fixed64::ZERO, |acc, &a| acc + a);
        debug_assert!(self.volume <= self.capacity + VOLUME_EPSILON);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixed::f64_to_fixed64 as fx;

    fn beaker(capacity: f64) -> Vessel {
        Vessel::new(VesselKind::Beaker, fx(capacity))
    }

    const WATER: ChemicalId = ChemicalId(0);
    const SALT: ChemicalId = ChemicalId(1);

    // -----------------------------------------------------------------------
    // Fill
    // -----------------------------------------------------------------------

    #[test]
    fn fill_within_capacity() {
        let mut v = beaker(500.0);
        let added = v.fill(WATER, fx(200.0));
        assert_eq!(added, fx(200.0));
        assert_eq!(v.volume(), fx(200.0));
        assert_eq!(v.amount_of(WATER), fx(200.0));
    }

    #[test]
    fn fill_clamps_to_capacity() {
        let mut v = beaker(500.0);
        let added = v.fill(WATER, fx(1000.0));
        assert_eq!(added, fx(500.0));
        assert_eq!(v.volume(), fx(500.0));
        assert_eq!(v.entry_count(), 1);
        assert_eq!(v.amount_of(WATER), fx(500.0));
    }

    #[test]
    fn fill_full_vessel_is_noop() {
        let mut v = beaker(100.0);
        v.fill(WATER, fx(100.0));
        let added = v.fill(SALT, fx(10.0));
        assert_eq!(added, Fixed64::ZERO);
        assert_eq!(v.amount_of(SALT), Fixed64::ZERO);
    }

    #[test]
    fn fill_merges_existing_entry() {
        let mut v = beaker(500.0);
        v.fill(WATER, fx(100.0));
        v.fill(WATER, fx(50.0));
        assert_eq!(v.entry_count(), 1);
        assert_eq!(v.amount_of(WATER), fx(150.0));
    }

    #[test]
    fn fill_negative_request_is_noop() {
        let mut v = beaker(500.0);
        assert_eq!(v.fill(WATER, fx(-5.0)), Fixed64::ZERO);
        assert!(v.is_empty());
    }

    // -----------------------------------------------------------------------
    // Take (proportional removal)
    // -----------------------------------------------------------------------

    #[test]
    fn take_preserves_relative_composition() {
        let mut v = beaker(500.0);
        v.fill(WATER, fx(300.0));
        v.fill(SALT, fx(100.0));

        let removed = v.take(fx(200.0));
        let total_removed: Fixed64 = removed.iter().map(|(_, a)| *a).sum();
        assert!((total_removed - fx(200.0)).abs() < VOLUME_EPSILON);

        // 3:1 ratio preserved on both sides of the pour.
        let water_left = v.amount_of(WATER);
        let salt_left = v.amount_of(SALT);
        assert!((water_left - fx(150.0)).abs() < VOLUME_EPSILON);
        assert!((salt_left - fx(50.0)).abs() < VOLUME_EPSILON);
    }

    #[test]
    fn take_more_than_volume_clamps_and_empties() {
        let mut v = beaker(500.0);
        v.fill(WATER, fx(30.0));
        let removed = v.take(fx(50.0));
        let total: Fixed64 = removed.iter().map(|(_, a)| *a).sum();
        assert!((total - fx(30.0)).abs() < VOLUME_EPSILON);
        assert!(v.is_empty());
        assert_eq!(v.entry_count(), 0, "residuals pruned");
    }

    #[test]
    fn take_from_empty_is_noop() {
        let mut v = beaker(500.0);
        assert!(v.take(fx(10.0)).is_empty());
    }

    #[test]
    fn volume_always_equals_entry_sum() {
        let mut v = beaker(1000.0);
        v.fill(WATER, fx(333.3));
        v.fill(SALT, fx(111.1));
        v.take(fx(123.45));
        v.fill(WATER, fx(7.5));
        let sum: Fixed64 = v.contents().map(|(_, a)| a).sum();
        assert!((v.volume() - sum).abs() < VOLUME_EPSILON);
    }

    // -----------------------------------------------------------------------
    // Replace / remove / clear
    // -----------------------------------------------------------------------

    #[test]
    fn replace_contents_splits_volume_evenly() {
        let mut v = beaker(500.0);
        v.fill(WATER, fx(300.0));
        v.replace_contents(&[SALT, ChemicalId(2), ChemicalId(3)]);
        assert_eq!(v.entry_count(), 3);
        assert!((v.amount_of(SALT) - fx(100.0)).abs() < VOLUME_EPSILON);
        // Equal-split conserves total volume exactly.
        assert_eq!(v.volume(), fx(300.0));
    }

    #[test]
    fn replace_contents_duplicate_product_merges() {
        let mut v = beaker(500.0);
        v.fill(WATER, fx(100.0));
        v.replace_contents(&[SALT, SALT]);
        assert_eq!(v.entry_count(), 1);
        assert_eq!(v.volume(), fx(100.0));
    }

    #[test]
    fn remove_chemical_drops_entry() {
        let mut v = beaker(500.0);
        v.fill(WATER, fx(100.0));
        v.fill(SALT, fx(50.0));
        let removed = v.remove_chemical(WATER);
        assert_eq!(removed, fx(100.0));
        assert_eq!(v.volume(), fx(50.0));
    }

    #[test]
    fn clear_empties_and_resets_tilt() {
        let mut v = beaker(500.0);
        v.fill(WATER, fx(100.0));
        v.tilt = fx(45.0);
        v.clear();
        assert!(v.is_empty());
        assert_eq!(v.tilt, Fixed64::ZERO);
        assert_eq!(v.entry_count(), 0);
    }

    // -----------------------------------------------------------------------
    // Position
    // -----------------------------------------------------------------------

    #[test]
    fn distance_is_euclidean() {
        let a = Position::new(fx(0.0), fx(0.0), fx(0.0));
        let b = Position::new(fx(3.0), fx(4.0), fx(0.0));
        assert_eq!(a.distance_to(&b), fx(5.0));
    }
}
