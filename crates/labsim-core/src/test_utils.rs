//! Shared helpers for tests across the workspace.
//!
//! Available to other crates via the `test-utils` cargo feature.

use crate::fixed::{Fixed64, f64_to_fixed64};
use crate::id::{ApparatusId, ChemicalId, VesselId};
use crate::reaction::EffectKind;
use crate::registry::{Category, CategoryPair, Registry, RegistryBuilder, Rgba};
use crate::vessel::{Vessel, VesselKind};

/// Ids of the chemicals in [`demo_registry`].
#[derive(Debug, Clone, Copy)]
pub struct DemoChemicals {
    pub water: ChemicalId,
    pub hcl: ChemicalId,
    pub naoh: ChemicalId,
    pub nacl: ChemicalId,
    pub zinc: ChemicalId,
    pub zinc_chloride: ChemicalId,
    pub phenolphthalein: ChemicalId,
    pub phenolphthalein_pink: ChemicalId,
    pub sand: ChemicalId,
}

/// Ids of the apparatus in [`demo_registry_full`].
#[derive(Debug, Clone, Copy)]
pub struct DemoApparatus {
    pub beaker: ApparatusId,
    pub funnel: ApparatusId,
    pub burner: ApparatusId,
    pub evaporating_dish: ApparatusId,
}

/// A small registry covering every category and three non-overlapping rules.
pub fn demo_registry() -> (Registry, DemoChemicals) {
    let (registry, chemicals, _) = demo_registry_full();
    (registry, chemicals)
}

/// [`demo_registry`] plus a small apparatus set (funnel requires beaker).
pub fn demo_registry_full() -> (Registry, DemoChemicals, DemoApparatus) {
    let mut b = RegistryBuilder::new();
    let water = b.register_chemical("water", Some("H2O"), Rgba::CLEAR, Category::Water);
    let hcl = b.register_chemical("hcl", Some("HCl"), Rgba::CLEAR, Category::Acid);
    let naoh = b.register_chemical("naoh", Some("NaOH"), Rgba::CLEAR, Category::Base);
    let nacl = b.register_chemical(
        "nacl",
        Some("NaCl"),
        Rgba::opaque(245, 245, 245),
        Category::Salt,
    );
    let zinc = b.register_chemical("zinc", Some("Zn"), Rgba::opaque(160, 165, 170), Category::Metal);
    let zinc_chloride = b.register_chemical(
        "zinc_chloride",
        Some("ZnCl2"),
        Rgba::opaque(235, 235, 235),
        Category::Salt,
    );
    let phenolphthalein =
        b.register_chemical("phenolphthalein", None, Rgba::CLEAR, Category::Indicator);
    let phenolphthalein_pink = b.register_chemical(
        "phenolphthalein_pink",
        None,
        Rgba::opaque(255, 105, 180),
        Category::Indicator,
    );
    let sand = b.register_chemical("sand", None, Rgba::opaque(194, 178, 128), Category::Neutral);

    b.register_rule(
        "neutralization",
        CategoryPair::new(Category::Acid, Category::Base),
        vec![nacl, water],
        vec![EffectKind::Bubbles, EffectKind::Glow],
        true,
    );
    b.register_rule(
        "metal_displacement",
        CategoryPair::new(Category::Acid, Category::Metal),
        vec![zinc_chloride],
        vec![EffectKind::Bubbles],
        false,
    );
    b.register_rule(
        "indicator_shift",
        CategoryPair::new(Category::Base, Category::Indicator),
        vec![phenolphthalein_pink],
        vec![EffectKind::ColourShift],
        false,
    );

    let beaker = b.register_apparatus("beaker", None);
    let funnel = b.register_apparatus("funnel", Some(beaker));
    let burner = b.register_apparatus("burner", None);
    let evaporating_dish = b.register_apparatus("evaporating_dish", None);

    let registry = match b.build() {
        Ok(r) => r,
        Err(e) => panic!("demo registry must build: {e}"),
    };
    (
        registry,
        DemoChemicals {
            water,
            hcl,
            naoh,
            nacl,
            zinc,
            zinc_chloride,
            phenolphthalein,
            phenolphthalein_pink,
            sand,
        },
        DemoApparatus {
            beaker,
            funnel,
            burner,
            evaporating_dish,
        },
    )
}

/// Create a beaker with the given capacity.
pub fn make_beaker(capacity: f64) -> Vessel {
    Vessel::new(VesselKind::Beaker, f64_to_fixed64(capacity))
}

/// Add a beaker to an engine and pre-fill it.
pub fn add_filled_beaker(
    engine: &mut crate::engine::LabEngine,
    capacity: f64,
    contents: &[(ChemicalId, f64)],
) -> VesselId {
    let id = engine.add_vessel(make_beaker(capacity));
    for &(chemical, amount) in contents {
        engine.fill_vessel(id, chemical, f64_to_fixed64(amount));
    }
    id
}

/// Total volume across all vessels in an engine (conservation checks).
pub fn total_volume(engine: &crate::engine::LabEngine) -> Fixed64 {
    engine
        .vessel_ids()
        .filter_map(|id| engine.vessel(id))
        .fold(Fixed64::ZERO, |acc, v| acc + v.volume())
}
