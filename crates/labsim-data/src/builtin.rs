//! The built-in lab catalog.
//!
//! Ships a complete registry (chemicals across every category, the sandbox
//! rule set, the workbench apparatus) and the three guided experiments, so
//! clients can run without any data directory. Data files loaded through
//! [`crate::loader`] replace this wholesale; the two are never merged.

use labsim_core::id::{Action, ApparatusId, ChemicalId, ExperimentId};
use labsim_core::reaction::EffectKind;
use labsim_core::registry::{Category, CategoryPair, Registry, RegistryBuilder, RegistryError, Rgba};
use labsim_curriculum::experiment::{
    Curriculum, CurriculumError, ExperimentDefinition, ExperimentFamily, MaterialRound,
};
use labsim_curriculum::outcome::{Outcome, OutcomeKey, OutcomeTable, VesselTransform};

/// Experiment ids in the built-in curriculum.
pub const SALT_SAND_SEPARATION: ExperimentId = ExperimentId(0);
pub const HEATING_THREE_MATERIALS: ExperimentId = ExperimentId(1);
pub const ACID_BASE_TITRATION: ExperimentId = ExperimentId(2);

/// Errors raised while assembling the built-in catalog.
#[derive(Debug, thiserror::Error)]
pub enum BuiltinError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
}

/// The assembled built-in content.
pub struct BuiltinCatalog {
    pub registry: Registry,
    pub curriculum: Curriculum,
}

/// Ids of the built-in chemicals, for programmatic access.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinChemicals {
    pub water: ChemicalId,
    pub ice: ChemicalId,
    pub hydrochloric_acid: ChemicalId,
    pub sulfuric_acid: ChemicalId,
    pub sodium_hydroxide: ChemicalId,
    pub calcium_hydroxide: ChemicalId,
    pub zinc: ChemicalId,
    pub iron: ChemicalId,
    pub sodium_chloride: ChemicalId,
    pub zinc_chloride: ChemicalId,
    pub copper_sulfate: ChemicalId,
    pub copper_hydroxide: ChemicalId,
    pub rust: ChemicalId,
    pub phenolphthalein: ChemicalId,
    pub phenolphthalein_pink: ChemicalId,
    pub sand: ChemicalId,
}

/// Ids of the built-in apparatus.
#[derive(Debug, Clone, Copy)]
pub struct BuiltinApparatus {
    pub beaker: ApparatusId,
    pub funnel: ApparatusId,
    pub filter_paper: ApparatusId,
    pub burner: ApparatusId,
    pub evaporating_dish: ApparatusId,
    pub glass_rod: ApparatusId,
}

/// Build the built-in catalog.
pub fn builtin_catalog() -> Result<BuiltinCatalog, BuiltinError> {
    let (registry, chemicals, apparatus) = builtin_registry()?;
    let curriculum = builtin_curriculum(&chemicals, &apparatus)?;
    Ok(BuiltinCatalog {
        registry,
        curriculum,
    })
}

/// Build just the registry, with the id bundles for direct access.
pub fn builtin_registry()
-> Result<(Registry, BuiltinChemicals, BuiltinApparatus), BuiltinError> {
    let mut b = RegistryBuilder::new();

    let water = b.register_chemical("water", Some("H2O"), Rgba::CLEAR, Category::Water);
    let ice = b.register_chemical(
        "ice",
        Some("H2O"),
        Rgba::opaque(220, 235, 245),
        Category::Neutral,
    );
    let hydrochloric_acid = b.register_chemical(
        "hydrochloric_acid",
        Some("HCl"),
        Rgba::CLEAR,
        Category::Acid,
    );
    let sulfuric_acid = b.register_chemical(
        "sulfuric_acid",
        Some("H2SO4"),
        Rgba::CLEAR,
        Category::Acid,
    );
    let sodium_hydroxide = b.register_chemical(
        "sodium_hydroxide",
        Some("NaOH"),
        Rgba::CLEAR,
        Category::Base,
    );
    let calcium_hydroxide = b.register_chemical(
        "calcium_hydroxide",
        Some("Ca(OH)2"),
        Rgba::opaque(240, 240, 235),
        Category::Base,
    );
    let zinc = b.register_chemical(
        "zinc",
        Some("Zn"),
        Rgba::opaque(160, 165, 170),
        Category::Metal,
    );
    let iron = b.register_chemical(
        "iron",
        Some("Fe"),
        Rgba::opaque(120, 120, 125),
        Category::Metal,
    );
    let sodium_chloride = b.register_chemical(
        "sodium_chloride",
        Some("NaCl"),
        Rgba::opaque(245, 245, 245),
        Category::Salt,
    );
    let zinc_chloride = b.register_chemical(
        "zinc_chloride",
        Some("ZnCl2"),
        Rgba::opaque(235, 235, 235),
        Category::Salt,
    );
    let copper_sulfate = b.register_chemical(
        "copper_sulfate",
        Some("CuSO4"),
        Rgba::opaque(60, 120, 200),
        Category::Salt,
    );
    let copper_hydroxide = b.register_chemical(
        "copper_hydroxide",
        Some("Cu(OH)2"),
        Rgba::opaque(110, 180, 200),
        Category::Neutral,
    );
    let rust = b.register_chemical(
        "rust",
        Some("Fe2O3"),
        Rgba::opaque(160, 80, 40),
        Category::Neutral,
    );
    let phenolphthalein = b.register_chemical("phenolphthalein", None, Rgba::CLEAR, Category::Indicator);
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
        vec![sodium_chloride, water],
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
    b.register_rule(
        "precipitation",
        CategoryPair::new(Category::Base, Category::Salt),
        vec![copper_hydroxide, water],
        vec![EffectKind::Precipitate],
        false,
    );
    b.register_rule(
        "oxidation",
        CategoryPair::new(Category::Metal, Category::Water),
        vec![rust, water],
        vec![EffectKind::Precipitate],
        false,
    );
    b.register_rule(
        "dissolution",
        CategoryPair::new(Category::Salt, Category::Water),
        vec![sodium_chloride, water],
        vec![],
        false,
    );

    let beaker = b.register_apparatus("beaker", None);
    let funnel = b.register_apparatus("funnel", Some(beaker));
    let filter_paper = b.register_apparatus("filter_paper", Some(funnel));
    let burner = b.register_apparatus("burner", None);
    let evaporating_dish = b.register_apparatus("evaporating_dish", Some(burner));
    let glass_rod = b.register_apparatus("glass_rod", None);

    let registry = b.build()?;
    Ok((
        registry,
        BuiltinChemicals {
            water,
            ice,
            hydrochloric_acid,
            sulfuric_acid,
            sodium_hydroxide,
            calcium_hydroxide,
            zinc,
            iron,
            sodium_chloride,
            zinc_chloride,
            copper_sulfate,
            copper_hydroxide,
            rust,
            phenolphthalein,
            phenolphthalein_pink,
            sand,
        },
        BuiltinApparatus {
            beaker,
            funnel,
            filter_paper,
            burner,
            evaporating_dish,
            glass_rod,
        },
    ))
}

/// Build the three guided experiments against the built-in registry ids.
pub fn builtin_curriculum(
    chemicals: &BuiltinChemicals,
    apparatus: &BuiltinApparatus,
) -> Result<Curriculum, CurriculumError> {
    let mut curriculum = Curriculum::new();
    curriculum.register(salt_sand_separation(chemicals, apparatus))?;
    curriculum.register(heating_three_materials(chemicals, apparatus))?;
    curriculum.register(acid_base_titration(chemicals, apparatus))?;
    Ok(curriculum)
}

/// Two-phase comparison: filter the sand out, then evaporate the water off.
fn salt_sand_separation(
    chemicals: &BuiltinChemicals,
    apparatus: &BuiltinApparatus,
) -> ExperimentDefinition {
    let mixture = [chemicals.sodium_chloride, chemicals.sand, chemicals.water];
    let brine = [chemicals.sodium_chloride, chemicals.water];

    let mut outcomes = OutcomeTable::new();
    outcomes.insert(
        OutcomeKey::new(mixture, [Action::Filter]),
        Outcome {
            phase: 0,
            observation: "The sand stays behind on the filter paper.".to_string(),
            explanation: "Sand grains are too large to pass through the paper; \
                          the dissolved salt passes with the water."
                .to_string(),
            success: true,
            transform: Some(VesselTransform::RemoveChemical(chemicals.sand)),
        },
    );
    outcomes.insert(
        OutcomeKey::new(brine, [Action::Evaporate]),
        Outcome {
            phase: 1,
            observation: "White salt crystals remain in the dish.".to_string(),
            explanation: "Heating drives the water off as vapour; the dissolved \
                          salt is left behind."
                .to_string(),
            success: true,
            transform: Some(VesselTransform::RemoveChemical(chemicals.water)),
        },
    );
    outcomes.insert(
        OutcomeKey::new(mixture, [Action::Stir]),
        Outcome {
            phase: 0,
            observation: "The salt dissolves; the sand swirls and settles.".to_string(),
            explanation: "Stirring speeds up dissolving but cannot separate the \
                          mixture."
                .to_string(),
            success: false,
            transform: None,
        },
    );
    outcomes.insert(
        OutcomeKey::chemicals_only(mixture),
        Outcome {
            phase: 0,
            observation: "A cloudy mixture of salt, sand, and water.".to_string(),
            explanation: "Nothing separates on its own; try an action.".to_string(),
            success: false,
            transform: None,
        },
    );

    ExperimentDefinition {
        id: SALT_SAND_SEPARATION,
        name: "salt_sand_separation".to_string(),
        family: ExperimentFamily::Comparison,
        apparatus: vec![apparatus.beaker, apparatus.funnel, apparatus.filter_paper],
        chemicals: mixture.to_vec(),
        outcomes,
        auto_evaporate_after_heat: true,
    }
}

/// Three-round material study: ice melts, sand is unchanged, salt crackles.
fn heating_three_materials(
    chemicals: &BuiltinChemicals,
    apparatus: &BuiltinApparatus,
) -> ExperimentDefinition {
    let mut outcomes = OutcomeTable::new();
    outcomes.insert(
        OutcomeKey::new([chemicals.ice], [Action::Heat]),
        Outcome {
            phase: 0,
            observation: "The ice melts into clear water.".to_string(),
            explanation: "Heating past the melting point turns the solid into a \
                          liquid; it is still the same substance."
                .to_string(),
            success: true,
            transform: Some(VesselTransform::ReplaceContents(vec![chemicals.water])),
        },
    );
    outcomes.insert(
        OutcomeKey::new([chemicals.sand], [Action::Heat]),
        Outcome {
            phase: 1,
            observation: "The sand gets hot but does not change.".to_string(),
            explanation: "Sand melts far above the burner's temperature.".to_string(),
            success: true,
            transform: None,
        },
    );
    outcomes.insert(
        OutcomeKey::new([chemicals.sodium_chloride], [Action::Heat]),
        Outcome {
            phase: 2,
            observation: "The salt crackles and jumps in the dish.".to_string(),
            explanation: "Trapped moisture boils out of the crystals.".to_string(),
            success: true,
            transform: None,
        },
    );

    ExperimentDefinition {
        id: HEATING_THREE_MATERIALS,
        name: "heating_three_materials".to_string(),
        family: ExperimentFamily::MaterialStudy {
            rounds: [
                MaterialRound {
                    chemical: chemicals.ice,
                    apparatus: apparatus.burner,
                },
                MaterialRound {
                    chemical: chemicals.sand,
                    apparatus: apparatus.burner,
                },
                MaterialRound {
                    chemical: chemicals.sodium_chloride,
                    apparatus: apparatus.evaporating_dish,
                },
            ],
        },
        apparatus: vec![apparatus.burner, apparatus.evaporating_dish],
        chemicals: vec![chemicals.ice, chemicals.sand, chemicals.sodium_chloride],
        outcomes,
        auto_evaporate_after_heat: false,
    }
}

/// Drop-counted titration; completion belongs to the drop counter, so the
/// outcome table only carries flavour text.
fn acid_base_titration(
    chemicals: &BuiltinChemicals,
    apparatus: &BuiltinApparatus,
) -> ExperimentDefinition {
    let mut outcomes = OutcomeTable::new();
    outcomes.insert(
        OutcomeKey::new(
            [chemicals.sodium_hydroxide, chemicals.phenolphthalein],
            [Action::Stir],
        ),
        Outcome {
            phase: 0,
            observation: "The solution stays colourless.".to_string(),
            explanation: "Phenolphthalein shows no colour until enough titrant \
                          is added; add it drop by drop."
                .to_string(),
            success: false,
            transform: None,
        },
    );

    ExperimentDefinition {
        id: ACID_BASE_TITRATION,
        name: "acid_base_titration".to_string(),
        family: ExperimentFamily::Titration {
            indicator: chemicals.phenolphthalein,
            shifted: chemicals.phenolphthalein_pink,
        },
        apparatus: vec![apparatus.beaker, apparatus.glass_rod],
        chemicals: vec![
            chemicals.sodium_hydroxide,
            chemicals.phenolphthalein,
            chemicals.hydrochloric_acid,
        ],
        outcomes,
        auto_evaporate_after_heat: false,
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_builds() {
        let catalog = builtin_catalog().unwrap();
        assert_eq!(catalog.registry.chemical_count(), 16);
        assert_eq!(catalog.registry.rule_count(), 6);
        assert_eq!(catalog.registry.apparatus_count(), 6);
        assert_eq!(catalog.curriculum.experiment_count(), 3);
    }

    #[test]
    fn every_category_is_covered() {
        let (registry, _, _) = builtin_registry().unwrap();
        for category in [
            Category::Acid,
            Category::Base,
            Category::Metal,
            Category::Salt,
            Category::Water,
            Category::Indicator,
            Category::Neutral,
        ] {
            let covered = (0..registry.chemical_count() as u32)
                .filter_map(|i| registry.chemical(ChemicalId(i)))
                .any(|c| c.category == category);
            assert!(covered, "no chemical in category {category:?}");
        }
    }

    #[test]
    fn rule_pairs_are_distinct() {
        let (registry, _, _) = builtin_registry().unwrap();
        let pairs: Vec<CategoryPair> = registry.rules().map(|(_, r)| r.pair).collect();
        for (i, a) in pairs.iter().enumerate() {
            for b in &pairs[i + 1..] {
                assert_ne!(a, b, "overlapping category pair");
            }
        }
    }

    #[test]
    fn apparatus_prerequisite_chain() {
        let (registry, _, apparatus) = builtin_registry().unwrap();
        assert_eq!(
            registry.apparatus(apparatus.funnel).unwrap().requires,
            Some(apparatus.beaker)
        );
        assert_eq!(
            registry.apparatus(apparatus.filter_paper).unwrap().requires,
            Some(apparatus.funnel)
        );
        assert_eq!(registry.apparatus(apparatus.beaker).unwrap().requires, None);
    }

    #[test]
    fn salt_sand_phase_keys_resolve() {
        let (_, chemicals, apparatus) = builtin_registry().unwrap();
        let def = salt_sand_separation(&chemicals, &apparatus);

        let mixture = [chemicals.sodium_chloride, chemicals.sand, chemicals.water]
            .into_iter()
            .collect();
        let hit = def.outcomes.lookup(&mixture, &[Action::Filter]).unwrap();
        assert_eq!(hit.phase, 0);
        assert!(hit.success);

        // Without an action the bare-mixture key answers, unsuccessfully.
        let idle = def.outcomes.lookup(&mixture, &[]).unwrap();
        assert!(!idle.success);
    }

    #[test]
    fn material_rounds_follow_the_outcome_phases() {
        let (_, chemicals, apparatus) = builtin_registry().unwrap();
        let def = heating_three_materials(&chemicals, &apparatus);
        let ExperimentFamily::MaterialStudy { rounds } = &def.family else {
            panic!("expected a material study");
        };
        for (phase, round) in rounds.iter().enumerate() {
            let key = [round.chemical].into_iter().collect();
            let hit = def.outcomes.lookup(&key, &[Action::Heat]).unwrap();
            assert_eq!(hit.phase as usize, phase);
        }
    }

    #[test]
    fn titration_signature_never_succeeds() {
        let (_, chemicals, apparatus) = builtin_registry().unwrap();
        let def = acid_base_titration(&chemicals, &apparatus);
        let session = [chemicals.sodium_hydroxide, chemicals.phenolphthalein]
            .into_iter()
            .collect();
        let hit = def.outcomes.lookup(&session, &[Action::Stir]).unwrap();
        assert!(!hit.success);
    }
}
