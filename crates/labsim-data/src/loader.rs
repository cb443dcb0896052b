//! Resolution pipeline: reads data files, resolves name references, builds
//! the registry and curriculum.
//!
//! Provides format detection (RON/JSON/TOML), file discovery, and
//! deserialization helpers, plus [`load_lab_data`], which turns a data
//! directory into a frozen [`Registry`] and a [`Curriculum`].

use crate::schema::{
    ApparatusData, ChemicalData, ExperimentData, FamilyData, OutcomeData, RuleData, TransformData,
};
use labsim_curriculum::experiment::{
    Curriculum, ExperimentDefinition, ExperimentFamily, MaterialRound,
};
use labsim_curriculum::outcome::{Outcome, OutcomeKey, OutcomeTable, VesselTransform};
use labsim_core::id::{ApparatusId, ChemicalId, ExperimentId};
use labsim_core::registry::{CategoryPair, Registry, RegistryBuilder, Rgba};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ===========================================================================
// Errors
// ===========================================================================

/// Errors that can occur during data loading.
#[derive(Debug, thiserror::Error)]
pub enum DataLoadError {
    /// A required data file was not found in the given directory.
    #[error("required file '{file}' not found in {dir}")]
    MissingRequired { file: &'static str, dir: PathBuf },

    /// The file has an extension we don't support.
    #[error("unsupported format for file: {file}")]
    UnsupportedFormat { file: PathBuf },

    /// Two files with the same base name but different formats exist.
    #[error("conflicting formats: {a} and {b}")]
    ConflictingFormats { a: PathBuf, b: PathBuf },

    /// A deserialization error occurred.
    #[error("parse error in {file}: {detail}")]
    Parse { file: PathBuf, detail: String },

    /// A name reference could not be resolved.
    #[error("unresolved {expected_kind} reference '{name}' in {file}")]
    UnresolvedRef {
        file: PathBuf,
        name: String,
        expected_kind: &'static str,
    },

    /// A duplicate name was found.
    #[error("duplicate name '{name}' in {file}")]
    DuplicateName { file: PathBuf, name: String },

    /// The assembled registry failed cross-reference validation.
    #[error("registry validation failed: {detail}")]
    Registry { detail: String },

    /// An I/O error occurred.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

// ===========================================================================
// Format detection
// ===========================================================================

/// Supported data file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ron,
    Toml,
    Json,
}

/// Detect the format of a file based on its extension.
pub fn detect_format(path: &Path) -> Result<Format, DataLoadError> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("ron") => Ok(Format::Ron),
        Some("toml") => Ok(Format::Toml),
        Some("json") => Ok(Format::Json),
        _ => Err(DataLoadError::UnsupportedFormat {
            file: path.to_path_buf(),
        }),
    }
}

// ===========================================================================
// File discovery
// ===========================================================================

/// Scan a directory for a data file with the given base name (without extension).
///
/// Looks for `{base_name}.ron`, `{base_name}.toml`, and `{base_name}.json`.
/// Returns `Ok(None)` if no file is found, or `Err(ConflictingFormats)` if
/// multiple formats exist for the same base name.
pub fn find_data_file(dir: &Path, base_name: &str) -> Result<Option<PathBuf>, DataLoadError> {
    let extensions = ["ron", "toml", "json"];
    let mut found: Option<PathBuf> = None;

    for ext in &extensions {
        let candidate = dir.join(format!("{base_name}.{ext}"));
        if candidate.exists() {
            if let Some(ref existing) = found {
                return Err(DataLoadError::ConflictingFormats {
                    a: existing.clone(),
                    b: candidate,
                });
            }
            found = Some(candidate);
        }
    }

    Ok(found)
}

/// Like [`find_data_file`], but returns an error if no file is found.
pub fn require_data_file(dir: &Path, base_name: &str) -> Result<PathBuf, DataLoadError> {
    find_data_file(dir, base_name)?.ok_or_else(|| DataLoadError::MissingRequired {
        file: Box::leak(base_name.to_string().into_boxed_str()),
        dir: dir.to_path_buf(),
    })
}

// ===========================================================================
// Deserialization
// ===========================================================================

/// Read a file and deserialize it according to its format (detected from extension).
pub fn deserialize_file<T: DeserializeOwned>(path: &Path) -> Result<T, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Json => serde_json::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Toml => toml::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
    }
}

/// Deserialize a list from a file. For TOML files, extracts the array at the
/// given `toml_key` from a top-level table. For RON and JSON, deserializes
/// directly as `Vec<T>`.
pub fn deserialize_list<T: DeserializeOwned>(
    path: &Path,
    toml_key: &str,
) -> Result<Vec<T>, DataLoadError> {
    let format = detect_format(path)?;
    let content = std::fs::read_to_string(path)?;

    match format {
        Format::Ron => ron::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Json => serde_json::from_str(&content).map_err(|e| DataLoadError::Parse {
            file: path.to_path_buf(),
            detail: e.to_string(),
        }),
        Format::Toml => {
            let table: toml::Value =
                toml::from_str(&content).map_err(|e| DataLoadError::Parse {
                    file: path.to_path_buf(),
                    detail: e.to_string(),
                })?;
            let array = table
                .get(toml_key)
                .ok_or_else(|| DataLoadError::Parse {
                    file: path.to_path_buf(),
                    detail: format!("missing key '{toml_key}' in TOML file"),
                })?
                .clone();
            array
                .try_into()
                .map_err(|e: toml::de::Error| DataLoadError::Parse {
                    file: path.to_path_buf(),
                    detail: e.to_string(),
                })
        }
    }
}

// ===========================================================================
// Name resolution helpers
// ===========================================================================

/// Look up a name in a map, returning an `UnresolvedRef` error if not found.
pub fn resolve_name<'a, V>(
    map: &'a HashMap<String, V>,
    name: &str,
    file: &Path,
    expected_kind: &'static str,
) -> Result<&'a V, DataLoadError> {
    map.get(name).ok_or_else(|| DataLoadError::UnresolvedRef {
        file: file.to_path_buf(),
        name: name.to_string(),
        expected_kind,
    })
}

/// Check whether a name already exists in a map, returning a `DuplicateName`
/// error if so.
pub fn check_duplicate<V>(
    map: &HashMap<String, V>,
    name: &str,
    file: &Path,
) -> Result<(), DataLoadError> {
    if map.contains_key(name) {
        Err(DataLoadError::DuplicateName {
            file: file.to_path_buf(),
            name: name.to_string(),
        })
    } else {
        Ok(())
    }
}

// ===========================================================================
// The loading pipeline
// ===========================================================================

/// Everything a data directory resolves to.
pub struct LabData {
    pub registry: Registry,
    pub curriculum: Curriculum,
}

/// Load a data directory into a frozen registry and curriculum.
///
/// `chemicals` is required; `rules`, `apparatus`, and `experiments` are
/// optional. Each file may be RON, TOML, or JSON. Apparatus prerequisites
/// must be declared before the apparatus that references them; experiment
/// ids are assigned from file order.
pub fn load_lab_data(dir: &Path) -> Result<LabData, DataLoadError> {
    let mut builder = RegistryBuilder::new();

    // Chemicals (required).
    let chemicals_path = require_data_file(dir, "chemicals")?;
    let chemicals: Vec<ChemicalData> = deserialize_list(&chemicals_path, "chemicals")?;
    let mut chemical_ids: HashMap<String, ChemicalId> = HashMap::new();
    for data in &chemicals {
        check_duplicate(&chemical_ids, &data.name, &chemicals_path)?;
        let [r, g, b, a] = data.colour;
        let id = builder.register_chemical(
            &data.name,
            data.formula.as_deref(),
            Rgba { r, g, b, a },
            data.category,
        );
        chemical_ids.insert(data.name.clone(), id);
    }

    // Rules (optional).
    if let Some(path) = find_data_file(dir, "rules")? {
        let rules: Vec<RuleData> = deserialize_list(&path, "rules")?;
        for data in &rules {
            let products = data
                .products
                .iter()
                .map(|name| resolve_name(&chemical_ids, name, &path, "chemical").copied())
                .collect::<Result<Vec<_>, _>>()?;
            builder.register_rule(
                &data.name,
                CategoryPair::new(data.pair.0, data.pair.1),
                products,
                data.effects.clone(),
                data.exothermic,
            );
        }
    }

    // Apparatus (optional).
    let mut apparatus_ids: HashMap<String, ApparatusId> = HashMap::new();
    if let Some(path) = find_data_file(dir, "apparatus")? {
        let apparatus: Vec<ApparatusData> = deserialize_list(&path, "apparatus")?;
        for data in &apparatus {
            check_duplicate(&apparatus_ids, &data.name, &path)?;
            let requires = match &data.requires {
                Some(name) => Some(*resolve_name(&apparatus_ids, name, &path, "apparatus")?),
                None => None,
            };
            let id = builder.register_apparatus(&data.name, requires);
            apparatus_ids.insert(data.name.clone(), id);
        }
    }

    let registry = builder.build().map_err(|e| DataLoadError::Registry {
        detail: e.to_string(),
    })?;

    // Experiments (optional).
    let mut curriculum = Curriculum::new();
    if let Some(path) = find_data_file(dir, "experiments")? {
        let experiments: Vec<ExperimentData> = deserialize_list(&path, "experiments")?;
        for (index, data) in experiments.iter().enumerate() {
            let definition = resolve_experiment(
                ExperimentId(index as u32),
                data,
                &chemical_ids,
                &apparatus_ids,
                &path,
            )?;
            // Sequential ids cannot collide; surface it as a parse error
            // anyway rather than dropping the definition.
            curriculum
                .register(definition)
                .map_err(|e| DataLoadError::Parse {
                    file: path.clone(),
                    detail: e.to_string(),
                })?;
        }
    }

    Ok(LabData {
        registry,
        curriculum,
    })
}

fn resolve_experiment(
    id: ExperimentId,
    data: &ExperimentData,
    chemical_ids: &HashMap<String, ChemicalId>,
    apparatus_ids: &HashMap<String, ApparatusId>,
    path: &Path,
) -> Result<ExperimentDefinition, DataLoadError> {
    let chemical = |name: &str| resolve_name(chemical_ids, name, path, "chemical").copied();
    let apparatus = |name: &str| resolve_name(apparatus_ids, name, path, "apparatus").copied();

    let family = match &data.family {
        FamilyData::Comparison => ExperimentFamily::Comparison,
        FamilyData::MaterialStudy { rounds } => {
            let mut resolved = [MaterialRound {
                chemical: ChemicalId(0),
                apparatus: ApparatusId(0),
            }; 3];
            for (slot, round) in resolved.iter_mut().zip(rounds) {
                *slot = MaterialRound {
                    chemical: chemical(&round.chemical)?,
                    apparatus: apparatus(&round.apparatus)?,
                };
            }
            ExperimentFamily::MaterialStudy { rounds: resolved }
        }
        FamilyData::Titration { indicator, shifted } => ExperimentFamily::Titration {
            indicator: chemical(indicator)?,
            shifted: chemical(shifted)?,
        },
    };

    let mut outcomes = OutcomeTable::new();
    for outcome in &data.outcomes {
        let (key, resolved) = resolve_outcome(outcome, &chemical)?;
        outcomes.insert(key, resolved);
    }

    Ok(ExperimentDefinition {
        id,
        name: data.name.clone(),
        family,
        apparatus: data
            .apparatus
            .iter()
            .map(|n| apparatus(n))
            .collect::<Result<Vec<_>, _>>()?,
        chemicals: data
            .chemicals
            .iter()
            .map(|n| chemical(n))
            .collect::<Result<Vec<_>, _>>()?,
        outcomes,
        auto_evaporate_after_heat: data.auto_evaporate_after_heat,
    })
}

fn resolve_outcome(
    data: &OutcomeData,
    chemical: &impl Fn(&str) -> Result<ChemicalId, DataLoadError>,
) -> Result<(OutcomeKey, Outcome), DataLoadError> {
    let key = OutcomeKey::new(
        data.chemicals
            .iter()
            .map(|n| chemical(n))
            .collect::<Result<Vec<_>, _>>()?,
        data.actions.iter().copied(),
    );
    let transform = match &data.transform {
        Some(TransformData::ReplaceContents(names)) => Some(VesselTransform::ReplaceContents(
            names
                .iter()
                .map(|n| chemical(n))
                .collect::<Result<Vec<_>, _>>()?,
        )),
        Some(TransformData::RemoveChemical(name)) => {
            Some(VesselTransform::RemoveChemical(chemical(name)?))
        }
        Some(TransformData::Clear) => Some(VesselTransform::Clear),
        None => None,
    };
    Ok((
        key,
        Outcome {
            phase: data.phase,
            observation: data.observation.clone(),
            explanation: data.explanation.clone(),
            success: data.success,
            transform,
        },
    ))
}

// ===========================================================================
// Tests
// ===========================================================================
