use crate::id::{ApparatusId, ChemicalId, RuleId};
use crate::reaction::EffectKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Chemical category used for pairwise reaction matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Acid,
    Base,
    Metal,
    Salt,
    Water,
    Indicator,
    Neutral,
}

/// Display colour. Carried for rendering collaborators only; never consulted
/// by the simulation except for the titration interpolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const CLEAR: Rgba = Rgba {
        r: 255,
        g: 255,
        b: 255,
        a: 40,
    };

    pub const fn opaque(r: u8, g: u8, b: u8) -> Rgba {
        Rgba { r, g, b, a: 255 }
    }
}

/// A chemical entity definition. Immutable once the registry is built;
/// shared by reference.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChemicalDef {
    pub name: String,
    pub formula: Option<String>,
    pub colour: Rgba,
    pub category: Category,
}

/// An unordered pair of chemical categories. Stored normalized so that
/// `(Acid, Base)` and `(Base, Acid)` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CategoryPair(Category, Category);

impl CategoryPair {
    pub fn new(a: Category, b: Category) -> Self {
        if a <= b { CategoryPair(a, b) } else { CategoryPair(b, a) }
    }

    /// Order-independent match against two categories.
    pub fn matches(&self, a: Category, b: Category) -> bool {
        *self == CategoryPair::new(a, b)
    }
}

/// A declarative reaction rule: unordered category pair in, product
/// chemicals and effect tags out.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionRuleDef {
    pub name: String,
    pub pair: CategoryPair,
    pub products: Vec<ChemicalId>,
    pub effects: Vec<EffectKind>,
    pub exothermic: bool,
}

/// A piece of apparatus. `requires` is an advisory prerequisite: the named
/// apparatus should already be placed, but placement never fails on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApparatusDef {
    pub name: String,
    pub requires: Option<ApparatusId>,
}

/// Builder for constructing an immutable [`Registry`].
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    chemicals: Vec<ChemicalDef>,
    chemical_name_to_id: HashMap<String, ChemicalId>,
    rules: Vec<ReactionRuleDef>,
    apparatus: Vec<ApparatusDef>,
    apparatus_name_to_id: HashMap<String, ApparatusId>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a chemical. Returns its ID.
    pub fn register_chemical(
        &mut self,
        name: &str,
        formula: Option<&str>,
        colour: Rgba,
        category: Category,
    ) -> ChemicalId {
        let id = ChemicalId(self.chemicals.len() as u32);
        self.chemicals.push(ChemicalDef {
            name: name.to_string(),
            formula: formula.map(str::to_string),
            colour,
            category,
        });
        self.chemical_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Register a reaction rule. Returns its ID.
    pub fn register_rule(
        &mut self,
        name: &str,
        pair: CategoryPair,
        products: Vec<ChemicalId>,
        effects: Vec<EffectKind>,
        exothermic: bool,
    ) -> RuleId {
        let id = RuleId(self.rules.len() as u32);
        self.rules.push(ReactionRuleDef {
            name: name.to_string(),
            pair,
            products,
            effects,
            exothermic,
        });
        id
    }

    /// Register an apparatus with an optional advisory prerequisite.
    pub fn register_apparatus(&mut self, name: &str, requires: Option<ApparatusId>) -> ApparatusId {
        let id = ApparatusId(self.apparatus.len() as u32);
        self.apparatus.push(ApparatusDef {
            name: name.to_string(),
            requires,
        });
        self.apparatus_name_to_id.insert(name.to_string(), id);
        id
    }

    /// Lookup a chemical ID by name (registration phase).
    pub fn chemical_id(&self, name: &str) -> Option<ChemicalId> {
        self.chemical_name_to_id.get(name).copied()
    }

    /// Finalize and build the immutable registry. Validates that chemical
    /// and apparatus names are unique and that every rule product and
    /// apparatus prerequisite refers to a registered entry.
    pub fn build(self) -> Result<Registry, RegistryError> {
        let mut seen = std::collections::HashSet::new();
        for chemical in &self.chemicals {
            if !seen.insert(chemical.name.as_str()) {
                return Err(RegistryError::DuplicateName(chemical.name.clone()));
            }
        }
        seen.clear();
        for apparatus in &self.apparatus {
            if !seen.insert(apparatus.name.as_str()) {
                return Err(RegistryError::DuplicateName(apparatus.name.clone()));
            }
        }
        for rule in &self.rules {
            for product in &rule.products {
                if product.0 as usize >= self.chemicals.len() {
                    return Err(RegistryError::InvalidChemicalRef(*product));
                }
            }
            if rule.products.is_empty() {
                return Err(RegistryError::EmptyProducts(rule.name.clone()));
            }
        }
        for apparatus in &self.apparatus {
            if let Some(req) = apparatus.requires
                && req.0 as usize >= self.apparatus.len()
            {
                return Err(RegistryError::InvalidApparatusRef(req));
            }
        }

        Ok(Registry {
            chemicals: self.chemicals,
            chemical_name_to_id: self.chemical_name_to_id,
            rules: self.rules,
            apparatus: self.apparatus,
            apparatus_name_to_id: self.apparatus_name_to_id,
        })
    }
}

/// Immutable registry of chemicals, reaction rules, and apparatus.
/// Frozen after build(). Thread-safe to share.
#[derive(Debug)]
pub struct Registry {
    chemicals: Vec<ChemicalDef>,
    chemical_name_to_id: HashMap<String, ChemicalId>,
    rules: Vec<ReactionRuleDef>,
    apparatus: Vec<ApparatusDef>,
    apparatus_name_to_id: HashMap<String, ApparatusId>,
}

impl Registry {
    pub fn chemical(&self, id: ChemicalId) -> Option<&ChemicalDef> {
        self.chemicals.get(id.0 as usize)
    }

    pub fn rule(&self, id: RuleId) -> Option<&ReactionRuleDef> {
        self.rules.get(id.0 as usize)
    }

    pub fn apparatus(&self, id: ApparatusId) -> Option<&ApparatusDef> {
        self.apparatus.get(id.0 as usize)
    }

    pub fn chemical_id(&self, name: &str) -> Option<ChemicalId> {
        self.chemical_name_to_id.get(name).copied()
    }

    pub fn apparatus_id(&self, name: &str) -> Option<ApparatusId> {
        self.apparatus_name_to_id.get(name).copied()
    }

    /// Rules in registration order. The sandbox matcher iterates this order.
    pub fn rules(&self) -> impl Iterator<Item = (RuleId, &ReactionRuleDef)> {
        self.rules
            .iter()
            .enumerate()
            .map(|(i, r)| (RuleId(i as u32), r))
    }

    pub fn chemical_count(&self) -> usize {
        self.chemicals.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn apparatus_count(&self) -> usize {
        self.apparatus.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid chemical reference: {0:?}")]
    InvalidChemicalRef(ChemicalId),
    #[error("invalid apparatus reference: {0:?}")]
    InvalidApparatusRef(ApparatusId),
    #[error("rule '{0}' declares no products")]
    EmptyProducts(String),
    #[error("duplicate name '{0}'")]
    DuplicateName(String),
}
