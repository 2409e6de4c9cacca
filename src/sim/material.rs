//! Material registry: named materials plus pairwise contact coefficients.
//!
//! Each world owns one registry. `"default"` is always registered.

use std::collections::BTreeMap;
use std::fmt;

use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Error, Result};

pub const DEFAULT_MATERIAL: &str = "default";

/// Handle to a registered material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MaterialId(pub u32);

impl fmt::Display for MaterialId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The six per-pair contact parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContactCoefficients {
    pub friction: f64,
    pub restitution: f64,
    pub contact_equation_stiffness: f64,
    pub contact_equation_relaxation: f64,
    pub friction_equation_stiffness: f64,
    pub friction_equation_relaxation: f64,
}

impl Default for ContactCoefficients {
    fn default() -> Self {
        Self {
            friction: 0.3,
            restitution: 0.3,
            contact_equation_stiffness: 1e7,
            contact_equation_relaxation: 3.0,
            friction_equation_stiffness: 1e7,
            friction_equation_relaxation: 3.0,
        }
    }
}

/// One field of [`ContactCoefficients`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoefficientField {
    Friction,
    Restitution,
    ContactEquationStiffness,
    ContactEquationRelaxation,
    FrictionEquationStiffness,
    FrictionEquationRelaxation,
}

impl CoefficientField {
    pub const ALL: [CoefficientField; 6] = [
        CoefficientField::Friction,
        CoefficientField::Restitution,
        CoefficientField::ContactEquationStiffness,
        CoefficientField::ContactEquationRelaxation,
        CoefficientField::FrictionEquationStiffness,
        CoefficientField::FrictionEquationRelaxation,
    ];

    pub fn property_name(self) -> &'static str {
        match self {
            CoefficientField::Friction => "friction",
            CoefficientField::Restitution => "restitution",
            CoefficientField::ContactEquationStiffness => "contactEquationStiffness",
            CoefficientField::ContactEquationRelaxation => "contactEquationRelaxation",
            CoefficientField::FrictionEquationStiffness => "frictionEquationStiffness",
            CoefficientField::FrictionEquationRelaxation => "frictionEquationRelaxation",
        }
    }
}

impl ContactCoefficients {
    pub fn get(&self, field: CoefficientField) -> f64 {
        match field {
            CoefficientField::Friction => self.friction,
            CoefficientField::Restitution => self.restitution,
            CoefficientField::ContactEquationStiffness => self.contact_equation_stiffness,
            CoefficientField::ContactEquationRelaxation => self.contact_equation_relaxation,
            CoefficientField::FrictionEquationStiffness => self.friction_equation_stiffness,
            CoefficientField::FrictionEquationRelaxation => self.friction_equation_relaxation,
        }
    }

    pub fn set(&mut self, field: CoefficientField, value: f64) {
        let slot = match field {
            CoefficientField::Friction => &mut self.friction,
            CoefficientField::Restitution => &mut self.restitution,
            CoefficientField::ContactEquationStiffness => &mut self.contact_equation_stiffness,
            CoefficientField::ContactEquationRelaxation => &mut self.contact_equation_relaxation,
            CoefficientField::FrictionEquationStiffness => &mut self.friction_equation_stiffness,
            CoefficientField::FrictionEquationRelaxation => &mut self.friction_equation_relaxation,
        };
        *slot = value;
    }
}

/// Unordered pair key: `(a, b)` and `(b, a)` address the same record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MaterialPair(MaterialId, MaterialId);

impl MaterialPair {
    pub fn new(a: MaterialId, b: MaterialId) -> Self {
        if a <= b { Self(a, b) } else { Self(b, a) }
    }

    pub fn ids(self) -> (MaterialId, MaterialId) {
        (self.0, self.1)
    }
}

// ============================================================================
// Registry
// ============================================================================

#[derive(Debug, Clone)]
pub struct MaterialRegistry {
    by_name: HashMap<String, MaterialId>,
    names: BTreeMap<MaterialId, String>,
    interactions: HashMap<MaterialPair, ContactCoefficients>,
    fallback: ContactCoefficients,
    default: MaterialId,
    next_id: u32,
}

impl Default for MaterialRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MaterialRegistry {
    pub fn new() -> Self {
        let mut registry = Self {
            by_name: HashMap::new(),
            names: BTreeMap::new(),
            interactions: HashMap::new(),
            fallback: ContactCoefficients::default(),
            default: MaterialId(0),
            next_id: 0,
        };
        registry.default = registry.register_material(DEFAULT_MATERIAL);
        registry
    }

    /// Register `name`, or return its existing handle.
    pub fn register_material(&mut self, name: &str) -> MaterialId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = MaterialId(self.next_id);
        self.next_id += 1;
        self.by_name.insert(name.to_string(), id);
        self.names.insert(id, name.to_string());
        debug!(material = name, %id, "material registered");
        id
    }

    pub fn default_material(&self) -> MaterialId {
        self.default
    }

    /// Resolve a name, failing with `UnknownMaterial` rather than falling back.
    pub fn resolve(&self, name: &str) -> Result<MaterialId> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| Error::UnknownMaterial(name.to_string()))
    }

    pub fn name_of(&self, id: MaterialId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }

    /// Re-key the handle registered as `old` under `new`.
    ///
    /// Bodies holding the handle keep it. `"default"` is never unregistered.
    /// Fails if `new` already names another material.
    pub fn rename(&mut self, old: &str, new: &str) -> Result<MaterialId> {
        let id = self.resolve(old)?;
        if old == new {
            return Ok(id);
        }
        if let Some(existing) = self.by_name.get(new).filter(|existing| **existing != id) {
            return Err(Error::InvalidArgument {
                property: "name".into(),
                reason: format!("\"{new}\" already names material {existing}"),
            });
        }
        if old != DEFAULT_MATERIAL {
            self.by_name.remove(old);
        }
        self.by_name.insert(new.to_string(), id);
        self.names.insert(id, new.to_string());
        debug!(old, new, %id, "material renamed");
        Ok(id)
    }

    /// Create the interaction record between two named materials.
    ///
    /// Each pair has at most one record; registering a pair that already has
    /// one fails and leaves the existing record untouched.
    pub fn register_interaction(
        &mut self,
        a: &str,
        b: &str,
        coefficients: ContactCoefficients,
    ) -> Result<MaterialPair> {
        let pair = MaterialPair::new(self.resolve(a)?, self.resolve(b)?);
        validate(&coefficients)?;
        self.ensure_vacant(pair, "material1", a, b)?;
        self.interactions.insert(pair, coefficients);
        debug!(a, b, "interaction registered");
        Ok(pair)
    }

    /// Mutate one coefficient of an existing record in place.
    pub fn update_interaction_coefficient(
        &mut self,
        a: &str,
        b: &str,
        field: CoefficientField,
        value: f64,
    ) -> Result<()> {
        let pair = MaterialPair::new(self.resolve(a)?, self.resolve(b)?);
        self.update_pair_coefficient(pair, field, value)
    }

    pub fn update_pair_coefficient(
        &mut self,
        pair: MaterialPair,
        field: CoefficientField,
        value: f64,
    ) -> Result<()> {
        if !value.is_finite() {
            return Err(Error::InvalidArgument {
                property: field.property_name().to_string(),
                reason: "value must be finite".into(),
            });
        }
        let record = self
            .interactions
            .get_mut(&pair)
            .ok_or_else(|| Error::NotFound(format!("Interaction {:?}", pair.ids())))?;
        record.set(field, value);
        Ok(())
    }

    /// Move a record to another pair, keeping its coefficients. Fails if the
    /// destination pair already has a record.
    pub fn move_interaction(&mut self, from: MaterialPair, to: MaterialPair) -> Result<()> {
        if from == to {
            return Ok(());
        }
        if !self.interactions.contains_key(&from) {
            return Err(Error::NotFound(format!("Interaction {:?}", from.ids())));
        }
        let (a, b) = to.ids();
        let names = (self.display_name(a), self.display_name(b));
        self.ensure_vacant(to, "material", &names.0, &names.1)?;
        if let Some(record) = self.interactions.remove(&from) {
            self.interactions.insert(to, record);
        }
        Ok(())
    }

    fn ensure_vacant(&self, pair: MaterialPair, property: &str, a: &str, b: &str) -> Result<()> {
        if self.interactions.contains_key(&pair) {
            return Err(Error::InvalidArgument {
                property: property.into(),
                reason: format!("materials \"{a}\" and \"{b}\" already have an interaction"),
            });
        }
        Ok(())
    }

    fn display_name(&self, id: MaterialId) -> String {
        self.name_of(id).map_or_else(|| id.to_string(), str::to_owned)
    }

    pub fn remove_interaction(&mut self, pair: MaterialPair) -> Option<ContactCoefficients> {
        self.interactions.remove(&pair)
    }

    pub fn interaction(&self, a: MaterialId, b: MaterialId) -> Option<&ContactCoefficients> {
        self.interactions.get(&MaterialPair::new(a, b))
    }

    pub fn interaction_by_name(&self, a: &str, b: &str) -> Result<Option<&ContactCoefficients>> {
        Ok(self.interaction(self.resolve(a)?, self.resolve(b)?))
    }

    /// Coefficients a contact between `a` and `b` should use.
    pub fn coefficients_for(&self, a: MaterialId, b: MaterialId) -> &ContactCoefficients {
        self.interaction(a, b).unwrap_or(&self.fallback)
    }
}

fn validate(c: &ContactCoefficients) -> Result<()> {
    for field in CoefficientField::ALL {
        if !c.get(field).is_finite() {
            return Err(Error::InvalidArgument {
                property: field.property_name().to_string(),
                reason: "value must be finite".into(),
            });
        }
    }
    Ok(())
}
