//! Node in the scene graph.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use uuid::Uuid;

use super::{PropertyKind, PropertyMap, Slot, Value, Vector};

/// Opaque node identifier, unique within one scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Node kinds
// ============================================================================

/// Shape-kind discriminator, taken from the element's tag name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    /// The document root.
    Scene,
    Box,
    Billboard,
    /// Client-controlled avatar. Simulated as a sphere, never written back.
    Player,
    /// Carries world gravity (`<physics>` in scene documents).
    World,
    Material,
    /// Pairwise contact parameters (`<contactmaterial>`).
    MaterialInteraction,
    Spawn,
    Other(String),
}

impl NodeKind {
    /// Map a tag name to a kind. Unrecognized tags become `Other`.
    pub fn from_tag(tag: &str) -> Self {
        match tag.to_ascii_lowercase().as_str() {
            "scene" => NodeKind::Scene,
            "box" => NodeKind::Box,
            "billboard" => NodeKind::Billboard,
            "player" => NodeKind::Player,
            "physics" | "world" => NodeKind::World,
            "material" => NodeKind::Material,
            "contactmaterial" | "material-interaction" => NodeKind::MaterialInteraction,
            "spawn" => NodeKind::Spawn,
            other => NodeKind::Other(other.to_string()),
        }
    }

    pub fn tag(&self) -> &str {
        match self {
            NodeKind::Scene => "scene",
            NodeKind::Box => "box",
            NodeKind::Billboard => "billboard",
            NodeKind::Player => "player",
            NodeKind::World => "physics",
            NodeKind::Material => "material",
            NodeKind::MaterialInteraction => "contactmaterial",
            NodeKind::Spawn => "spawn",
            NodeKind::Other(tag) => tag,
        }
    }

    /// Nodes with a spatial presence get a body when bound.
    pub fn is_spatial(&self) -> bool {
        matches!(self, NodeKind::Box | NodeKind::Billboard | NodeKind::Player)
    }

    /// Declared properties for this kind.
    pub fn schema(&self) -> &'static [PropertySpec] {
        match self {
            NodeKind::Box | NodeKind::Billboard | NodeKind::Player => SPATIAL,
            NodeKind::World => WORLD,
            NodeKind::Material => MATERIAL,
            NodeKind::MaterialInteraction => MATERIAL_INTERACTION,
            NodeKind::Scene | NodeKind::Spawn | NodeKind::Other(_) => &[],
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

// ============================================================================
// Schemas
// ============================================================================

/// Compile-time default for a declared property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DefaultValue {
    Vector([f64; 3]),
    Rotation([f64; 3]),
    Scalar(f64),
    Text(&'static str),
}

impl DefaultValue {
    pub fn kind(self) -> PropertyKind {
        match self {
            DefaultValue::Vector(_) => PropertyKind::Vector,
            DefaultValue::Rotation(_) => PropertyKind::Rotation,
            DefaultValue::Scalar(_) => PropertyKind::Scalar,
            DefaultValue::Text(_) => PropertyKind::Text,
        }
    }

    pub fn to_value(self) -> Value {
        match self {
            DefaultValue::Vector(a) => Value::Vector(Vector::from_array(a)),
            DefaultValue::Rotation(a) => Value::Rotation(super::Rotation::from_array(a)),
            DefaultValue::Scalar(s) => Value::Scalar(s),
            DefaultValue::Text(s) => Value::Text(s.to_string()),
        }
    }
}

/// A declared property: name plus default (the default fixes the kind).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PropertySpec {
    pub name: &'static str,
    pub default: DefaultValue,
}

const fn prop(name: &'static str, default: DefaultValue) -> PropertySpec {
    PropertySpec { name, default }
}

pub const SPATIAL: &[PropertySpec] = &[
    prop("position", DefaultValue::Vector([0.0, 0.0, 0.0])),
    prop("scale", DefaultValue::Vector([1.0, 1.0, 1.0])),
    prop("rotation", DefaultValue::Rotation([0.0, 0.0, 0.0])),
    prop("velocity", DefaultValue::Vector([0.0, 0.0, 0.0])),
    prop("mass", DefaultValue::Scalar(0.0)),
    prop("material", DefaultValue::Text("default")),
];

pub const WORLD: &[PropertySpec] = &[prop("gravity", DefaultValue::Vector([0.0, -9.82, 0.0]))];

pub const MATERIAL: &[PropertySpec] = &[prop("name", DefaultValue::Text("default"))];

pub const MATERIAL_INTERACTION: &[PropertySpec] = &[
    prop("material1", DefaultValue::Text("default")),
    prop("material2", DefaultValue::Text("default")),
    prop("friction", DefaultValue::Scalar(0.3)),
    prop("restitution", DefaultValue::Scalar(0.3)),
    prop("contactEquationStiffness", DefaultValue::Scalar(1e7)),
    prop("contactEquationRelaxation", DefaultValue::Scalar(3.0)),
    prop("frictionEquationStiffness", DefaultValue::Scalar(1e7)),
    prop("frictionEquationRelaxation", DefaultValue::Scalar(3.0)),
];

// ============================================================================
// Node
// ============================================================================

/// A node in the scene graph.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub uuid: Uuid,
    /// Document-level identifier (the `id` attribute), if any.
    pub element_id: Option<String>,
    pub kind: NodeKind,
    pub properties: PropertyMap,
    pub parent: Option<NodeId>,
    pub children: SmallVec<[NodeId; 4]>,
}

impl Node {
    /// A detached node with every declared slot present but unmaterialized.
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        let properties = kind
            .schema()
            .iter()
            .map(|p| (p.name.to_string(), Slot::new(p.default.kind(), p.default.to_value())))
            .collect();
        Self {
            id,
            uuid: Uuid::new_v4(),
            element_id: None,
            kind,
            properties,
            parent: None,
            children: SmallVec::new(),
        }
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Declare an ad-hoc text attribute that the schema does not know about.
    pub fn declare_text(&mut self, name: &str) {
        self.properties
            .entry(name.to_string())
            .or_insert_with(|| Slot::new(PropertyKind::Text, Value::Text(String::new())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_tag() {
        assert_eq!(NodeKind::from_tag("box"), NodeKind::Box);
        assert_eq!(NodeKind::from_tag("Physics"), NodeKind::World);
        assert_eq!(NodeKind::from_tag("material-interaction"), NodeKind::MaterialInteraction);
        assert_eq!(NodeKind::from_tag("audio"), NodeKind::Other("audio".into()));
        assert_eq!(NodeKind::MaterialInteraction.tag(), "contactmaterial");
    }

    #[test]
    fn test_spatial_defaults() {
        let node = Node::new(NodeId(7), NodeKind::Box);
        assert_eq!(node.properties.len(), SPATIAL.len());
        assert_eq!(node.properties["scale"].peek(), &Value::Vector(Vector::ONE));
        assert_eq!(node.properties["material"].peek(), &Value::Text("default".into()));
        assert!(node.properties.values().all(|s| !s.is_materialized()));
    }

    #[test]
    fn test_inert_kinds_have_no_schema() {
        assert!(NodeKind::Spawn.schema().is_empty());
        assert!(!NodeKind::Spawn.is_spatial());
        assert!(NodeKind::Player.is_spatial());
    }
}
