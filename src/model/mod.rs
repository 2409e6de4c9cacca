//! # Scene Graph Model
//!
//! Value types that every other layer speaks: vectors, Euler rotations,
//! typed property values, and node kinds with their declared schemas.
//!
//! Design rule: this module is pure data. No locks, no observers, no
//! simulation handles.

pub mod node;
pub mod property_map;
pub mod rotation;
pub mod value;
pub mod vector;

pub use node::{DefaultValue, Node, NodeId, NodeKind, PropertySpec};
pub use property_map::{PropertyMap, Slot};
pub use rotation::Rotation;
pub use value::{PropertyKind, Value};
pub use vector::{ParseTripleError, Vector};
