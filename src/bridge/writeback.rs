//! Dead-band comparison between a stepped body and its node.

use smallvec::SmallVec;

use crate::model::{Rotation, Value, Vector};
use crate::sim::BodySnapshot;

/// The node-side values a body is compared against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct NodeState {
    pub position: Vector,
    pub velocity: Vector,
    pub rotation: Rotation,
}

/// Properties whose simulated value drifted past `dead_band` (squared distance).
pub(crate) fn diff(
    node: &NodeState,
    body: &BodySnapshot,
    dead_band: f64,
) -> SmallVec<[(&'static str, Value); 3]> {
    let mut out = SmallVec::new();
    if body.position.distance_to_squared(node.position) > dead_band {
        out.push(("position", Value::Vector(body.position)));
    }
    if body.velocity.distance_to_squared(node.velocity) > dead_band {
        out.push(("velocity", Value::Vector(body.velocity)));
    }
    let rotation = body.rotation();
    if rotation.distance_to_squared(node.rotation) > dead_band {
        out.push(("rotation", Value::Rotation(rotation)));
    }
    out
}
