//! Node → simulation binding.
//!
//! Binding a node creates its simulation-side counterpart (body, gravity,
//! material or interaction record) and installs the push observers that keep
//! it in sync with the node. Every observer ignores changes tagged
//! [`ChangeOrigin::Simulation`], so write-backs never loop back into the world.

use std::sync::{Arc, Weak};

use glam::{DQuat, DVec3};
use tracing::debug;

use super::{BridgeShared, SimState};
use crate::model::{NodeId, NodeKind, Rotation, Vector};
use crate::scene::{BodyLink, ChangeOrigin, ObserverId, PropertyChange};
use crate::sim::{
    BodyDesc, BodyHandle, BodySnapshot, CoefficientField, ContactCoefficients, MaterialPair, Shape,
    World,
};
use crate::{Error, Result};

/// What a bound node maps to, plus the observers installed for it.
#[derive(Debug)]
pub(crate) struct Binding {
    pub target: Target,
    pub observers: Vec<ObserverId>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Target {
    Body { handle: BodyHandle, write_back: bool },
    World,
    Material { name: String },
    Interaction { pair: MaterialPair, materials: [String; 2] },
}

// ============================================================================
// Bind / unbind
// ============================================================================

/// Bind every node in `nodes`, material nodes first, the rest in the given
/// order. Already-bound and inert nodes are skipped.
///
/// On failure every node bound by this call is unbound again.
pub(crate) fn bind_nodes(
    shared: &Arc<BridgeShared>,
    sim: &mut SimState,
    nodes: &[NodeId],
) -> Result<usize> {
    let mut ordered: Vec<(NodeId, NodeKind)> = Vec::with_capacity(nodes.len());
    for &node in nodes {
        ordered.push((node, shared.scene.kind(node)?));
    }
    ordered.sort_by_key(|(_, kind)| *kind != NodeKind::Material);

    let mut bound = Vec::new();
    for (node, kind) in ordered {
        if sim.bindings.contains_key(&node) {
            continue;
        }
        match bind_node(shared, sim, node, &kind) {
            Ok(true) => bound.push(node),
            Ok(false) => {}
            Err(e) => {
                unbind_node(shared, sim, node);
                for node in bound.into_iter().rev() {
                    unbind_node(shared, sim, node);
                }
                return Err(e);
            }
        }
    }
    Ok(bound.len())
}

fn bind_node(
    shared: &Arc<BridgeShared>,
    sim: &mut SimState,
    node: NodeId,
    kind: &NodeKind,
) -> Result<bool> {
    match kind {
        NodeKind::Box | NodeKind::Billboard | NodeKind::Player => bind_body(shared, sim, node, kind)?,
        NodeKind::World => bind_world(shared, sim, node)?,
        NodeKind::Material => bind_material(shared, sim, node)?,
        NodeKind::MaterialInteraction => bind_interaction(shared, sim, node)?,
        NodeKind::Scene | NodeKind::Spawn | NodeKind::Other(_) => return Ok(false),
    }
    Ok(true)
}

/// Remove a node's binding: its observers, its control handle and its
/// simulation counterpart. Materials stay registered, since other bodies
/// may still hold the handle.
pub(crate) fn unbind_node(shared: &BridgeShared, sim: &mut SimState, node: NodeId) -> bool {
    let Some(binding) = sim.bindings.remove(&node) else {
        return false;
    };
    for id in binding.observers {
        shared.scene.remove_property_change_observer(id);
    }
    match binding.target {
        Target::Body { handle, .. } => {
            sim.world.remove_body(handle);
            shared.scene.detach_body(node);
            debug!(%node, %handle, "body unbound");
        }
        Target::Interaction { pair, materials } => {
            sim.world.materials.remove_interaction(pair);
            debug!(%node, material1 = %materials[0], material2 = %materials[1], "interaction unbound");
        }
        Target::World | Target::Material { .. } => {}
    }
    true
}

// ============================================================================
// Spatial nodes
// ============================================================================

fn bind_body(
    shared: &Arc<BridgeShared>,
    sim: &mut SimState,
    node: NodeId,
    kind: &NodeKind,
) -> Result<()> {
    let scene = &shared.scene;
    let position = scene.get_vector(node, "position")?;
    let velocity = scene.get_vector(node, "velocity")?;
    let rotation = scene.get_rotation(node, "rotation")?;
    let scale = scene.get_vector(node, "scale")?;
    let mass = check_mass(scene.get_scalar(node, "mass")?)?;
    let material_name = scene.get_text(node, "material")?;
    let material = sim.world.materials.resolve(&material_name)?;

    let shape = match kind {
        NodeKind::Player => Shape::Sphere { radius: shared.config.player_radius },
        _ => Shape::Box { half_extents: DVec3::from(check_scale(scale)?.scaled(0.5)) },
    };
    let handle = sim.world.add_body(BodyDesc {
        mass,
        shape,
        material,
        position: position.into(),
        orientation: rotation.to_quat(),
        velocity: velocity.into(),
    });
    // Players are client-authoritative.
    let write_back = *kind != NodeKind::Player;
    sim.bindings.insert(
        node,
        Binding { target: Target::Body { handle, write_back }, observers: Vec::new() },
    );
    scene.attach_body(node, Arc::new(NodeLink { shared: Arc::downgrade(shared), handle }));
    debug!(%node, %kind, %position, %handle, "body bound");

    observe(shared, sim, node, "position", move |sim, change| {
        sim.world.set_position(handle, vector(change)?.into())
    })?;
    observe(shared, sim, node, "rotation", move |sim, change| {
        sim.world.set_orientation(handle, rotation_of(change)?.to_quat())
    })?;
    observe(shared, sim, node, "scale", |_, _| {
        Err(Error::UnsupportedMutation {
            property: "scale".into(),
            reason: "the shape of a bound body is fixed".into(),
        })
    })?;
    observe(shared, sim, node, "velocity", move |sim, change| {
        sim.world.set_velocity(handle, vector(change)?.into())
    })?;
    observe(shared, sim, node, "mass", move |sim, change| {
        sim.world.set_mass(handle, check_mass(scalar(change)?)?)
    })?;
    observe(shared, sim, node, "material", move |sim, change| {
        let material = sim.world.materials.resolve(text(change)?)?;
        sim.world.set_material(handle, material)
    })?;
    Ok(())
}

fn check_scale(scale: Vector) -> Result<Vector> {
    if scale.x > 0.0 && scale.y > 0.0 && scale.z > 0.0 {
        return Ok(scale);
    }
    Err(Error::InvalidArgument {
        property: "scale".into(),
        reason: format!("box extents must be positive, got {scale}"),
    })
}

fn check_mass(mass: f64) -> Result<f64> {
    if mass < 0.0 {
        return Err(Error::InvalidArgument {
            property: "mass".into(),
            reason: format!("mass must not be negative, got {mass}"),
        });
    }
    Ok(mass)
}

// ============================================================================
// World, material and interaction nodes
// ============================================================================

fn bind_world(shared: &Arc<BridgeShared>, sim: &mut SimState, node: NodeId) -> Result<()> {
    let gravity = shared.scene.get_vector(node, "gravity")?;
    sim.world.gravity = gravity.into();
    sim.bindings.insert(node, Binding { target: Target::World, observers: Vec::new() });
    debug!(%node, %gravity, "world bound");

    observe(shared, sim, node, "gravity", |sim, change| {
        sim.world.gravity = vector(change)?.into();
        Ok(())
    })
}

fn bind_material(shared: &Arc<BridgeShared>, sim: &mut SimState, node: NodeId) -> Result<()> {
    let name = shared.scene.get_text(node, "name")?;
    sim.world.materials.register_material(&name);
    sim.bindings.insert(node, Binding { target: Target::Material { name }, observers: Vec::new() });

    observe(shared, sim, node, "name", move |sim, change| {
        let new_name = text(change)?;
        let Some(Binding { target: Target::Material { name }, .. }) = sim.bindings.get_mut(&node)
        else {
            return Err(Error::NotFound(format!("Material binding for node {node}")));
        };
        sim.world.materials.rename(name, new_name)?;
        *name = new_name.to_string();
        Ok(())
    })
}

fn bind_interaction(shared: &Arc<BridgeShared>, sim: &mut SimState, node: NodeId) -> Result<()> {
    let scene = &shared.scene;
    let materials = [scene.get_text(node, "material1")?, scene.get_text(node, "material2")?];
    let mut coefficients = ContactCoefficients::default();
    for field in CoefficientField::ALL {
        coefficients.set(field, scene.get_scalar(node, field.property_name())?);
    }
    let pair = sim
        .world
        .materials
        .register_interaction(&materials[0], &materials[1], coefficients)?;
    sim.bindings.insert(
        node,
        Binding { target: Target::Interaction { pair, materials }, observers: Vec::new() },
    );

    for field in CoefficientField::ALL {
        observe(shared, sim, node, field.property_name(), move |sim, change| {
            let value = scalar(change)?;
            let (pair, _) = interaction_of(sim, node)?;
            sim.world.materials.update_pair_coefficient(pair, field, value)
        })?;
    }
    for (side, property) in ["material1", "material2"].into_iter().enumerate() {
        observe(shared, sim, node, property, move |sim, change| {
            repoint(sim, node, side, text(change)?).map_err(|e| match e {
                Error::InvalidArgument { reason, .. } => {
                    Error::InvalidArgument { property: property.into(), reason }
                }
                e => e,
            })
        })?;
    }
    Ok(())
}

fn interaction_of(sim: &SimState, node: NodeId) -> Result<(MaterialPair, [String; 2])> {
    match sim.bindings.get(&node) {
        Some(Binding { target: Target::Interaction { pair, materials }, .. }) => {
            Ok((*pair, materials.clone()))
        }
        _ => Err(Error::NotFound(format!("Interaction binding for node {node}"))),
    }
}

/// Move an interaction record to a new material pair, keeping its coefficients.
fn repoint(sim: &mut SimState, node: NodeId, side: usize, name: &str) -> Result<()> {
    let (from, mut materials) = interaction_of(sim, node)?;
    materials[side] = name.to_string();
    let to = MaterialPair::new(
        sim.world.materials.resolve(&materials[0])?,
        sim.world.materials.resolve(&materials[1])?,
    );
    sim.world.materials.move_interaction(from, to)?;
    if let Some(Binding { target, .. }) = sim.bindings.get_mut(&node) {
        *target = Target::Interaction { pair: to, materials };
    }
    Ok(())
}

// ============================================================================
// Observer plumbing
// ============================================================================

/// Install a push observer on `(node, property)` and record it on the node's
/// binding. `apply` runs under the simulation lock.
fn observe<F>(
    shared: &Arc<BridgeShared>,
    sim: &mut SimState,
    node: NodeId,
    property: &str,
    apply: F,
) -> Result<()>
where
    F: Fn(&mut SimState, &PropertyChange) -> Result<()> + Send + Sync + 'static,
{
    let weak = Arc::downgrade(shared);
    let id = shared.scene.add_property_change_observer(node, property, move |change| {
        if change.origin == ChangeOrigin::Simulation {
            return Ok(());
        }
        let Some(shared) = weak.upgrade() else {
            return Ok(());
        };
        let mut sim = shared.sim.lock();
        apply(&mut sim, change)
    })?;
    match sim.bindings.get_mut(&node) {
        Some(binding) => binding.observers.push(id),
        None => {
            shared.scene.remove_property_change_observer(id);
        }
    }
    Ok(())
}

fn vector(change: &PropertyChange) -> Result<Vector> {
    change.value.as_vector().ok_or_else(|| mismatch("VECTOR", change))
}

fn rotation_of(change: &PropertyChange) -> Result<Rotation> {
    change.value.as_rotation().ok_or_else(|| mismatch("ROTATION", change))
}

fn scalar(change: &PropertyChange) -> Result<f64> {
    change.value.as_scalar().ok_or_else(|| mismatch("SCALAR", change))
}

fn text(change: &PropertyChange) -> Result<&str> {
    change.value.as_str().ok_or_else(|| mismatch("TEXT", change))
}

fn mismatch(expected: &str, change: &PropertyChange) -> Error {
    Error::TypeError {
        expected: expected.into(),
        got: change.value.type_name().into(),
    }
}

// ============================================================================
// Control surface attached to bound nodes
// ============================================================================

/// The [`BodyLink`] a bound spatial node carries.
pub(crate) struct NodeLink {
    shared: Weak<BridgeShared>,
    handle: BodyHandle,
}

impl NodeLink {
    fn with_world(&self, f: impl FnOnce(&mut World, BodyHandle) -> Result<()>) -> Result<()> {
        let shared = self
            .shared
            .upgrade()
            .ok_or_else(|| Error::NotFound(format!("Body {} (bridge shut down)", self.handle)))?;
        let mut sim = shared.sim.lock();
        f(&mut sim.world, self.handle)
    }
}

impl BodyLink for NodeLink {
    fn snapshot(&self) -> Option<BodySnapshot> {
        let shared = self.shared.upgrade()?;
        let sim = shared.sim.lock();
        sim.world.body(self.handle)
    }

    fn apply_impulse(&self, impulse: Vector, world_point: Vector) -> Result<()> {
        require_finite("impulse", impulse)?;
        require_finite("worldPoint", world_point)?;
        self.with_world(|world, handle| {
            world.apply_impulse(handle, impulse.into(), world_point.into())
        })
    }

    fn set_persistent_force(&self, force: Vector) -> Result<()> {
        require_finite("force", force)?;
        self.with_world(|world, handle| world.set_persistent_force(handle, Some(force.into())))
    }

    fn clear_persistent_force(&self) -> Result<()> {
        self.with_world(|world, handle| world.set_persistent_force(handle, None))
    }
}

fn require_finite(property: &str, v: Vector) -> Result<()> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(Error::InvalidArgument {
            property: property.into(),
            reason: "components must be finite".into(),
        })
    }
}

/// Orientation of the static ground plane: local +Z turned to world +Y.
pub(crate) fn ground_orientation() -> DQuat {
    DQuat::from_axis_angle(DVec3::X, -std::f64::consts::FRAC_PI_2)
}
