//! Rigid bodies owned by the simulation world.

use std::fmt;

use glam::{DQuat, DVec3};
use rapier3d_f64::na::{Quaternion, UnitQuaternion, Vector3};
use rapier3d_f64::prelude::{
    ActiveHooks, Collider, ColliderBuilder, ColliderHandle, RigidBody, RigidBodyHandle,
};
use serde::{Deserialize, Serialize};

use super::MaterialId;
use crate::model::{Rotation, Vector};

/// Handle to a body inside one [`World`](super::World).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BodyHandle(pub u64);

impl fmt::Display for BodyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Collision shape. Fixed for the lifetime of a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Box { half_extents: DVec3 },
    Sphere { radius: f64 },
    /// Infinite plane through the body origin, normal along local +Z.
    Plane,
}

impl Shape {
    /// Collider for this shape, tagged with its material and routed through
    /// the contact hooks.
    pub(crate) fn collider(&self, mass: f64, material: MaterialId) -> Collider {
        let builder = match *self {
            Shape::Box { half_extents: h } => ColliderBuilder::cuboid(h.x, h.y, h.z),
            Shape::Sphere { radius } => ColliderBuilder::ball(radius),
            Shape::Plane => ColliderBuilder::halfspace(Vector3::z_axis()),
        };
        let builder = builder
            .user_data(u128::from(material.0))
            .active_hooks(ActiveHooks::MODIFY_SOLVER_CONTACTS);
        if mass > 0.0 && !matches!(self, Shape::Plane) {
            builder.mass(mass).build()
        } else {
            builder.build()
        }
    }
}

/// Sleep state of a body.
///
/// `Sleepy` means the body is below the sleep speed limit and counting down
/// towards `Sleeping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SleepState {
    Awake,
    Sleepy,
    Sleeping,
}

impl SleepState {
    pub(crate) fn of(body: &RigidBody) -> Self {
        if body.is_sleeping() {
            SleepState::Sleeping
        } else if body.is_dynamic() && body.activation().time_since_can_sleep > 0.0 {
            SleepState::Sleepy
        } else {
            SleepState::Awake
        }
    }
}

/// Initial state for a new body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyDesc {
    pub mass: f64,
    pub shape: Shape,
    pub material: MaterialId,
    pub position: DVec3,
    pub orientation: DQuat,
    pub velocity: DVec3,
}

/// Book-keeping the world holds next to each solver body.
#[derive(Debug, Clone)]
pub(crate) struct BodyEntry {
    pub rigid_body: RigidBodyHandle,
    pub collider: ColliderHandle,
    pub shape: Shape,
    pub mass: f64,
    pub material: MaterialId,
    /// Added to the solver's force accumulator before every world step.
    pub persistent_force: Option<DVec3>,
}

impl BodyEntry {
    pub fn snapshot(&self, handle: BodyHandle, body: &RigidBody) -> BodySnapshot {
        BodySnapshot {
            handle,
            mass: self.mass,
            shape: self.shape,
            material: self.material,
            position: from_na(body.translation()).into(),
            orientation: quat_from_na(body.rotation()),
            velocity: from_na(body.linvel()).into(),
            angular_velocity: from_na(body.angvel()).into(),
            persistent_force: self.persistent_force.map(Vector::from),
            sleep_state: SleepState::of(body),
        }
    }
}

/// Read-only copy of a body, handed to callers outside the world lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodySnapshot {
    pub handle: BodyHandle,
    pub mass: f64,
    pub shape: Shape,
    pub material: MaterialId,
    pub position: Vector,
    pub orientation: DQuat,
    pub velocity: Vector,
    pub angular_velocity: Vector,
    pub persistent_force: Option<Vector>,
    pub sleep_state: SleepState,
}

impl BodySnapshot {
    /// Orientation converted back to Euler angles.
    pub fn rotation(&self) -> Rotation {
        Rotation::from_quat(self.orientation)
    }
}

// ============================================================================
// glam <-> nalgebra
// ============================================================================

pub(crate) fn to_na(v: DVec3) -> Vector3<f64> {
    Vector3::new(v.x, v.y, v.z)
}

pub(crate) fn from_na(v: &Vector3<f64>) -> DVec3 {
    DVec3::new(v.x, v.y, v.z)
}

pub(crate) fn quat_to_na(q: DQuat) -> UnitQuaternion<f64> {
    UnitQuaternion::new_normalize(Quaternion::new(q.w, q.x, q.y, q.z))
}

pub(crate) fn quat_from_na(q: &UnitQuaternion<f64>) -> DQuat {
    let c = q.quaternion().coords;
    DQuat::from_xyzw(c[0], c[1], c[2], c[3])
}
