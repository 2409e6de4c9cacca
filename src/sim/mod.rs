//! # Rigid-Body World
//!
//! The simulation collaborator the bridge drives: a rapier pipeline plus the
//! book-keeping the bridge needs around it. It offers body creation, global
//! gravity, pairwise contact materials, a fixed-step `step` with bounded
//! sub-stepping and per-body sleep states.
//!
//! ## Stepping
//!
//! `step(fixed, dt, max_sub_steps)` adds `dt` to an accumulator and runs
//! whole internal steps of `fixed` seconds while the accumulator allows and
//! the sub-step budget lasts. When the budget runs out, the excess backlog is
//! dropped rather than carried forward, so a slow host never spirals.
//!
//! Forces copied in by [`World::apply_persistent_forces`] are cleared after
//! the first internal step, so a persistent force acts for one internal step
//! per `step` call.

mod body;
mod contact;
mod material;

pub use body::{BodyDesc, BodyHandle, BodySnapshot, Shape, SleepState};
pub use material::{
    CoefficientField, ContactCoefficients, MaterialId, MaterialPair, MaterialRegistry,
    DEFAULT_MATERIAL,
};

use std::collections::BTreeMap;

use glam::{DQuat, DVec3};
use rapier3d_f64::na::{Isometry3, Point3, Translation3};
use rapier3d_f64::prelude::{
    CCDSolver, ColliderSet, DefaultBroadPhase, ImpulseJointSet, IntegrationParameters,
    IslandManager, MultibodyJointSet, NarrowPhase, PhysicsPipeline, RigidBody, RigidBodyBuilder,
    RigidBodySet, RigidBodyType,
};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};
use body::{from_na, quat_from_na, quat_to_na, to_na, BodyEntry};
use contact::ContactHooks;

/// Absorbs rounding when comparing the accumulator against the step size.
const ACCUMULATOR_EPSILON: f64 = 1e-9;

/// Damping rate used for a damping factor of 1 (velocity fully removed).
const MAX_DAMPING_RATE: f64 = 1e6;

/// World-wide integration settings, applied to every body at creation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldSettings {
    pub allow_sleep: bool,
    pub sleep_speed_limit: f64,
    pub sleep_time_limit: f64,
    /// Fraction of linear velocity lost per second.
    pub linear_damping: f64,
    pub angular_damping: f64,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            allow_sleep: true,
            sleep_speed_limit: 0.1,
            sleep_time_limit: 1.0,
            linear_damping: 0.01,
            angular_damping: 0.01,
        }
    }
}

/// Solver damping coefficient that loses `fraction` of the velocity per second.
fn damping_rate(fraction: f64) -> f64 {
    if fraction >= 1.0 {
        MAX_DAMPING_RATE
    } else {
        -(1.0 - fraction.max(0.0)).ln()
    }
}

pub struct World {
    pub gravity: DVec3,
    pub materials: MaterialRegistry,
    settings: WorldSettings,
    entries: BTreeMap<BodyHandle, BodyEntry>,
    next_handle: u64,
    accumulator: f64,

    params: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    rigid_bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd: CCDSolver,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldSettings::default())
    }
}

impl World {
    pub fn new(settings: WorldSettings) -> Self {
        Self {
            gravity: DVec3::ZERO,
            materials: MaterialRegistry::new(),
            settings,
            entries: BTreeMap::new(),
            next_handle: 1,
            accumulator: 0.0,
            params: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd: CCDSolver::new(),
        }
    }

    // ========================================================================
    // Bodies
    // ========================================================================

    /// Create a body. A mass of zero, or a plane shape, makes it static.
    pub fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let builder = if is_dynamic(desc.mass, &desc.shape) {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };
        let mut body = builder
            .position(Isometry3::from_parts(
                Translation3::from(to_na(desc.position)),
                quat_to_na(desc.orientation),
            ))
            .linvel(to_na(desc.velocity))
            .linear_damping(damping_rate(self.settings.linear_damping))
            .angular_damping(damping_rate(self.settings.angular_damping))
            .can_sleep(self.settings.allow_sleep)
            .build();
        if self.settings.allow_sleep {
            let activation = body.activation_mut();
            activation.normalized_linear_threshold = self.settings.sleep_speed_limit;
            activation.angular_threshold = self.settings.sleep_speed_limit;
            activation.time_until_sleep = self.settings.sleep_time_limit;
        }

        let rigid_body = self.rigid_bodies.insert(body);
        let collider = self.colliders.insert_with_parent(
            desc.shape.collider(desc.mass, desc.material),
            rigid_body,
            &mut self.rigid_bodies,
        );
        if let Some(body) = self.rigid_bodies.get_mut(rigid_body) {
            body.recompute_mass_properties_from_colliders(&self.colliders);
        }

        let handle = BodyHandle(self.next_handle);
        self.next_handle += 1;
        self.entries.insert(
            handle,
            BodyEntry {
                rigid_body,
                collider,
                shape: desc.shape,
                mass: desc.mass.max(0.0),
                material: desc.material,
                persistent_force: None,
            },
        );
        handle
    }

    /// Remove a body and its collider. Returns `false` for an unknown handle.
    pub fn remove_body(&mut self, handle: BodyHandle) -> bool {
        let Some(entry) = self.entries.remove(&handle) else {
            return false;
        };
        self.rigid_bodies.remove(
            entry.rigid_body,
            &mut self.islands,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
        true
    }

    pub fn body(&self, handle: BodyHandle) -> Option<BodySnapshot> {
        let entry = self.entries.get(&handle)?;
        let body = self.rigid_bodies.get(entry.rigid_body)?;
        Some(entry.snapshot(handle, body))
    }

    pub fn body_count(&self) -> usize {
        self.entries.len()
    }

    // ========================================================================
    // Mutation
    // ========================================================================

    pub fn set_position(&mut self, handle: BodyHandle, position: DVec3) -> Result<()> {
        let (_, body) = self.parts_mut(handle)?;
        let mut pose = *body.position();
        pose.translation = Translation3::from(to_na(position));
        body.set_position(pose, true);
        Ok(())
    }

    pub fn set_orientation(&mut self, handle: BodyHandle, orientation: DQuat) -> Result<()> {
        let (_, body) = self.parts_mut(handle)?;
        let mut pose = *body.position();
        pose.rotation = quat_to_na(orientation);
        body.set_position(pose, true);
        Ok(())
    }

    pub fn set_velocity(&mut self, handle: BodyHandle, velocity: DVec3) -> Result<()> {
        let (_, body) = self.parts_mut(handle)?;
        body.set_linvel(to_na(velocity), true);
        Ok(())
    }

    /// Reassign mass. Zero makes the body static, a positive mass makes it
    /// dynamic again. Planes stay static.
    pub fn set_mass(&mut self, handle: BodyHandle, mass: f64) -> Result<()> {
        let entry = self.entries.get_mut(&handle).ok_or_else(|| not_found(handle))?;
        let dynamic = is_dynamic(mass, &entry.shape);
        entry.mass = mass.max(0.0);
        if dynamic {
            if let Some(collider) = self.colliders.get_mut(entry.collider) {
                collider.set_mass(mass);
            }
        }
        let body = self
            .rigid_bodies
            .get_mut(entry.rigid_body)
            .ok_or_else(|| not_found(handle))?;
        let body_type = if dynamic { RigidBodyType::Dynamic } else { RigidBodyType::Fixed };
        body.set_body_type(body_type, true);
        body.recompute_mass_properties_from_colliders(&self.colliders);
        body.wake_up(true);
        Ok(())
    }

    pub fn set_material(&mut self, handle: BodyHandle, material: MaterialId) -> Result<()> {
        let entry = self.entries.get_mut(&handle).ok_or_else(|| not_found(handle))?;
        entry.material = material;
        if let Some(collider) = self.colliders.get_mut(entry.collider) {
            collider.user_data = u128::from(material.0);
        }
        Ok(())
    }

    /// Instantaneous impulse at a world-space point. Static bodies ignore it.
    pub fn apply_impulse(&mut self, handle: BodyHandle, impulse: DVec3, point: DVec3) -> Result<()> {
        let (_, body) = self.parts_mut(handle)?;
        body.apply_impulse_at_point(to_na(impulse), Point3::from(to_na(point)), true);
        Ok(())
    }

    /// Set or clear the force re-applied before every step. A non-zero
    /// force wakes the body.
    pub fn set_persistent_force(&mut self, handle: BodyHandle, force: Option<DVec3>) -> Result<()> {
        let (entry, body) = self.parts_mut(handle)?;
        entry.persistent_force = force;
        if force.is_some_and(|f| f != DVec3::ZERO) {
            body.wake_up(true);
        }
        Ok(())
    }

    /// Put the body to sleep immediately, zeroing its motion.
    pub fn sleep(&mut self, handle: BodyHandle) -> Result<()> {
        let (_, body) = self.parts_mut(handle)?;
        body.sleep();
        Ok(())
    }

    fn parts_mut(&mut self, handle: BodyHandle) -> Result<(&mut BodyEntry, &mut RigidBody)> {
        let entry = self.entries.get_mut(&handle).ok_or_else(|| not_found(handle))?;
        let body = self
            .rigid_bodies
            .get_mut(entry.rigid_body)
            .ok_or_else(|| not_found(handle))?;
        Ok((entry, body))
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Copy every persistent force into its body's force accumulator.
    /// A non-zero force keeps its body awake.
    pub fn apply_persistent_forces(&mut self) {
        for entry in self.entries.values() {
            let Some(force) = entry.persistent_force else {
                continue;
            };
            if let Some(body) = self.rigid_bodies.get_mut(entry.rigid_body) {
                body.reset_forces(false);
                body.add_force(to_na(force), force != DVec3::ZERO);
            }
        }
    }

    /// Advance by `dt` seconds of real time using `fixed`-second steps.
    ///
    /// Returns the number of internal steps taken.
    pub fn step(&mut self, fixed: f64, dt: f64, max_sub_steps: u32) -> Result<u32> {
        if !(fixed.is_finite() && fixed > 0.0) {
            return Err(Error::SimulationFault(format!("invalid fixed step {fixed}")));
        }
        if !dt.is_finite() {
            return Err(Error::SimulationFault(format!("invalid elapsed time {dt}")));
        }
        if dt <= 0.0 {
            return Ok(0);
        }

        self.accumulator += dt;
        let mut steps = 0;
        while self.accumulator + ACCUMULATOR_EPSILON >= fixed && steps < max_sub_steps {
            self.internal_step(fixed)?;
            if steps == 0 {
                self.clear_forces();
            }
            self.accumulator -= fixed;
            steps += 1;
        }
        if self.accumulator >= fixed {
            self.accumulator %= fixed;
        }
        if self.accumulator + ACCUMULATOR_EPSILON >= fixed || self.accumulator < 0.0 {
            self.accumulator = 0.0;
        }
        Ok(steps)
    }

    fn internal_step(&mut self, h: f64) -> Result<()> {
        self.check_finite()?;
        self.params.dt = h;
        let hooks = ContactHooks { materials: &self.materials };
        self.pipeline.step(
            &to_na(self.gravity),
            &self.params,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd,
            None,
            &hooks,
            &(),
        );
        self.check_finite()
    }

    fn clear_forces(&mut self) {
        for entry in self.entries.values() {
            if let Some(body) = self.rigid_bodies.get_mut(entry.rigid_body) {
                body.reset_forces(false);
            }
        }
    }

    fn check_finite(&self) -> Result<()> {
        for (handle, entry) in &self.entries {
            let Some(body) = self.rigid_bodies.get(entry.rigid_body) else {
                continue;
            };
            let finite = from_na(body.translation()).is_finite()
                && from_na(body.linvel()).is_finite()
                && from_na(body.angvel()).is_finite()
                && quat_from_na(body.rotation()).is_finite();
            if !finite {
                return Err(Error::SimulationFault(format!(
                    "body {handle} diverged to non-finite state"
                )));
            }
        }
        Ok(())
    }
}

fn is_dynamic(mass: f64, shape: &Shape) -> bool {
    mass > 0.0 && !matches!(shape, Shape::Plane)
}

fn not_found(handle: BodyHandle) -> Error {
    Error::NotFound(format!("Body {handle}"))
}
