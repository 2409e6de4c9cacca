//! # Physics Bridge
//!
//! Maps scene nodes to rigid bodies and keeps both sides in step.
//!
//! ```text
//!   Scene ──set()──► push observers ──► World        (graph → simulation)
//!   Scene ◄──set_from(Simulation)── write-back ◄── step   (simulation → graph)
//! ```
//!
//! All simulation state sits behind one mutex inside [`PhysicsBridge`]. Push
//! observers, scene events, body links and the step timer all take that lock,
//! so steps and property dispatch are serialized. The step releases the lock
//! before writing back, which lets foreign observers of the written
//! properties call back into the bridge.

mod binding;
mod step_loop;
mod writeback;

pub use step_loop::StepReport;

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::PhysicsConfig;
use crate::model::{NodeId, Vector};
use crate::scene::{ChangeOrigin, ListenerId, Scene, SceneEvent, SceneListener};
use crate::sim::{BodyDesc, BodyHandle, BodySnapshot, ContactCoefficients, Shape, SleepState, World};
use crate::{Error, Result};
use binding::{Binding, Target};
use step_loop::StepClock;
use writeback::NodeState;

/// Running totals since the bridge was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    /// Steps taken (baseline samples excluded).
    pub steps: u64,
    pub sub_steps: u64,
    pub written: u64,
    pub write_back_failures: u64,
}

/// Everything the bridge owns on the simulation side.
pub(crate) struct SimState {
    pub world: World,
    pub bindings: BTreeMap<NodeId, Binding>,
    pub initialized: bool,
    ground: Option<BodyHandle>,
}

impl SimState {
    fn new(config: &PhysicsConfig) -> Self {
        Self {
            world: World::new(config.world_settings()),
            bindings: BTreeMap::new(),
            initialized: false,
            ground: None,
        }
    }
}

/// State shared with observers, body links and the timer task.
pub(crate) struct BridgeShared {
    pub scene: Scene,
    pub config: PhysicsConfig,
    pub sim: Mutex<SimState>,
    clock: Mutex<StepClock>,
    stats: Mutex<BridgeStats>,
}

#[derive(Default)]
struct Control {
    timer: Option<JoinHandle<()>>,
    listener: Option<ListenerId>,
}

/// Live two-way synchronization between one [`Scene`] and one [`World`].
pub struct PhysicsBridge {
    shared: Arc<BridgeShared>,
    control: Mutex<Control>,
}

impl PhysicsBridge {
    pub fn new(scene: Scene, config: PhysicsConfig) -> Result<Self> {
        config.validate()?;
        let sim = SimState::new(&config);
        Ok(Self {
            shared: Arc::new(BridgeShared {
                scene,
                config,
                sim: Mutex::new(sim),
                clock: Mutex::new(StepClock::default()),
                stats: Mutex::new(BridgeStats::default()),
            }),
            control: Mutex::new(Control::default()),
        })
    }

    pub fn scene(&self) -> &Scene {
        &self.shared.scene
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.shared.config
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Bind every node already in the graph and start listening for
    /// structural changes. A second call is a no-op.
    ///
    /// If any node fails to bind, nothing stays bound and the error is
    /// returned.
    pub fn init(&self) -> Result<()> {
        let shared = &self.shared;
        let mut sim = shared.sim.lock();
        if sim.initialized {
            debug!("physics bridge already initialized");
            return Ok(());
        }

        sim.world.gravity = shared.config.default_gravity.into();
        let nodes = shared.scene.descendants(shared.scene.root())?;
        if let Err(e) = binding::bind_nodes(shared, &mut sim, &nodes) {
            *sim = SimState::new(&shared.config);
            return Err(e);
        }

        if shared.config.ground_plane {
            let materials = &sim.world.materials;
            let material = materials.resolve("ground").unwrap_or(materials.default_material());
            let ground = sim.world.add_body(BodyDesc {
                mass: 0.0,
                shape: Shape::Plane,
                material,
                position: glam::DVec3::ZERO,
                orientation: binding::ground_orientation(),
                velocity: glam::DVec3::ZERO,
            });
            sim.ground = Some(ground);
        }

        let listener = shared
            .scene
            .subscribe(Arc::new(SceneEvents(Arc::downgrade(shared))));
        self.control.lock().listener = Some(listener);
        sim.initialized = true;
        info!(
            bound = sim.bindings.len(),
            bodies = sim.world.body_count(),
            gravity = %Vector::from(sim.world.gravity),
            "physics bridge initialized"
        );
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.sim.lock().initialized
    }

    /// Initialize if needed, then start the fixed-cadence step timer on the
    /// current tokio runtime. Starting a running bridge is a no-op.
    pub fn start(&self) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| Error::NoRuntime)?;
        self.init()?;

        let mut control = self.control.lock();
        if control.timer.as_ref().is_some_and(|t| !t.is_finished()) {
            debug!("step loop already running");
            return Ok(());
        }
        self.shared.clock.lock().reset();
        let period = self.shared.config.tick_period();
        control.timer = Some(runtime.spawn(step_loop::run(Arc::downgrade(&self.shared), period)));
        info!(period_ms = period.as_secs_f64() * 1000.0, "step loop started");
        Ok(())
    }

    /// Cancel the step timer. Returns `true` if a running timer was
    /// cancelled, `false` if none was running.
    pub fn stop(&self) -> bool {
        let Some(timer) = self.control.lock().timer.take() else {
            return false;
        };
        if timer.is_finished() {
            return false;
        }
        timer.abort();
        info!("step loop stopped");
        true
    }

    pub fn is_running(&self) -> bool {
        self.control
            .lock()
            .timer
            .as_ref()
            .is_some_and(|t| !t.is_finished())
    }

    /// Stop, detach from the scene and empty the world. The bridge can be
    /// initialized again afterwards.
    pub fn shutdown(&self) {
        self.stop();
        if let Some(listener) = self.control.lock().listener.take() {
            self.shared.scene.unsubscribe(listener);
        }
        let mut sim = self.shared.sim.lock();
        if !sim.initialized && sim.bindings.is_empty() {
            return;
        }
        let nodes: Vec<NodeId> = sim.bindings.keys().copied().collect();
        for node in nodes {
            binding::unbind_node(&self.shared, &mut sim, node);
        }
        *sim = SimState::new(&self.shared.config);
        info!("physics bridge shut down");
    }

    // ========================================================================
    // Stepping
    // ========================================================================

    /// Sample the clock at `now` and step by the elapsed time.
    ///
    /// The first sample after creation or `start` only records a baseline
    /// and returns `None`.
    pub fn tick_at(&self, now: Instant) -> Result<Option<StepReport>> {
        self.shared.tick_at(now)
    }

    /// Step by `dt` seconds of real time, then write back.
    pub fn step(&self, dt: f64) -> Result<StepReport> {
        self.shared.step(dt)
    }

    pub fn stats(&self) -> BridgeStats {
        *self.shared.stats.lock()
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// Snapshot of the body bound to `node`.
    pub fn body(&self, node: NodeId) -> Option<BodySnapshot> {
        let sim = self.shared.sim.lock();
        let handle = body_handle(&sim, node)?;
        sim.world.body(handle)
    }

    pub fn body_handle(&self, node: NodeId) -> Option<BodyHandle> {
        body_handle(&self.shared.sim.lock(), node)
    }

    /// Name of the material the body bound to `node` currently uses.
    pub fn body_material(&self, node: NodeId) -> Option<String> {
        let sim = self.shared.sim.lock();
        let handle = body_handle(&sim, node)?;
        let material = sim.world.body(handle)?.material;
        sim.world.materials.name_of(material).map(str::to_owned)
    }

    pub fn is_bound(&self, node: NodeId) -> bool {
        self.shared.sim.lock().bindings.contains_key(&node)
    }

    pub fn gravity(&self) -> Vector {
        self.shared.sim.lock().world.gravity.into()
    }

    /// Live coefficients of the interaction between two named materials.
    pub fn interaction(&self, a: &str, b: &str) -> Result<Option<ContactCoefficients>> {
        let sim = self.shared.sim.lock();
        Ok(sim.world.materials.interaction_by_name(a, b)?.copied())
    }

    pub fn ground_body(&self) -> Option<BodyHandle> {
        self.shared.sim.lock().ground
    }

    /// Run `f` against the world under the simulation lock.
    ///
    /// `f` must not touch the scene or the bridge.
    pub fn with_world<R>(&self, f: impl FnOnce(&mut World) -> R) -> R {
        f(&mut self.shared.sim.lock().world)
    }
}

impl Drop for PhysicsBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn body_handle(sim: &SimState, node: NodeId) -> Option<BodyHandle> {
    match sim.bindings.get(&node)?.target {
        Target::Body { handle, .. } => Some(handle),
        _ => None,
    }
}

// ============================================================================
// Step + write-back
// ============================================================================

impl BridgeShared {
    pub(crate) fn tick_at(&self, now: Instant) -> Result<Option<StepReport>> {
        let Some(dt) = self.clock.lock().sample(now) else {
            trace!("step clock baseline recorded");
            return Ok(None);
        };
        self.step(dt).map(Some)
    }

    fn step(&self, dt: f64) -> Result<StepReport> {
        let (sub_steps, awake) = {
            let mut sim = self.sim.lock();
            sim.world.apply_persistent_forces();
            let sub_steps =
                sim.world
                    .step(self.config.fixed_time_step, dt, self.config.max_sub_steps)?;
            let state = &*sim;
            let awake: Vec<(NodeId, BodySnapshot)> = state
                .bindings
                .iter()
                .filter_map(|(node, binding)| match binding.target {
                    Target::Body { handle, write_back: true } => state
                        .world
                        .body(handle)
                        .filter(|body| body.sleep_state != SleepState::Sleeping)
                        .map(|body| (*node, body)),
                    _ => None,
                })
                .collect();
            (sub_steps, awake)
        };

        let mut report = StepReport { dt, sub_steps, ..Default::default() };
        for (node, body) in awake {
            let state = match self.node_state(node) {
                Ok(state) => state,
                Err(e) => {
                    warn!(%node, error = %e, "cannot read node for write-back");
                    report.failures += 1;
                    continue;
                }
            };
            for (property, value) in writeback::diff(&state, &body, self.config.dead_band) {
                trace!(%node, property, %value, "write-back");
                match self.scene.set_from(node, property, value, ChangeOrigin::Simulation) {
                    Ok(()) => report.written += 1,
                    Err(e) => {
                        warn!(%node, property, error = %e, "write-back rejected by observer");
                        report.failures += 1;
                    }
                }
            }
        }

        let mut stats = self.stats.lock();
        stats.steps += 1;
        stats.sub_steps += u64::from(sub_steps);
        stats.written += report.written as u64;
        stats.write_back_failures += report.failures as u64;
        trace!(dt, sub_steps, written = report.written, "step");
        Ok(report)
    }

    fn node_state(&self, node: NodeId) -> Result<NodeState> {
        Ok(NodeState {
            position: self.scene.get_vector(node, "position")?,
            velocity: self.scene.get_vector(node, "velocity")?,
            rotation: self.scene.get_rotation(node, "rotation")?,
        })
    }
}

// ============================================================================
// Scene events
// ============================================================================

/// Binds appended subtrees and unbinds removed ones.
struct SceneEvents(Weak<BridgeShared>);

impl SceneListener for SceneEvents {
    fn on_event(&self, scene: &Scene, event: &SceneEvent) -> Result<()> {
        let Some(shared) = self.0.upgrade() else {
            return Ok(());
        };
        let (SceneEvent::NodeAppended { node, .. } | SceneEvent::NodeRemoved { node, .. }) = *event;
        let mut subtree = vec![node];
        subtree.extend(scene.descendants(node)?);

        let mut sim = shared.sim.lock();
        if !sim.initialized {
            return Ok(());
        }
        match event {
            SceneEvent::NodeAppended { .. } => {
                let bound = binding::bind_nodes(&shared, &mut sim, &subtree)?;
                debug!(%node, bound, "subtree appended");
            }
            SceneEvent::NodeRemoved { .. } => {
                let unbound = subtree
                    .into_iter()
                    .filter(|id| binding::unbind_node(&shared, &mut sim, *id))
                    .count();
                debug!(%node, unbound, "subtree removed");
            }
        }
        Ok(())
    }
}
