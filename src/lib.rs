//! # scene-physics: Live Scene Graph ↔ Rigid-Body Bridge
//!
//! Keeps an observable scene graph and a fixed-step rigid-body simulation
//! in sync, in both directions.
//!
//! ## Design Principles
//!
//! 1. **Typed properties**: every node property has a declared kind; text is
//!    parsed at the boundary, never stored raw
//! 2. **Explicit notification**: observers are registered per `(node, property)`
//!    and structural changes arrive as [`SceneEvent`]s, no API wrapping
//! 3. **Bridge owns the simulation**: bodies, materials and interactions live
//!    in one [`World`] per [`PhysicsBridge`]; the graph only holds a
//!    [`BodyLink`] control surface
//! 4. **Origin-tagged writes**: simulation write-backs are tagged
//!    [`ChangeOrigin::Simulation`] so the bridge never re-applies its own output
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use scene_physics::{NodeKind, NodeTemplate, PhysicsBridge, PhysicsConfig, Scene};
//!
//! # async fn example() -> scene_physics::Result<()> {
//! let scene = Scene::new();
//! let crate_box = scene.append(
//!     scene.root(),
//!     NodeTemplate::new(NodeKind::Box)
//!         .id("crate")
//!         .attr("position", "0 5 0")
//!         .attr("mass", 2.0),
//! )?;
//!
//! let bridge = PhysicsBridge::new(scene.clone(), PhysicsConfig::default())?;
//! bridge.start()?;
//!
//! // Pushes go straight into the body.
//! scene.set(crate_box, "velocity", "1 0 0")?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod bridge;
pub mod config;
pub mod model;
pub mod scene;
pub mod sim;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{Node, NodeId, NodeKind, PropertyKind, PropertyMap, Rotation, Value, Vector};

// ============================================================================
// Re-exports: Scene
// ============================================================================

pub use scene::{
    BodyLink, ChangeOrigin, ListenerId, NodeTemplate, ObserverId, PropertyChange, Scene,
    SceneEvent, SceneListener,
};

// ============================================================================
// Re-exports: Simulation and bridge
// ============================================================================

pub use bridge::{BridgeStats, PhysicsBridge, StepReport};
pub use config::PhysicsConfig;
pub use sim::{BodyHandle, BodySnapshot, CoefficientField, ContactCoefficients, SleepState, World};

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Invalid value for '{property}': {reason}")]
    InvalidArgument { property: String, reason: String },

    #[error("Unknown material: \"{0}\"")]
    UnknownMaterial(String),

    #[error("Unsupported mutation of '{property}': {reason}")]
    UnsupportedMutation { property: String, reason: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid tree operation: {0}")]
    InvalidTree(String),

    #[error("Type error: expected {expected}, got {got}")]
    TypeError { expected: String, got: String },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Simulation fault: {0}")]
    SimulationFault(String),

    #[error("No async runtime available to drive the step loop")]
    NoRuntime,
}

pub type Result<T> = std::result::Result<T, Error>;
