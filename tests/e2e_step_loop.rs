//! End-to-end tests for stepping, write-back and the step timer.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use scene_physics::scene::NodeTemplate;
use scene_physics::{ChangeOrigin, Error, NodeId, PhysicsBridge, PhysicsConfig, Scene, SleepState, Vector};

const H: f64 = 1.0 / 50.0;

// ============================================================================
// Helpers
// ============================================================================

/// A floating scene: zero gravity, no ground.
fn drifting(velocity: &str) -> (Scene, NodeId, PhysicsBridge) {
    let scene = Scene::new();
    let root = scene.root();
    scene
        .append(root, NodeTemplate::tag("physics").attr("gravity", "0 0 0"))
        .unwrap();
    let id = scene
        .append(
            root,
            NodeTemplate::tag("box")
                .attr("position", "0 5 0")
                .attr("velocity", velocity)
                .attr("mass", 1),
        )
        .unwrap();
    let config = PhysicsConfig { ground_plane: false, ..Default::default() };
    let bridge = PhysicsBridge::new(scene.clone(), config).unwrap();
    bridge.init().unwrap();
    (scene, id, bridge)
}

/// Counts simulation-origin notifications on `(node, property)`.
fn count_write_backs(scene: &Scene, node: NodeId, property: &str) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&count);
    scene
        .add_property_change_observer(node, property, move |change| {
            if change.origin == ChangeOrigin::Simulation {
                c.fetch_add(1, Ordering::SeqCst);
            }
            Ok(())
        })
        .unwrap();
    count
}

// ============================================================================
// 1. Dead-band
// ============================================================================

#[test]
fn test_small_displacement_not_written_back() {
    let (scene, id, bridge) = drifting("0.5 0 0");
    let writes = count_write_backs(&scene, id, "position");

    let report = bridge.step(H).unwrap();
    assert_eq!(report.sub_steps, 1);
    assert_eq!(report.written, 0);
    assert_eq!(writes.load(Ordering::SeqCst), 0);
    assert_eq!(scene.get_vector(id, "position").unwrap(), Vector::new(0.0, 5.0, 0.0));
    // The body itself did move.
    assert!(bridge.body(id).unwrap().position.x > 0.0);
}

#[test]
fn test_displacement_past_dead_band_written_back() {
    let (scene, id, bridge) = drifting("0.5 0 0");
    let writes = count_write_backs(&scene, id, "position");

    // 0.5 m/s crosses 0.1 m (squared distance 0.01) after 11 steps of 20 ms.
    for _ in 0..10 {
        bridge.step(H).unwrap();
    }
    assert_eq!(writes.load(Ordering::SeqCst), 0);
    for _ in 0..2 {
        bridge.step(H).unwrap();
    }
    assert_eq!(writes.load(Ordering::SeqCst), 1);

    let written = scene.get_vector(id, "position").unwrap();
    assert!(written.x > 0.1 && written.x < 0.13, "x = {}", written.x);
    assert_eq!(written.y, 5.0);
}

#[test]
fn test_write_back_does_not_echo_into_body() {
    let (scene, id, bridge) = drifting("0 0 0");
    let handle = bridge.body_handle(id).unwrap();
    bridge.with_world(|w| w.set_position(handle, Vector::new(3.0, 5.0, 0.0).into()).unwrap());
    bridge.step(H).unwrap();
    assert_eq!(scene.get_vector(id, "position").unwrap().x, 3.0);
    // Still exactly where the simulation put it.
    assert_eq!(bridge.body(id).unwrap().position.x, 3.0);
}

// ============================================================================
// 2. Falling bodies and sleeping
// ============================================================================

#[test]
fn test_falling_body_written_back() {
    let scene = Scene::new();
    let id = scene
        .append(scene.root(), NodeTemplate::tag("box").attr("position", "0 10 0").attr("mass", 1))
        .unwrap();
    let bridge = PhysicsBridge::new(scene.clone(), PhysicsConfig::default()).unwrap();
    bridge.init().unwrap();

    for _ in 0..10 {
        bridge.step(H).unwrap();
    }
    let position = scene.get_vector(id, "position").unwrap();
    let velocity = scene.get_vector(id, "velocity").unwrap();
    assert!(position.y < 10.0);
    assert!(velocity.y < -1.0);
}

#[test]
fn test_settled_body_sleeps_and_stops_writing() {
    let scene = Scene::new();
    let id = scene
        .append(scene.root(), NodeTemplate::tag("box").attr("position", "0 1 0").attr("mass", 1))
        .unwrap();
    let bridge = PhysicsBridge::new(scene.clone(), PhysicsConfig::default()).unwrap();
    bridge.init().unwrap();

    for _ in 0..400 {
        bridge.step(H).unwrap();
    }
    assert_eq!(bridge.body(id).unwrap().sleep_state, SleepState::Sleeping);
    let y = scene.get_vector(id, "position").unwrap().y;
    assert!((y - 0.5).abs() < 0.15, "y = {y}");

    let writes = count_write_backs(&scene, id, "position");
    for _ in 0..50 {
        bridge.step(H).unwrap();
    }
    assert_eq!(writes.load(Ordering::SeqCst), 0);
}

#[test]
fn test_sleeping_body_never_written_back() {
    let (scene, id, bridge) = drifting("0 0 0");
    let handle = bridge.body_handle(id).unwrap();
    bridge.with_world(|w| {
        w.set_position(handle, Vector::new(100.0, 5.0, 0.0).into()).unwrap();
        w.sleep(handle).unwrap();
    });
    let writes = count_write_backs(&scene, id, "position");

    let report = bridge.step(H).unwrap();
    assert_eq!(report.written, 0);
    assert_eq!(writes.load(Ordering::SeqCst), 0);
    assert_eq!(scene.get_vector(id, "position").unwrap().x, 0.0);
}

#[test]
fn test_pushed_velocity_wakes_body() {
    let (scene, id, bridge) = drifting("0 0 0");
    let handle = bridge.body_handle(id).unwrap();
    bridge.with_world(|w| w.sleep(handle).unwrap());
    assert_eq!(bridge.body(id).unwrap().sleep_state, SleepState::Sleeping);

    scene.set(id, "velocity", "0 0 3").unwrap();
    assert_eq!(bridge.body(id).unwrap().sleep_state, SleepState::Awake);
}

#[test]
fn test_player_never_written_back() {
    let scene = Scene::new();
    let player = scene
        .append(scene.root(), NodeTemplate::tag("player").attr("position", "0 10 0").attr("mass", 1))
        .unwrap();
    let bridge = PhysicsBridge::new(scene.clone(), PhysicsConfig::default()).unwrap();
    bridge.init().unwrap();

    for _ in 0..20 {
        bridge.step(H).unwrap();
    }
    assert!(bridge.body(player).unwrap().position.y < 10.0);
    assert_eq!(scene.get_vector(player, "position").unwrap(), Vector::new(0.0, 10.0, 0.0));
}

#[test]
fn test_luggage_comes_to_rest_on_static_train() {
    let scene = Scene::new();
    let root = scene.root();
    scene
        .append(root, NodeTemplate::tag("box").id("train").attr("position", "0 1 0").attr("mass", 0))
        .unwrap();
    let luggage = scene
        .append(root, NodeTemplate::tag("box").attr("position", "0 3 0").attr("mass", 1))
        .unwrap();
    let config = PhysicsConfig { ground_plane: false, ..Default::default() };
    let bridge = PhysicsBridge::new(scene.clone(), config).unwrap();
    bridge.init().unwrap();

    for _ in 0..100 {
        bridge.step(H).unwrap();
    }
    let y = scene.get_vector(luggage, "position").unwrap().y;
    assert!((y - 2.0).abs() < 0.15, "y = {y}");
}

// ============================================================================
// 3. Forces
// ============================================================================

#[test]
fn test_persistent_force_reapplied_every_step() {
    let (scene, id, bridge) = drifting("0 0 0");
    let link = scene.body(id).unwrap();
    link.set_persistent_force(Vector::new(2.0, 0.0, 0.0)).unwrap();

    bridge.step(H).unwrap();
    let v1 = bridge.body(id).unwrap().velocity.x;
    bridge.step(H).unwrap();
    let v2 = bridge.body(id).unwrap().velocity.x;
    assert!(v1 > 0.0 && v2 > v1 * 1.9);

    link.clear_persistent_force().unwrap();
    bridge.step(H).unwrap();
    let v3 = bridge.body(id).unwrap().velocity.x;
    assert!(v3 <= v2);
}

// ============================================================================
// 4. Failures during a step
// ============================================================================

#[test]
fn test_rejected_write_back_is_counted_not_fatal() {
    let (scene, id, bridge) = drifting("5 0 0");
    scene
        .add_property_change_observer(id, "position", |change| {
            if change.origin == ChangeOrigin::Simulation {
                return Err(Error::InvalidArgument {
                    property: "position".into(),
                    reason: "read-only replica".into(),
                });
            }
            Ok(())
        })
        .unwrap();

    let report = bridge.step(4.0 * H).unwrap();
    assert_eq!(report.failures, 1);
    assert_eq!(bridge.stats().write_back_failures, 1);
    // Value was committed before the observer rejected it.
    assert!(scene.get_vector(id, "position").unwrap().x > 0.1);
}

#[test]
fn test_non_finite_state_is_a_fault() {
    let (_scene, id, bridge) = drifting("0 0 0");
    let handle = bridge.body_handle(id).unwrap();
    bridge.with_world(|w| w.set_velocity(handle, Vector::new(f64::NAN, 0.0, 0.0).into()).unwrap());
    assert!(matches!(bridge.step(H), Err(Error::SimulationFault(_))));
}

// ============================================================================
// 5. Clock sampling
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_first_tick_only_records_baseline() {
    let (_scene, _id, bridge) = drifting("1 0 0");
    let t0 = tokio::time::Instant::now();

    assert_eq!(bridge.tick_at(t0).unwrap(), None);
    assert_eq!(bridge.stats().steps, 0);

    let report = bridge.tick_at(t0 + Duration::from_millis(20)).unwrap().unwrap();
    assert!((report.dt - H).abs() < 1e-9);
    assert_eq!(report.sub_steps, 1);
}

#[tokio::test(start_paused = true)]
async fn test_long_stall_capped_at_max_sub_steps() {
    let (_scene, _id, bridge) = drifting("1 0 0");
    let t0 = tokio::time::Instant::now();
    bridge.tick_at(t0).unwrap();
    let report = bridge.tick_at(t0 + Duration::from_secs(2)).unwrap().unwrap();
    assert_eq!(report.sub_steps, 3);
}

// ============================================================================
// 6. Step timer
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_start_steps_until_stopped() {
    let (_scene, _id, bridge) = drifting("1 0 0");
    bridge.start().unwrap();
    assert!(bridge.is_running());

    tokio::time::sleep(Duration::from_millis(210)).await;
    let steps = bridge.stats().steps;
    assert!(steps >= 5, "steps = {steps}");

    assert!(bridge.stop());
    assert!(!bridge.is_running());
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(bridge.stats().steps, steps);

    assert!(!bridge.stop());
}

#[tokio::test(start_paused = true)]
async fn test_start_initializes_and_is_idempotent() {
    let scene = Scene::new();
    let id = scene.append(scene.root(), NodeTemplate::tag("box")).unwrap();
    let bridge = PhysicsBridge::new(scene, PhysicsConfig::default()).unwrap();

    bridge.start().unwrap();
    bridge.start().unwrap();
    assert!(bridge.is_initialized());
    assert!(bridge.is_bound(id));
    assert!(bridge.stop());
    assert!(!bridge.stop());
}

#[tokio::test(start_paused = true)]
async fn test_fault_stops_the_loop() {
    let (_scene, id, bridge) = drifting("0 0 0");
    bridge.start().unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let handle = bridge.body_handle(id).unwrap();
    bridge.with_world(|w| {
        w.set_velocity(handle, Vector::new(0.0, f64::INFINITY, 0.0).into()).unwrap();
    });
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(!bridge.is_running());
    assert!(!bridge.stop());
}

#[test]
fn test_start_without_runtime_fails() {
    let (_scene, _id, bridge) = drifting("0 0 0");
    assert!(matches!(bridge.start(), Err(Error::NoRuntime)));
    assert!(!bridge.is_running());
    assert!(!bridge.stop());
}
