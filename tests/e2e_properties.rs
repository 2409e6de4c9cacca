//! Property-based tests for textual property assignment.
//!
//! Valid "x y z" strings round-trip exactly through `set`/`get`; malformed or
//! non-finite strings are rejected and leave the previous value in place.

use proptest::prelude::*;
use scene_physics::scene::NodeTemplate;
use scene_physics::{Error, NodeId, PhysicsBridge, PhysicsConfig, Rotation, Scene, Vector};

fn scene_with_box() -> (Scene, NodeId) {
    let scene = Scene::new();
    let id = scene
        .append(scene.root(), NodeTemplate::tag("box").attr("position", "1 2 3"))
        .unwrap();
    (scene, id)
}

fn component() -> impl Strategy<Value = f64> {
    prop_oneof![-1.0e6..1.0e6, -1.0..1.0, Just(0.0), Just(-0.0)]
}

fn malformed() -> impl Strategy<Value = String> {
    prop_oneof![
        Just(String::new()),
        Just("1 2".to_string()),
        Just("1 2 3 4".to_string()),
        Just("NaN 0 0".to_string()),
        Just("0 inf 0".to_string()),
        Just("0 0 -inf".to_string()),
        Just("1e400 0 0".to_string()),
        "[a-z]{1,6} [a-z]{1,6} [a-z]{1,6}",
        (component(), component()).prop_map(|(x, y)| format!("{x} {y} oops")),
    ]
}

proptest! {
    #[test]
    fn prop_vector_text_round_trips(x in component(), y in component(), z in component()) {
        let (scene, id) = scene_with_box();
        scene.set(id, "position", format!("{x} {y} {z}")).unwrap();
        prop_assert_eq!(scene.get_vector(id, "position").unwrap(), Vector::new(x, y, z));
    }

    #[test]
    fn prop_rotation_text_round_trips(x in component(), y in component(), z in component()) {
        let (scene, id) = scene_with_box();
        scene.set(id, "rotation", format!("{x} {y} {z}")).unwrap();
        prop_assert_eq!(scene.get_rotation(id, "rotation").unwrap(), Rotation::new(x, y, z));
    }

    #[test]
    fn prop_malformed_vector_rejected(text in malformed()) {
        let (scene, id) = scene_with_box();
        let err = scene.set(id, "position", text.as_str()).unwrap_err();
        let is_invalid = matches!(err, Error::InvalidArgument { ref property, .. } if property == "position");
        prop_assert!(is_invalid, "unexpected error {:?}", err);
        prop_assert_eq!(scene.get_vector(id, "position").unwrap(), Vector::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn prop_malformed_rotation_rejected(text in malformed()) {
        let (scene, id) = scene_with_box();
        let err = scene.set(id, "rotation", text.as_str()).unwrap_err();
        let is_invalid = matches!(err, Error::InvalidArgument { .. });
        prop_assert!(is_invalid, "unexpected error {:?}", err);
        prop_assert_eq!(scene.get_rotation(id, "rotation").unwrap(), Rotation::ZERO);
    }

    #[test]
    fn prop_bound_position_pushed_exactly(x in component(), y in component(), z in component()) {
        let (scene, id) = scene_with_box();
        let bridge = PhysicsBridge::new(scene.clone(), PhysicsConfig::default()).unwrap();
        bridge.init().unwrap();
        scene.set(id, "position", format!("{x} {y} {z}")).unwrap();
        prop_assert_eq!(bridge.body(id).unwrap().position, Vector::new(x, y, z));
    }
}
