use glam::Vec3;
use scene::{Material, Scene, Shape};

const SEABED: &str = r#"{
    "objects": [
        { "name": "seabed", "shape": "plane", "normal": [0.0, 1.0, 0.0], "offset": -15.0,
          "material": { "reflectivity": 0.4 } },
        { "name": "wreck", "shape": "box", "center": [0.0, -12.0, -30.0],
          "half_extents": [4.0, 3.0, 10.0] },
        { "shape": "sphere", "center": [5.0, -10.0, -20.0], "radius": 1.5,
          "material": { "reflectivity": 0.95 } }
    ]
}"#;

#[test]
fn scene_file_round_trips_through_json() {
    let scene: Scene = serde_json::from_str(SEABED).expect("parse scene");
    scene.validate().expect("valid scene");
    assert_eq!(scene.len(), 3);
    assert_eq!(scene.objects[0].name.as_deref(), Some("seabed"));
    assert!(matches!(scene.objects[1].shape, Shape::Box { .. }));
    assert_eq!(scene.objects[1].material, Material::default());

    let text = serde_json::to_string(&scene).expect("serialize");
    let again: Scene = serde_json::from_str(&text).expect("reparse");
    assert_eq!(again, scene);
}

#[test]
fn looking_down_hits_the_seabed() {
    let scene: Scene = serde_json::from_str(SEABED).expect("parse scene");
    let hit = scene.cast(Vec3::ZERO, Vec3::NEG_Y).expect("seabed below");
    assert!((hit.distance - 15.0).abs() < 1e-4);
    assert!((hit.normal - Vec3::Y).length() < 1e-5);
    assert!((hit.reflectivity - 0.4).abs() < 1e-6);
}

#[test]
fn invalid_scene_file_fails_validation() {
    let text = r#"{ "objects": [ { "shape": "sphere", "center": [0, 0, 0], "radius": -1.0 } ] }"#;
    let scene: Scene = serde_json::from_str(text).expect("parse scene");
    assert!(scene.validate().is_err());
}
