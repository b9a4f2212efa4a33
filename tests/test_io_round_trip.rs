//! Integration tests: scene files survive a save/load cycle unchanged

mod common;

use common::*;
use sdf_scene::prelude::*;
use std::fs;

fn temp_path(name: &str) -> std::path::PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("sdf_scene_io_{}", name));
    path
}

#[test]
fn saved_scene_compiles_identically() {
    let scene = build(&mixed_scene());
    let path = temp_path("mixed.json");
    save_scene(&scene, &path).unwrap();
    let loaded = load_scene(&path).unwrap();
    fs::remove_file(&path).ok();

    for dialect in Dialect::ALL {
        let original = CompiledProgram::compile(&scene, dialect).unwrap();
        let reloaded = CompiledProgram::compile(&loaded, dialect).unwrap();
        assert_eq!(original.program, reloaded.program);
        assert_eq!(original.source, reloaded.source);

        let original = SceneShader::compile(&scene, dialect, true).unwrap();
        let reloaded = SceneShader::compile(&loaded, dialect, true).unwrap();
        assert_eq!(original.source, reloaded.source);
    }
}

#[test]
fn ids_and_names_survive() {
    let config = two_spheres().named("pair");
    let scene = build(&config);
    let loaded = from_json_string(&to_json_string(&scene).unwrap()).unwrap();

    assert_eq!(loaded.root().name(), Some("pair"));
    let mut ids = Vec::new();
    loaded.traverse(|node, _| ids.push(node.id()));
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(loaded.node(2).unwrap().material(), Material::rgb(0.0, 0.0, 1.0));
}

#[test]
fn hand_written_scene_loads() {
    let json = r#"{
        "op": "opUnion",
        "children": [
            { "op": "sdSphere", "args": { "r": 1.0 } },
            {
                "op": "sdSphere",
                "args": { "r": 1 },
                "modifiers": [{ "op": "opTranslate", "args": { "t": [3, 0, 0] } }]
            }
        ]
    }"#;
    let scene = from_json_string(json).unwrap();
    assert_eq!(scene.node_count(), 3);
    assert_close(eval_scene(&scene, Vec3::new(1.5, 0.0, 0.0)).unwrap(), 0.5, 1e-6, "midpoint");
}

#[test]
fn invalid_argument_is_rejected_on_load() {
    let json = r#"{ "op": "sdSphere", "args": { "r": [1, 2] } }"#;
    assert!(matches!(
        from_json_string(json),
        Err(IoError::Scene(SceneError::InvalidArgument { .. }))
    ));
}
