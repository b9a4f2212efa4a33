//! JSON scene files
//!
//! Uses `serde_json::to_writer_pretty`/`from_reader` over buffered files,
//! so no intermediate string is built for file I/O.

use crate::io::IoError;
use crate::scene::{NodeConfig, Scene};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::debug;

/// Save a scene as pretty-printed JSON
pub fn save_scene(scene: &Scene, path: impl AsRef<Path>) -> Result<(), IoError> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, &scene.to_config())
        .map_err(|e| IoError::Serialization(e.to_string()))?;
    writer.flush()?;
    debug!(path = %path.display(), nodes = scene.node_count(), "scene saved");
    Ok(())
}

/// Load a scene from JSON
pub fn load_scene(path: impl AsRef<Path>) -> Result<Scene, IoError> {
    let path = path.as_ref();
    let reader = BufReader::new(File::open(path)?);
    let config: NodeConfig =
        serde_json::from_reader(reader).map_err(|e| IoError::Serialization(e.to_string()))?;
    let scene = Scene::from_config(&config)?;
    debug!(path = %path.display(), nodes = scene.node_count(), "scene loaded");
    Ok(scene)
}

/// Serialize a scene to a JSON string
pub fn to_json_string(scene: &Scene) -> Result<String, IoError> {
    serde_json::to_string_pretty(&scene.to_config()).map_err(|e| IoError::Serialization(e.to_string()))
}

/// Parse a scene from a JSON string
pub fn from_json_string(json: &str) -> Result<Scene, IoError> {
    let config: NodeConfig =
        serde_json::from_str(json).map_err(|e| IoError::Serialization(e.to_string()))?;
    Ok(Scene::from_config(&config)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ModifierConfig, SceneError};
    use crate::types::Material;
    use glam::Vec3;
    use std::fs;

    fn temp_path(name: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("sdf_scene_json_{}", name));
        path
    }

    fn sample_scene() -> Scene {
        let config = NodeConfig::new("opSmoothUnion")
            .arg("k", 0.25)
            .child(
                NodeConfig::new("sdSphere")
                    .arg("r", 1.0)
                    .material(Material::rgb(1.0, 0.2, 0.1)),
            )
            .child(
                NodeConfig::new("sdBox")
                    .arg("b", Vec3::new(0.5, 1.0, 0.5))
                    .modifier(ModifierConfig::new("opTranslate").arg("t", Vec3::new(1.0, 0.0, 0.0))),
            );
        Scene::from_config(&config).unwrap()
    }

    #[test]
    fn test_save_load() {
        let scene = sample_scene();
        let path = temp_path("save_load.json");

        save_scene(&scene, &path).unwrap();
        let loaded = load_scene(&path).unwrap();

        assert_eq!(loaded.to_config(), scene.to_config());
        fs::remove_file(&path).ok();
    }

    #[test]
    fn test_json_string_roundtrip() {
        let scene = sample_scene();
        let json = to_json_string(&scene).unwrap();
        let parsed = from_json_string(&json).unwrap();
        assert_eq!(parsed.node_count(), scene.node_count());
        assert_eq!(parsed.to_config(), scene.to_config());
    }

    #[test]
    fn test_json_readability() {
        let json = to_json_string(&sample_scene()).unwrap();
        assert!(json.contains("\"opSmoothUnion\""));
        assert!(json.contains("\"opTranslate\""));
        assert!(json.contains("\"children\""));
    }

    #[test]
    fn test_malformed_json() {
        assert!(matches!(from_json_string("{ not json"), Err(IoError::Serialization(_))));
    }

    #[test]
    fn test_unknown_operation_is_scene_error() {
        let result = from_json_string(r#"{"op": "sdTeapot"}"#);
        assert!(matches!(
            result,
            Err(IoError::Scene(SceneError::UnknownOperation(op))) if op == "sdTeapot"
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(load_scene(temp_path("does_not_exist.json")), Err(IoError::Io(_))));
    }
}
