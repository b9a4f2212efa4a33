//! Scene file I/O
//!
//! Scenes are stored as their nested configuration in JSON, the same
//! shape [`Scene::from_config`] accepts. Loading rebuilds the scene and
//! re-validates every operation and argument.

mod json;

pub use json::{from_json_string, load_scene, save_scene, to_json_string};

use crate::scene::SceneError;
use thiserror::Error;

/// File I/O errors
#[derive(Error, Debug)]
pub enum IoError {
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// File parsed but does not describe a valid scene
    #[error("Invalid scene: {0}")]
    Scene(#[from] SceneError),
}
