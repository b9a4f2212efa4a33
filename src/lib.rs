//! # sdf-scene
//!
//! **Scene-graph compiler for signed distance fields**
//!
//! Procedural 3D models are authored as trees of SDF primitives combined by
//! boolean and displacement operators, with coordinate modifiers attached to
//! each node. This crate keeps that tree editable and lowers it for per-pixel
//! GPU evaluation in two equivalent ways.
//!
//! ## Features
//!
//! - **Registry**: every primitive, boolean, displacement and positioning
//!   operation with WGSL and GLSL bodies, CPU evaluators and stable opcodes
//! - **Scene graph**: mutable node tree with id pooling and change events
//! - **Expression compiler**: straight-line `sdScene` shader per scene
//! - **Bytecode compiler**: flat program for a fixed stack-machine kernel
//! - **CPU mirror**: the same stack machine, with normals and ambient occlusion
//! - **Reference evaluator**: recursive walk used to check both backends
//! - **File I/O**: JSON scene files
//!
//! ## Example
//!
//! ```rust
//! use sdf_scene::prelude::*;
//!
//! let config = NodeConfig::new("opUnion")
//!     .child(NodeConfig::new("sdSphere").arg("r", 1.0))
//!     .child(
//!         NodeConfig::new("sdSphere")
//!             .arg("r", 1.0)
//!             .modifier(ModifierConfig::new("opTranslate").arg("t", Vec3::new(3.0, 0.0, 0.0))),
//!     );
//! let scene = Scene::from_config(&config).unwrap();
//!
//! // Halfway between the spheres
//! let p = Vec3::new(1.5, 0.0, 0.0);
//! let reference = eval_scene(&scene, p).unwrap();
//! let compiled = CompiledProgram::compile(&scene, Dialect::Wgsl).unwrap();
//! assert!((reference - 0.5).abs() < 1e-6);
//! assert!((compiled.eval(p).unwrap() - reference).abs() < 1e-6);
//! ```

#![warn(missing_docs)]

pub mod types;
pub mod registry;
pub mod scene;
pub mod compiled;
pub mod eval;
pub mod io;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude - commonly used types and functions
pub mod prelude {
    pub use crate::types::{ArgType, ArgValue, Dialect, Material, SceneSample};
    pub use crate::registry::{Category, OperationDefinition, RegistryError};
    pub use crate::scene::{
        IdPool, Modifier, ModifierConfig, Node, NodeConfig, NodeId, Scene, SceneChange,
        SceneError, SceneObserver, MAX_NODE_ID,
    };
    pub use crate::compiled::{
        disassemble, eval_program, eval_program_ao, eval_program_batch,
        eval_program_batch_parallel, eval_program_normal, eval_program_sample, CompileError,
        CompiledProgram, KernelConfig, SceneShader, StackMachineKernel, VmError,
    };
    pub use crate::eval::{
        eval_batch, eval_batch_parallel, eval_grid, eval_node, eval_scene, eval_scene_sample,
        SceneEvaluator,
    };
    pub use crate::io::{from_json_string, load_scene, save_scene, to_json_string, IoError};
    pub use glam::{Mat4, Quat, Vec2, Vec3, Vec4};
}
