//! Compiled scene backends
//!
//! A scene can be lowered two ways, both for WGSL and GLSL:
//!
//! - [`SceneShader`] (expression compiler): the whole tree becomes straight-line
//!   code inside one `sdScene` function. Fast to run, but every edit needs a
//!   new shader.
//! - [`CompiledProgram`] (bytecode compiler): the tree becomes a flat `f32`
//!   program interpreted by a fixed stack-machine kernel
//!   ([`StackMachineKernel`]). Argument edits only re-upload the program.
//!
//! The same program runs on the CPU through [`eval_program`] and its
//! siblings, which is how the two backends are checked against each other.
//!
//! # Example
//!
//! ```rust
//! use sdf_scene::prelude::*;
//!
//! let config = NodeConfig::new("opUnion")
//!     .child(NodeConfig::new("sdSphere").arg("r", 1.0))
//!     .child(
//!         NodeConfig::new("sdBox")
//!             .arg("b", Vec3::splat(0.5))
//!             .modifier(ModifierConfig::new("opTranslate").arg("t", Vec3::new(3.0, 0.0, 0.0))),
//!     );
//! let scene = Scene::from_config(&config).unwrap();
//!
//! let shader = SceneShader::compile(&scene, Dialect::Wgsl, false).unwrap();
//! assert!(shader.source.contains("fn sdScene("));
//!
//! let compiled = CompiledProgram::compile(&scene, Dialect::Glsl).unwrap();
//! let d = compiled.eval(Vec3::ZERO).unwrap();
//! assert!((d + 1.0).abs() < 1e-5);
//! ```
//!
//! # Program layout
//!
//! | Element | Layout |
//! |---------|--------|
//! | Modifier | opcode, literals |
//! | Leaf | opcode, literals, r, g, b, a, id |
//! | Combiner | children in order, then opcode, literals after each child past the first |
//! | Empty combiner | `EMPTY`, r, g, b, a, id |
//! | Modifier scope end | `POP_CONTEXT` per modifier |

mod bytecode;
pub mod dialect;
mod expression;
mod kernel;
pub mod opcode;
mod resolve;
mod vm;

pub use bytecode::CompiledProgram;
pub use dialect::{format_literal, Glsl, ShaderLang, Wgsl};
pub use expression::SceneShader;
pub use kernel::{KernelConfig, StackMachineKernel, AO_DIRECTIONS};
pub use opcode::{Control, Decoded};
pub use vm::{
    disassemble, eval_program, eval_program_ao, eval_program_batch,
    eval_program_batch_parallel, eval_program_normal, eval_program_sample, Instruction,
    StackValue, VmError,
};

pub(crate) use resolve::{ResolvedNode, Role};
pub(crate) use vm::{central_normal, occlusion};

use crate::registry::Category;
use crate::scene::NodeId;
use crate::types::{ArgType, Dialect};
use thiserror::Error;

/// Distance of a combiner without children
pub const EMPTY_DISTANCE: f32 = 1e10;

/// Id reported where no surface exists (`-1` in kernel code)
pub const NO_SURFACE: u32 = u32::MAX;

/// Maximum program length in floats (the kernel's uniform array size)
pub const MAX_PROGRAM_LENGTH: usize = 4096;

/// Maximum value stack depth of the stack machine
pub const MAX_VALUE_STACK: usize = 32;

/// Maximum modifier frame depth of the stack machine
pub const MAX_FRAME_STACK: usize = 16;

/// Scene compilation errors
///
/// Node-level errors name the offending node id.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// Operation name not in the registry
    #[error("node {node}: unknown operation '{op}'")]
    UnknownOperation {
        /// Offending node
        node: NodeId,
        /// Operation name
        op: String,
    },

    /// A literal argument has no value on the node or modifier
    #[error("node {node}: {op} is missing argument '{arg}'")]
    MissingArgument {
        /// Offending node
        node: NodeId,
        /// Operation name
        op: &'static str,
        /// Argument name
        arg: &'static str,
    },

    /// A supplied argument has the wrong type
    #[error("node {node}: {op} argument '{arg}' expects {expected}, got {found}")]
    InvalidArgument {
        /// Offending node
        node: NodeId,
        /// Operation name
        op: &'static str,
        /// Argument name
        arg: &'static str,
        /// Declared type
        expected: ArgType,
        /// Supplied type
        found: ArgType,
    },

    /// Operation category cannot appear in this position
    #[error("node {node}: {op} ({category}) cannot be used {position}")]
    UnsupportedCategory {
        /// Offending node
        node: NodeId,
        /// Operation name
        op: &'static str,
        /// Its category
        category: Category,
        /// "as a node" or "as a modifier"
        position: &'static str,
    },

    /// A referenced operation has no body in the target dialect
    #[error("operation '{op}' has no {dialect} body")]
    MissingDialectBody {
        /// Operation name
        op: &'static str,
        /// Target dialect
        dialect: Dialect,
    },

    /// Node id cannot be stored exactly as a program float
    #[error("node {0}: id exceeds the largest encodable id 16777215")]
    IdOutOfRange(NodeId),

    /// Boolean operation with more than one literal float
    #[error("node {node}: {op} has {count} literal floats, at most 1 is supported")]
    TooManyBlendArguments {
        /// Offending node
        node: NodeId,
        /// Operation name
        op: &'static str,
        /// Literal width
        count: usize,
    },

    /// Encoded program exceeds the kernel's program storage
    #[error("program needs {length} floats but the kernel holds {limit}")]
    ProgramTooLong {
        /// Encoded length
        length: usize,
        /// Kernel capacity
        limit: usize,
    },

    /// The tree is too deep for the stack machine
    #[error("scene requires stack depth {required} but maximum is {limit} ({kind} stack)")]
    StackOverflow {
        /// "value" or "frame"
        kind: &'static str,
        /// Required depth
        required: usize,
        /// Maximum allowed depth
        limit: usize,
    },

    /// Compilation was asked to start at a node that does not exist
    #[error("node {0} not found")]
    NodeNotFound(NodeId),
}
