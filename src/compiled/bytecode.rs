//! Bytecode compiler: a scene as a flat program for the stack machine
//!
//! The program is a post-order walk of the tree. Modifiers are emitted
//! before their node and closed with one `POP_CONTEXT` each after it; leaves
//! carry their colour and id so the record entry points can select
//! materials.

use super::kernel::{KernelConfig, StackMachineKernel};
use super::opcode::Control;
use super::resolve::{ResolvedNode, Role};
use super::vm::{eval_program, eval_program_normal, eval_program_sample, run, VmError};
use super::{CompileError, MAX_PROGRAM_LENGTH};
use crate::scene::{NodeId, Scene};
use crate::types::{Dialect, SceneSample};
use glam::Vec3;
use std::collections::BTreeSet;
use tracing::debug;

/// Stack-machine program with its generated kernel
#[derive(Debug, Clone)]
pub struct CompiledProgram {
    /// Kernel source
    pub source: String,
    /// Encoded program
    pub program: Vec<f32>,
    /// Number of floats in use (`program.len()`)
    pub program_length: usize,
    /// Kernel dialect
    pub dialect: Dialect,
    /// Opcodes the program references
    pub opcodes: BTreeSet<u16>,
    /// Number of compiled nodes
    pub node_count: usize,
    /// Baked surface-query settings
    pub config: KernelConfig,
}

impl CompiledProgram {
    /// Compile the whole scene with default kernel settings
    pub fn compile(scene: &Scene, dialect: Dialect) -> Result<Self, CompileError> {
        Self::compile_with(scene, dialect, KernelConfig::default())
    }

    /// Compile the whole scene
    pub fn compile_with(
        scene: &Scene,
        dialect: Dialect,
        config: KernelConfig,
    ) -> Result<Self, CompileError> {
        let tree = ResolvedNode::build(scene, scene.root())?;
        Self::from_tree(&tree, dialect, config)
    }

    /// Compile the subtree rooted at `id`
    pub fn compile_node(
        scene: &Scene,
        id: NodeId,
        dialect: Dialect,
        config: KernelConfig,
    ) -> Result<Self, CompileError> {
        let tree = ResolvedNode::build_at(scene, id)?;
        Self::from_tree(&tree, dialect, config)
    }

    fn from_tree(tree: &ResolvedNode, dialect: Dialect, config: KernelConfig) -> Result<Self, CompileError> {
        tree.check_stack_depths()?;

        let mut program = Vec::new();
        emit(tree, &mut program);
        if program.len() > MAX_PROGRAM_LENGTH {
            return Err(CompileError::ProgramTooLong {
                length: program.len(),
                limit: MAX_PROGRAM_LENGTH,
            });
        }

        let mut opcodes = BTreeSet::new();
        tree.collect_opcodes(&mut opcodes);
        let kernel = StackMachineKernel::generate(dialect, &opcodes, config)?;

        let node_count = tree.count();
        debug!(%dialect, node_count, length = program.len(), "program compiled");
        Ok(CompiledProgram {
            source: kernel.source,
            program_length: program.len(),
            program,
            dialect,
            opcodes,
            node_count,
            config,
        })
    }

    /// Program padded with zeros to the kernel's storage size, for upload
    pub fn padded_program(&self) -> Vec<f32> {
        let mut out = self.program.clone();
        out.resize(MAX_PROGRAM_LENGTH, 0.0);
        out
    }

    /// Distance at `point` on the CPU
    pub fn eval(&self, point: Vec3) -> Result<f32, VmError> {
        eval_program(&self.program, point)
    }

    /// Record at `point` on the CPU, without normal and occlusion
    pub fn eval_record(&self, point: Vec3) -> Result<SceneSample, VmError> {
        run::<SceneSample>(&self.program, point)
    }

    /// Full record at `point` on the CPU
    pub fn eval_sample(&self, point: Vec3) -> Result<SceneSample, VmError> {
        eval_program_sample(&self.program, point, &self.config)
    }

    /// Surface normal at `point` on the CPU
    pub fn normal(&self, point: Vec3) -> Result<Vec3, VmError> {
        eval_program_normal(&self.program, point, self.config.normal_epsilon)
    }
}

fn emit_trailer(node: &ResolvedNode, out: &mut Vec<f32>) {
    out.extend(node.material.to_array());
    // Exact: resolution rejects ids above MAX_NODE_ID
    out.push(node.id as f32);
}

fn emit(node: &ResolvedNode, out: &mut Vec<f32>) {
    for m in &node.modifiers {
        out.push(f32::from(m.def.code));
        out.extend_from_slice(&m.literals);
    }

    match node.role {
        Role::Shape(_) => {
            out.push(f32::from(node.def.code));
            out.extend_from_slice(&node.literals);
            emit_trailer(node, out);
        }
        Role::Boolean { .. } | Role::Displacement(_) => match node.children.split_first() {
            None => {
                out.push(f32::from(Control::Empty.code()));
                emit_trailer(node, out);
            }
            Some((first, rest)) => {
                emit(first, out);
                for child in rest {
                    emit(child, out);
                    out.push(f32::from(node.def.code));
                    out.extend_from_slice(&node.literals);
                }
            }
        },
    }

    for _ in &node.modifiers {
        out.push(f32::from(Control::PopContext.code()));
    }
}
