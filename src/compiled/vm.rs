//! CPU stack machine for compiled programs
//!
//! Interprets the same `f32` program the GPU kernel runs, with the same
//! fixed-size stacks and the same operation order, so CPU and kernel agree
//! to floating-point tolerance. Malformed programs yield a [`VmError`]
//! instead of undefined behaviour.

use super::kernel::{KernelConfig, AO_DIRECTIONS};
use super::opcode::{decode, Control, Decoded};
use super::{EMPTY_DISTANCE, MAX_FRAME_STACK, MAX_VALUE_STACK, NO_SURFACE};
use crate::registry::{BlendRule, OpKind};
use crate::types::SceneSample;
use glam::{Vec3, Vec4};
use rayon::prelude::*;
use std::fmt;
use thiserror::Error;

/// Program execution errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VmError {
    /// Opcode slot holds no known opcode
    #[error("unknown opcode {value} at offset {offset}")]
    UnknownOpcode {
        /// Raw slot value
        value: f32,
        /// Program offset
        offset: usize,
    },

    /// Program ends inside an instruction
    #[error("instruction at offset {offset} runs past the end of the program")]
    Truncated {
        /// Offset of the instruction
        offset: usize,
    },

    /// Combiner with fewer than two operands on the stack
    #[error("stack underflow at offset {offset}")]
    StackUnderflow {
        /// Offset of the instruction
        offset: usize,
    },

    /// Fixed-size stack exhausted
    #[error("{kind} stack overflow at offset {offset}")]
    StackOverflow {
        /// "value" or "frame"
        kind: &'static str,
        /// Offset of the instruction
        offset: usize,
    },

    /// `POP_CONTEXT` without a matching modifier
    #[error("unbalanced POP_CONTEXT at offset {offset}")]
    UnbalancedContext {
        /// Offset of the instruction
        offset: usize,
    },
}

/// Value carried on the stack: a bare distance or a full record
pub trait StackValue: Copy {
    /// Leaf value
    fn leaf(distance: f32, color: Vec4, id: u32) -> Self;
    /// Distance of the value
    fn distance(&self) -> f32;
    /// Result of a boolean combiner with combined distance `d`
    fn boolean(blend: BlendRule, a: Self, b: Self, d: f32, k: f32) -> Self;
    /// Result of a displacement combiner with combined distance `d`
    fn displaced(a: Self, b: Self, d: f32) -> Self;
}

impl StackValue for f32 {
    #[inline(always)]
    fn leaf(distance: f32, _color: Vec4, _id: u32) -> Self {
        distance
    }

    #[inline(always)]
    fn distance(&self) -> f32 {
        *self
    }

    #[inline(always)]
    fn boolean(_blend: BlendRule, _a: Self, _b: Self, d: f32, _k: f32) -> Self {
        d
    }

    #[inline(always)]
    fn displaced(_a: Self, _b: Self, d: f32) -> Self {
        d
    }
}

impl StackValue for SceneSample {
    #[inline]
    fn leaf(distance: f32, color: Vec4, id: u32) -> Self {
        SceneSample::new(distance, color, id)
    }

    #[inline]
    fn distance(&self) -> f32 {
        self.distance
    }

    #[inline]
    fn boolean(blend: BlendRule, a: Self, b: Self, d: f32, k: f32) -> Self {
        blend.apply(&a, &b, d, k)
    }

    #[inline]
    fn displaced(a: Self, _b: Self, d: f32) -> Self {
        SceneSample::new(d, a.color, a.id)
    }
}

/// Take `n` floats at `*ip`, advancing it
#[inline]
fn take<'a>(program: &'a [f32], ip: &mut usize, n: usize, offset: usize) -> Result<&'a [f32], VmError> {
    let slice = program
        .get(*ip..*ip + n)
        .ok_or(VmError::Truncated { offset })?;
    *ip += n;
    Ok(slice)
}

/// Colour and id trailer of a leaf
#[inline]
fn trailer(slice: &[f32]) -> (Vec4, u32) {
    (
        Vec4::new(slice[0], slice[1], slice[2], slice[3]),
        slice[4] as u32,
    )
}

/// Run `program` at `point`
pub(crate) fn run<V: StackValue>(program: &[f32], point: Vec3) -> Result<V, VmError> {
    let mut stack = [V::leaf(0.0, Vec4::ZERO, NO_SURFACE); MAX_VALUE_STACK];
    let mut sp = 0usize;
    let mut frames = [(Vec3::ZERO, 1.0f32); MAX_FRAME_STACK];
    let mut fp = 0usize;

    let mut p = point;
    let mut s = 1.0f32;
    let mut ip = 0usize;

    while ip < program.len() {
        let offset = ip;
        let value = program[ip];
        ip += 1;
        let decoded = decode(value).ok_or(VmError::UnknownOpcode { value, offset })?;

        let pushed = match decoded {
            Decoded::Control(Control::PopContext) => {
                if fp == 0 {
                    return Err(VmError::UnbalancedContext { offset });
                }
                fp -= 1;
                (p, s) = frames[fp];
                None
            }
            Decoded::Control(Control::Empty) => {
                let (color, id) = trailer(take(program, &mut ip, 5, offset)?);
                Some(V::leaf(EMPTY_DISTANCE, color, id))
            }
            Decoded::Operation(def) => {
                let literals = take(program, &mut ip, def.literal_width(), offset)?;
                match def.kind {
                    OpKind::Distance(f) | OpKind::Primitive(f) => {
                        let (color, id) = trailer(take(program, &mut ip, 5, offset)?);
                        Some(V::leaf(f(p, literals) * s, color, id))
                    }
                    OpKind::Boolean { eval, blend } => {
                        if sp < 2 {
                            return Err(VmError::StackUnderflow { offset });
                        }
                        let (a, b) = (stack[sp - 2], stack[sp - 1]);
                        sp -= 2;
                        // The blend literal is in world units
                        let k = literals.first().map_or(0.0, |k| k * s);
                        let scaled = [k];
                        let d = eval(a.distance(), b.distance(), &scaled[..literals.len()]);
                        Some(V::boolean(blend, a, b, d, k))
                    }
                    OpKind::Displacement(f) => {
                        if sp < 2 {
                            return Err(VmError::StackUnderflow { offset });
                        }
                        let (a, b) = (stack[sp - 2], stack[sp - 1]);
                        sp -= 2;
                        let d = f(p, a.distance() / s, b.distance() / s, literals) * s;
                        Some(V::displaced(a, b, d))
                    }
                    OpKind::Positioning { eval, scale } => {
                        if fp == MAX_FRAME_STACK {
                            return Err(VmError::StackOverflow {
                                kind: "frame",
                                offset,
                            });
                        }
                        frames[fp] = (p, s);
                        fp += 1;
                        p = eval(p, literals);
                        s = scale.apply(s, literals);
                        None
                    }
                }
            }
        };

        if let Some(v) = pushed {
            if sp == MAX_VALUE_STACK {
                return Err(VmError::StackOverflow {
                    kind: "value",
                    offset,
                });
            }
            stack[sp] = v;
            sp += 1;
        }
    }

    Ok(if sp == 0 {
        V::leaf(EMPTY_DISTANCE, Vec4::ZERO, NO_SURFACE)
    } else {
        stack[sp - 1]
    })
}

/// Distance at `point`
///
/// An empty program evaluates to the empty distance.
#[inline]
pub fn eval_program(program: &[f32], point: Vec3) -> Result<f32, VmError> {
    run::<f32>(program, point)
}

/// Central-difference unit normal of the field `f`, `Vec3::ZERO` when degenerate
pub(crate) fn central_normal<E>(
    point: Vec3,
    epsilon: f32,
    mut f: impl FnMut(Vec3) -> Result<f32, E>,
) -> Result<Vec3, E> {
    let dx = Vec3::new(epsilon, 0.0, 0.0);
    let dy = Vec3::new(0.0, epsilon, 0.0);
    let dz = Vec3::new(0.0, 0.0, epsilon);

    let n = Vec3::new(
        f(point + dx)? - f(point - dx)?,
        f(point + dy)? - f(point - dy)?,
        f(point + dz)? - f(point - dz)?,
    );
    let magnitude = n.length();
    if magnitude < 1e-12 {
        return Ok(Vec3::ZERO);
    }
    Ok(n / magnitude)
}

/// Ambient occlusion of the field `f` at `point`, in `[0, 1]`
pub(crate) fn occlusion<E>(
    point: Vec3,
    normal: Vec3,
    config: &KernelConfig,
    mut f: impl FnMut(Vec3) -> Result<f32, E>,
) -> Result<f32, E> {
    let samples = config.samples();
    let mut occ = 0.0f32;
    for (i, dir) in AO_DIRECTIONS.iter().take(samples).enumerate() {
        let mut dir = *dir;
        if dir.dot(normal) < 0.0 {
            dir = -dir;
        }
        let dir = (normal + dir).normalize();
        let t = config.ao_step * (i + 1) as f32;
        occ += (t - f(point + dir * t)?.max(0.0)) / t;
    }
    Ok((1.0 - occ / samples as f32).clamp(0.0, 1.0))
}

/// Unit normal at `point` by central differences, `Vec3::ZERO` when degenerate
pub fn eval_program_normal(program: &[f32], point: Vec3, epsilon: f32) -> Result<Vec3, VmError> {
    central_normal(point, epsilon, |q| eval_program(program, q))
}

/// Ambient occlusion at `point` with surface normal `normal`, in `[0, 1]`
pub fn eval_program_ao(
    program: &[f32],
    point: Vec3,
    normal: Vec3,
    config: &KernelConfig,
) -> Result<f32, VmError> {
    occlusion(point, normal, config, |q| eval_program(program, q))
}

/// Full record at `point`: distance, colour, id, normal and occlusion
pub fn eval_program_sample(
    program: &[f32],
    point: Vec3,
    config: &KernelConfig,
) -> Result<SceneSample, VmError> {
    let mut sample = run::<SceneSample>(program, point)?;
    sample.normal = eval_program_normal(program, point, config.normal_epsilon)?;
    sample.ao = eval_program_ao(program, point, sample.normal, config)?;
    Ok(sample)
}

/// Distances at many points
pub fn eval_program_batch(program: &[f32], points: &[Vec3]) -> Result<Vec<f32>, VmError> {
    points.iter().map(|p| eval_program(program, *p)).collect()
}

/// Distances at many points, in parallel
pub fn eval_program_batch_parallel(program: &[f32], points: &[Vec3]) -> Result<Vec<f32>, VmError> {
    points.par_iter().map(|p| eval_program(program, *p)).collect()
}

/// One decoded instruction
#[derive(Debug, Clone, PartialEq)]
pub struct Instruction {
    /// Offset of the opcode slot
    pub offset: usize,
    /// Operation name or control mnemonic
    pub mnemonic: &'static str,
    /// Floats following the opcode (literals, then colour and id for leaves)
    pub operands: Vec<f32>,
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>5}  {}", self.offset, self.mnemonic)?;
        for v in &self.operands {
            write!(f, " {v}")?;
        }
        Ok(())
    }
}

/// Decode a program into instructions without running it
pub fn disassemble(program: &[f32]) -> Result<Vec<Instruction>, VmError> {
    let mut out = Vec::new();
    let mut ip = 0;
    while ip < program.len() {
        let offset = ip;
        let value = program[ip];
        ip += 1;
        let (mnemonic, width) = match decode(value).ok_or(VmError::UnknownOpcode { value, offset })? {
            Decoded::Control(control @ Control::Empty) => (control.mnemonic(), 5),
            Decoded::Control(control @ Control::PopContext) => (control.mnemonic(), 0),
            Decoded::Operation(def) => {
                let trailer = if def.category().is_shape() { 5 } else { 0 };
                (def.name, def.literal_width() + trailer)
            }
        };
        let operands = take(program, &mut ip, width, offset)?.to_vec();
        out.push(Instruction {
            offset,
            mnemonic,
            operands,
        });
    }
    Ok(out)
}
