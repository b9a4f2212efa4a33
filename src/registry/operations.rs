//! Boolean (CSG) operators
//!
//! Each operator folds two operand distances and at most one blend literal.
//! The literal is given in world units; callers multiply it by the
//! accumulated scale before evaluation.

use super::{
    arg, mix, smooth_weight, BlendRule, OpKind, OperationDefinition, Pick, D1, D2,
};
use crate::types::ArgType::Float;
use std::f32::consts::FRAC_1_SQRT_2;

/// Union: `min(d1, d2)`
#[inline(always)]
pub fn op_union(d1: f32, d2: f32) -> f32 {
    d1.min(d2)
}

/// Subtraction of `d2` from `d1`
#[inline(always)]
pub fn op_subtraction(d1: f32, d2: f32) -> f32 {
    d1.max(-d2)
}

/// Intersection: `max(d1, d2)`
#[inline(always)]
pub fn op_intersection(d1: f32, d2: f32) -> f32 {
    d1.max(d2)
}

/// Symmetric difference
#[inline(always)]
pub fn op_xor(d1: f32, d2: f32) -> f32 {
    d1.min(d2).max(-d1.max(d2))
}

/// Polynomial smooth union with radius `k`
#[inline(always)]
pub fn op_smooth_union(d1: f32, d2: f32, k: f32) -> f32 {
    let h = smooth_weight(d1, d2, k);
    mix(d2, d1, h) - k * h * (1.0 - h)
}

/// Polynomial smooth subtraction of `d2` from `d1`
#[inline(always)]
pub fn op_smooth_subtraction(d1: f32, d2: f32, k: f32) -> f32 {
    let h = (0.5 - 0.5 * (d2 + d1) / k.max(super::MIN_BLEND_RADIUS)).clamp(0.0, 1.0);
    mix(d1, -d2, h) + k * h * (1.0 - h)
}

/// Polynomial smooth intersection with radius `k`
#[inline(always)]
pub fn op_smooth_intersection(d1: f32, d2: f32, k: f32) -> f32 {
    let h = (0.5 - 0.5 * (d2 - d1) / k.max(super::MIN_BLEND_RADIUS)).clamp(0.0, 1.0);
    mix(d2, d1, h) + k * h * (1.0 - h)
}

/// Union with a 45° chamfer of size `r`
#[inline(always)]
pub fn op_chamfer_union(d1: f32, d2: f32, r: f32) -> f32 {
    d1.min(d2).min((d1 - r + d2) * FRAC_1_SQRT_2)
}

/// Subtraction with a 45° chamfer of size `r`
#[inline(always)]
pub fn op_chamfer_subtraction(d1: f32, d2: f32, r: f32) -> f32 {
    d1.max(-d2).max((d1 + r - d2) * FRAC_1_SQRT_2)
}

/// Intersection with a 45° chamfer of size `r`
#[inline(always)]
pub fn op_chamfer_intersection(d1: f32, d2: f32, r: f32) -> f32 {
    d1.max(d2).max((d1 + r + d2) * FRAC_1_SQRT_2)
}

/// Boolean operators (`64..96`)
pub static DEFINITIONS: [OperationDefinition; 10] = [
    OperationDefinition {
        name: "opUnion",
        code: 64,
        args: &[D1, D2],
        returns: Float,
        kind: OpKind::Boolean {
            eval: |a, b, _| op_union(a, b),
            blend: BlendRule::Exact(Pick::Nearest),
        },
        wgsl: Some("    return min(d1, d2);"),
        glsl: Some("    return min(d1, d2);"),
        deps: &[],
    },
    OperationDefinition {
        name: "opSubtraction",
        code: 65,
        args: &[D1, D2],
        returns: Float,
        kind: OpKind::Boolean {
            eval: |a, b, _| op_subtraction(a, b),
            blend: BlendRule::Exact(Pick::Minuend),
        },
        wgsl: Some("    return max(d1, -d2);"),
        glsl: Some("    return max(d1, -d2);"),
        deps: &[],
    },
    OperationDefinition {
        name: "opIntersection",
        code: 66,
        args: &[D1, D2],
        returns: Float,
        kind: OpKind::Boolean {
            eval: |a, b, _| op_intersection(a, b),
            blend: BlendRule::Exact(Pick::Farthest),
        },
        wgsl: Some("    return max(d1, d2);"),
        glsl: Some("    return max(d1, d2);"),
        deps: &[],
    },
    OperationDefinition {
        name: "opXor",
        code: 67,
        args: &[D1, D2],
        returns: Float,
        kind: OpKind::Boolean {
            eval: |a, b, _| op_xor(a, b),
            blend: BlendRule::Exact(Pick::Nearest),
        },
        wgsl: Some("    return max(min(d1, d2), -max(d1, d2));"),
        glsl: Some("    return max(min(d1, d2), -max(d1, d2));"),
        deps: &[],
    },
    OperationDefinition {
        name: "opSmoothUnion",
        code: 68,
        args: &[D1, D2, arg("k", Float, &[0.25])],
        returns: Float,
        kind: OpKind::Boolean {
            eval: |a, b, l| op_smooth_union(a, b, l[0]),
            blend: BlendRule::Smooth(Pick::Nearest),
        },
        wgsl: Some(
            "    let h = clamp(0.5 + 0.5 * (d2 - d1) / max(k, 1e-6), 0.0, 1.0);
    return mix(d2, d1, h) - k * h * (1.0 - h);",
        ),
        glsl: Some(
            "    float h = clamp(0.5 + 0.5 * (d2 - d1) / max(k, 1e-6), 0.0, 1.0);
    return mix(d2, d1, h) - k * h * (1.0 - h);",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "opSmoothSubtraction",
        code: 69,
        args: &[D1, D2, arg("k", Float, &[0.25])],
        returns: Float,
        kind: OpKind::Boolean {
            eval: |a, b, l| op_smooth_subtraction(a, b, l[0]),
            blend: BlendRule::Smooth(Pick::Minuend),
        },
        wgsl: Some(
            "    let h = clamp(0.5 - 0.5 * (d2 + d1) / max(k, 1e-6), 0.0, 1.0);
    return mix(d1, -d2, h) + k * h * (1.0 - h);",
        ),
        glsl: Some(
            "    float h = clamp(0.5 - 0.5 * (d2 + d1) / max(k, 1e-6), 0.0, 1.0);
    return mix(d1, -d2, h) + k * h * (1.0 - h);",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "opSmoothIntersection",
        code: 70,
        args: &[D1, D2, arg("k", Float, &[0.25])],
        returns: Float,
        kind: OpKind::Boolean {
            eval: |a, b, l| op_smooth_intersection(a, b, l[0]),
            blend: BlendRule::Smooth(Pick::Farthest),
        },
        wgsl: Some(
            "    let h = clamp(0.5 - 0.5 * (d2 - d1) / max(k, 1e-6), 0.0, 1.0);
    return mix(d2, d1, h) + k * h * (1.0 - h);",
        ),
        glsl: Some(
            "    float h = clamp(0.5 - 0.5 * (d2 - d1) / max(k, 1e-6), 0.0, 1.0);
    return mix(d2, d1, h) + k * h * (1.0 - h);",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "opChamferUnion",
        code: 71,
        args: &[D1, D2, arg("r", Float, &[0.1])],
        returns: Float,
        kind: OpKind::Boolean {
            eval: |a, b, l| op_chamfer_union(a, b, l[0]),
            blend: BlendRule::Chamfer(Pick::Nearest),
        },
        wgsl: Some("    return min(min(d1, d2), (d1 - r + d2) * 0.70710678);"),
        glsl: Some("    return min(min(d1, d2), (d1 - r + d2) * 0.70710678);"),
        deps: &[],
    },
    OperationDefinition {
        name: "opChamferSubtraction",
        code: 72,
        args: &[D1, D2, arg("r", Float, &[0.1])],
        returns: Float,
        kind: OpKind::Boolean {
            eval: |a, b, l| op_chamfer_subtraction(a, b, l[0]),
            blend: BlendRule::Chamfer(Pick::Minuend),
        },
        wgsl: Some("    return max(max(d1, -d2), (d1 + r - d2) * 0.70710678);"),
        glsl: Some("    return max(max(d1, -d2), (d1 + r - d2) * 0.70710678);"),
        deps: &[],
    },
    OperationDefinition {
        name: "opChamferIntersection",
        code: 73,
        args: &[D1, D2, arg("r", Float, &[0.1])],
        returns: Float,
        kind: OpKind::Boolean {
            eval: |a, b, l| op_chamfer_intersection(a, b, l[0]),
            blend: BlendRule::Chamfer(Pick::Farthest),
        },
        wgsl: Some("    return max(max(d1, d2), (d1 + r + d2) * 0.70710678);"),
        glsl: Some("    return max(max(d1, d2), (d1 + r + d2) * 0.70710678);"),
        deps: &[],
    },
];
