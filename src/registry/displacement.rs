//! Displacement operators
//!
//! Two-operand combiners that also see the running point. Operands arrive in
//! the node's local units; the caller re-applies the accumulated scale.

use super::{arg, mix, OpKind, OperationDefinition, D1, D2, POINT};
use crate::types::ArgType::Float;
use glam::Vec3;

/// Add a second field to the first
#[inline(always)]
pub fn op_displace(d1: f32, d2: f32) -> f32 {
    d1 + d2
}

/// Linear morph from `d1` to `d2`
#[inline(always)]
pub fn op_blend(d1: f32, d2: f32, t: f32) -> f32 {
    mix(d1, d2, t)
}

/// Union rippled by a product of sines
#[inline(always)]
pub fn op_sine_displace(p: Vec3, d1: f32, d2: f32, amplitude: f32, frequency: f32) -> f32 {
    let q = p * frequency;
    d1.min(d2) + amplitude * q.x.sin() * q.y.sin() * q.z.sin()
}

/// Displacement operators (`96..128`)
pub static DEFINITIONS: [OperationDefinition; 3] = [
    OperationDefinition {
        name: "opDisplace",
        code: 96,
        args: &[POINT, D1, D2],
        returns: Float,
        kind: OpKind::Displacement(|_, a, b, _| op_displace(a, b)),
        wgsl: Some("    return d1 + d2;"),
        glsl: Some("    return d1 + d2;"),
        deps: &[],
    },
    OperationDefinition {
        name: "opBlend",
        code: 97,
        args: &[POINT, D1, D2, arg("t", Float, &[0.5])],
        returns: Float,
        kind: OpKind::Displacement(|_, a, b, l| op_blend(a, b, l[0])),
        wgsl: Some("    return mix(d1, d2, t);"),
        glsl: Some("    return mix(d1, d2, t);"),
        deps: &[],
    },
    OperationDefinition {
        name: "opSineDisplace",
        code: 98,
        args: &[
            POINT,
            D1,
            D2,
            arg("amplitude", Float, &[0.05]),
            arg("frequency", Float, &[10.0]),
        ],
        returns: Float,
        kind: OpKind::Displacement(|p, a, b, l| op_sine_displace(p, a, b, l[0], l[1])),
        wgsl: Some(
            "    let q = p * frequency;
    return min(d1, d2) + amplitude * sin(q.x) * sin(q.y) * sin(q.z);",
        ),
        glsl: Some(
            "    vec3 q = p * frequency;
    return min(d1, d2) + amplitude * sin(q.x) * sin(q.y) * sin(q.z);",
        ),
        deps: &[],
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_displace_adds() {
        assert_eq!(op_displace(0.5, -0.25), 0.25);
    }

    #[test]
    fn test_blend_endpoints() {
        assert_eq!(op_blend(1.0, 3.0, 0.0), 1.0);
        assert_eq!(op_blend(1.0, 3.0, 1.0), 3.0);
        assert_eq!(op_blend(1.0, 3.0, 0.5), 2.0);
    }

    #[test]
    fn test_sine_displace_vanishes_on_axis_planes() {
        let p = Vec3::new(0.0, 0.3, 0.7);
        assert_eq!(op_sine_displace(p, 0.4, 0.2, 0.1, 10.0), 0.2);
        let p = Vec3::new(0.1, 0.2, 0.3);
        assert_ne!(op_sine_displace(p, 0.4, 0.2, 0.1, 10.0), 0.2);
    }

    #[test]
    fn test_table_declares_point_first() {
        for def in DEFINITIONS.iter() {
            assert_eq!(def.args[0].name, "p");
            assert_eq!(def.args[1].name, "d1");
            assert_eq!(def.args[2].name, "d2");
        }
    }
}
