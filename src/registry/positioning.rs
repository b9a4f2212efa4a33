//! Positioning operators (modifiers)
//!
//! Every operator maps the running point into the child's local frame, so
//! rotations and translations apply the inverse motion. Only `opScale` and
//! `opTransform` change the accumulated distance scale.

use super::{arg, m4, v3, v4, OpKind, OperationDefinition, ScaleRule, POINT};
use crate::types::ArgType::{Float, Mat4 as M4, Vec3 as V3, Vec4 as V4};
use glam::{Mat4, Vec3, Vec4};

/// Move the shape by `t`
#[inline(always)]
pub fn op_translate(p: Vec3, t: Vec3) -> Vec3 {
    p - t
}

/// Rotate the shape about X by `angle` radians
#[inline(always)]
pub fn op_rotate_x(p: Vec3, angle: f32) -> Vec3 {
    let (s, c) = angle.sin_cos();
    Vec3::new(p.x, c * p.y + s * p.z, c * p.z - s * p.y)
}

/// Rotate the shape about Y by `angle` radians
#[inline(always)]
pub fn op_rotate_y(p: Vec3, angle: f32) -> Vec3 {
    let (s, c) = angle.sin_cos();
    Vec3::new(c * p.x - s * p.z, p.y, c * p.z + s * p.x)
}

/// Rotate the shape about Z by `angle` radians
#[inline(always)]
pub fn op_rotate_z(p: Vec3, angle: f32) -> Vec3 {
    let (s, c) = angle.sin_cos();
    Vec3::new(c * p.x + s * p.y, c * p.y - s * p.x, p.z)
}

/// Rotate the shape by quaternion `q = (x, y, z, w)`
#[inline(always)]
pub fn op_rotate(p: Vec3, q: Vec4) -> Vec3 {
    let qn = q.normalize();
    let u = -qn.truncate();
    let t = 2.0 * u.cross(p);
    p + qn.w * t + u.cross(t)
}

/// Uniformly scale the shape by `s`
#[inline(always)]
pub fn op_scale(p: Vec3, s: f32) -> Vec3 {
    p / s
}

/// Map the point through world-to-local matrix `m`
#[inline(always)]
pub fn op_transform(p: Vec3, m: Mat4) -> Vec3 {
    (m * p.extend(1.0)).truncate()
}

/// Infinite repetition with cell size `c`
#[inline(always)]
pub fn op_repeat(p: Vec3, c: Vec3) -> Vec3 {
    p - c * (p / c + 0.5).floor()
}

/// Mirror across every plane whose `axes` component is at least 0.5
#[inline(always)]
pub fn op_mirror(p: Vec3, axes: Vec3) -> Vec3 {
    let pick = |v: f32, axis: f32| if axis >= 0.5 { v.abs() } else { v };
    Vec3::new(pick(p.x, axes.x), pick(p.y, axes.y), pick(p.z, axes.z))
}

/// Twist about Y by `k` radians per unit
#[inline(always)]
pub fn op_twist(p: Vec3, k: f32) -> Vec3 {
    let (s, c) = (k * p.y).sin_cos();
    Vec3::new(c * p.x - s * p.z, p.y, s * p.x + c * p.z)
}

/// Bend the XY plane by `k` radians per unit
#[inline(always)]
pub fn op_bend(p: Vec3, k: f32) -> Vec3 {
    let (s, c) = (k * p.x).sin_cos();
    Vec3::new(c * p.x - s * p.y, s * p.x + c * p.y, p.z)
}

const IDENTITY: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, //
    0.0, 0.0, 0.0, 1.0,
];

/// Positioning operators (`128..192`)
pub static DEFINITIONS: [OperationDefinition; 11] = [
    OperationDefinition {
        name: "opTranslate",
        code: 128,
        args: &[POINT, arg("t", V3, &[0.0, 0.0, 0.0])],
        returns: V3,
        kind: OpKind::Positioning {
            eval: |p, l| op_translate(p, v3(l, 0)),
            scale: ScaleRule::Preserve,
        },
        wgsl: Some("    return p - t;"),
        glsl: Some("    return p - t;"),
        deps: &[],
    },
    OperationDefinition {
        name: "opRotateX",
        code: 129,
        args: &[POINT, arg("angle", Float, &[0.0])],
        returns: V3,
        kind: OpKind::Positioning {
            eval: |p, l| op_rotate_x(p, l[0]),
            scale: ScaleRule::Preserve,
        },
        wgsl: Some(
            "    let c = cos(angle);
    let s = sin(angle);
    return vec3<f32>(p.x, c * p.y + s * p.z, c * p.z - s * p.y);",
        ),
        glsl: Some(
            "    float c = cos(angle);
    float s = sin(angle);
    return vec3(p.x, c * p.y + s * p.z, c * p.z - s * p.y);",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "opRotateY",
        code: 130,
        args: &[POINT, arg("angle", Float, &[0.0])],
        returns: V3,
        kind: OpKind::Positioning {
            eval: |p, l| op_rotate_y(p, l[0]),
            scale: ScaleRule::Preserve,
        },
        wgsl: Some(
            "    let c = cos(angle);
    let s = sin(angle);
    return vec3<f32>(c * p.x - s * p.z, p.y, c * p.z + s * p.x);",
        ),
        glsl: Some(
            "    float c = cos(angle);
    float s = sin(angle);
    return vec3(c * p.x - s * p.z, p.y, c * p.z + s * p.x);",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "opRotateZ",
        code: 131,
        args: &[POINT, arg("angle", Float, &[0.0])],
        returns: V3,
        kind: OpKind::Positioning {
            eval: |p, l| op_rotate_z(p, l[0]),
            scale: ScaleRule::Preserve,
        },
        wgsl: Some(
            "    let c = cos(angle);
    let s = sin(angle);
    return vec3<f32>(c * p.x + s * p.y, c * p.y - s * p.x, p.z);",
        ),
        glsl: Some(
            "    float c = cos(angle);
    float s = sin(angle);
    return vec3(c * p.x + s * p.y, c * p.y - s * p.x, p.z);",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "opRotate",
        code: 132,
        args: &[POINT, arg("q", V4, &[0.0, 0.0, 0.0, 1.0])],
        returns: V3,
        kind: OpKind::Positioning {
            eval: |p, l| op_rotate(p, v4(l, 0)),
            scale: ScaleRule::Preserve,
        },
        wgsl: Some(
            "    let qn = normalize(q);
    let u = -qn.xyz;
    let t = 2.0 * cross(u, p);
    return p + qn.w * t + cross(u, t);",
        ),
        glsl: Some(
            "    vec4 qn = normalize(q);
    vec3 u = -qn.xyz;
    vec3 t = 2.0 * cross(u, p);
    return p + qn.w * t + cross(u, t);",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "opScale",
        code: 133,
        args: &[POINT, arg("s", Float, &[1.0])],
        returns: V3,
        kind: OpKind::Positioning {
            eval: |p, l| op_scale(p, l[0]),
            scale: ScaleRule::Multiply,
        },
        wgsl: Some("    return p / s;"),
        glsl: Some("    return p / s;"),
        deps: &[],
    },
    OperationDefinition {
        name: "opTransform",
        code: 134,
        args: &[POINT, arg("m", M4, &IDENTITY)],
        returns: V3,
        kind: OpKind::Positioning {
            eval: |p, l| op_transform(p, m4(l, 0)),
            scale: ScaleRule::DivideByBasis,
        },
        wgsl: Some("    return (m * vec4<f32>(p, 1.0)).xyz;"),
        glsl: Some("    return (m * vec4(p, 1.0)).xyz;"),
        deps: &[],
    },
    OperationDefinition {
        name: "opRepeat",
        code: 135,
        args: &[POINT, arg("c", V3, &[2.0, 2.0, 2.0])],
        returns: V3,
        kind: OpKind::Positioning {
            eval: |p, l| op_repeat(p, v3(l, 0)),
            scale: ScaleRule::Preserve,
        },
        wgsl: Some("    return p - c * floor(p / c + 0.5);"),
        glsl: Some("    return p - c * floor(p / c + 0.5);"),
        deps: &[],
    },
    OperationDefinition {
        name: "opMirror",
        code: 136,
        args: &[POINT, arg("axes", V3, &[1.0, 0.0, 0.0])],
        returns: V3,
        kind: OpKind::Positioning {
            eval: |p, l| op_mirror(p, v3(l, 0)),
            scale: ScaleRule::Preserve,
        },
        wgsl: Some("    return select(p, abs(p), axes >= vec3<f32>(0.5));"),
        glsl: Some("    return mix(p, abs(p), step(vec3(0.5), axes));"),
        deps: &[],
    },
    OperationDefinition {
        name: "opTwist",
        code: 137,
        args: &[POINT, arg("k", Float, &[1.0])],
        returns: V3,
        kind: OpKind::Positioning {
            eval: |p, l| op_twist(p, l[0]),
            scale: ScaleRule::Preserve,
        },
        wgsl: Some(
            "    let c = cos(k * p.y);
    let s = sin(k * p.y);
    return vec3<f32>(c * p.x - s * p.z, p.y, s * p.x + c * p.z);",
        ),
        glsl: Some(
            "    float c = cos(k * p.y);
    float s = sin(k * p.y);
    return vec3(c * p.x - s * p.z, p.y, s * p.x + c * p.z);",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "opBend",
        code: 138,
        args: &[POINT, arg("k", Float, &[0.5])],
        returns: V3,
        kind: OpKind::Positioning {
            eval: |p, l| op_bend(p, l[0]),
            scale: ScaleRule::Preserve,
        },
        wgsl: Some(
            "    let c = cos(k * p.x);
    let s = sin(k * p.x);
    return vec3<f32>(c * p.x - s * p.y, s * p.x + c * p.y, p.z);",
        ),
        glsl: Some(
            "    float c = cos(k * p.x);
    float s = sin(k * p.x);
    return vec3(c * p.x - s * p.y, s * p.x + c * p.y, p.z);",
        ),
        deps: &[],
    },
];
