//! Distance functions and composed primitives
//!
//! Formulas follow the usual raymarching references; octahedron, ellipsoid,
//! hex prism and gyroid are bounds rather than exact distances.

use super::{arg, sign, v2, v3, OpKind, OperationDefinition, POINT};
use crate::types::ArgType::{Float, Vec2 as V2, Vec3 as V3};
use glam::{Vec2, Vec3};

/// Sphere centred at the origin
#[inline(always)]
pub fn sd_sphere(p: Vec3, r: f32) -> f32 {
    p.length() - r
}

/// Axis-aligned box with half extents `b`
#[inline(always)]
pub fn sd_box(p: Vec3, b: Vec3) -> f32 {
    let q = p.abs() - b;
    q.max(Vec3::ZERO).length() + q.max_element().min(0.0)
}

/// Torus in the XZ plane, `t = (major, minor)`
#[inline(always)]
pub fn sd_torus(p: Vec3, t: Vec2) -> f32 {
    let q = Vec2::new(Vec2::new(p.x, p.z).length() - t.x, p.y);
    q.length() - t.y
}

/// Capped cylinder along Y with half height `h` and radius `r`
#[inline(always)]
pub fn sd_cylinder(p: Vec3, h: f32, r: f32) -> f32 {
    let d = Vec2::new(Vec2::new(p.x, p.z).length(), p.y).abs() - Vec2::new(r, h);
    d.x.max(d.y).min(0.0) + d.max(Vec2::ZERO).length()
}

/// Capsule between `a` and `b`
#[inline(always)]
pub fn sd_capsule(p: Vec3, a: Vec3, b: Vec3, r: f32) -> f32 {
    let pa = p - a;
    let ba = b - a;
    let h = (pa.dot(ba) / ba.dot(ba).max(1e-10)).clamp(0.0, 1.0);
    (pa - ba * h).length() - r
}

/// Plane with unit normal `n` at offset `h`
#[inline(always)]
pub fn sd_plane(p: Vec3, n: Vec3, h: f32) -> f32 {
    p.dot(n) + h
}

/// Octahedron (bound)
#[inline(always)]
pub fn sd_octahedron(p: Vec3, s: f32) -> f32 {
    let q = p.abs();
    (q.x + q.y + q.z - s) * 0.57735027
}

/// Ellipsoid with radii `r` (bound)
#[inline(always)]
pub fn sd_ellipsoid(p: Vec3, r: Vec3) -> f32 {
    let k0 = (p / r).length();
    let k1 = (p / (r * r)).length();
    k0 * (k0 - 1.0) / k1.max(1e-10)
}

/// Hexagonal prism along Z, `h = (radius, half length)`
#[inline(always)]
pub fn sd_hex_prism(p: Vec3, h: Vec2) -> f32 {
    const K: Vec3 = Vec3::new(-0.8660254, 0.5, 0.57735);
    let q = p.abs();
    let kxy = Vec2::new(K.x, K.y);
    let qxy = Vec2::new(q.x, q.y);
    let xy = qxy - 2.0 * kxy.dot(qxy).min(0.0) * kxy;
    let d = Vec2::new(
        (xy - Vec2::new(xy.x.clamp(-K.z * h.x, K.z * h.x), h.x)).length() * sign(xy.y - h.x),
        q.z - h.y,
    );
    d.x.max(d.y).min(0.0) + d.max(Vec2::ZERO).length()
}

/// Gyroid sheet (bound)
#[inline(always)]
pub fn sd_gyroid(p: Vec3, scale: f32, thickness: f32) -> f32 {
    let q = p * scale;
    let s = Vec3::new(q.x.sin(), q.y.sin(), q.z.sin());
    let c = Vec3::new(q.z.cos(), q.x.cos(), q.y.cos());
    s.dot(c).abs() / scale - thickness
}

/// Box with rounded edges
#[inline(always)]
pub fn sd_round_box(p: Vec3, b: Vec3, r: f32) -> f32 {
    sd_box(p, b - Vec3::splat(r)) - r
}

/// Spherical shell of thickness `2 t`
#[inline(always)]
pub fn sd_hollow_sphere(p: Vec3, r: f32, t: f32) -> f32 {
    sd_sphere(p, r).abs() - t
}

/// Cylinder with rounded rims
#[inline(always)]
pub fn sd_round_cylinder(p: Vec3, h: f32, r: f32, rr: f32) -> f32 {
    sd_cylinder(p, h - rr, r - rr) - rr
}

/// Distance functions (`0..32`) and composed primitives (`32..64`)
pub static DEFINITIONS: [OperationDefinition; 13] = [
    OperationDefinition {
        name: "sdSphere",
        code: 0,
        args: &[POINT, arg("r", Float, &[1.0])],
        returns: Float,
        kind: OpKind::Distance(|p, l| sd_sphere(p, l[0])),
        wgsl: Some("    return length(p) - r;"),
        glsl: Some("    return length(p) - r;"),
        deps: &[],
    },
    OperationDefinition {
        name: "sdBox",
        code: 1,
        args: &[POINT, arg("b", V3, &[0.5, 0.5, 0.5])],
        returns: Float,
        kind: OpKind::Distance(|p, l| sd_box(p, v3(l, 0))),
        wgsl: Some(
            "    let q = abs(p) - b;
    return length(max(q, vec3<f32>(0.0))) + min(max(q.x, max(q.y, q.z)), 0.0);",
        ),
        glsl: Some(
            "    vec3 q = abs(p) - b;
    return length(max(q, vec3(0.0))) + min(max(q.x, max(q.y, q.z)), 0.0);",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "sdTorus",
        code: 2,
        args: &[POINT, arg("t", V2, &[1.0, 0.25])],
        returns: Float,
        kind: OpKind::Distance(|p, l| sd_torus(p, v2(l, 0))),
        wgsl: Some(
            "    let q = vec2<f32>(length(p.xz) - t.x, p.y);
    return length(q) - t.y;",
        ),
        glsl: Some(
            "    vec2 q = vec2(length(p.xz) - t.x, p.y);
    return length(q) - t.y;",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "sdCylinder",
        code: 3,
        args: &[POINT, arg("h", Float, &[0.5]), arg("r", Float, &[0.5])],
        returns: Float,
        kind: OpKind::Distance(|p, l| sd_cylinder(p, l[0], l[1])),
        wgsl: Some(
            "    let d = abs(vec2<f32>(length(p.xz), p.y)) - vec2<f32>(r, h);
    return min(max(d.x, d.y), 0.0) + length(max(d, vec2<f32>(0.0)));",
        ),
        glsl: Some(
            "    vec2 d = abs(vec2(length(p.xz), p.y)) - vec2(r, h);
    return min(max(d.x, d.y), 0.0) + length(max(d, vec2(0.0)));",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "sdCapsule",
        code: 4,
        args: &[
            POINT,
            arg("a", V3, &[0.0, -0.5, 0.0]),
            arg("b", V3, &[0.0, 0.5, 0.0]),
            arg("r", Float, &[0.25]),
        ],
        returns: Float,
        kind: OpKind::Distance(|p, l| sd_capsule(p, v3(l, 0), v3(l, 3), l[6])),
        wgsl: Some(
            "    let pa = p - a;
    let ba = b - a;
    let h = clamp(dot(pa, ba) / max(dot(ba, ba), 1e-10), 0.0, 1.0);
    return length(pa - ba * h) - r;",
        ),
        glsl: Some(
            "    vec3 pa = p - a;
    vec3 ba = b - a;
    float h = clamp(dot(pa, ba) / max(dot(ba, ba), 1e-10), 0.0, 1.0);
    return length(pa - ba * h) - r;",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "sdPlane",
        code: 5,
        args: &[POINT, arg("n", V3, &[0.0, 1.0, 0.0]), arg("h", Float, &[0.0])],
        returns: Float,
        kind: OpKind::Distance(|p, l| sd_plane(p, v3(l, 0), l[3])),
        wgsl: Some("    return dot(p, n) + h;"),
        glsl: Some("    return dot(p, n) + h;"),
        deps: &[],
    },
    OperationDefinition {
        name: "sdOctahedron",
        code: 6,
        args: &[POINT, arg("s", Float, &[1.0])],
        returns: Float,
        kind: OpKind::Distance(|p, l| sd_octahedron(p, l[0])),
        wgsl: Some(
            "    let q = abs(p);
    return (q.x + q.y + q.z - s) * 0.57735027;",
        ),
        glsl: Some(
            "    vec3 q = abs(p);
    return (q.x + q.y + q.z - s) * 0.57735027;",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "sdEllipsoid",
        code: 7,
        args: &[POINT, arg("r", V3, &[1.0, 0.5, 0.5])],
        returns: Float,
        kind: OpKind::Distance(|p, l| sd_ellipsoid(p, v3(l, 0))),
        wgsl: Some(
            "    let k0 = length(p / r);
    let k1 = length(p / (r * r));
    return k0 * (k0 - 1.0) / max(k1, 1e-10);",
        ),
        glsl: Some(
            "    float k0 = length(p / r);
    float k1 = length(p / (r * r));
    return k0 * (k0 - 1.0) / max(k1, 1e-10);",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "sdHexPrism",
        code: 8,
        args: &[POINT, arg("h", V2, &[0.5, 0.5])],
        returns: Float,
        kind: OpKind::Distance(|p, l| sd_hex_prism(p, v2(l, 0))),
        wgsl: Some(
            "    let k = vec3<f32>(-0.8660254, 0.5, 0.57735);
    let q = abs(p);
    let xy = q.xy - 2.0 * min(dot(k.xy, q.xy), 0.0) * k.xy;
    let d = vec2<f32>(
        length(xy - vec2<f32>(clamp(xy.x, -k.z * h.x, k.z * h.x), h.x)) * sign(xy.y - h.x),
        q.z - h.y
    );
    return min(max(d.x, d.y), 0.0) + length(max(d, vec2<f32>(0.0)));",
        ),
        glsl: Some(
            "    vec3 k = vec3(-0.8660254, 0.5, 0.57735);
    vec3 q = abs(p);
    vec2 xy = q.xy - 2.0 * min(dot(k.xy, q.xy), 0.0) * k.xy;
    vec2 d = vec2(
        length(xy - vec2(clamp(xy.x, -k.z * h.x, k.z * h.x), h.x)) * sign(xy.y - h.x),
        q.z - h.y
    );
    return min(max(d.x, d.y), 0.0) + length(max(d, vec2(0.0)));",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "sdGyroid",
        code: 9,
        args: &[POINT, arg("scale", Float, &[4.0]), arg("thickness", Float, &[0.05])],
        returns: Float,
        kind: OpKind::Distance(|p, l| sd_gyroid(p, l[0], l[1])),
        wgsl: Some(
            "    let q = p * scale;
    return abs(dot(sin(q), cos(q.zxy))) / scale - thickness;",
        ),
        glsl: Some(
            "    vec3 q = p * scale;
    return abs(dot(sin(q), cos(q.zxy))) / scale - thickness;",
        ),
        deps: &[],
    },
    OperationDefinition {
        name: "sdRoundBox",
        code: 32,
        args: &[POINT, arg("b", V3, &[0.5, 0.5, 0.5]), arg("r", Float, &[0.1])],
        returns: Float,
        kind: OpKind::Primitive(|p, l| sd_round_box(p, v3(l, 0), l[3])),
        wgsl: Some("    return sdBox(p, b - vec3<f32>(r)) - r;"),
        glsl: Some("    return sdBox(p, b - vec3(r)) - r;"),
        deps: &["sdBox"],
    },
    OperationDefinition {
        name: "sdHollowSphere",
        code: 33,
        args: &[POINT, arg("r", Float, &[1.0]), arg("t", Float, &[0.05])],
        returns: Float,
        kind: OpKind::Primitive(|p, l| sd_hollow_sphere(p, l[0], l[1])),
        wgsl: Some("    return abs(sdSphere(p, r)) - t;"),
        glsl: Some("    return abs(sdSphere(p, r)) - t;"),
        deps: &["sdSphere"],
    },
    OperationDefinition {
        name: "sdRoundCylinder",
        code: 34,
        args: &[
            POINT,
            arg("h", Float, &[0.5]),
            arg("r", Float, &[0.5]),
            arg("rr", Float, &[0.1]),
        ],
        returns: Float,
        kind: OpKind::Primitive(|p, l| sd_round_cylinder(p, l[0], l[1], l[2])),
        wgsl: Some("    return sdCylinder(p, h - rr, r - rr) - rr;"),
        glsl: Some("    return sdCylinder(p, h - rr, r - rr) - rr;"),
        deps: &["sdCylinder"],
    },
];
