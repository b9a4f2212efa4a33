//! Core value types shared by the registry, the scene graph and both compilers
//!
//! Everything here is plain data: argument values, materials, kernel dialects
//! and the evaluation record produced by the material entry points.

use glam::{Mat4, Vec2, Vec3, Vec4};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Target dialect for generated kernel source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// WebGPU Shading Language; the program is read from a uniform buffer of `vec4`s
    Wgsl,
    /// Classic GLSL; the program is a plain `uniform float[]`
    Glsl,
}

impl Dialect {
    /// Both dialects, in a stable order
    pub const ALL: [Dialect; 2] = [Dialect::Wgsl, Dialect::Glsl];

    /// Lowercase dialect name
    pub fn name(self) -> &'static str {
        match self {
            Dialect::Wgsl => "wgsl",
            Dialect::Glsl => "glsl",
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Scalar or small-vector type of an operation argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ArgType {
    /// Single float
    Float,
    /// 2-component vector
    Vec2,
    /// 3-component vector
    Vec3,
    /// 4-component vector (colours, quaternions)
    Vec4,
    /// Column-major 4x4 matrix
    Mat4,
}

impl ArgType {
    /// Number of floats this type occupies in the bytecode stream
    #[inline]
    pub fn width(self) -> usize {
        match self {
            ArgType::Float => 1,
            ArgType::Vec2 => 2,
            ArgType::Vec3 => 3,
            ArgType::Vec4 => 4,
            ArgType::Mat4 => 16,
        }
    }

    fn from_width(width: usize) -> Option<Self> {
        match width {
            1 => Some(ArgType::Float),
            2 => Some(ArgType::Vec2),
            3 => Some(ArgType::Vec3),
            4 => Some(ArgType::Vec4),
            16 => Some(ArgType::Mat4),
            _ => None,
        }
    }
}

impl fmt::Display for ArgType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgType::Float => "float",
            ArgType::Vec2 => "vec2",
            ArgType::Vec3 => "vec3",
            ArgType::Vec4 => "vec4",
            ArgType::Mat4 => "mat4",
        };
        f.write_str(name)
    }
}

/// Literal argument value supplied by a node or modifier
///
/// Serialized as a bare number or as an array of 2, 3, 4 or 16 numbers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawArgValue", into = "RawArgValue")]
pub enum ArgValue {
    /// Single float
    Float(f32),
    /// 2-component vector
    Vec2(Vec2),
    /// 3-component vector
    Vec3(Vec3),
    /// 4-component vector
    Vec4(Vec4),
    /// Column-major 4x4 matrix
    Mat4(Mat4),
}

impl ArgValue {
    /// Type of this value
    pub fn ty(&self) -> ArgType {
        match self {
            ArgValue::Float(_) => ArgType::Float,
            ArgValue::Vec2(_) => ArgType::Vec2,
            ArgValue::Vec3(_) => ArgType::Vec3,
            ArgValue::Vec4(_) => ArgType::Vec4,
            ArgValue::Mat4(_) => ArgType::Mat4,
        }
    }

    /// Append the components of this value to `out` (column-major for matrices)
    pub fn flatten_into(&self, out: &mut Vec<f32>) {
        match self {
            ArgValue::Float(v) => out.push(*v),
            ArgValue::Vec2(v) => out.extend_from_slice(&v.to_array()),
            ArgValue::Vec3(v) => out.extend_from_slice(&v.to_array()),
            ArgValue::Vec4(v) => out.extend_from_slice(&v.to_array()),
            ArgValue::Mat4(m) => out.extend_from_slice(&m.to_cols_array()),
        }
    }

    /// Components of this value as a flat vector
    pub fn to_vec(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.ty().width());
        self.flatten_into(&mut out);
        out
    }

    /// Rebuild a value of type `ty` from its flat components
    ///
    /// Returns `None` when `components` does not have exactly `ty.width()` entries.
    pub fn from_components(ty: ArgType, components: &[f32]) -> Option<Self> {
        if components.len() != ty.width() {
            return None;
        }
        let c = components;
        Some(match ty {
            ArgType::Float => ArgValue::Float(c[0]),
            ArgType::Vec2 => ArgValue::Vec2(Vec2::new(c[0], c[1])),
            ArgType::Vec3 => ArgValue::Vec3(Vec3::new(c[0], c[1], c[2])),
            ArgType::Vec4 => ArgValue::Vec4(Vec4::new(c[0], c[1], c[2], c[3])),
            ArgType::Mat4 => ArgValue::Mat4(Mat4::from_cols_slice(c)),
        })
    }
}

impl From<f32> for ArgValue {
    fn from(v: f32) -> Self {
        ArgValue::Float(v)
    }
}

impl From<Vec2> for ArgValue {
    fn from(v: Vec2) -> Self {
        ArgValue::Vec2(v)
    }
}

impl From<Vec3> for ArgValue {
    fn from(v: Vec3) -> Self {
        ArgValue::Vec3(v)
    }
}

impl From<Vec4> for ArgValue {
    fn from(v: Vec4) -> Self {
        ArgValue::Vec4(v)
    }
}

impl From<Mat4> for ArgValue {
    fn from(m: Mat4) -> Self {
        ArgValue::Mat4(m)
    }
}

impl From<[f32; 2]> for ArgValue {
    fn from(v: [f32; 2]) -> Self {
        ArgValue::Vec2(Vec2::from(v))
    }
}

impl From<[f32; 3]> for ArgValue {
    fn from(v: [f32; 3]) -> Self {
        ArgValue::Vec3(Vec3::from(v))
    }
}

impl From<[f32; 4]> for ArgValue {
    fn from(v: [f32; 4]) -> Self {
        ArgValue::Vec4(Vec4::from(v))
    }
}

/// Wire form of [`ArgValue`]
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawArgValue {
    Scalar(f32),
    List(Vec<f32>),
}

impl TryFrom<RawArgValue> for ArgValue {
    type Error = String;

    fn try_from(raw: RawArgValue) -> Result<Self, Self::Error> {
        match raw {
            RawArgValue::Scalar(v) => Ok(ArgValue::Float(v)),
            RawArgValue::List(list) => ArgType::from_width(list.len())
                .and_then(|ty| ArgValue::from_components(ty, &list))
                .ok_or_else(|| {
                    format!(
                        "argument arrays must have 1, 2, 3, 4 or 16 components, got {}",
                        list.len()
                    )
                }),
        }
    }
}

impl From<ArgValue> for RawArgValue {
    fn from(value: ArgValue) -> Self {
        match value {
            ArgValue::Float(v) => RawArgValue::Scalar(v),
            other => RawArgValue::List(other.to_vec()),
        }
    }
}

/// Surface colour attached to a node
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Material {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    #[serde(default = "Material::opaque")]
    pub a: f32,
}

impl Material {
    /// Create an opaque colour
    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Material { r, g, b, a: 1.0 }
    }

    /// Create a colour with alpha
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Material { r, g, b, a }
    }

    /// Colour as `[r, g, b, a]`
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Colour as a vector
    pub fn to_vec4(self) -> Vec4 {
        Vec4::new(self.r, self.g, self.b, self.a)
    }

    fn opaque() -> f32 {
        1.0
    }
}

impl Default for Material {
    fn default() -> Self {
        Material::rgb(0.8, 0.8, 0.8)
    }
}

impl From<Vec4> for Material {
    fn from(v: Vec4) -> Self {
        Material::rgba(v.x, v.y, v.z, v.w)
    }
}

/// Result of the material entry points
///
/// `normal` and `ao` are placeholders (`Vec3::ZERO` and `1.0`) on every
/// intermediate record; only the final record of a sample evaluation carries
/// the real surface normal and ambient occlusion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSample {
    /// Signed distance in world units
    pub distance: f32,
    /// Surface normal (central differences)
    pub normal: Vec3,
    /// Ambient occlusion in `[0, 1]`, 1 = unoccluded
    pub ao: f32,
    /// Surface colour
    pub color: Vec4,
    /// Id of the node that owns the surface
    pub id: u32,
}

impl SceneSample {
    /// Intermediate record with placeholder normal and occlusion
    #[inline]
    pub fn new(distance: f32, color: Vec4, id: u32) -> Self {
        SceneSample {
            distance,
            normal: Vec3::ZERO,
            ao: 1.0,
            color,
            id,
        }
    }
}
