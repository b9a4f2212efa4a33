//! Operation registry: the static catalog of every primitive and operator
//!
//! Each [`OperationDefinition`] carries its name, its category payload
//! ([`OpKind`]), its ordered argument list, a stable opcode, one function body
//! per kernel dialect and a CPU implementation. Both compilers, the reference
//! evaluator and the CPU stack machine dispatch on [`OpKind`], so adding a
//! category forces every backend to handle it.
//!
//! # Argument partition
//!
//! Every declared argument is either *contextual* (supplied by the evaluation
//! context, see [`Category::contextual_args`]) or *literal* (supplied by the
//! node or modifier). Literal arguments are encoded in declaration order.
//!
//! | Category | Contextual | Opcode band |
//! |----------|------------|-------------|
//! | DistanceFunction | `p` | `0..64` |
//! | PrimitiveOp | `p` | `0..64` |
//! | BooleanOp | `d1`, `d2` | `64..96` |
//! | DisplacementOp | `p`, `d1`, `d2` | `96..128` |
//! | PositioningOp | `p` | `128..192` |

pub mod displacement;
pub mod operations;
pub mod positioning;
pub mod primitives;

use crate::types::{ArgType, ArgValue, Dialect, SceneSample};
use glam::{Mat4, Vec2, Vec3, Vec4};
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::fmt;
use std::ops::Range;
use thiserror::Error;

/// Registry lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Operation name not in the registry
    #[error("unknown operation '{0}'")]
    UnknownOperation(String),

    /// Operation has no body for the requested dialect
    #[error("operation '{op}' has no {dialect} body")]
    MissingDialectBody {
        /// Operation name
        op: &'static str,
        /// Requested dialect
        dialect: Dialect,
    },
}

/// Operation category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Leaf shape evaluated from the running point
    DistanceFunction,
    /// Leaf shape composed from other registry functions
    PrimitiveOp,
    /// Combines two operand distances
    BooleanOp,
    /// Combines two operand distances with access to the running point
    DisplacementOp,
    /// Maps the running point to a new point (modifiers only)
    PositioningOp,
}

impl Category {
    /// Arguments supplied by the evaluation context, with their required types
    pub fn contextual_args(self) -> &'static [(&'static str, ArgType)] {
        match self {
            Category::DistanceFunction | Category::PrimitiveOp | Category::PositioningOp => {
                &[("p", ArgType::Vec3)]
            }
            Category::BooleanOp => &[("d1", ArgType::Float), ("d2", ArgType::Float)],
            Category::DisplacementOp => &[
                ("p", ArgType::Vec3),
                ("d1", ArgType::Float),
                ("d2", ArgType::Float),
            ],
        }
    }

    /// Whether `name` is contextual for this category
    #[inline]
    pub fn is_contextual(self, name: &str) -> bool {
        self.contextual_args().iter().any(|(n, _)| *n == name)
    }

    /// Opcode band reserved for this category
    pub fn code_band(self) -> Range<u16> {
        match self {
            Category::DistanceFunction | Category::PrimitiveOp => 0..64,
            Category::BooleanOp => 64..96,
            Category::DisplacementOp => 96..128,
            Category::PositioningOp => 128..192,
        }
    }

    /// Whether nodes of this category combine children
    #[inline]
    pub fn is_combiner(self) -> bool {
        matches!(self, Category::BooleanOp | Category::DisplacementOp)
    }

    /// Whether nodes of this category are leaf shapes
    #[inline]
    pub fn is_shape(self) -> bool {
        matches!(self, Category::DistanceFunction | Category::PrimitiveOp)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Declared argument of an operation
#[derive(Debug, Clone, Copy)]
pub struct ArgDecl {
    /// Argument name (also the parameter name in generated code)
    pub name: &'static str,
    /// Argument type
    pub ty: ArgType,
    /// Template value used by `Scene::add_node`; empty for contextual arguments
    pub default: &'static [f32],
}

/// Leaf shape: `(p, literals) -> distance`
pub type ShapeFn = fn(Vec3, &[f32]) -> f32;
/// Boolean combiner: `(d1, d2, literals) -> distance`
pub type BooleanFn = fn(f32, f32, &[f32]) -> f32;
/// Displacement combiner: `(p, d1, d2, literals) -> distance`
pub type DisplaceFn = fn(Vec3, f32, f32, &[f32]) -> f32;
/// Positioning operator: `(p, literals) -> p'`
pub type PositionFn = fn(Vec3, &[f32]) -> Vec3;

/// Which operand owns the surface for exact boolean material selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    /// Operand with the smaller distance
    Nearest,
    /// Operand with the larger distance
    Farthest,
    /// Always the first operand
    Minuend,
}

impl Pick {
    /// Distance of the exact operator this pick belongs to
    #[inline]
    pub fn base_distance(self, d1: f32, d2: f32) -> f32 {
        match self {
            Pick::Nearest => d1.min(d2),
            Pick::Farthest => d1.max(d2),
            Pick::Minuend => d1.max(-d2),
        }
    }

    /// Select `a` or `b`
    #[inline]
    pub fn choose<'a>(self, a: &'a SceneSample, b: &'a SceneSample) -> &'a SceneSample {
        match self {
            Pick::Nearest if a.distance <= b.distance => a,
            Pick::Farthest if a.distance >= b.distance => a,
            Pick::Minuend => a,
            _ => b,
        }
    }

    /// Colour weight of the first operand for the smooth operator this pick belongs to
    ///
    /// Each smooth operator interpolates its distance with its own `h`; the
    /// colour follows the same interpolation.
    #[inline]
    pub fn smooth_color_weight(self, d1: f32, d2: f32, k: f32) -> f32 {
        let k = k.max(MIN_BLEND_RADIUS);
        match self {
            Pick::Nearest => smooth_weight(d1, d2, k),
            Pick::Farthest => (0.5 - 0.5 * (d2 - d1) / k).clamp(0.0, 1.0),
            // h weighs the subtrahend
            Pick::Minuend => 1.0 - (0.5 - 0.5 * (d2 + d1) / k).clamp(0.0, 1.0),
        }
    }
}

/// How a boolean operator combines material and id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlendRule {
    /// Exact operator: take colour and id from the picked operand
    Exact(Pick),
    /// Chamfer: 50 % colour mix inside the chamfer region, pick elsewhere
    Chamfer(Pick),
    /// Smooth: colour interpolated by the operator's own weight, id of the nearer operand
    Smooth(Pick),
}

/// Colour difference threshold that marks the chamfer region
pub const CHAMFER_EPSILON: f32 = 1e-6;
/// Lower bound for smooth blend radii
pub const MIN_BLEND_RADIUS: f32 = 1e-6;

impl BlendRule {
    /// Combine two records into one with combined distance `d` and blend literal `k`
    pub fn apply(self, a: &SceneSample, b: &SceneSample, d: f32, k: f32) -> SceneSample {
        let nearer = if a.distance <= b.distance { a } else { b };
        match self {
            BlendRule::Exact(pick) => {
                let owner = pick.choose(a, b);
                SceneSample::new(d, owner.color, owner.id)
            }
            BlendRule::Chamfer(pick) => {
                let base = pick.base_distance(a.distance, b.distance);
                if (d - base).abs() > CHAMFER_EPSILON {
                    SceneSample::new(d, a.color.lerp(b.color, 0.5), nearer.id)
                } else {
                    let owner = pick.choose(a, b);
                    SceneSample::new(d, owner.color, owner.id)
                }
            }
            BlendRule::Smooth(pick) => {
                let h = pick.smooth_color_weight(a.distance, b.distance, k);
                SceneSample::new(d, b.color.lerp(a.color, h), nearer.id)
            }
        }
    }
}

/// Smooth blend weight `h = clamp(0.5 + 0.5 (d2 - d1) / k, 0, 1)`
#[inline]
pub fn smooth_weight(d1: f32, d2: f32, k: f32) -> f32 {
    (0.5 + 0.5 * (d2 - d1) / k.max(MIN_BLEND_RADIUS)).clamp(0.0, 1.0)
}

/// How a positioning operator changes the accumulated uniform scale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScaleRule {
    /// Rigid motion or domain warp: scale unchanged
    Preserve,
    /// Multiply by the first literal
    Multiply,
    /// Divide by the length of the first basis column of the matrix literal
    DivideByBasis,
}

impl ScaleRule {
    /// Updated scale after applying an operator with `literals`
    #[inline]
    pub fn apply(self, scale: f32, literals: &[f32]) -> f32 {
        match self {
            ScaleRule::Preserve => scale,
            ScaleRule::Multiply => scale * literals[0],
            ScaleRule::DivideByBasis => scale / v3(literals, 0).length(),
        }
    }
}

/// Category payload of an operation
#[derive(Debug, Clone, Copy)]
pub enum OpKind {
    /// Leaf shape
    Distance(ShapeFn),
    /// Leaf shape built from other registry functions
    Primitive(ShapeFn),
    /// Two-operand CSG combiner
    Boolean {
        /// Distance formula
        eval: BooleanFn,
        /// Material and id selection
        blend: BlendRule,
    },
    /// Two-operand combiner with access to the point
    Displacement(DisplaceFn),
    /// Coordinate transform
    Positioning {
        /// Point mapping
        eval: PositionFn,
        /// Scale propagation
        scale: ScaleRule,
    },
}

impl OpKind {
    /// Category of this payload
    pub fn category(&self) -> Category {
        match self {
            OpKind::Distance(_) => Category::DistanceFunction,
            OpKind::Primitive(_) => Category::PrimitiveOp,
            OpKind::Boolean { .. } => Category::BooleanOp,
            OpKind::Displacement(_) => Category::DisplacementOp,
            OpKind::Positioning { .. } => Category::PositioningOp,
        }
    }
}

/// Immutable description of one primitive or operator
#[derive(Debug)]
pub struct OperationDefinition {
    /// Function name in generated code
    pub name: &'static str,
    /// Stable opcode
    pub code: u16,
    /// Ordered arguments (contextual and literal)
    pub args: &'static [ArgDecl],
    /// Return type
    pub returns: ArgType,
    /// Category payload
    pub kind: OpKind,
    /// WGSL function body
    pub wgsl: Option<&'static str>,
    /// GLSL function body
    pub glsl: Option<&'static str>,
    /// Registry functions called by the bodies
    pub deps: &'static [&'static str],
}

impl OperationDefinition {
    /// Category of this operation
    #[inline]
    pub fn category(&self) -> Category {
        self.kind.category()
    }

    /// Function body for `dialect`
    pub fn body(&self, dialect: Dialect) -> Result<&'static str, RegistryError> {
        let body = match dialect {
            Dialect::Wgsl => self.wgsl,
            Dialect::Glsl => self.glsl,
        };
        body.ok_or(RegistryError::MissingDialectBody {
            op: self.name,
            dialect,
        })
    }

    /// Arguments supplied by the evaluation context
    pub fn contextual_args(&self) -> impl Iterator<Item = &'static ArgDecl> {
        let category = self.category();
        self.args.iter().filter(move |a| category.is_contextual(a.name))
    }

    /// Arguments that must be supplied by the node or modifier, in declaration order
    pub fn literal_args(&self) -> impl Iterator<Item = &'static ArgDecl> {
        let category = self.category();
        self.args.iter().filter(move |a| !category.is_contextual(a.name))
    }

    /// Literal argument by name
    pub fn literal_arg(&self, name: &str) -> Option<&'static ArgDecl> {
        self.literal_args().find(|a| a.name == name)
    }

    /// Number of floats the literal arguments occupy in the bytecode stream
    pub fn literal_width(&self) -> usize {
        self.literal_args().map(|a| a.ty.width()).sum()
    }

    /// Template values for every literal argument
    pub fn default_args(&self) -> Vec<(&'static str, ArgValue)> {
        self.literal_args()
            .filter_map(|a| ArgValue::from_components(a.ty, a.default).map(|v| (a.name, v)))
            .collect()
    }
}

lazy_static! {
    static ref BY_NAME: HashMap<&'static str, &'static OperationDefinition> =
        all().map(|def| (def.name, def)).collect();
    static ref BY_CODE: HashMap<u16, &'static OperationDefinition> =
        all().map(|def| (def.code, def)).collect();
}

fn tables() -> [&'static [OperationDefinition]; 4] {
    [
        &primitives::DEFINITIONS,
        &operations::DEFINITIONS,
        &displacement::DEFINITIONS,
        &positioning::DEFINITIONS,
    ]
}

/// Look up an operation by name
pub fn lookup(name: &str) -> Result<&'static OperationDefinition, RegistryError> {
    BY_NAME
        .get(name)
        .copied()
        .ok_or_else(|| RegistryError::UnknownOperation(name.to_string()))
}

/// Look up an operation by opcode
pub fn by_code(code: u16) -> Option<&'static OperationDefinition> {
    BY_CODE.get(&code).copied()
}

/// Every operation, in opcode order
pub fn all() -> impl Iterator<Item = &'static OperationDefinition> {
    // Tables are declared band by band in ascending code order
    tables().into_iter().flat_map(|table| table.iter())
}

/// Declared argument (table constructor)
pub(crate) const fn arg(name: &'static str, ty: ArgType, default: &'static [f32]) -> ArgDecl {
    ArgDecl { name, ty, default }
}

/// Contextual running point
pub(crate) const POINT: ArgDecl = arg("p", ArgType::Vec3, &[]);
/// Contextual first operand distance
pub(crate) const D1: ArgDecl = arg("d1", ArgType::Float, &[]);
/// Contextual second operand distance
pub(crate) const D2: ArgDecl = arg("d2", ArgType::Float, &[]);

/// Sign with `sign(0) == 0`, as in shader code
#[inline]
pub(crate) fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Shader `mix` for scalars
#[inline]
pub(crate) fn mix(x: f32, y: f32, a: f32) -> f32 {
    x * (1.0 - a) + y * a
}

// Literal slice accessors shared by the CPU implementations

#[inline]
pub(crate) fn v2(l: &[f32], at: usize) -> Vec2 {
    Vec2::new(l[at], l[at + 1])
}

#[inline]
pub(crate) fn v3(l: &[f32], at: usize) -> Vec3 {
    Vec3::new(l[at], l[at + 1], l[at + 2])
}

#[inline]
pub(crate) fn v4(l: &[f32], at: usize) -> Vec4 {
    Vec4::new(l[at], l[at + 1], l[at + 2], l[at + 3])
}

#[inline]
pub(crate) fn m4(l: &[f32], at: usize) -> Mat4 {
    Mat4::from_cols_slice(&l[at..at + 16])
}
