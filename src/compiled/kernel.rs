//! Stack-machine kernel generation
//!
//! The kernel is a fixed interpreter: it reads the program from a uniform
//! array through `programAt(i)` and dispatches on opcode constants. Only the
//! operations a program references (plus their dependencies) are compiled
//! in, unless [`StackMachineKernel::full`] is asked for.
//!
//! # Entry points
//!
//! | Function | Result |
//! |----------|--------|
//! | `sdProgram(pos)` | distance |
//! | `sdProgramRecord(pos)` | `SceneSample` with placeholder normal and occlusion |
//! | `programNormal(pos)` | unit normal by central differences, zero when degenerate |
//! | `programAmbientOcclusion(pos, n)` | occlusion in `[0, 1]` |
//! | `sdProgramSample(pos)` | `SceneSample` with normal and occlusion |

use super::dialect::{
    blend_expr, displace_expr, format_literal, functions_source, id_literal, sample_ctor,
    sample_support, Glsl, ShaderLang, Wgsl,
};
use super::opcode::{constant_name, Control};
use super::{CompileError, EMPTY_DISTANCE, MAX_FRAME_STACK, MAX_VALUE_STACK, NO_SURFACE};
use crate::registry::{self, OpKind, OperationDefinition, ScaleRule};
use crate::types::{ArgType, Dialect};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// Fixed sampling directions for ambient occlusion, in sampling order
pub const AO_DIRECTIONS: [Vec3; 8] = [
    Vec3::new(0.0, 1.0, 0.0),
    Vec3::new(0.8, 0.6, 0.0),
    Vec3::new(-0.8, 0.6, 0.0),
    Vec3::new(0.0, 0.6, 0.8),
    Vec3::new(0.0, 0.6, -0.8),
    Vec3::new(0.6, 0.0, 0.8),
    Vec3::new(-0.6, 0.0, 0.8),
    Vec3::new(0.48, 0.6, 0.64),
];

/// Surface-query settings baked into the kernel as constants
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Central-difference offset for normals
    pub normal_epsilon: f32,
    /// Ambient occlusion sample count (clamped to `1..=8`)
    pub ao_samples: u32,
    /// Distance between ambient occlusion samples
    pub ao_step: f32,
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig {
            normal_epsilon: 1e-3,
            ao_samples: 5,
            ao_step: 0.1,
        }
    }
}

impl KernelConfig {
    /// Effective ambient occlusion sample count
    #[inline]
    pub fn samples(&self) -> usize {
        (self.ao_samples as usize).clamp(1, AO_DIRECTIONS.len())
    }
}

/// Generated stack-machine kernel
#[derive(Debug, Clone)]
pub struct StackMachineKernel {
    /// Kernel source
    pub source: String,
    /// Target dialect
    pub dialect: Dialect,
    /// Opcodes with a dispatch branch
    pub opcodes: BTreeSet<u16>,
    /// Baked surface-query settings
    pub config: KernelConfig,
}

impl StackMachineKernel {
    /// Kernel dispatching `opcodes`
    pub fn generate(
        dialect: Dialect,
        opcodes: &BTreeSet<u16>,
        config: KernelConfig,
    ) -> Result<Self, CompileError> {
        let source = match dialect {
            Dialect::Wgsl => kernel_source::<Wgsl>(opcodes, &config)?,
            Dialect::Glsl => kernel_source::<Glsl>(opcodes, &config)?,
        };
        debug!(%dialect, opcodes = opcodes.len(), bytes = source.len(), "kernel generated");
        Ok(StackMachineKernel {
            source,
            dialect,
            opcodes: opcodes.clone(),
            config,
        })
    }

    /// Kernel dispatching every registry operation
    pub fn full(dialect: Dialect, config: KernelConfig) -> Result<Self, CompileError> {
        let opcodes: BTreeSet<u16> = registry::all().map(|def| def.code).collect();
        Self::generate(dialect, &opcodes, config)
    }
}

/// Indented source builder
struct Code {
    out: String,
    depth: usize,
}

impl Code {
    fn new() -> Self {
        Code {
            out: String::new(),
            depth: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str("    ");
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn open(&mut self, text: &str) {
        self.line(text);
        self.depth += 1;
    }

    fn reopen(&mut self, text: &str) {
        self.depth -= 1;
        self.open(text);
    }

    fn close(&mut self) {
        self.depth -= 1;
        self.line("}");
    }

    fn blank(&mut self) {
        self.out.push('\n');
    }
}

fn kernel_source<L: ShaderLang>(
    opcodes: &BTreeSet<u16>,
    config: &KernelConfig,
) -> Result<String, CompileError> {
    let float = L::type_name(ArgType::Float);
    let int = L::int_type();

    let mut code = Code::new();
    code.out.push_str(L::program_storage());
    code.blank();

    code.line(&L::decl_const("EMPTY_DISTANCE", float, &format_literal(EMPTY_DISTANCE)));
    code.line(&L::decl_const(
        "NORMAL_EPSILON",
        float,
        &format_literal(config.normal_epsilon),
    ));
    code.line(&L::decl_const("AO_STEP", float, &format_literal(config.ao_step)));
    code.line(&L::decl_const("AO_SAMPLES", int, &config.samples().to_string()));
    for control in [Control::Empty, Control::PopContext] {
        code.line(&L::decl_const(
            control.constant_name(),
            int,
            &control.code().to_string(),
        ));
    }
    for def in dispatched(opcodes) {
        code.line(&L::decl_const(&constant_name(def.name), int, &def.code.to_string()));
    }
    code.blank();

    code.out.push_str(&sample_support::<L>());
    code.blank();
    let (functions, _) = functions_source::<L>(opcodes)?;
    code.out.push_str(&functions);

    emit_machine::<L>(&mut code, opcodes, false);
    code.blank();
    emit_machine::<L>(&mut code, opcodes, true);
    code.blank();
    emit_surface_queries::<L>(&mut code);
    Ok(code.out)
}

fn dispatched(opcodes: &BTreeSet<u16>) -> impl Iterator<Item = &'static OperationDefinition> + '_ {
    opcodes.iter().filter_map(|&code| registry::by_code(code))
}

/// Program float at `ip + offset`
fn program_at(offset: usize) -> String {
    if offset == 0 {
        "programAt(ip)".to_string()
    } else {
        format!("programAt(ip + {offset})")
    }
}

/// Declare `a0..` from the literal operands and advance `ip`; returns their names
fn read_literals<L: ShaderLang>(code: &mut Code, def: &OperationDefinition, scaled: bool) -> Vec<String> {
    let mut offset = 0;
    let mut names = Vec::new();
    for (i, decl) in def.literal_args().enumerate() {
        let components: Vec<String> = (0..decl.ty.width()).map(|j| program_at(offset + j)).collect();
        let mut expr = L::value_expr(decl.ty, &components);
        if scaled {
            expr = format!("{expr} * s");
        }
        let name = format!("a{i}");
        code.line(&L::decl_let(&name, L::type_name(decl.ty), &expr));
        names.push(name);
        offset += decl.ty.width();
    }
    if offset > 0 {
        code.line(&format!("ip = ip + {offset};"));
    }
    names
}

fn call(name: &str, args: impl IntoIterator<Item = String>) -> String {
    format!("{name}({})", args.into_iter().collect::<Vec<_>>().join(", "))
}

/// Push a leaf result whose colour and id follow at `ip`
fn push_leaf<L: ShaderLang>(code: &mut Code, distance: &str, records: bool) {
    if records {
        let components: Vec<String> = (0..4).map(program_at).collect();
        code.line(&L::decl_let(
            "c",
            L::type_name(ArgType::Vec4),
            &L::value_expr(ArgType::Vec4, &components),
        ));
        let id = L::to_int(&program_at(4));
        code.line(&format!("records[sp] = {};", sample_ctor::<L>(distance, "c", &id)));
    } else {
        code.line(&format!("stack[sp] = {distance};"));
    }
    code.line("sp = sp + 1;");
    code.line("ip = ip + 5;");
}

fn pop_operands<L: ShaderLang>(code: &mut Code, records: bool) {
    let (stack, ty) = if records {
        ("records", "SceneSample")
    } else {
        ("stack", L::type_name(ArgType::Float))
    };
    code.line(&L::decl_let("b", ty, &format!("{stack}[sp - 1]")));
    code.line(&L::decl_let("a", ty, &format!("{stack}[sp - 2]")));
    code.line("sp = sp - 2;");
}

fn emit_machine<L: ShaderLang>(code: &mut Code, opcodes: &BTreeSet<u16>, records: bool) {
    let float = L::type_name(ArgType::Float);
    let vec3 = L::type_name(ArgType::Vec3);
    let int = L::int_type();
    let (name, stack, value) = if records {
        ("sdProgramRecord", "records", "SceneSample")
    } else {
        ("sdProgram", "stack", float)
    };
    let (da, db) = if records { ("a.d", "b.d") } else { ("a", "b") };

    code.open(&L::fn_header(name, &[("pos", vec3)], value));
    code.line(&L::decl_array(stack, value, MAX_VALUE_STACK));
    code.line(&L::decl_array("framePoints", vec3, MAX_FRAME_STACK));
    code.line(&L::decl_array("frameScales", float, MAX_FRAME_STACK));
    code.line(&L::decl_var("p", vec3, "pos"));
    code.line(&L::decl_var("s", float, "1.0"));
    code.line(&L::decl_var("ip", int, "0"));
    code.line(&L::decl_var("sp", int, "0"));
    code.line(&L::decl_var("fp", int, "0"));
    code.line(&L::decl_let("programEnd", int, "programLength()"));

    code.open("while (ip < programEnd) {");
    code.line(&L::decl_let("code", int, &L::to_int("programAt(ip)")));
    code.line("ip = ip + 1;");

    code.open(&format!("if (code == {}) {{", Control::PopContext.constant_name()));
    code.line("fp = fp - 1;");
    code.line("p = framePoints[fp];");
    code.line("s = frameScales[fp];");

    code.reopen(&format!("}} else if (code == {}) {{", Control::Empty.constant_name()));
    push_leaf::<L>(code, "EMPTY_DISTANCE", records);

    for def in dispatched(opcodes) {
        code.reopen(&format!("}} else if (code == {}) {{", constant_name(def.name)));
        match def.kind {
            OpKind::Distance(_) | OpKind::Primitive(_) => {
                let args = read_literals::<L>(code, def, false);
                let distance = format!("{} * s", call(def.name, std::iter::once("p".to_string()).chain(args)));
                push_leaf::<L>(code, &distance, records);
            }
            OpKind::Boolean { blend, .. } => {
                pop_operands::<L>(code, records);
                let args = read_literals::<L>(code, def, true);
                let k = args.first().cloned().unwrap_or_else(|| "0.0".to_string());
                let distance = call(def.name, [da.to_string(), db.to_string()].into_iter().chain(args));
                if records {
                    code.line(&L::decl_let("d", float, &distance));
                    code.line(&format!("records[sp] = {};", blend_expr(blend, "a", "b", "d", &k)));
                } else {
                    code.line(&format!("stack[sp] = {distance};"));
                }
                code.line("sp = sp + 1;");
            }
            OpKind::Displacement(_) => {
                pop_operands::<L>(code, records);
                let args = read_literals::<L>(code, def, false);
                let operands = ["p".to_string(), format!("{da} / s"), format!("{db} / s")];
                let distance = format!("{} * s", call(def.name, operands.into_iter().chain(args)));
                if records {
                    code.line(&L::decl_let("d", float, &distance));
                    code.line(&format!("records[sp] = {};", displace_expr("a", "b", "d")));
                } else {
                    code.line(&format!("stack[sp] = {distance};"));
                }
                code.line("sp = sp + 1;");
            }
            OpKind::Positioning { scale, .. } => {
                let args = read_literals::<L>(code, def, false);
                code.line("framePoints[fp] = p;");
                code.line("frameScales[fp] = s;");
                code.line("fp = fp + 1;");
                let first = args.first().cloned().unwrap_or_default();
                code.line(&format!("p = {};", call(def.name, std::iter::once("p".to_string()).chain(args))));
                match scale {
                    ScaleRule::Preserve => {}
                    ScaleRule::Multiply => code.line(&format!("s = s * {first};")),
                    ScaleRule::DivideByBasis => code.line(&format!("s = s / length({first}[0].xyz);")),
                }
            }
        }
    }

    code.reopen("} else {");
    code.line("break;");
    code.close();
    code.close();

    code.open("if (sp == 0) {");
    if records {
        let zero = L::value_expr(ArgType::Vec4, &["0.0".to_string()]);
        code.line(&format!(
            "return {};",
            sample_ctor::<L>("EMPTY_DISTANCE", &zero, &id_literal(NO_SURFACE))
        ));
    } else {
        code.line("return EMPTY_DISTANCE;");
    }
    code.close();
    code.line(&format!("return {stack}[sp - 1];"));
    code.close();
}

fn emit_surface_queries<L: ShaderLang>(code: &mut Code) {
    let float = L::type_name(ArgType::Float);
    let vec3 = L::type_name(ArgType::Vec3);
    let v3 = |x: &str, y: &str, z: &str| {
        L::value_expr(ArgType::Vec3, &[x.to_string(), y.to_string(), z.to_string()])
    };

    code.open(&L::fn_header("programNormal", &[("pos", vec3)], vec3));
    code.line(&L::decl_let("e", float, "NORMAL_EPSILON"));
    let axes = [
        v3("e", "0.0", "0.0"),
        v3("0.0", "e", "0.0"),
        v3("0.0", "0.0", "e"),
    ];
    let diffs: Vec<String> = axes
        .iter()
        .map(|h| format!("sdProgram(pos + {h}) - sdProgram(pos - {h})"))
        .collect();
    code.line(&L::decl_let("n", vec3, &L::value_expr(ArgType::Vec3, &diffs)));
    code.line(&L::decl_let("magnitude", float, "length(n)"));
    code.open("if (magnitude < 1e-12) {");
    code.line(&format!("return {};", L::vec3_zero()));
    code.close();
    code.line("return n / magnitude;");
    code.close();
    code.blank();

    let directions: Vec<String> = AO_DIRECTIONS
        .iter()
        .map(|d| v3(&format_literal(d.x), &format_literal(d.y), &format_literal(d.z)))
        .collect();
    code.open(&L::fn_header(
        "programAmbientOcclusion",
        &[("pos", vec3), ("n", vec3)],
        float,
    ));
    code.line(&L::decl_array_init("dirs", vec3, &directions));
    code.line(&L::decl_var("occ", float, "0.0"));
    code.open(&L::for_header("i", "AO_SAMPLES"));
    code.line(&L::decl_var("dir", vec3, "dirs[i]"));
    code.open("if (dot(dir, n) < 0.0) {");
    code.line("dir = -dir;");
    code.close();
    code.line("dir = normalize(n + dir);");
    code.line(&L::decl_let("t", float, &format!("AO_STEP * {}", L::to_float("i + 1"))));
    code.line("occ = occ + (t - max(sdProgram(pos + dir * t), 0.0)) / t;");
    code.close();
    code.line(&format!(
        "return clamp(1.0 - occ / {}, 0.0, 1.0);",
        L::to_float("AO_SAMPLES")
    ));
    code.close();
    code.blank();

    code.open(&L::fn_header("sdProgramSample", &[("pos", vec3)], "SceneSample"));
    code.line(&L::decl_var("result", "SceneSample", "sdProgramRecord(pos)"));
    code.line("result.normal = programNormal(pos);");
    code.line("result.ao = programAmbientOcclusion(pos, result.normal);");
    code.line("return result;");
    code.close();
}
