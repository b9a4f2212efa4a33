//! Kernel dialects: the syntactic differences between WGSL and GLSL
//!
//! [`ShaderLang`] captures declarations, constructors and the program
//! storage prelude. Everything else (registry functions, the `SceneSample`
//! record and its combiners) is generated once, generically, from those
//! pieces, so the expression compiler and the stack-machine kernel share
//! the same helper code.

use super::resolve::with_dependencies;
use super::{CompileError, NO_SURFACE};
use crate::registry::{self, BlendRule, OperationDefinition, Pick, CHAMFER_EPSILON, MIN_BLEND_RADIUS};
use crate::types::{ArgType, Dialect, Material};
use std::collections::BTreeSet;

/// Syntax of one kernel dialect
pub trait ShaderLang: 'static {
    /// Dialect this implementation emits
    const DIALECT: Dialect;

    /// Type name of an argument type
    fn type_name(ty: ArgType) -> &'static str;
    /// Signed integer type name
    fn int_type() -> &'static str;
    /// Zero `vec3` expression
    fn vec3_zero() -> &'static str;

    /// Immutable local: `let name: T = expr;` / `T name = expr;`
    fn decl_let(name: &str, ty: &str, expr: &str) -> String;
    /// Mutable local: `var name: T = expr;` / `T name = expr;`
    fn decl_var(name: &str, ty: &str, expr: &str) -> String;
    /// Uninitialized fixed-size local array
    fn decl_array(name: &str, elem: &str, len: usize) -> String;
    /// Initialized fixed-size local array
    fn decl_array_init(name: &str, elem: &str, values: &[String]) -> String;
    /// Module-scope constant
    fn decl_const(name: &str, ty: &str, value: &str) -> String;

    /// Function header up to and including the opening brace
    fn fn_header(name: &str, params: &[(&str, &str)], ret: &str) -> String;
    /// Struct declaration
    fn struct_decl(name: &str, fields: &[(&str, &str)]) -> String;
    /// `for` header counting `var` from 0 while below `bound`
    fn for_header(var: &str, bound: &str) -> String;

    /// Integer to float conversion
    fn to_float(expr: &str) -> String;
    /// Float to integer conversion
    fn to_int(expr: &str) -> String;

    /// Program storage and its `programAt(i)` / `programLength()` accessors
    fn program_storage() -> &'static str;

    /// Expression for an argument value from formatted components
    fn value_expr(ty: ArgType, components: &[String]) -> String {
        match ty {
            ArgType::Float => components.first().cloned().unwrap_or_else(|| "0.0".to_string()),
            _ => format!("{}({})", Self::type_name(ty), components.join(", ")),
        }
    }
}

/// WGSL syntax
#[derive(Debug, Clone, Copy, Default)]
pub struct Wgsl;

/// GLSL syntax
#[derive(Debug, Clone, Copy, Default)]
pub struct Glsl;

impl ShaderLang for Wgsl {
    const DIALECT: Dialect = Dialect::Wgsl;

    fn type_name(ty: ArgType) -> &'static str {
        match ty {
            ArgType::Float => "f32",
            ArgType::Vec2 => "vec2<f32>",
            ArgType::Vec3 => "vec3<f32>",
            ArgType::Vec4 => "vec4<f32>",
            ArgType::Mat4 => "mat4x4<f32>",
        }
    }

    fn int_type() -> &'static str {
        "i32"
    }

    fn vec3_zero() -> &'static str {
        "vec3<f32>(0.0)"
    }

    fn decl_let(name: &str, ty: &str, expr: &str) -> String {
        format!("let {name}: {ty} = {expr};")
    }

    fn decl_var(name: &str, ty: &str, expr: &str) -> String {
        format!("var {name}: {ty} = {expr};")
    }

    fn decl_array(name: &str, elem: &str, len: usize) -> String {
        format!("var {name}: array<{elem}, {len}>;")
    }

    fn decl_array_init(name: &str, elem: &str, values: &[String]) -> String {
        format!(
            "var {name} = array<{elem}, {}>({});",
            values.len(),
            values.join(", ")
        )
    }

    fn decl_const(name: &str, ty: &str, value: &str) -> String {
        format!("const {name}: {ty} = {value};")
    }

    fn fn_header(name: &str, params: &[(&str, &str)], ret: &str) -> String {
        let params: Vec<String> = params.iter().map(|(n, t)| format!("{n}: {t}")).collect();
        format!("fn {name}({}) -> {ret} {{", params.join(", "))
    }

    fn struct_decl(name: &str, fields: &[(&str, &str)]) -> String {
        let mut out = format!("struct {name} {{\n");
        for (field, ty) in fields {
            out.push_str(&format!("    {field}: {ty},\n"));
        }
        out.push_str("}\n");
        out
    }

    fn for_header(var: &str, bound: &str) -> String {
        format!("for (var {var}: i32 = 0; {var} < {bound}; {var} = {var} + 1) {{")
    }

    fn to_float(expr: &str) -> String {
        format!("f32({expr})")
    }

    fn to_int(expr: &str) -> String {
        format!("i32({expr})")
    }

    fn program_storage() -> &'static str {
        r#"struct SceneProgram {
    size: i32,
    data: array<vec4<f32>, 1024>,
}

@group(0) @binding(0) var<uniform> sceneProgram: SceneProgram;

fn programAt(i: i32) -> f32 {
    return sceneProgram.data[i / 4][i % 4];
}

fn programLength() -> i32 {
    return sceneProgram.size;
}
"#
    }
}

impl ShaderLang for Glsl {
    const DIALECT: Dialect = Dialect::Glsl;

    fn type_name(ty: ArgType) -> &'static str {
        match ty {
            ArgType::Float => "float",
            ArgType::Vec2 => "vec2",
            ArgType::Vec3 => "vec3",
            ArgType::Vec4 => "vec4",
            ArgType::Mat4 => "mat4",
        }
    }

    fn int_type() -> &'static str {
        "int"
    }

    fn vec3_zero() -> &'static str {
        "vec3(0.0)"
    }

    fn decl_let(name: &str, ty: &str, expr: &str) -> String {
        format!("{ty} {name} = {expr};")
    }

    fn decl_var(name: &str, ty: &str, expr: &str) -> String {
        format!("{ty} {name} = {expr};")
    }

    fn decl_array(name: &str, elem: &str, len: usize) -> String {
        format!("{elem} {name}[{len}];")
    }

    fn decl_array_init(name: &str, elem: &str, values: &[String]) -> String {
        let len = values.len();
        format!("{elem} {name}[{len}] = {elem}[{len}]({});", values.join(", "))
    }

    fn decl_const(name: &str, ty: &str, value: &str) -> String {
        format!("const {ty} {name} = {value};")
    }

    fn fn_header(name: &str, params: &[(&str, &str)], ret: &str) -> String {
        let params: Vec<String> = params.iter().map(|(n, t)| format!("{t} {n}")).collect();
        format!("{ret} {name}({}) {{", params.join(", "))
    }

    fn struct_decl(name: &str, fields: &[(&str, &str)]) -> String {
        let mut out = format!("struct {name} {{\n");
        for (field, ty) in fields {
            out.push_str(&format!("    {ty} {field};\n"));
        }
        out.push_str("};\n");
        out
    }

    fn for_header(var: &str, bound: &str) -> String {
        format!("for (int {var} = 0; {var} < {bound}; {var}++) {{")
    }

    fn to_float(expr: &str) -> String {
        format!("float({expr})")
    }

    fn to_int(expr: &str) -> String {
        format!("int({expr})")
    }

    fn program_storage() -> &'static str {
        r#"layout(std140, binding = 0) uniform SceneProgram {
    int sceneProgramLength;
    vec4 sceneProgram[1024];
};

float programAt(int i) {
    return sceneProgram[i / 4][i % 4];
}

int programLength() {
    return sceneProgramLength;
}
"#
    }
}

/// Format a float literal that both dialects parse back to the same `f32`
///
/// Negative values are parenthesized so they can follow a binary operator.
pub fn format_literal(value: f32) -> String {
    let text = format!("{value:?}");
    if value.is_sign_negative() && value != 0.0 {
        format!("({text})")
    } else if value == 0.0 {
        "0.0".to_string()
    } else {
        text
    }
}

/// Integer literal for a node id (`NO_SURFACE` becomes `-1`)
pub(crate) fn id_literal(id: u32) -> String {
    if id == NO_SURFACE {
        "(-1)".to_string()
    } else {
        id.to_string()
    }
}

/// Colour literal of a material
pub(crate) fn color_literal<L: ShaderLang>(material: Material) -> String {
    let components: Vec<String> = material.to_array().iter().map(|&c| format_literal(c)).collect();
    L::value_expr(ArgType::Vec4, &components)
}

/// Formatted literal operands of `def`, one expression per literal argument
pub(crate) fn literal_exprs<L: ShaderLang>(def: &OperationDefinition, literals: &[f32]) -> Vec<String> {
    let mut at = 0;
    def.literal_args()
        .map(|decl| {
            let width = decl.ty.width();
            let components: Vec<String> = literals[at..at + width]
                .iter()
                .map(|&v| format_literal(v))
                .collect();
            at += width;
            L::value_expr(decl.ty, &components)
        })
        .collect()
}

/// Source of one registry function
pub fn function_source<L: ShaderLang>(def: &OperationDefinition) -> Result<String, CompileError> {
    let body = def.body(L::DIALECT).map_err(|_| CompileError::MissingDialectBody {
        op: def.name,
        dialect: L::DIALECT,
    })?;
    let params: Vec<(&str, &str)> = def
        .args
        .iter()
        .map(|a| (a.name, L::type_name(a.ty)))
        .collect();
    Ok(format!(
        "{}\n{}\n}}\n",
        L::fn_header(def.name, &params, L::type_name(def.returns)),
        body.trim_end()
    ))
}

/// Sources of the registry functions for `codes` and their dependencies
///
/// Dependencies have lower opcodes than their users, so ascending code order
/// declares every function before it is called.
pub(crate) fn functions_source<L: ShaderLang>(
    codes: &BTreeSet<u16>,
) -> Result<(String, usize), CompileError> {
    let mut out = String::new();
    let mut count = 0;
    for code in with_dependencies(codes) {
        if let Some(def) = registry::by_code(code) {
            out.push_str(&function_source::<L>(def)?);
            out.push('\n');
            count += 1;
        }
    }
    Ok((out, count))
}

/// Record constructor with placeholder normal and occlusion
pub(crate) fn sample_ctor<L: ShaderLang>(d: &str, color: &str, id: &str) -> String {
    format!("SceneSample({d}, {}, 1.0, {color}, {id})", L::vec3_zero())
}

fn pick_name(pick: Pick) -> &'static str {
    match pick {
        Pick::Nearest => "pickNearest",
        Pick::Farthest => "pickFarthest",
        Pick::Minuend => "pickMinuend",
    }
}

fn smooth_weight_name(pick: Pick) -> &'static str {
    match pick {
        Pick::Nearest => "smoothUnionWeight",
        Pick::Farthest => "smoothIntersectionWeight",
        Pick::Minuend => "smoothSubtractionWeight",
    }
}

fn base_expr(pick: Pick, a: &str, b: &str) -> String {
    match pick {
        Pick::Nearest => format!("min({a}.d, {b}.d)"),
        Pick::Farthest => format!("max({a}.d, {b}.d)"),
        Pick::Minuend => format!("max({a}.d, -{b}.d)"),
    }
}

/// Record combining `a` and `b` under `blend`, with combined distance `d`
pub(crate) fn blend_expr(blend: BlendRule, a: &str, b: &str, d: &str, k: &str) -> String {
    match blend {
        BlendRule::Exact(pick) => format!("{}({a}, {b}, {d})", pick_name(pick)),
        BlendRule::Chamfer(pick) => format!(
            "chamferSample({a}, {b}, {}({a}, {b}, {d}), {})",
            pick_name(pick),
            base_expr(pick, a, b)
        ),
        BlendRule::Smooth(pick) => format!(
            "smoothSample({a}, {b}, {d}, {}({a}, {b}, {k}))",
            smooth_weight_name(pick)
        ),
    }
}

/// Record of a displacement result: material of the first operand
pub(crate) fn displace_expr(a: &str, b: &str, d: &str) -> String {
    format!("pickMinuend({a}, {b}, {d})")
}

/// `SceneSample` struct and the record combiners
pub(crate) fn sample_support<L: ShaderLang>() -> String {
    let float = L::type_name(ArgType::Float);
    let int = L::int_type();
    let record = "SceneSample";
    let mut out = L::struct_decl(
        record,
        &[
            ("d", float),
            ("normal", L::type_name(ArgType::Vec3)),
            ("ao", float),
            ("color", L::type_name(ArgType::Vec4)),
            ("id", int),
        ],
    );
    out.push('\n');

    let pair = [("a", record), ("b", record), ("d", float)];
    for (name, cmp) in [("pickNearest", Some("<=")), ("pickFarthest", Some(">=")), ("pickMinuend", None)] {
        out.push_str(&L::fn_header(name, &pair, record));
        out.push('\n');
        match cmp {
            Some(cmp) => {
                out.push_str(&format!("    if (a.d {cmp} b.d) {{\n"));
                out.push_str(&format!("        return {};\n", sample_ctor::<L>("d", "a.color", "a.id")));
                out.push_str("    }\n");
                out.push_str(&format!("    return {};\n", sample_ctor::<L>("d", "b.color", "b.id")));
            }
            None => {
                out.push_str(&format!("    return {};\n", sample_ctor::<L>("d", "a.color", "a.id")));
            }
        }
        out.push_str("}\n\n");
    }

    let nearest_id = |out: &mut String, indent: &str| {
        out.push_str(&format!("{indent}{}\n", L::decl_var("id", int, "b.id")));
        out.push_str(&format!("{indent}if (a.d <= b.d) {{\n"));
        out.push_str(&format!("{indent}    id = a.id;\n"));
        out.push_str(&format!("{indent}}}\n"));
    };

    out.push_str(&L::fn_header(
        "chamferSample",
        &[("a", record), ("b", record), ("picked", record), ("base", float)],
        record,
    ));
    out.push('\n');
    out.push_str(&format!(
        "    if (abs(picked.d - base) > {}) {{\n",
        format_literal(CHAMFER_EPSILON)
    ));
    nearest_id(&mut out, "        ");
    out.push_str(&format!(
        "        return {};\n",
        sample_ctor::<L>("picked.d", "mix(a.color, b.color, 0.5)", "id")
    ));
    out.push_str("    }\n    return picked;\n}\n\n");

    // Colour weight of `a`, the same h each smooth operator uses for its distance
    let radius = format!("max(k, {})", format_literal(MIN_BLEND_RADIUS));
    let weights = [
        ("smoothUnionWeight", format!("clamp(0.5 + 0.5 * (b.d - a.d) / {radius}, 0.0, 1.0)")),
        ("smoothIntersectionWeight", format!("clamp(0.5 - 0.5 * (b.d - a.d) / {radius}, 0.0, 1.0)")),
        ("smoothSubtractionWeight", format!("1.0 - clamp(0.5 - 0.5 * (b.d + a.d) / {radius}, 0.0, 1.0)")),
    ];
    for (name, weight) in weights {
        out.push_str(&L::fn_header(name, &[("a", record), ("b", record), ("k", float)], float));
        out.push_str(&format!("\n    return {weight};\n}}\n\n"));
    }

    out.push_str(&L::fn_header(
        "smoothSample",
        &[("a", record), ("b", record), ("d", float), ("h", float)],
        record,
    ));
    out.push('\n');
    nearest_id(&mut out, "    ");
    out.push_str(&format!(
        "    return {};\n",
        sample_ctor::<L>("d", "mix(b.color, a.color, h)", "id")
    ));
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_literal() {
        assert_eq!(format_literal(1.0), "1.0");
        assert_eq!(format_literal(0.25), "0.25");
        assert_eq!(format_literal(-2.5), "(-2.5)");
        assert_eq!(format_literal(-0.0), "0.0");
        assert_eq!(format_literal(1e-6), "1e-6");
        assert_eq!(format_literal(1e10).parse::<f32>().unwrap(), 1e10);
        let v = 0.1f32 + 0.2f32;
        assert_eq!(format_literal(v).parse::<f32>().unwrap(), v);
    }

    #[test]
    fn test_function_source_wgsl() {
        let def = registry::lookup("sdSphere").unwrap();
        let src = function_source::<Wgsl>(def).unwrap();
        assert!(src.starts_with("fn sdSphere(p: vec3<f32>, r: f32) -> f32 {\n"));
        assert!(src.ends_with("}\n"));
    }

    #[test]
    fn test_function_source_glsl() {
        let def = registry::lookup("opSmoothUnion").unwrap();
        let src = function_source::<Glsl>(def).unwrap();
        assert!(src.starts_with("float opSmoothUnion(float d1, float d2, float k) {\n"));
    }

    #[test]
    fn test_literal_exprs() {
        let def = registry::lookup("sdCapsule").unwrap();
        let exprs = literal_exprs::<Wgsl>(def, &[0.0, -1.0, 0.0, 0.0, 1.0, 0.0, 0.5]);
        assert_eq!(
            exprs,
            vec![
                "vec3<f32>(0.0, (-1.0), 0.0)".to_string(),
                "vec3<f32>(0.0, 1.0, 0.0)".to_string(),
                "0.5".to_string(),
            ]
        );
    }

    #[test]
    fn test_functions_source_includes_dependencies_first() {
        let code = registry::lookup("sdRoundBox").unwrap().code;
        let (src, count) = functions_source::<Glsl>(&BTreeSet::from([code])).unwrap();
        assert_eq!(count, 2);
        let boxed = src.find("float sdBox(").unwrap();
        let rounded = src.find("float sdRoundBox(").unwrap();
        assert!(boxed < rounded);
    }

    #[test]
    fn test_blend_expr() {
        assert_eq!(
            blend_expr(BlendRule::Exact(Pick::Nearest), "s1", "s2", "d", "0.0"),
            "pickNearest(s1, s2, d)"
        );
        assert_eq!(
            blend_expr(BlendRule::Chamfer(Pick::Minuend), "s1", "s2", "d", "0.1"),
            "chamferSample(s1, s2, pickMinuend(s1, s2, d), max(s1.d, -s2.d))"
        );
        assert_eq!(
            blend_expr(BlendRule::Smooth(Pick::Nearest), "s1", "s2", "d", "0.5"),
            "smoothSample(s1, s2, d, smoothUnionWeight(s1, s2, 0.5))"
        );
        assert_eq!(
            blend_expr(BlendRule::Smooth(Pick::Minuend), "s1", "s2", "d", "a0"),
            "smoothSample(s1, s2, d, smoothSubtractionWeight(s1, s2, a0))"
        );
    }

    #[test]
    fn test_sample_support_glsl_declares_struct_first() {
        let src = sample_support::<Glsl>();
        assert!(src.starts_with("struct SceneSample {\n    float d;"));
        assert!(src.contains("SceneSample pickNearest(SceneSample a, SceneSample b, float d) {"));
        assert!(src.contains("int id = b.id;"));
    }

    #[test]
    fn test_sample_support_smooth_weights() {
        let src = sample_support::<Wgsl>();
        assert!(src.contains(
            "fn smoothIntersectionWeight(a: SceneSample, b: SceneSample, k: f32) -> f32 {\n    \
             return clamp(0.5 - 0.5 * (b.d - a.d) / max(k, 1e-6), 0.0, 1.0);\n}"
        ));
        assert!(src.contains(
            "return 1.0 - clamp(0.5 - 0.5 * (b.d + a.d) / max(k, 1e-6), 0.0, 1.0);"
        ));
        assert!(src.contains("fn smoothSample(a: SceneSample, b: SceneSample, d: f32, h: f32) -> SceneSample {"));
    }

    #[test]
    fn test_id_literal() {
        assert_eq!(id_literal(3), "3");
        assert_eq!(id_literal(NO_SURFACE), "(-1)");
    }
}
