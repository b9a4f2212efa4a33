//! Expression compiler: a scene as straight-line kernel code
//!
//! Every node becomes one or two local declarations inside `sdScene`.
//! Modifiers reassign a mutable point variable; the accumulated scale is
//! folded into literals at compile time, so the generated code contains no
//! scale bookkeeping.
//!
//! In material mode `sdScene` returns a `SceneSample` record instead of a
//! bare distance, and every combiner also selects colour and id.

use super::dialect::{
    blend_expr, color_literal, displace_expr, format_literal, functions_source, id_literal,
    literal_exprs, sample_ctor, sample_support, Glsl, ShaderLang, Wgsl,
};
use super::resolve::{ResolvedNode, Role};
use super::{CompileError, EMPTY_DISTANCE};
use crate::scene::{NodeId, Scene};
use crate::types::{ArgType, Dialect};
use std::collections::BTreeSet;
use std::marker::PhantomData;
use tracing::debug;

/// Generated `sdScene` source
#[derive(Debug, Clone)]
pub struct SceneShader {
    /// Kernel source: constants, helpers, registry functions, `sdScene`
    pub source: String,
    /// Target dialect
    pub dialect: Dialect,
    /// Whether `sdScene` returns a `SceneSample`
    pub material: bool,
    /// Number of registry functions emitted
    pub helper_count: usize,
    /// Number of compiled nodes
    pub node_count: usize,
}

impl SceneShader {
    /// Compile the whole scene
    pub fn compile(scene: &Scene, dialect: Dialect, material: bool) -> Result<Self, CompileError> {
        let tree = ResolvedNode::build(scene, scene.root())?;
        Self::from_tree(&tree, dialect, material)
    }

    /// Compile the subtree rooted at `id`
    pub fn compile_node(
        scene: &Scene,
        id: NodeId,
        dialect: Dialect,
        material: bool,
    ) -> Result<Self, CompileError> {
        let tree = ResolvedNode::build_at(scene, id)?;
        Self::from_tree(&tree, dialect, material)
    }

    fn from_tree(tree: &ResolvedNode, dialect: Dialect, material: bool) -> Result<Self, CompileError> {
        let (source, helper_count) = match dialect {
            Dialect::Wgsl => ExpressionCompiler::<Wgsl>::new(material).generate(tree)?,
            Dialect::Glsl => ExpressionCompiler::<Glsl>::new(material).generate(tree)?,
        };
        let node_count = tree.count();
        debug!(%dialect, material, helper_count, node_count, "scene shader compiled");
        Ok(SceneShader {
            source,
            dialect,
            material,
            helper_count,
            node_count,
        })
    }
}

struct ExpressionCompiler<L: ShaderLang> {
    var_counter: usize,
    material: bool,
    codes: BTreeSet<u16>,
    body: String,
    _phantom: PhantomData<L>,
}

impl<L: ShaderLang> ExpressionCompiler<L> {
    fn new(material: bool) -> Self {
        Self {
            var_counter: 0,
            material,
            codes: BTreeSet::new(),
            body: String::new(),
            _phantom: PhantomData,
        }
    }

    fn generate(mut self, tree: &ResolvedNode) -> Result<(String, usize), CompileError> {
        let result = self.emit_node(tree, "p", 1.0);
        let (functions, helper_count) = functions_source::<L>(&self.codes)?;
        let float = L::type_name(ArgType::Float);

        let mut out = L::decl_const("EMPTY_DISTANCE", float, &format_literal(EMPTY_DISTANCE));
        out.push_str("\n\n");
        if self.material {
            out.push_str(&sample_support::<L>());
            out.push('\n');
        }
        out.push_str(&functions);
        let ret = if self.material { "SceneSample" } else { float };
        out.push_str(&L::fn_header("sdScene", &[("p", L::type_name(ArgType::Vec3))], ret));
        out.push('\n');
        out.push_str(&self.body);
        out.push_str(&format!("    return {result};\n}}\n"));
        Ok((out, helper_count))
    }

    fn next_var(&mut self, prefix: &str) -> String {
        let var = format!("{prefix}{}", self.var_counter);
        self.var_counter += 1;
        var
    }

    fn line(&mut self, statement: String) {
        self.body.push_str("    ");
        self.body.push_str(&statement);
        self.body.push('\n');
    }

    fn record_type(&self) -> &'static str {
        if self.material {
            "SceneSample"
        } else {
            L::type_name(ArgType::Float)
        }
    }

    /// Declare a node result: a distance, or a record built by `record`
    fn declare(&mut self, distance: String, record: impl FnOnce(&str) -> String) -> String {
        if self.material {
            let d = self.next_var("d");
            self.line(L::decl_let(&d, L::type_name(ArgType::Float), &distance));
            let s = self.next_var("s");
            let ty = self.record_type();
            self.line(L::decl_let(&s, ty, &record(&d)));
            s
        } else {
            let d = self.next_var("d");
            self.line(L::decl_let(&d, L::type_name(ArgType::Float), &distance));
            d
        }
    }

    fn distance_of(&self, var: &str) -> String {
        if self.material {
            format!("{var}.d")
        } else {
            var.to_string()
        }
    }

    /// Emit `node` evaluated at point expression `incoming`; returns its result variable
    fn emit_node(&mut self, node: &ResolvedNode, incoming: &str, scale: f32) -> String {
        let mut scale = scale;
        let point = if node.modifiers.is_empty() {
            incoming.to_string()
        } else {
            let point = self.next_var("p");
            self.line(L::decl_var(&point, L::type_name(ArgType::Vec3), incoming));
            for m in &node.modifiers {
                self.codes.insert(m.def.code);
                let args = call_args(&point, literal_exprs::<L>(m.def, &m.literals));
                self.line(format!("{point} = {}({args});", m.def.name));
                scale = m.scale.apply(scale, &m.literals);
            }
            point
        };

        let color = color_literal::<L>(node.material);
        let id = id_literal(node.id);

        if let Role::Shape(_) = node.role {
            self.codes.insert(node.def.code);
            let args = call_args(&point, literal_exprs::<L>(node.def, &node.literals));
            let distance = scaled(format!("{}({args})", node.def.name), scale);
            return self.declare(distance, |d| sample_ctor::<L>(d, &color, &id));
        }

        let Some((first, rest)) = node.children.split_first() else {
            return self.declare("EMPTY_DISTANCE".to_string(), |d| {
                sample_ctor::<L>(d, &color, &id)
            });
        };

        let mut acc = self.emit_node(first, &point, scale);
        for child in rest {
            let rhs = self.emit_node(child, &point, scale);
            acc = self.combine(node, &acc, &rhs, &point, scale);
        }
        acc
    }

    fn combine(&mut self, node: &ResolvedNode, a: &str, b: &str, point: &str, scale: f32) -> String {
        self.codes.insert(node.def.code);
        let (da, db) = (self.distance_of(a), self.distance_of(b));
        match node.role {
            Role::Boolean { blend, .. } => {
                let k = node.literals.first().map(|k| format_literal(k * scale));
                let mut args = vec![da, db];
                args.extend(k.clone());
                let distance = format!("{}({})", node.def.name, args.join(", "));
                let k = k.unwrap_or_else(|| "0.0".to_string());
                self.declare(distance, |d| blend_expr(blend, a, b, d, &k))
            }
            Role::Displacement(_) => {
                let (da, db) = if scale == 1.0 {
                    (da, db)
                } else {
                    let s = format_literal(scale);
                    (format!("{da} / {s}"), format!("{db} / {s}"))
                };
                let mut args = vec![point.to_string(), da, db];
                args.extend(literal_exprs::<L>(node.def, &node.literals));
                let distance = scaled(format!("{}({})", node.def.name, args.join(", ")), scale);
                self.declare(distance, |d| displace_expr(a, b, d))
            }
            // Shapes never reach a fold
            Role::Shape(_) => a.to_string(),
        }
    }
}

fn call_args(point: &str, literals: Vec<String>) -> String {
    std::iter::once(point.to_string())
        .chain(literals)
        .collect::<Vec<_>>()
        .join(", ")
}

fn scaled(expr: String, scale: f32) -> String {
    if scale == 1.0 {
        expr
    } else {
        format!("{expr} * {}", format_literal(scale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{ModifierConfig, NodeConfig};
    use crate::types::Material;
    use glam::Vec3;

    fn sphere(r: f32) -> NodeConfig {
        NodeConfig::new("sdSphere").arg("r", r)
    }

    fn compile(config: NodeConfig, dialect: Dialect, material: bool) -> SceneShader {
        let scene = Scene::from_config(&config).unwrap();
        SceneShader::compile(&scene, dialect, material).unwrap()
    }

    #[test]
    fn test_single_sphere_wgsl() {
        let shader = compile(sphere(1.5), Dialect::Wgsl, false);
        assert!(shader.source.contains("fn sdSphere(p: vec3<f32>, r: f32) -> f32 {"));
        assert!(shader.source.contains("fn sdScene(p: vec3<f32>) -> f32 {"));
        assert!(shader.source.contains("let d0: f32 = sdSphere(p, 1.5);"));
        assert!(shader.source.contains("return d0;"));
        assert_eq!(shader.helper_count, 1);
    }

    #[test]
    fn test_union_glsl() {
        let config = NodeConfig::new("opUnion").child(sphere(1.0)).child(sphere(2.0));
        let shader = compile(config, Dialect::Glsl, false);
        assert!(shader.source.contains("float sdScene(vec3 p) {"));
        assert!(shader.source.contains("float d2 = opUnion(d0, d1);"));
        assert_eq!(shader.helper_count, 2);
        assert_eq!(shader.node_count, 3);
    }

    #[test]
    fn test_modifiers_reassign_point() {
        let config = sphere(1.0)
            .modifier(ModifierConfig::new("opTranslate").arg("t", Vec3::new(3.0, 0.0, 0.0)))
            .modifier(ModifierConfig::new("opScale").arg("s", 2.0));
        let shader = compile(config, Dialect::Wgsl, false);
        let src = &shader.source;
        assert!(src.contains("var p0: vec3<f32> = p;"));
        assert!(src.contains("p0 = opTranslate(p0, vec3<f32>(3.0, 0.0, 0.0));"));
        assert!(src.contains("p0 = opScale(p0, 2.0);"));
        assert!(src.contains("let d1: f32 = sdSphere(p0, 1.0) * 2.0;"));
    }

    #[test]
    fn test_blend_radius_scaled() {
        let config = NodeConfig::new("opSmoothUnion")
            .arg("k", 0.25)
            .child(sphere(1.0))
            .child(sphere(1.0))
            .modifier(ModifierConfig::new("opScale").arg("s", 2.0));
        let shader = compile(config, Dialect::Glsl, false);
        assert!(shader.source.contains("opSmoothUnion(d1, d2, 0.5)"));
    }

    #[test]
    fn test_three_children_fold_left_with_scale() {
        let config = NodeConfig::new("opSmoothUnion")
            .arg("k", 0.25)
            .modifier(ModifierConfig::new("opScale").arg("s", 2.0))
            .child(sphere(1.0))
            .child(sphere(2.0))
            .child(sphere(3.0));
        let shader = compile(config, Dialect::Glsl, false);
        let body = &shader.source[shader.source.find("float sdScene").unwrap()..];
        let expected = [
            "    vec3 p0 = p;",
            "    p0 = opScale(p0, 2.0);",
            "    float d1 = sdSphere(p0, 1.0) * 2.0;",
            "    float d2 = sdSphere(p0, 2.0) * 2.0;",
            "    float d3 = opSmoothUnion(d1, d2, 0.5);",
            "    float d4 = sdSphere(p0, 3.0) * 2.0;",
            "    float d5 = opSmoothUnion(d3, d4, 0.5);",
            "    return d5;",
        ];
        assert_eq!(body.lines().skip(1).take(expected.len()).collect::<Vec<_>>(), expected);
    }

    #[test]
    fn test_single_child_passes_through() {
        let config = NodeConfig::new("opSubtraction").child(sphere(1.0));
        let shader = compile(config, Dialect::Wgsl, false);
        assert!(!shader.source.contains("opSubtraction("));
        assert!(shader.source.contains("return d0;"));
    }

    #[test]
    fn test_empty_scene() {
        let shader = SceneShader::compile(&Scene::new(), Dialect::Wgsl, false).unwrap();
        assert!(shader.source.contains("const EMPTY_DISTANCE: f32 ="));
        assert!(shader.source.contains("let d0: f32 = EMPTY_DISTANCE;"));
        assert_eq!(shader.helper_count, 0);
    }

    #[test]
    fn test_material_mode() {
        let config = NodeConfig::new("opUnion")
            .with_id(0)
            .child(sphere(1.0).with_id(4).material(Material::rgb(1.0, 0.0, 0.0)))
            .child(sphere(2.0).with_id(5));
        let shader = compile(config, Dialect::Wgsl, true);
        let src = &shader.source;
        assert!(src.contains("struct SceneSample {"));
        assert!(src.contains("fn sdScene(p: vec3<f32>) -> SceneSample {"));
        assert!(src.contains(
            "let s1: SceneSample = SceneSample(d0, vec3<f32>(0.0), 1.0, vec4<f32>(1.0, 0.0, 0.0, 1.0), 4);"
        ));
        assert!(src.contains("let d4: f32 = opUnion(s1.d, s3.d);"));
        assert!(src.contains("let s5: SceneSample = pickNearest(s1, s3, d4);"));
    }

    #[test]
    fn test_displacement_descales_operands() {
        let config = NodeConfig::new("opDisplace")
            .child(sphere(1.0))
            .child(sphere(2.0))
            .modifier(ModifierConfig::new("opScale").arg("s", 2.0));
        let shader = compile(config, Dialect::Glsl, false);
        assert!(shader
            .source
            .contains("opDisplace(p0, d1 / 2.0, d2 / 2.0) * 2.0"));
    }

    #[test]
    fn test_missing_argument() {
        let scene = Scene::from_config(&NodeConfig::new("sdSphere").with_id(3)).unwrap();
        assert_eq!(
            SceneShader::compile(&scene, Dialect::Wgsl, false).unwrap_err(),
            CompileError::MissingArgument {
                node: 3,
                op: "sdSphere",
                arg: "r"
            }
        );
    }

    #[test]
    fn test_compile_node_subtree() {
        let config = NodeConfig::new("opUnion")
            .child(sphere(1.0).with_id(8))
            .child(NodeConfig::new("sdBox").arg("b", Vec3::ONE));
        let scene = Scene::from_config(&config).unwrap();
        let shader = SceneShader::compile_node(&scene, 8, Dialect::Wgsl, false).unwrap();
        assert!(!shader.source.contains("sdBox"));
        assert_eq!(
            SceneShader::compile_node(&scene, 99, Dialect::Wgsl, false).unwrap_err(),
            CompileError::NodeNotFound(99)
        );
    }
}
