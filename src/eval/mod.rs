//! Reference evaluation of a scene graph
//!
//! Walks the resolved tree recursively with the registry's CPU evaluators,
//! independent of either compiled backend. The stack machine and the
//! generated shaders are checked against this walk, so it applies the
//! same rules they do:
//!
//! - modifiers transform the point in declaration order and fold their
//!   scale into the running scale factor
//! - leaf distances are multiplied by the running scale
//! - boolean blend radii are world-space (`k * scale`)
//! - displacement sees de-scaled operand distances and re-scales its result
//! - a combiner without children yields the empty distance

pub mod parallel;

pub use parallel::{eval_batch, eval_batch_parallel, eval_grid};

use crate::compiled::{
    central_normal, occlusion, CompileError, KernelConfig, ResolvedNode, Role, StackValue,
    EMPTY_DISTANCE,
};
use crate::scene::{NodeId, Scene};
use crate::types::SceneSample;
use glam::Vec3;
use std::convert::Infallible;

/// Resolved scene ready for repeated evaluation
///
/// Resolution validates the scene once; evaluation afterwards cannot fail.
#[derive(Debug, Clone)]
pub struct SceneEvaluator {
    tree: ResolvedNode,
}

impl SceneEvaluator {
    /// Resolve the whole scene
    pub fn new(scene: &Scene) -> Result<Self, CompileError> {
        Ok(SceneEvaluator {
            tree: ResolvedNode::build(scene, scene.root())?,
        })
    }

    /// Resolve the subtree rooted at `id`
    pub fn for_node(scene: &Scene, id: NodeId) -> Result<Self, CompileError> {
        Ok(SceneEvaluator {
            tree: ResolvedNode::build_at(scene, id)?,
        })
    }

    /// Number of evaluated nodes
    pub fn node_count(&self) -> usize {
        self.tree.count()
    }

    /// Signed distance at `point`
    #[inline]
    pub fn eval(&self, point: Vec3) -> f32 {
        walk::<f32>(&self.tree, point, 1.0)
    }

    /// Distance, colour and id at `point`, without normal and occlusion
    pub fn eval_record(&self, point: Vec3) -> SceneSample {
        walk::<SceneSample>(&self.tree, point, 1.0)
    }

    /// Unit normal at `point`, `Vec3::ZERO` where the field is flat
    pub fn normal(&self, point: Vec3, epsilon: f32) -> Vec3 {
        match central_normal::<Infallible>(point, epsilon, |q| Ok(self.eval(q))) {
            Ok(n) => n,
            Err(never) => match never {},
        }
    }

    /// Ambient occlusion at `point` along `normal`
    pub fn ambient_occlusion(&self, point: Vec3, normal: Vec3, config: &KernelConfig) -> f32 {
        match occlusion::<Infallible>(point, normal, config, |q| Ok(self.eval(q))) {
            Ok(ao) => ao,
            Err(never) => match never {},
        }
    }

    /// Full record at `point`
    pub fn eval_sample(&self, point: Vec3, config: &KernelConfig) -> SceneSample {
        let mut sample = self.eval_record(point);
        sample.normal = self.normal(point, config.normal_epsilon);
        sample.ao = self.ambient_occlusion(point, sample.normal, config);
        sample
    }
}

/// Signed distance of the whole scene at `point`
///
/// Resolves the scene on every call; use [`SceneEvaluator`] for many points.
pub fn eval_scene(scene: &Scene, point: Vec3) -> Result<f32, CompileError> {
    Ok(SceneEvaluator::new(scene)?.eval(point))
}

/// Signed distance of the subtree rooted at `id`
pub fn eval_node(scene: &Scene, id: NodeId, point: Vec3) -> Result<f32, CompileError> {
    Ok(SceneEvaluator::for_node(scene, id)?.eval(point))
}

/// Full record of the whole scene at `point`
pub fn eval_scene_sample(
    scene: &Scene,
    point: Vec3,
    config: &KernelConfig,
) -> Result<SceneSample, CompileError> {
    Ok(SceneEvaluator::new(scene)?.eval_sample(point, config))
}

fn walk<V: StackValue>(node: &ResolvedNode, mut point: Vec3, mut scale: f32) -> V {
    for m in &node.modifiers {
        point = (m.eval)(point, &m.literals);
        scale = m.scale.apply(scale, &m.literals);
    }

    let color = node.material.to_vec4();
    let fold = |combine: &dyn Fn(V, V) -> V| -> V {
        let mut children = node.children.iter().map(|c| walk::<V>(c, point, scale));
        match children.next() {
            None => V::leaf(EMPTY_DISTANCE, color, node.id),
            Some(first) => children.fold(first, |a, b| combine(a, b)),
        }
    };

    match node.role {
        Role::Shape(f) => V::leaf(f(point, &node.literals) * scale, color, node.id),
        Role::Boolean { eval, blend } => {
            let k = node.literals.first().map_or(0.0, |k| k * scale);
            let scaled = [k];
            let lits = &scaled[..node.literals.len()];
            fold(&|a: V, b: V| {
                let d = eval(a.distance(), b.distance(), lits);
                V::boolean(blend, a, b, d, k)
            })
        }
        Role::Displacement(f) => fold(&|a: V, b: V| {
            let d = f(point, a.distance() / scale, b.distance() / scale, &node.literals) * scale;
            V::displaced(a, b, d)
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiled::NO_SURFACE;
    use crate::scene::{ModifierConfig, NodeConfig};
    use crate::types::Material;

    fn sphere(r: f32) -> NodeConfig {
        NodeConfig::new("sdSphere").arg("r", r)
    }

    fn evaluator(config: &NodeConfig) -> SceneEvaluator {
        SceneEvaluator::new(&Scene::from_config(config).unwrap()).unwrap()
    }

    #[test]
    fn test_sphere() {
        let eval = evaluator(&sphere(1.0));
        assert!((eval.eval(Vec3::new(2.0, 0.0, 0.0)) - 1.0).abs() < 1e-6);
        assert!((eval.eval(Vec3::ZERO) + 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_scene() {
        let scene = Scene::new();
        assert_eq!(eval_scene(&scene, Vec3::ZERO), Ok(EMPTY_DISTANCE));
        let record = SceneEvaluator::new(&scene).unwrap().eval_record(Vec3::ZERO);
        assert_eq!(record.distance, EMPTY_DISTANCE);
        assert_eq!(record.id, 0);
        assert_ne!(record.id, NO_SURFACE);
    }

    #[test]
    fn test_scale_multiplies_distance() {
        let config = sphere(1.0).modifier(ModifierConfig::new("opScale").arg("s", 2.0));
        let eval = evaluator(&config);
        assert!((eval.eval(Vec3::ZERO) + 2.0).abs() < 1e-6);
        assert!((eval.eval(Vec3::new(3.0, 0.0, 0.0)) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_union_of_translated_spheres() {
        let config = NodeConfig::new("opUnion")
            .child(sphere(1.0).with_id(1).material(Material::rgb(1.0, 0.0, 0.0)))
            .child(
                sphere(1.0)
                    .with_id(2)
                    .material(Material::rgb(0.0, 0.0, 1.0))
                    .modifier(ModifierConfig::new("opTranslate").arg("t", Vec3::new(3.0, 0.0, 0.0))),
            );
        let eval = evaluator(&config);
        let p = Vec3::new(1.5, 0.0, 0.0);
        assert!((eval.eval(p) - 0.5).abs() < 1e-6);

        let near_blue = eval.eval_record(Vec3::new(2.9, 0.0, 0.0));
        assert_eq!(near_blue.id, 2);
        assert_eq!(near_blue.color, Material::rgb(0.0, 0.0, 1.0).to_vec4());
    }

    #[test]
    fn test_subtraction_takes_minuend_material() {
        let config = NodeConfig::new("opSubtraction")
            .child(sphere(2.0).with_id(1))
            .child(sphere(1.0).with_id(2));
        let eval = evaluator(&config);
        // Inside the carved hole the surface is the inner wall of sphere 1
        let record = eval.eval_record(Vec3::new(0.5, 0.0, 0.0));
        assert!((record.distance - 0.5).abs() < 1e-6);
        assert_eq!(record.id, 1);
    }

    #[test]
    fn test_eval_node_evaluates_subtree() {
        let config = NodeConfig::new("opUnion")
            .child(sphere(1.0).with_id(1))
            .child(sphere(3.0).with_id(2));
        let scene = Scene::from_config(&config).unwrap();
        let d = eval_node(&scene, 1, Vec3::new(2.0, 0.0, 0.0)).unwrap();
        assert!((d - 1.0).abs() < 1e-6);
        assert_eq!(eval_node(&scene, 99, Vec3::ZERO), Err(CompileError::NodeNotFound(99)));
    }

    #[test]
    fn test_sample_has_normal_and_ao() {
        let scene = Scene::from_config(&sphere(1.0)).unwrap();
        let sample = eval_scene_sample(&scene, Vec3::new(1.0, 0.0, 0.0), &KernelConfig::default()).unwrap();
        assert!((sample.normal - Vec3::X).length() < 1e-3);
        assert!(sample.ao > 0.9 && sample.ao <= 1.0);
    }

    #[test]
    fn test_positioning_node_fails_resolution() {
        let config = NodeConfig::new("opUnion").child(NodeConfig::new("opTranslate").with_id(4));
        let scene = Scene::from_config(&config).unwrap();
        assert!(matches!(
            eval_scene(&scene, Vec3::ZERO),
            Err(CompileError::UnsupportedCategory { node: 4, .. })
        ));
    }
}
