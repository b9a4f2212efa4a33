//! Common test helpers for sdf-scene integration tests

#![allow(dead_code)]

use sdf_scene::prelude::*;

// ============================================================================
// Standard test scenes
// ============================================================================

pub fn sphere(r: f32) -> NodeConfig {
    NodeConfig::new("sdSphere").arg("r", r)
}

pub fn translate(t: Vec3) -> ModifierConfig {
    ModifierConfig::new("opTranslate").arg("t", t)
}

/// Unit spheres at the origin (id 1, red) and at x = 3 (id 2, blue)
pub fn two_spheres() -> NodeConfig {
    NodeConfig::new("opUnion")
        .with_id(0)
        .child(sphere(1.0).with_id(1).material(Material::rgb(1.0, 0.0, 0.0)))
        .child(
            sphere(1.0)
                .with_id(2)
                .material(Material::rgb(0.0, 0.0, 1.0))
                .modifier(translate(Vec3::new(3.0, 0.0, 0.0))),
        )
}

/// A scene touching every combiner kind and several modifiers
pub fn mixed_scene() -> NodeConfig {
    let carved = NodeConfig::new("opSmoothSubtraction")
        .arg("k", 0.1)
        .child(NodeConfig::new("sdBox").arg("b", Vec3::new(1.0, 0.8, 0.6)))
        .child(sphere(0.7).modifier(translate(Vec3::new(0.4, 0.2, 0.0))));

    let ring = NodeConfig::new("sdTorus")
        .arg("t", Vec2::new(0.8, 0.2))
        .material(Material::rgb(0.2, 0.9, 0.3))
        .modifier(ModifierConfig::new("opRotateX").arg("angle", 0.6))
        .modifier(translate(Vec3::new(0.0, 1.2, 0.0)));

    let blob = NodeConfig::new("opSmoothUnion")
        .arg("k", 0.3)
        .modifier(ModifierConfig::new("opScale").arg("s", 0.5))
        .child(sphere(1.0))
        .child(sphere(0.8).modifier(translate(Vec3::new(1.2, 0.0, 0.0))));

    let rough = NodeConfig::new("opDisplace")
        .child(NodeConfig::new("sdBox").arg("b", Vec3::splat(0.4)))
        .child(sphere(0.3))
        .modifier(translate(Vec3::new(-2.0, 0.0, 0.0)));

    NodeConfig::new("opUnion")
        .child(carved)
        .child(ring)
        .child(blob.modifier(translate(Vec3::new(0.0, -1.5, 0.5))))
        .child(rough)
        .child(
            NodeConfig::new("opChamferIntersection")
                .arg("r", 0.1)
                .modifier(translate(Vec3::new(2.5, 0.0, 0.0)))
                .child(sphere(0.9))
                .child(NodeConfig::new("sdBox").arg("b", Vec3::splat(0.7))),
        )
        .child(NodeConfig::new("opIntersection"))
}

/// One node per registry operation under an `opUnion`
///
/// Shapes use their default arguments, combiners fold two offset spheres and
/// positioning operators wrap a unit sphere.
pub fn every_operation() -> NodeConfig {
    let mut root = NodeConfig::new("opUnion");
    for def in sdf_scene::registry::all() {
        let node = if def.category().is_shape() {
            with_defaults(NodeConfig::new(def.name), def)
        } else if def.category().is_combiner() {
            with_defaults(NodeConfig::new(def.name), def)
                .child(sphere(1.0))
                .child(sphere(0.5).modifier(translate(Vec3::X)))
        } else {
            let modifier = def
                .default_args()
                .into_iter()
                .fold(ModifierConfig::new(def.name), |m, (name, value)| m.arg(name, value));
            sphere(1.0).modifier(modifier)
        };
        root = root.child(node);
    }
    root
}

fn with_defaults(config: NodeConfig, def: &OperationDefinition) -> NodeConfig {
    def.default_args()
        .into_iter()
        .fold(config, |c, (name, value)| c.arg(name, value))
}

pub fn build(config: &NodeConfig) -> Scene {
    Scene::from_config(config).expect("valid test scene")
}

// ============================================================================
// Standard test points
// ============================================================================

/// Deterministic spread of points over `[-3, 3]^3`
pub fn test_points() -> Vec<Vec3> {
    let mut points = vec![
        Vec3::ZERO,
        Vec3::X,
        Vec3::Y,
        Vec3::Z,
        Vec3::new(1.5, 0.0, 0.0),
        Vec3::new(-2.0, 0.1, 0.0),
        Vec3::new(2.5, 0.2, -0.3),
        Vec3::new(0.3, 1.2, 0.1),
    ];
    for i in 0..5 {
        for j in 0..5 {
            for k in 0..5 {
                points.push(Vec3::new(
                    -3.0 + 1.5 * i as f32 + 0.13,
                    -3.0 + 1.5 * j as f32 + 0.07,
                    -3.0 + 1.5 * k as f32 - 0.11,
                ));
            }
        }
    }
    points
}

// ============================================================================
// Assertions
// ============================================================================

pub fn assert_close(actual: f32, expected: f32, tolerance: f32, context: &str) {
    assert!(
        (actual - expected).abs() <= tolerance,
        "{}: expected {}, got {} (diff {})",
        context,
        expected,
        actual,
        (actual - expected).abs()
    );
}
