//! Integration tests: generated WGSL and GLSL pass naga's parsers and validator
//!
//! GLSL sources are library code without an entry point, so each one is
//! wrapped in a `#version 450` fragment shader whose `main` calls it.

mod common;

use common::*;
use naga::valid::{Capabilities, ValidationFlags, Validator};
use sdf_scene::prelude::*;

fn validate_wgsl(source: &str, context: &str) {
    let module = match naga::front::wgsl::parse_str(source) {
        Ok(module) => module,
        Err(e) => panic!("{context}: WGSL parse failed:\n{}\n{source}", e.emit_to_string(source)),
    };
    if let Err(e) = Validator::new(ValidationFlags::all(), Capabilities::all()).validate(&module) {
        panic!("{context}: WGSL validation failed: {e:?}\n{source}");
    }
}

fn validate_glsl(source: &str, context: &str, call: &str) {
    let wrapped = format!(
        "#version 450\n{source}\nlayout(location = 0) out vec4 fragColor;\n\
         void main() {{\n    fragColor = vec4({call});\n}}\n"
    );
    let options = naga::front::glsl::Options {
        stage: naga::ShaderStage::Fragment,
        defines: Default::default(),
    };
    let module = match naga::front::glsl::Frontend::default().parse(&options, &wrapped) {
        Ok(module) => module,
        Err(e) => panic!("{context}: GLSL parse failed: {e:?}\n{wrapped}"),
    };
    if let Err(e) = Validator::new(ValidationFlags::all(), Capabilities::all()).validate(&module) {
        panic!("{context}: GLSL validation failed: {e:?}\n{wrapped}");
    }
}

fn scene_call(material: bool) -> &'static str {
    if material {
        "sdScene(vec3(0.0)).d"
    } else {
        "sdScene(vec3(0.0))"
    }
}

#[test]
fn expression_shader_validates() {
    for material in [false, true] {
        for config in [two_spheres(), mixed_scene()] {
            let shader = SceneShader::compile(&build(&config), Dialect::Wgsl, material).unwrap();
            validate_wgsl(&shader.source, &format!("expression (material = {material})"));
        }
    }
}

#[test]
fn empty_scene_shader_validates() {
    let scene = Scene::new();
    for material in [false, true] {
        let shader = SceneShader::compile(&scene, Dialect::Wgsl, material).unwrap();
        validate_wgsl(&shader.source, "empty scene");
    }
}

#[test]
fn every_operation_validates_in_expression_shader() {
    let scene = build(&every_operation());
    for material in [false, true] {
        let shader = SceneShader::compile(&scene, Dialect::Wgsl, material).unwrap();
        validate_wgsl(&shader.source, "all operations");
    }
}

#[test]
fn program_kernel_validates() {
    let compiled = CompiledProgram::compile(&build(&mixed_scene()), Dialect::Wgsl).unwrap();
    validate_wgsl(&compiled.source, "program kernel");
}

#[test]
fn full_kernel_validates() {
    let kernel = StackMachineKernel::full(Dialect::Wgsl, KernelConfig::default()).unwrap();
    validate_wgsl(&kernel.source, "full kernel");
}

#[test]
fn glsl_expression_shader_validates() {
    for material in [false, true] {
        for config in [two_spheres(), mixed_scene(), every_operation()] {
            let shader = SceneShader::compile(&build(&config), Dialect::Glsl, material).unwrap();
            validate_glsl(
                &shader.source,
                &format!("GLSL expression (material = {material})"),
                scene_call(material),
            );
        }
    }
}

#[test]
fn glsl_empty_scene_shader_validates() {
    let scene = Scene::new();
    for material in [false, true] {
        let shader = SceneShader::compile(&scene, Dialect::Glsl, material).unwrap();
        validate_glsl(&shader.source, "GLSL empty scene", scene_call(material));
    }
}

#[test]
fn glsl_program_kernel_validates() {
    let compiled = CompiledProgram::compile(&build(&mixed_scene()), Dialect::Glsl).unwrap();
    validate_glsl(&compiled.source, "GLSL program kernel", "sdProgram(vec3(0.0))");
    validate_glsl(
        &compiled.source,
        "GLSL program kernel (material)",
        "sdProgramSample(vec3(0.0)).color",
    );
}

#[test]
fn glsl_full_kernel_validates() {
    let kernel = StackMachineKernel::full(Dialect::Glsl, KernelConfig::default()).unwrap();
    assert!(kernel.source.contains("SceneSample sdProgramSample(vec3 pos)"));
    assert!(!kernel.source.contains("vec3<f32>"));
    validate_glsl(&kernel.source, "GLSL full kernel", "sdProgram(vec3(0.0))");
}
