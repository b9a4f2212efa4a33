//! sdf-scene CLI
//!
//! Compiles JSON scene files to shader source or stack-machine programs,
//! and evaluates them on the CPU.

use clap::{Parser, Subcommand, ValueEnum};
use sdf_scene::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "sdf-scene")]
#[command(version = sdf_scene::VERSION)]
#[command(about = "Compile SDF scene graphs to WGSL/GLSL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a scene to kernel source
    Compile {
        /// Scene file (.json)
        scene: PathBuf,
        /// Target shading language
        #[arg(short, long, value_enum, default_value_t = DialectArg::Wgsl)]
        dialect: DialectArg,
        /// Compilation backend
        #[arg(short, long, value_enum, default_value_t = Backend::Expression)]
        backend: Backend,
        /// Emit the material-returning `sdScene` (expression backend)
        #[arg(long)]
        material: bool,
        /// Output file (stdout when absent)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate a scene at one point
    Eval {
        /// Scene file (.json)
        scene: PathBuf,
        /// X coordinate
        #[arg(allow_hyphen_values = true)]
        x: f32,
        /// Y coordinate
        #[arg(allow_hyphen_values = true)]
        y: f32,
        /// Z coordinate
        #[arg(allow_hyphen_values = true)]
        z: f32,
    },

    /// Display scene information and the compiled program
    Info {
        /// Scene file (.json)
        scene: PathBuf,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum DialectArg {
    Wgsl,
    Glsl,
}

impl From<DialectArg> for Dialect {
    fn from(arg: DialectArg) -> Self {
        match arg {
            DialectArg::Wgsl => Dialect::Wgsl,
            DialectArg::Glsl => Dialect::Glsl,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum Backend {
    Expression,
    Bytecode,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn,sdf_scene=info"));
    fmt().with_env_filter(filter).with_target(false).with_writer(std::io::stderr).init();
}

fn main() {
    init_logging();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Compile {
            scene,
            dialect,
            backend,
            material,
            output,
        } => cmd_compile(&scene, dialect.into(), backend, material, output.as_deref()),
        Commands::Eval { scene, x, y, z } => cmd_eval(&scene, Vec3::new(x, y, z)),
        Commands::Info { scene } => cmd_info(&scene),
    };

    if let Err(e) = result {
        error!("{}", e);
        process::exit(1);
    }
}

fn cmd_compile(
    path: &Path,
    dialect: Dialect,
    backend: Backend,
    material: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let scene = load_scene(path)?;
    let source = match backend {
        Backend::Expression => SceneShader::compile(&scene, dialect, material)?.source,
        Backend::Bytecode => CompiledProgram::compile(&scene, dialect)?.source,
    };

    match output {
        Some(out) => {
            fs::write(out, &source)?;
            info!("Wrote {} ({} bytes)", out.display(), source.len());
        }
        None => print!("{}", source),
    }
    Ok(())
}

fn cmd_eval(path: &Path, point: Vec3) -> Result<(), Box<dyn std::error::Error>> {
    let scene = load_scene(path)?;
    let compiled = CompiledProgram::compile(&scene, Dialect::Wgsl)?;
    let sample = compiled.eval_sample(point)?;

    println!("Point:    ({}, {}, {})", point.x, point.y, point.z);
    println!("Distance: {}", sample.distance);
    println!("Normal:   ({}, {}, {})", sample.normal.x, sample.normal.y, sample.normal.z);
    println!("AO:       {}", sample.ao);
    println!(
        "Color:    ({}, {}, {}, {})",
        sample.color.x, sample.color.y, sample.color.z, sample.color.w
    );
    println!("Id:       {}", sample.id);
    Ok(())
}

fn cmd_info(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let scene = load_scene(path)?;
    println!("Scene: {}", path.display());
    println!("  Nodes: {}", scene.node_count());

    scene.traverse(|node, depth| {
        let name = node.name().map(|n| format!(" \"{}\"", n)).unwrap_or_default();
        println!(
            "  {:indent$}#{} {}{} ({} modifiers)",
            "",
            node.id(),
            node.op(),
            name,
            node.modifiers().len(),
            indent = depth * 2
        );
    });

    let compiled = CompiledProgram::compile(&scene, Dialect::Wgsl)?;
    println!();
    println!("Program: {} floats", compiled.program_length);
    for instruction in disassemble(&compiled.program)? {
        println!("  {}", instruction);
    }
    Ok(())
}
