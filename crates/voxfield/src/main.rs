//! voxfield - computes the density field of one block and reports it.
//!
//! Settings come from an optional JSON config, then command-line overrides.

use std::path::PathBuf;
use std::time::Instant;

use clap::{Parser, ValueEnum};
use voxfield::{
    compute_density_field_cpu, compute_density_field_gpu, BuiltinEvaluator, DensityField,
    FieldConfig, FieldError, GridResolution, LatticeMapping, Result, ShaderEvaluator, Vec3,
};

#[derive(Parser, Debug)]
#[command(name = "voxfield")]
#[command(about = "Generate a density field by rendering volume slices")]
struct Cli {
    /// JSON config with origin, size, resolution and mapping
    #[arg(long)]
    config: Option<PathBuf>,

    /// Block corner as x,y,z
    #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
    origin: Option<Vec3>,

    /// Block edge length
    #[arg(long)]
    size: Option<f32>,

    /// Samples per axis
    #[arg(long, allow_negative_numbers = true)]
    resolution: Option<i64>,

    /// Device that evaluates the field
    #[arg(long, value_enum, default_value_t = BackendKind::Gpu)]
    backend: BackendKind,

    /// Built-in density function
    #[arg(long, value_enum, default_value_t = EvaluatorKind::Terrain)]
    evaluator: EvaluatorKind,

    /// Constant value, or sphere radius
    #[arg(long)]
    value: Option<f32>,

    /// WGSL file defining `fn density` (gpu backend only)
    #[arg(long)]
    shader: Option<PathBuf>,

    /// Index to world position convention
    #[arg(long, value_enum)]
    mapping: Option<MappingKind>,

    /// Print every sample as `Density[x,y,z] = v`
    #[arg(long)]
    dump: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum BackendKind {
    Gpu,
    Cpu,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum EvaluatorKind {
    Terrain,
    Constant,
    Sphere,
    Index,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum MappingKind {
    Spanning,
    Partitioned,
}

impl From<MappingKind> for LatticeMapping {
    fn from(kind: MappingKind) -> Self {
        match kind {
            MappingKind::Spanning => LatticeMapping::Spanning,
            MappingKind::Partitioned => LatticeMapping::Partitioned,
        }
    }
}

fn parse_vec3(s: &str) -> std::result::Result<Vec3, String> {
    let parts = s
        .split(',')
        .map(|p| p.trim().parse::<f32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid coordinate in '{s}': {e}"))?;
    match parts.as_slice() {
        [x, y, z] => Ok(Vec3::new(*x, *y, *z)),
        _ => Err(format!("expected x,y,z, got '{s}'")),
    }
}

/// Everything one run needs, resolved from the config file and flags.
struct AppContext {
    config: FieldConfig,
    backend: BackendKind,
    evaluator: BuiltinEvaluator,
    shader: Option<ShaderEvaluator>,
    dump: bool,
}

impl AppContext {
    fn from_cli(cli: Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => FieldConfig::load(path)?,
            None => FieldConfig::default(),
        };
        if let Some(origin) = cli.origin {
            config.origin = origin;
        }
        if let Some(size) = cli.size {
            config.size = size;
        }
        if let Some(resolution) = cli.resolution {
            config.resolution = GridResolution::try_from(resolution)?;
        }
        if let Some(mapping) = cli.mapping {
            config.mapping = mapping.into();
        }

        let block = config.block()?;
        let evaluator = match cli.evaluator {
            EvaluatorKind::Terrain => BuiltinEvaluator::Terrain,
            EvaluatorKind::Constant => BuiltinEvaluator::Constant(cli.value.unwrap_or(1.0)),
            EvaluatorKind::Sphere => BuiltinEvaluator::Sphere {
                center: block.origin() + Vec3::splat(block.size() * 0.5),
                radius: cli.value.unwrap_or(block.size() * 0.4),
            },
            EvaluatorKind::Index => BuiltinEvaluator::IndexEncoding,
        };

        let shader = match &cli.shader {
            Some(_) if cli.backend == BackendKind::Cpu => {
                return Err(FieldError::InvalidConfiguration(
                    "--shader needs the gpu backend".into(),
                ));
            }
            Some(path) => Some(ShaderEvaluator::from_wgsl(
                path.display().to_string(),
                std::fs::read_to_string(path)?,
            )),
            None => None,
        };

        Ok(Self {
            config,
            backend: cli.backend,
            evaluator,
            shader,
            dump: cli.dump,
        })
    }

    fn run(&self) -> Result<DensityField> {
        let block = self.config.block()?;
        let resolution = self.config.resolution;
        let mapping = self.config.mapping;

        match self.backend {
            BackendKind::Gpu => {
                let shader = self
                    .shader
                    .clone()
                    .unwrap_or_else(|| self.evaluator.to_shader());
                log::info!("evaluator: {}", shader.label());
                compute_density_field_gpu(&block, resolution, &shader, mapping)
            }
            BackendKind::Cpu => {
                log::info!("evaluator: {}", self.evaluator);
                compute_density_field_cpu(&block, resolution, self.evaluator, mapping)
            }
        }
    }
}

fn report(field: &DensityField, dump: bool) {
    let stats = field.stats();
    log::info!(
        "{} samples: min {:.4}, max {:.4}, mean {:.4}",
        field.len(),
        stats.min,
        stats.max,
        stats.mean
    );

    if dump {
        for (coords, value) in field.iter_voxels() {
            println!("Density[{},{},{}] = {value}", coords.x, coords.y, coords.z);
        }
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let app = match AppContext::from_cli(cli) {
        Ok(app) => app,
        Err(e) => {
            log::error!("invalid settings: {e}");
            std::process::exit(2);
        }
    };

    let start = Instant::now();
    match app.run() {
        Ok(field) => {
            log::info!("density field ready in {:.2?}", start.elapsed());
            report(&field, app.dump);
        }
        Err(e) => {
            log::error!("density field failed: {e}");
            std::process::exit(1);
        }
    }
}
