//! Demo computing a terrain block and printing one vertical cut of it.
//!
//! Uses the GPU when an adapter is available and falls back to the CPU
//! backend otherwise.

use voxfield::*;

fn main() -> Result<()> {
    init_logging();

    let block = Block::new(Vec3::new(0.0, 0.0, 0.0), 32.0)?;
    let resolution = GridResolution::from_cells(32)?;
    let evaluator = BuiltinEvaluator::Terrain;

    let field = match compute_density_field_gpu(
        &block,
        resolution,
        &evaluator.to_shader(),
        LatticeMapping::Spanning,
    ) {
        Ok(field) => field,
        Err(e) => {
            log::warn!("GPU unavailable ({e}), using the CPU backend");
            compute_density_field_cpu(&block, resolution, evaluator, LatticeMapping::Spanning)?
        }
    };

    // Cut through the middle layer, top row first: '#' is solid ground.
    let z = resolution.samples() / 2;
    for y in (0..resolution.samples()).rev() {
        let row: String = (0..resolution.samples())
            .map(|x| match field.get(x, y, z) {
                Some(v) if v > 0.0 => '#',
                _ => '.',
            })
            .collect();
        println!("{row}");
    }

    let stats = field.stats();
    println!(
        "{} samples, min {:.3}, max {:.3}, mean {:.3}",
        field.len(),
        stats.min,
        stats.max,
        stats.mean
    );

    Ok(())
}
