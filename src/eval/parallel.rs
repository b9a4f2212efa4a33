//! Batch evaluation of a resolved scene
//!
//! Uses rayon for CPU parallelism. Grids are split by Z-slices so each
//! worker fills one contiguous chunk of the output buffer.

use super::SceneEvaluator;
use glam::Vec3;
use rayon::prelude::*;

/// Distances at many points (single-threaded)
pub fn eval_batch(evaluator: &SceneEvaluator, points: &[Vec3]) -> Vec<f32> {
    points.iter().map(|p| evaluator.eval(*p)).collect()
}

/// Distances at many points (parallel)
pub fn eval_batch_parallel(evaluator: &SceneEvaluator, points: &[Vec3]) -> Vec<f32> {
    points.par_iter().map(|p| evaluator.eval(*p)).collect()
}

/// Distances on a regular grid spanning `min..=max`
///
/// The buffer is X-fastest: index `x + y * res + z * res * res`.
/// A resolution below 2 samples `min` only.
pub fn eval_grid(evaluator: &SceneEvaluator, min: Vec3, max: Vec3, resolution: usize) -> Vec<f32> {
    if resolution < 2 {
        return vec![evaluator.eval(min); resolution];
    }
    let step = (max - min) / (resolution as f32 - 1.0);
    let slice_size = resolution * resolution;
    let mut buffer = vec![0.0f32; slice_size * resolution];

    buffer
        .par_chunks_mut(slice_size)
        .enumerate()
        .for_each(|(z, slice)| {
            let z_pos = min.z + z as f32 * step.z;
            for y in 0..resolution {
                let y_pos = min.y + y as f32 * step.y;
                let row = &mut slice[y * resolution..(y + 1) * resolution];
                for (x, out) in row.iter_mut().enumerate() {
                    *out = evaluator.eval(Vec3::new(min.x + x as f32 * step.x, y_pos, z_pos));
                }
            }
        });

    buffer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{NodeConfig, Scene};

    fn unit_sphere() -> SceneEvaluator {
        let scene = Scene::from_config(&NodeConfig::new("sdSphere").arg("r", 1.0)).unwrap();
        SceneEvaluator::new(&scene).unwrap()
    }

    #[test]
    fn test_batch_matches_parallel() {
        let eval = unit_sphere();
        let points: Vec<Vec3> = (0..100).map(|i| Vec3::new(i as f32 * 0.05, 0.3, -0.2)).collect();
        assert_eq!(eval_batch(&eval, &points), eval_batch_parallel(&eval, &points));
    }

    #[test]
    fn test_grid_layout() {
        let eval = unit_sphere();
        let grid = eval_grid(&eval, Vec3::splat(-2.0), Vec3::splat(2.0), 5);
        assert_eq!(grid.len(), 125);
        // Centre sample
        assert!((grid[2 + 2 * 5 + 2 * 25] + 1.0).abs() < 1e-6);
        // (x = 2, y = -2, z = -2)
        let expected = Vec3::new(2.0, -2.0, -2.0).length() - 1.0;
        assert!((grid[4] - expected).abs() < 1e-5);
    }

    #[test]
    fn test_degenerate_grid() {
        let eval = unit_sphere();
        assert!(eval_grid(&eval, Vec3::ZERO, Vec3::ONE, 0).is_empty());
        assert_eq!(eval_grid(&eval, Vec3::ZERO, Vec3::ONE, 1), vec![-1.0]);
    }
}
