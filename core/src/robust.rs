//! Robust Estimation Module
//!
//! Provides a generic, seeded RANSAC implementation that can be used for any
//! model estimation task. Runs with the same seed and data always produce the
//! same model.

use std::marker::PhantomData;

use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::SeedableRng;
use rayon::prelude::*;

/// Configuration for robust estimation
#[derive(Debug, Clone)]
pub struct RobustConfig {
    pub threshold: f64,
    pub max_iterations: usize,
    pub confidence: f64,
    pub min_sample_size: usize,
    pub seed: u64,
}

impl Default for RobustConfig {
    fn default() -> Self {
        Self {
            threshold: 1.0,
            max_iterations: 1000,
            confidence: 0.99,
            min_sample_size: 3,
            seed: 0x5eed,
        }
    }
}

/// Result of robust estimation
#[derive(Debug, Clone)]
pub struct RobustResult<M> {
    pub model: Option<M>,
    pub inliers: Vec<bool>,
    pub num_inliers: usize,
    pub residual: f64,
}

impl<M> RobustResult<M> {
    fn empty(n: usize) -> Self {
        Self {
            model: None,
            inliers: vec![false; n],
            num_inliers: 0,
            residual: f64::INFINITY,
        }
    }

    /// Indices of the inliers in ascending order.
    pub fn inlier_indices(&self) -> Vec<usize> {
        self.inliers
            .iter()
            .enumerate()
            .filter(|(_, &is_inlier)| is_inlier)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Trait for models that can be estimated robustly
pub trait RobustModel<D> {
    type Model: Clone;

    /// Minimum number of data points required to estimate the model
    fn min_sample_size(&self) -> usize;

    /// Estimate model from a minimal sample
    fn estimate(&self, data: &[&D]) -> Option<Self::Model>;

    /// Compute error for a single data point against the model
    fn compute_error(&self, model: &Self::Model, data: &D) -> f64;
}

/// Generic RANSAC engine
pub struct Ransac<D, M: RobustModel<D>> {
    config: RobustConfig,
    _phantom: PhantomData<(D, M)>,
}

impl<D, M> Ransac<D, M>
where
    D: Sync,
    M: RobustModel<D> + Sync,
    M::Model: Sync,
{
    pub fn new(config: RobustConfig) -> Self {
        Self {
            config,
            _phantom: PhantomData,
        }
    }

    pub fn config(&self) -> &RobustConfig {
        &self.config
    }

    pub fn run(&self, estimator: &M, data: &[D]) -> RobustResult<M::Model> {
        let n = data.len();
        let k = estimator.min_sample_size().max(self.config.min_sample_size);

        if n < k || k == 0 {
            return RobustResult::empty(n);
        }

        let mut best = RobustResult::empty(n);
        let mut rng = StdRng::seed_from_u64(self.config.seed);

        for _ in 0..self.config.max_iterations {
            // 1. Sample
            let picked = sample(&mut rng, n, k);
            let minimal: Vec<&D> = picked.iter().map(|i| &data[i]).collect();

            // 2. Estimate
            let Some(model) = estimator.estimate(&minimal) else {
                continue;
            };

            // 3. Score
            let errors: Vec<f64> = data
                .par_iter()
                .map(|d| estimator.compute_error(&model, d))
                .collect();
            let inliers: Vec<bool> = errors.iter().map(|&e| e < self.config.threshold).collect();
            let num_inliers = inliers.iter().filter(|&&b| b).count();
            let total_error: f64 = errors
                .iter()
                .zip(&inliers)
                .filter(|(_, &inl)| inl)
                .map(|(e, _)| e)
                .sum();
            let residual = if num_inliers > 0 {
                total_error / num_inliers as f64
            } else {
                f64::INFINITY
            };

            if num_inliers > best.num_inliers
                || (num_inliers == best.num_inliers && num_inliers > 0 && residual < best.residual)
            {
                best = RobustResult {
                    model: Some(model),
                    inliers,
                    num_inliers,
                    residual,
                };

                // Early exit check
                if num_inliers as f64 > n as f64 * self.config.confidence {
                    break;
                }
            }
        }

        best
    }
}
