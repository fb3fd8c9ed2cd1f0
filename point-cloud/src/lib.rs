//! Point Cloud Operations for base plane handling
//!
//! The crate is organized around the geometric core of series alignment:
//!
//! - `cpu::segmentation`: dominant plane discovery (seeded RANSAC + least-squares refit)
//! - `cpu::orientation`: sign-canonical plane normals from three plane points
//! - `cpu::partition`: above/below classification of the non-plane points
//! - `cpu::normals`: k-NN normal estimation for clouds that arrive without normals
//!
//! # Usage
//!
//! ```ignore
//! use align_point_cloud::cpu::*;
//! use align_point_cloud::SegmentationConfig;
//!
//! let plane = PlaneSegmenter::new(SegmentationConfig::default()).segment(&cloud)?;
//! let oriented = PlaneOrienter::new(UpAxis::Y).orient(&cloud, &plane)?;
//! let partition = partition_points(&cloud, &plane, &oriented)?;
//! ```

pub mod cpu;

use align_core::RobustConfig;
use serde::{Deserialize, Serialize};

/// Parameters of the dominant plane search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Points closer than this to the plane are coplanar.
    pub max_distance: f64,
    pub ransac_n: usize,
    pub num_iterations: usize,
    pub confidence: f64,
    pub seed: u64,
    /// Refit the winning plane by least squares over its inliers.
    pub refine: bool,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_distance: 1.0,
            ransac_n: 3,
            num_iterations: 1000,
            confidence: 0.99,
            seed: 0x5eed,
            refine: true,
        }
    }
}

impl SegmentationConfig {
    pub fn fast() -> Self {
        Self {
            num_iterations: 200,
            confidence: 0.95,
            ..Self::default()
        }
    }

    pub fn high_quality() -> Self {
        Self {
            num_iterations: 5000,
            confidence: 0.999,
            ..Self::default()
        }
    }

    pub fn with_max_distance(mut self, max_distance: f64) -> Self {
        self.max_distance = max_distance;
        self
    }

    /// RANSAC settings for a cloud of `points` points. The sample size is
    /// kept between 3 and the cloud size.
    pub(crate) fn robust_config(&self, points: usize) -> RobustConfig {
        RobustConfig {
            threshold: self.max_distance,
            max_iterations: self.num_iterations,
            confidence: self.confidence,
            min_sample_size: self.ransac_n.clamp(3, points.max(3)),
            seed: self.seed,
        }
    }
}

/// Parameters of k-NN normal estimation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalConfig {
    pub k: usize,
}

impl Default for NormalConfig {
    fn default() -> Self {
        Self { k: 15 }
    }
}
