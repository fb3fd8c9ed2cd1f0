//! 3D Registration Module
//!
//! Registers a set of feature points taken from a source series onto the
//! point cloud of a reference series. Correspondences are nearest neighbours
//! in the reference cloud; the rigid transform is solved in closed form by
//! SVD and the match/solve loop repeats until the RMSE stops improving.


use align_core::{Error, Result};
use nalgebra::{Matrix3, Matrix4, Point3};
use rstar::{RTree, RTreeObject, AABB};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Fewest correspondences that pin down a rigid transform.
pub const MIN_CORRESPONDENCES: usize = 3;

/// Options for correspondence registration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationConfig {
    pub max_iterations: usize,
    /// Stop once the RMSE improves by less than this.
    pub tolerance: f64,
    /// Feature points farther than this from every reference point are ignored.
    pub max_correspondence_distance: f64,
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self {
            max_iterations: 30,
            tolerance: 1e-9,
            max_correspondence_distance: f64::INFINITY,
        }
    }
}

/// Correspondence registration result
///
/// * `transformation` - 4×4 rigid transform taking source coordinates into the reference frame
/// * `fitness` - Fraction of feature points with a correspondence (0-1 range)
/// * `inlier_rmse` - RMSE of the matched feature points after transformation
#[derive(Debug, Clone, PartialEq)]
pub struct CorrespondenceResult {
    pub transformation: Matrix4<f64>,
    pub fitness: f64,
    pub inlier_rmse: f64,
    pub num_correspondences: usize,
    pub num_iterations: usize,
}

struct IndexedPoint(Point3<f64>);

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 3]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.0.x, self.0.y, self.0.z])
    }
}

impl rstar::PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        let dx = self.0.x - point[0];
        let dy = self.0.y - point[1];
        let dz = self.0.z - point[2];
        dx * dx + dy * dy + dz * dz
    }
}

/// Compute the rigid transformation mapping `source[i]` onto `target[i]`
/// using SVD. Returns `None` for fewer than three pairs or mismatched input.
pub fn estimate_rigid_transform(
    source: &[Point3<f64>],
    target: &[Point3<f64>],
) -> Option<Matrix4<f64>> {
    if source.len() != target.len() || source.len() < MIN_CORRESPONDENCES {
        return None;
    }

    // Compute centroids
    let n = source.len() as f64;
    let source_centroid = source.iter().fold(Point3::origin(), |acc, p| acc + p.coords) / n;
    let target_centroid = target.iter().fold(Point3::origin(), |acc, p| acc + p.coords) / n;

    // Compute covariance matrix
    let mut covariance = Matrix3::<f64>::zeros();
    for (s, t) in source.iter().zip(target) {
        let src = s - source_centroid;
        let tgt = t - target_centroid;
        covariance += tgt * src.transpose();
    }

    // SVD to find rotation
    let svd = covariance.svd(true, true);
    let u = svd.u?;
    let vt = svd.v_t?;

    let mut rotation = u * vt;

    // Ensure proper rotation (det = 1)
    if rotation.determinant() < 0.0 {
        let mut u_corrected = u;
        u_corrected.set_column(2, &(u.column(2) * -1.0));
        rotation = u_corrected * vt;
    }

    // Compute translation
    let translation = target_centroid.coords - rotation * source_centroid.coords;

    // Build transformation matrix
    let mut transformation = Matrix4::identity();
    transformation
        .fixed_view_mut::<3, 3>(0, 0)
        .copy_from(&rotation);
    transformation
        .fixed_view_mut::<3, 1>(0, 3)
        .copy_from(&translation);

    Some(transformation)
}

/// Match every transformed feature to its nearest reference point.
/// Returns `(feature index, reference point, squared distance)` triples.
fn find_correspondences(
    tree: &RTree<IndexedPoint>,
    features: &[Point3<f64>],
    transformation: &Matrix4<f64>,
    max_distance: f64,
) -> Vec<(usize, Point3<f64>, f64)> {
    let max_d2 = max_distance * max_distance;
    features
        .iter()
        .enumerate()
        .filter_map(|(i, p)| {
            let moved = transformation.transform_point(p);
            let nearest = tree.nearest_neighbor(&[moved.x, moved.y, moved.z])?;
            let d2 = (nearest.0 - moved).norm_squared();
            (d2 <= max_d2).then_some((i, nearest.0, d2))
        })
        .collect()
}

/// Evaluate how well `transformation` brings `features` onto `reference`.
/// Returns `(fitness, inlier_rmse)`.
pub fn evaluate_registration(
    reference: &[Point3<f64>],
    features: &[Point3<f64>],
    transformation: &Matrix4<f64>,
    max_correspondence_distance: f64,
) -> (f64, f64) {
    if reference.is_empty() || features.is_empty() {
        return (0.0, f64::INFINITY);
    }
    let tree = build_tree(reference);
    let matches = find_correspondences(&tree, features, transformation, max_correspondence_distance);
    score(&matches, features.len())
}

fn build_tree(points: &[Point3<f64>]) -> RTree<IndexedPoint> {
    RTree::bulk_load(
        points
            .iter()
            .map(|p| IndexedPoint(*p))
            .collect(),
    )
}

fn score(matches: &[(usize, Point3<f64>, f64)], total: usize) -> (f64, f64) {
    if matches.is_empty() {
        return (0.0, f64::INFINITY);
    }
    let sum: f64 = matches.iter().map(|m| m.2).sum();
    (
        matches.len() as f64 / total as f64,
        (sum / matches.len() as f64).sqrt(),
    )
}

/// Register `features` (source-series coordinates) onto the `reference`
/// cloud.
///
/// # Algorithm
///
/// Iteratively:
/// 1. Transform features with the current estimate
/// 2. Pair each with its nearest reference point
/// 3. Solve the rigid transform from the untransformed features to their pairs
/// 4. Stop when the RMSE improvement falls below `tolerance`
pub fn registration_by_correspondence(
    reference: &[Point3<f64>],
    features: &[Point3<f64>],
    config: &RegistrationConfig,
) -> Result<CorrespondenceResult> {
    if features.len() < MIN_CORRESPONDENCES {
        return Err(Error::UnderdeterminedAlignment {
            required: MIN_CORRESPONDENCES,
            actual: features.len(),
        });
    }
    if reference.is_empty() {
        return Err(Error::InvalidInput(
            "reference cloud has no points".to_string(),
        ));
    }

    let tree = build_tree(reference);
    let mut transformation = Matrix4::identity();
    let mut previous_rmse = f64::INFINITY;
    let mut result = None;

    for iter in 0..config.max_iterations.max(1) {
        let matches = find_correspondences(
            &tree,
            features,
            &transformation,
            config.max_correspondence_distance,
        );
        if matches.len() < MIN_CORRESPONDENCES {
            return Err(Error::UnderdeterminedAlignment {
                required: MIN_CORRESPONDENCES,
                actual: matches.len(),
            });
        }

        let source: Vec<Point3<f64>> = matches.iter().map(|m| features[m.0]).collect();
        let target: Vec<Point3<f64>> = matches.iter().map(|m| m.1).collect();
        let Some(next) = estimate_rigid_transform(&source, &target) else {
            break;
        };

        let moved = find_correspondences(&tree, features, &next, config.max_correspondence_distance);
        let (fitness, rmse) = score(&moved, features.len());
        debug!(iteration = iter, fitness, rmse, "correspondence registration step");

        if rmse > previous_rmse {
            break;
        }
        transformation = next;
        result = Some(CorrespondenceResult {
            transformation,
            fitness,
            inlier_rmse: rmse,
            num_correspondences: moved.len(),
            num_iterations: iter + 1,
        });

        if previous_rmse - rmse < config.tolerance {
            break;
        }
        previous_rmse = rmse;
    }

    result.ok_or_else(|| {
        Error::InvalidInput("correspondence points do not determine a rigid transform".to_string())
    })
}
