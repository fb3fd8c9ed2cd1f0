//! Dominant plane segmentation
//!
//! A seeded RANSAC proposes planes from 3-point samples; the plane with the
//! most inliers is refit by least squares and every point within
//! `max_distance` of the refit plane is accepted.

use align_core::{Error, PointCloud, Ransac, Result, RobustModel};
use nalgebra::{Matrix3, Point3, SymmetricEigen, Vector3};
use tracing::debug;

use crate::SegmentationConfig;

/// Plane `ax + by + cz + d = 0` with a unit `(a, b, c)`.
pub type PlaneModel = [f64; 4];

pub struct PlaneEstimator;

impl RobustModel<Point3<f64>> for PlaneEstimator {
    type Model = PlaneModel;

    fn min_sample_size(&self) -> usize {
        3
    }

    /// Three points span the plane directly; larger samples are fit by
    /// least squares.
    fn estimate(&self, data: &[&Point3<f64>]) -> Option<Self::Model> {
        if data.len() > 3 {
            return fit_plane_least_squares(data.iter().copied());
        }
        let p1 = data[0];
        let p2 = data[1];
        let p3 = data[2];

        let v1 = p2 - p1;
        let v2 = p3 - p1;
        let cross = v1.cross(&v2);
        let len = cross.norm();

        // collinear or repeated samples span no plane
        if len.is_nan() || len <= f64::EPSILON * v1.norm() * v2.norm() {
            return None;
        }

        let normal = cross / len;
        let d = -normal.dot(&p1.coords);
        Some([normal.x, normal.y, normal.z, d])
    }

    fn compute_error(&self, model: &Self::Model, data: &Point3<f64>) -> f64 {
        point_plane_distance(model, data)
    }
}

pub fn point_plane_distance(model: &PlaneModel, p: &Point3<f64>) -> f64 {
    let [a, b, c, d] = *model;
    let denom = (a * a + b * b + c * c).sqrt();
    if denom < 1e-12 {
        return f64::INFINITY;
    }
    (a * p.x + b * p.y + c * p.z + d).abs() / denom
}

/// Centroid and covariance eigen-decomposition of a point set, with the
/// eigenvalues in ascending order and `axes[i]` belonging to `values[i]`.
pub(crate) struct Spread {
    pub centroid: Vector3<f64>,
    pub values: [f64; 3],
    pub axes: [Vector3<f64>; 3],
}

impl Spread {
    /// Direction of least spread.
    pub fn normal(&self) -> Vector3<f64> {
        self.axes[0]
    }
}

pub(crate) fn principal_spread<'a, I>(points: I) -> Option<Spread>
where
    I: IntoIterator<Item = &'a Point3<f64>>,
{
    let points: Vec<&Point3<f64>> = points.into_iter().collect();
    if points.is_empty() {
        return None;
    }

    let centroid = points.iter().fold(Vector3::zeros(), |acc, p| acc + p.coords)
        / points.len() as f64;
    let cov = points.iter().fold(Matrix3::zeros(), |acc, p| {
        let d = p.coords - centroid;
        acc + d * d.transpose()
    }) / points.len() as f64;

    let eigen = SymmetricEigen::new(cov);
    let mut order = [0usize, 1, 2];
    order.sort_by(|&a, &b| eigen.eigenvalues[a].total_cmp(&eigen.eigenvalues[b]));

    let axes = order.map(|i| eigen.eigenvectors.column(i).into_owned());
    if !axes.iter().all(|v| v.iter().all(|c| c.is_finite())) {
        return None;
    }
    Some(Spread {
        centroid,
        values: order.map(|i| eigen.eigenvalues[i]),
        axes,
    })
}

/// Least-squares plane through `points`: centroid plus the eigenvector of the
/// smallest covariance eigenvalue.
pub fn fit_plane_least_squares<'a, I>(points: I) -> Option<PlaneModel>
where
    I: IntoIterator<Item = &'a Point3<f64>>,
{
    let points: Vec<&Point3<f64>> = points.into_iter().collect();
    if points.len() < 3 {
        return None;
    }
    let spread = principal_spread(points)?;
    // the two in-plane directions must both carry spread
    if spread.values[1].is_nan() || spread.values[1] <= 1e-12 * spread.values[2] {
        return None;
    }

    let normal = spread.normal();
    let d = -normal.dot(&spread.centroid);
    Some([normal.x, normal.y, normal.z, d])
}

/// Finds the indices of the points on the dominant plane of a cloud.
#[derive(Debug, Clone, Default)]
pub struct PlaneSegmenter {
    config: SegmentationConfig,
}

impl PlaneSegmenter {
    pub fn new(config: SegmentationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmentationConfig {
        &self.config
    }

    /// Returns the plane's point indices in ascending order.
    pub fn segment(&self, cloud: &PointCloud) -> Result<Vec<usize>> {
        segment_plane(cloud, &self.config).map(|(_, indices)| indices)
    }
}

/// Segment the dominant plane of `cloud`.
/// Returns the fitted plane model and the ascending inlier indices.
pub fn segment_plane(
    cloud: &PointCloud,
    config: &SegmentationConfig,
) -> Result<(PlaneModel, Vec<usize>)> {
    let n = cloud.len();
    if n < 3 {
        return Err(Error::InsufficientPoints {
            required: 3,
            actual: n,
        });
    }
    if config.max_distance.is_nan() || config.max_distance <= 0.0 {
        return Err(Error::InvalidInput(format!(
            "max_distance must be positive, got {}",
            config.max_distance
        )));
    }

    let ransac = Ransac::new(config.robust_config(n));
    let res = ransac.run(&PlaneEstimator, &cloud.points);

    let model = res.model.ok_or_else(|| {
        Error::DegeneratePlane(format!(
            "no non-collinear sample among {} points after {} iterations",
            n, config.num_iterations
        ))
    })?;
    let inliers = res.inlier_indices();
    if inliers.is_empty() {
        return Err(Error::DegeneratePlane(
            "plane fit rejected every point".to_string(),
        ));
    }
    debug!(
        points = n,
        inliers = inliers.len(),
        residual = res.residual,
        "ransac plane candidate"
    );

    if !config.refine {
        return Ok((model, inliers));
    }

    let Some(refined) = fit_plane_least_squares(inliers.iter().map(|&i| &cloud.points[i])) else {
        return Ok((model, inliers));
    };

    let accepted: Vec<usize> = cloud
        .points
        .iter()
        .enumerate()
        .filter(|(_, p)| point_plane_distance(&refined, p) <= config.max_distance)
        .map(|(i, _)| i)
        .collect();

    if accepted.is_empty() {
        return Ok((model, inliers));
    }

    debug!(
        before = inliers.len(),
        after = accepted.len(),
        "least-squares refit"
    );
    Ok((refined, accepted))
}

#[cfg(test)]
mod tests {
    use super::*;
    use align_core::ErrorKind;
    use approx::assert_relative_eq;

    fn cloud_from(points: Vec<Point3<f64>>) -> PointCloud {
        let normals = vec![Vector3::y(); points.len()];
        PointCloud::new(points, normals).unwrap()
    }

    /// 10x10 grid on y = 0 with spacing 10, followed by an object above it.
    fn base_with_object() -> PointCloud {
        let mut points = Vec::new();
        for i in 0..10 {
            for j in 0..10 {
                points.push(Point3::new(i as f64 * 10.0, 0.0, j as f64 * 10.0));
            }
        }
        for k in 0..20 {
            let t = k as f64;
            points.push(Point3::new(30.0 + t, 15.0 + 2.0 * t, 40.0 - t));
        }
        cloud_from(points)
    }

    #[test]
    fn test_segment_plane_finds_base() {
        let pc = base_with_object();
        let (model, indices) = segment_plane(&pc, &SegmentationConfig::default()).unwrap();
        assert_eq!(indices, (0..100).collect::<Vec<_>>());
        assert_relative_eq!(model[1].abs(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(model[3], 0.0, epsilon = 1e-6);
    }

    #[test]
    fn test_segment_plane_is_deterministic() {
        let pc = base_with_object();
        let segmenter = PlaneSegmenter::new(SegmentationConfig::fast());
        let a = segmenter.segment(&pc).unwrap();
        let b = segmenter.segment(&pc).unwrap();
        assert_eq!(a, b);
        assert!(a.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_segment_plane_two_points() {
        let pc = cloud_from(vec![Point3::origin(), Point3::new(1.0, 0.0, 0.0)]);
        let err = PlaneSegmenter::default().segment(&pc).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InsufficientPoints);
    }

    #[test]
    fn test_segment_plane_collinear() {
        let points = (0..10).map(|i| Point3::new(i as f64, 2.0 * i as f64, 0.0)).collect();
        let err = PlaneSegmenter::new(SegmentationConfig::fast())
            .segment(&cloud_from(points))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DegeneratePlane);
    }

    #[test]
    fn test_segment_plane_rejects_non_positive_distance() {
        let pc = base_with_object();
        let err = segment_plane(&pc, &SegmentationConfig::default().with_max_distance(0.0))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
    }

    #[test]
    fn test_fit_plane_least_squares_tilted() {
        // z = 0.5x + 0.25y + 3
        let pts: Vec<Point3<f64>> = (0..5)
            .flat_map(|i| (0..5).map(move |j| (i as f64, j as f64)))
            .map(|(x, y)| Point3::new(x, y, 0.5 * x + 0.25 * y + 3.0))
            .collect();
        let model = fit_plane_least_squares(pts.iter()).unwrap();
        for p in &pts {
            assert!(point_plane_distance(&model, p) < 1e-9);
        }
        let far = Point3::new(0.0, 0.0, 10.0);
        assert!(point_plane_distance(&model, &far) > 1.0);
    }

    #[test]
    fn test_sample_size_larger_than_cloud() {
        let pc = cloud_from(vec![
            Point3::new(0.0, 1.0, 0.0),
            Point3::new(4.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 4.0),
            Point3::new(4.0, 1.0, 4.0),
        ]);
        let config = SegmentationConfig {
            ransac_n: 5,
            ..Default::default()
        };
        let (model, indices) = segment_plane(&pc, &config).unwrap();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_relative_eq!(model[1].abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_larger_samples_are_fit_by_least_squares() {
        let pc = base_with_object();
        let config = SegmentationConfig {
            ransac_n: 6,
            ..Default::default()
        };
        let (_, indices) = segment_plane(&pc, &config).unwrap();
        assert_eq!(indices, (0..100).collect::<Vec<_>>());

        let sample: Vec<&Point3<f64>> = [0, 1, 10, 11, 55]
            .iter()
            .map(|&i| &pc.points[i])
            .collect();
        let model = PlaneEstimator.estimate(&sample).unwrap();
        assert_relative_eq!(model[1].abs(), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_plane_estimator_rejects_collinear_sample() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 1.0, 1.0);
        let c = Point3::new(2.0, 2.0, 2.0);
        assert!(PlaneEstimator.estimate(&[&a, &b, &c]).is_none());
    }
}
