//! Normal estimation for clouds that arrive with coordinates only.

use align_core::UpAxis;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

use super::segmentation::principal_spread;

struct TreePoint(Point3<f64>);

impl RTreeObject for TreePoint {
    type Envelope = AABB<[f64; 3]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.0.x, self.0.y, self.0.z])
    }
}

impl PointDistance for TreePoint {
    fn distance_2(&self, point: &[f64; 3]) -> f64 {
        (self.0 - Point3::from(*point)).norm_squared()
    }
}

/// Estimate one normal per point from the direction of least spread among its
/// `k` nearest neighbours, flipped towards `up`. Neighbourhoods with fewer
/// than three points, or whose spread cannot be decomposed, get `up` itself.
pub fn estimate_normals(points: &[Point3<f64>], k: usize, up: UpAxis) -> Vec<Vector3<f64>> {
    if points.is_empty() {
        return Vec::new();
    }
    let tree = RTree::bulk_load(points.iter().copied().map(TreePoint).collect());

    points
        .par_iter()
        .map(|p| {
            let neighbours: Vec<&Point3<f64>> = tree
                .nearest_neighbor_iter(&[p.x, p.y, p.z])
                .take(k)
                .map(|n| &n.0)
                .collect();
            if neighbours.len() < 3 {
                return up.unit();
            }
            principal_spread(neighbours)
                .map(|spread| up.canonicalize(spread.normal()))
                .unwrap_or_else(|| up.unit())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_estimate_normals_on_plane() {
        let mut points = Vec::new();
        for i in 0..6 {
            for j in 0..6 {
                points.push(Point3::new(i as f64, 0.0, j as f64));
            }
        }

        let normals = estimate_normals(&points, 8, UpAxis::Y);
        assert_eq!(normals.len(), points.len());
        for n in normals {
            assert_relative_eq!(n, Vector3::y(), epsilon = 1e-6);
        }
    }

    #[test]
    fn test_estimate_normals_tilted_plane_faces_up() {
        // x + z = 0, seen from +z
        let mut points = Vec::new();
        for i in 0..5 {
            for j in 0..5 {
                let (u, v) = (i as f64, j as f64);
                points.push(Point3::new(u, v, -u));
            }
        }
        let expected = Vector3::new(1.0, 0.0, 1.0).normalize();
        for n in estimate_normals(&points, 6, UpAxis::Z) {
            assert_relative_eq!(n, expected, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_estimate_normals_sparse_cloud() {
        let points = vec![Point3::origin(), Point3::new(1.0, 1.0, 1.0)];
        let normals = estimate_normals(&points, 15, UpAxis::Z);
        assert_eq!(normals, vec![Vector3::z(), Vector3::z()]);
    }
}
