//! Plane normal orientation
//!
//! The normal is taken from three representative plane points and flipped so
//! that its up component is non-negative, which makes "above" and "below"
//! independent of sampling order.

use align_core::{Error, OrientedPlane, PlaneAnchor, PlaneSample, PointCloud, Result, UpAxis};
use nalgebra::{Point3, Vector3};

/// Normal of the plane through three points:
/// `(point1 - point2) x (point3 - point2)`.
pub fn three_point_normal(
    point1: &Point3<f64>,
    point2: &Point3<f64>,
    point3: &Point3<f64>,
) -> Vector3<f64> {
    (point1 - point2).cross(&(point3 - point2))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlaneOrienter {
    up: UpAxis,
}

impl PlaneOrienter {
    pub fn new(up: UpAxis) -> Self {
        Self { up }
    }

    pub fn up(&self) -> UpAxis {
        self.up
    }

    /// Representative points of `plane`: first, last and second index for
    /// three or more points, otherwise the first point with its normal.
    pub fn sample(&self, cloud: &PointCloud, plane: &[usize]) -> Result<PlaneSample> {
        match plane {
            [] => Err(Error::DegeneratePlane("empty plane index set".to_string())),
            [first] | [first, _] => Ok(PlaneSample::PointNormal(PlaneAnchor::from_cloud(
                cloud, *first,
            )?)),
            [first, second, .., last] => Ok(PlaneSample::ThreePoints([
                PlaneAnchor::from_cloud(cloud, *first)?,
                PlaneAnchor::from_cloud(cloud, *last)?,
                PlaneAnchor::from_cloud(cloud, *second)?,
            ])),
        }
    }

    pub fn orient(&self, cloud: &PointCloud, plane: &[usize]) -> Result<OrientedPlane> {
        self.orient_sample(self.sample(cloud, plane)?)
    }

    pub fn orient_sample(&self, sample: PlaneSample) -> Result<OrientedPlane> {
        let raw_normal = match &sample {
            PlaneSample::ThreePoints([p1, p2, p3]) => {
                three_point_normal(&p1.point, &p2.point, &p3.point)
            }
            PlaneSample::PointNormal(anchor) => anchor.normal,
        };

        let len = raw_normal.norm();
        if len.is_nan() || len == 0.0 {
            return Err(Error::DegeneratePlane(match sample {
                PlaneSample::ThreePoints(a) => format!(
                    "representative points {}, {}, {} are collinear",
                    a[0].index, a[1].index, a[2].index
                ),
                PlaneSample::PointNormal(a) => {
                    format!("point {} has a zero-length normal", a.index)
                }
            }));
        }

        Ok(OrientedPlane {
            sample,
            raw_normal,
            normal: self.up.canonicalize(raw_normal / len),
            up: self.up,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use align_core::ErrorKind;
    use approx::assert_relative_eq;

    fn cloud(points: &[[f64; 3]]) -> PointCloud {
        PointCloud::new(
            points.iter().map(|p| Point3::new(p[0], p[1], p[2])).collect(),
            vec![Vector3::new(0.0, -1.0, 0.0); points.len()],
        )
        .unwrap()
    }

    #[test]
    fn test_orient_horizontal_plane_points_up() {
        let pc = cloud(&[
            [0.0, 0.0, 0.0],
            [10.0, 0.0, 0.0],
            [0.0, 0.0, 10.0],
            [10.0, 0.0, 10.0],
        ]);
        let plane = PlaneOrienter::new(UpAxis::Y).orient(&pc, &[0, 1, 2, 3]).unwrap();
        assert_relative_eq!(plane.normal, Vector3::y(), epsilon = 1e-12);
        assert_eq!(plane.anchor(), Point3::origin());
        match plane.sample {
            PlaneSample::ThreePoints(a) => {
                assert_eq!([a[0].index, a[1].index, a[2].index], [0, 3, 1]);
            }
            other => panic!("unexpected sample {:?}", other),
        }
    }

    #[test]
    fn test_three_point_order_changes_raw_not_canonical() {
        // tilted plane, not vertical with respect to y
        let pc = cloud(&[[0.0, 0.0, 0.0], [4.0, 1.0, 0.0], [0.0, 2.0, 5.0]]);
        let orienter = PlaneOrienter::new(UpAxis::Y);

        let forward = orienter.orient(&pc, &[0, 1, 2]).unwrap();
        let mut swapped_sample = forward.sample;
        if let PlaneSample::ThreePoints(ref mut a) = swapped_sample {
            a.swap(1, 2);
        }
        let swapped = orienter.orient_sample(swapped_sample).unwrap();

        assert_relative_eq!(forward.raw_normal, -swapped.raw_normal, epsilon = 1e-12);
        assert_relative_eq!(forward.normal, swapped.normal, epsilon = 1e-12);
        assert!(forward.normal.y >= 0.0);

        // every permutation of the same three points agrees
        for order in [[0, 2, 1], [1, 0, 2], [2, 1, 0], [1, 2, 0], [2, 0, 1]] {
            let other = orienter.orient(&pc, &order).unwrap();
            assert_relative_eq!(other.normal, forward.normal, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_small_plane_uses_stored_normal() {
        let pc = cloud(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
        let plane = PlaneOrienter::default().orient(&pc, &[1, 0]).unwrap();
        assert!(matches!(plane.sample, PlaneSample::PointNormal(a) if a.index == 1));
        assert_relative_eq!(plane.raw_normal, Vector3::new(0.0, -1.0, 0.0));
        assert_relative_eq!(plane.normal, Vector3::y());
    }

    #[test]
    fn test_collinear_representatives_are_degenerate() {
        let pc = cloud(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [5.0, 3.0, 0.0], [2.0, 0.0, 0.0]]);
        // first, last, second = 0, 3, 1 all on the x axis
        let err = PlaneOrienter::default().orient(&pc, &[0, 1, 2, 3]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DegeneratePlane);
    }

    #[test]
    fn test_empty_plane() {
        let pc = cloud(&[[0.0, 0.0, 0.0]]);
        assert!(PlaneOrienter::default().orient(&pc, &[]).is_err());
        assert!(PlaneOrienter::default().orient(&pc, &[4]).is_err());
    }
}
