use nalgebra::{Matrix4, Point3, Vector3};
use serde::{Deserialize, Serialize};

use crate::PointCloud;

/// World axis whose component of a plane normal must be non-negative
/// after orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpAxis {
    X,
    #[default]
    Y,
    Z,
}

impl UpAxis {
    pub fn component(&self, v: &Vector3<f64>) -> f64 {
        match self {
            UpAxis::X => v.x,
            UpAxis::Y => v.y,
            UpAxis::Z => v.z,
        }
    }

    pub fn unit(&self) -> Vector3<f64> {
        match self {
            UpAxis::X => Vector3::x(),
            UpAxis::Y => Vector3::y(),
            UpAxis::Z => Vector3::z(),
        }
    }

    /// Flip `normal` so that its up component is non-negative.
    pub fn canonicalize(&self, normal: Vector3<f64>) -> Vector3<f64> {
        if self.component(&normal) < 0.0 {
            -normal
        } else {
            normal
        }
    }
}

/// A plane point together with its cloud index and stored normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaneAnchor {
    pub index: usize,
    pub point: Point3<f64>,
    pub normal: Vector3<f64>,
}

impl PlaneAnchor {
    pub fn from_cloud(cloud: &PointCloud, index: usize) -> crate::Result<Self> {
        match (cloud.coordinate(index), cloud.normal(index)) {
            (Some(point), Some(normal)) => Ok(Self {
                index,
                point: *point,
                normal: *normal,
            }),
            _ => Err(crate::Error::InvalidInput(format!(
                "Plane index {} out of range for cloud of {} points",
                index,
                cloud.len()
            ))),
        }
    }
}

/// The plane points a plane is defined from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaneSample {
    /// Ordered as first, last and second point of the plane index set.
    ThreePoints([PlaneAnchor; 3]),
    /// Fallback for planes with fewer than three points.
    PointNormal(PlaneAnchor),
}

impl PlaneSample {
    pub fn anchor(&self) -> &PlaneAnchor {
        match self {
            PlaneSample::ThreePoints(anchors) => &anchors[0],
            PlaneSample::PointNormal(anchor) => anchor,
        }
    }
}

/// A plane with a sign-canonical normal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientedPlane {
    pub sample: PlaneSample,
    /// Normal before canonicalization; its sign depends on sample order.
    pub raw_normal: Vector3<f64>,
    pub normal: Vector3<f64>,
    pub up: UpAxis,
}

impl OrientedPlane {
    pub fn anchor(&self) -> Point3<f64> {
        self.sample.anchor().point
    }

    /// Unnormalized signed distance: dot(point - anchor, normal).
    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.anchor()).dot(&self.normal)
    }

    pub fn side_of(&self, point: &Point3<f64>) -> Option<Side> {
        Side::from_signed(self.signed_distance(point))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Above,
    Below,
}

impl Side {
    /// Exactly zero lies on neither side.
    pub fn from_signed(value: f64) -> Option<Side> {
        if value > 0.0 {
            Some(Side::Above)
        } else if value < 0.0 {
            Some(Side::Below)
        } else {
            None
        }
    }
}

/// Split of the non-plane indices of a cloud.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Partition {
    pub above: Vec<usize>,
    pub below: Vec<usize>,
    /// Non-plane points whose signed distance was exactly zero.
    pub on_plane: usize,
}

impl Partition {
    pub fn is_disjoint(&self) -> bool {
        // both sides are produced in ascending order
        let (mut a, mut b) = (self.above.iter().peekable(), self.below.iter().peekable());
        while let (Some(&&x), Some(&&y)) = (a.peek(), b.peek()) {
            if x == y {
                return false;
            }
            if x < y {
                a.next();
            } else {
                b.next();
            }
        }
        true
    }

    pub fn classified(&self) -> usize {
        self.above.len() + self.below.len()
    }
}

/// Apply a rigid 4x4 transform to every point and normal of `cloud`.
pub fn transform_cloud(cloud: &mut PointCloud, transformation: &Matrix4<f64>) {
    for p in cloud.points.iter_mut() {
        *p = transformation.transform_point(p);
    }
    for n in cloud.normals.iter_mut() {
        *n = transformation.transform_vector(n);
    }
}
