//! Crop planning: one destructive "cut below the base plane" per series.

use align_core::{Error, OrientedPlane, PlaneSample, Result};
use nalgebra::{Point3, Vector3};
use tracing::debug;

use crate::host::{GeometryHost, SeriesRef};

/// Plane definition handed to the host. The canonical normal is included so
/// that "below" means the same side the partitioner uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CropRequest {
    pub sample: PlaneSample,
    pub normal: Vector3<f64>,
}

impl CropRequest {
    pub fn anchor(&self) -> Point3<f64> {
        self.sample.anchor().point
    }

    pub fn signed_distance(&self, point: &Point3<f64>) -> f64 {
        (point - self.anchor()).dot(&self.normal)
    }

    /// Strictly below; points on the plane are kept.
    pub fn is_below(&self, point: &Point3<f64>) -> bool {
        self.signed_distance(point) < 0.0
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CropPlanner;

impl CropPlanner {
    pub fn plan(&self, plane: &OrientedPlane) -> CropRequest {
        CropRequest {
            sample: plane.sample,
            normal: plane.normal,
        }
    }

    pub fn apply<H: GeometryHost>(
        &self,
        host: &mut H,
        series: &SeriesRef,
        request: &CropRequest,
    ) -> Result<()> {
        debug!(series = %series, normal = ?request.normal, "cutting points below base plane");
        host.cut_points_below_plane(series, request)
            .map_err(|e| Error::external("cut_points_below_plane", e))
    }
}
