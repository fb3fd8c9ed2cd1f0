//! Collaborator boundary to the application that owns the measurement series.
//!
//! The aligner never touches series data directly: listing, reading,
//! cropping, registering and the temporary markers all go through
//! [`GeometryHost`]. Calls are synchronous and return once the host has
//! finished the operation.

use std::fmt;

use align_core::{PlaneSample, PointCloud};
use nalgebra::{Matrix4, Point3, Vector3};

use crate::crop::CropRequest;

/// One entry of the host's ordered series list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SeriesRef {
    pub id: usize,
    pub name: String,
}

impl SeriesRef {
    pub fn new(id: usize, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for SeriesRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (#{})", self.name, self.id)
    }
}

/// Host-side identity of a temporary visualization element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementHandle(pub u64);

/// How a plane marker is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaneMarker {
    ThreePoints([Point3<f64>; 3]),
    PointNormal {
        point: Point3<f64>,
        normal: Vector3<f64>,
    },
}

impl From<&PlaneSample> for PlaneMarker {
    fn from(sample: &PlaneSample) -> Self {
        match sample {
            PlaneSample::ThreePoints([a, b, c]) => PlaneMarker::ThreePoints([a.point, b.point, c.point]),
            PlaneSample::PointNormal(anchor) => PlaneMarker::PointNormal {
                point: anchor.point,
                normal: anchor.normal,
            },
        }
    }
}

/// What the host reports back after registering a series.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationSummary {
    pub transformation: Matrix4<f64>,
    pub fitness: f64,
    pub rmse: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Unknown series: {0}")]
    UnknownSeries(String),

    #[error("Unknown element: {0:?}")]
    UnknownElement(ElementHandle),

    #[error("Operation failed: {0}")]
    Failed(String),

    #[error("Core error: {0}")]
    Core(#[from] align_core::Error),
}

pub type HostResult<T> = std::result::Result<T, HostError>;

/// Capabilities the aligner needs from the host application.
pub trait GeometryHost {
    /// The project's series in processing order.
    fn list_series(&mut self) -> HostResult<Vec<SeriesRef>>;

    /// Snapshot of the series' cloud as currently persisted.
    fn point_cloud(&mut self, series: &SeriesRef) -> HostResult<PointCloud>;

    fn create_circle(
        &mut self,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        radius: f64,
    ) -> HostResult<ElementHandle>;

    fn create_plane(&mut self, marker: &PlaneMarker, size: f64) -> HostResult<ElementHandle>;

    fn delete_elements(&mut self, handles: &[ElementHandle]) -> HostResult<()>;

    /// Block until the host has redrawn everything created so far.
    fn wait_for_render_sync(&mut self) -> HostResult<()>;

    /// Remove every point strictly below the requested plane.
    fn cut_points_below_plane(&mut self, series: &SeriesRef, request: &CropRequest)
        -> HostResult<()>;

    /// Rigidly move `source` onto `reference` using `points` (source
    /// coordinates) as correspondence features.
    fn register_by_correspondence(
        &mut self,
        reference: &SeriesRef,
        source: &SeriesRef,
        points: &[Point3<f64>],
    ) -> HostResult<RegistrationSummary>;
}

impl<H: GeometryHost + ?Sized> GeometryHost for &mut H {
    fn list_series(&mut self) -> HostResult<Vec<SeriesRef>> {
        (**self).list_series()
    }

    fn point_cloud(&mut self, series: &SeriesRef) -> HostResult<PointCloud> {
        (**self).point_cloud(series)
    }

    fn create_circle(
        &mut self,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        radius: f64,
    ) -> HostResult<ElementHandle> {
        (**self).create_circle(point, normal, radius)
    }

    fn create_plane(&mut self, marker: &PlaneMarker, size: f64) -> HostResult<ElementHandle> {
        (**self).create_plane(marker, size)
    }

    fn delete_elements(&mut self, handles: &[ElementHandle]) -> HostResult<()> {
        (**self).delete_elements(handles)
    }

    fn wait_for_render_sync(&mut self) -> HostResult<()> {
        (**self).wait_for_render_sync()
    }

    fn cut_points_below_plane(
        &mut self,
        series: &SeriesRef,
        request: &CropRequest,
    ) -> HostResult<()> {
        (**self).cut_points_below_plane(series, request)
    }

    fn register_by_correspondence(
        &mut self,
        reference: &SeriesRef,
        source: &SeriesRef,
        points: &[Point3<f64>],
    ) -> HostResult<RegistrationSummary> {
        (**self).register_by_correspondence(reference, source, points)
    }
}
