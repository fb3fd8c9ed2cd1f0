//! In-process [`GeometryHost`] holding the series clouds in memory.
//!
//! Used by the command-line tool (series loaded from PLY files) and by
//! tests, which inspect the recorded [`HostCall`] log.

use std::collections::BTreeMap;

use align_core::{transform_cloud, PointCloud};
use align_registration::{registration_by_correspondence, RegistrationConfig};
use nalgebra::{Matrix4, Point3, Vector3};
use tracing::{debug, trace};

use crate::crop::CropRequest;
use crate::host::{
    ElementHandle, GeometryHost, HostError, HostResult, PlaneMarker, RegistrationSummary,
    SeriesRef,
};

/// One recorded host interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum HostCall {
    ListSeries,
    PointCloud(String),
    CreateCircle(ElementHandle),
    CreatePlane(ElementHandle),
    DeleteElements(Vec<ElementHandle>),
    WaitForRenderSync,
    CutPointsBelowPlane { series: String, removed: usize },
    RegisterByCorrespondence {
        reference: String,
        source: String,
        points: Vec<Point3<f64>>,
    },
}

impl HostCall {
    /// Operation name, as used by [`MemoryHost::fail_on`].
    pub fn operation(&self) -> &'static str {
        match self {
            HostCall::ListSeries => "list_series",
            HostCall::PointCloud(_) => "point_cloud",
            HostCall::CreateCircle(_) => "create_circle",
            HostCall::CreatePlane(_) => "create_plane",
            HostCall::DeleteElements(_) => "delete_elements",
            HostCall::WaitForRenderSync => "wait_for_render_sync",
            HostCall::CutPointsBelowPlane { .. } => "cut_points_below_plane",
            HostCall::RegisterByCorrespondence { .. } => "register_by_correspondence",
        }
    }
}

/// A live visualization element.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Circle {
        point: Point3<f64>,
        normal: Vector3<f64>,
        radius: f64,
    },
    Plane {
        marker: PlaneMarker,
        size: f64,
    },
}

struct StoredSeries {
    series: SeriesRef,
    cloud: PointCloud,
    transformation: Matrix4<f64>,
}

#[derive(Default)]
pub struct MemoryHost {
    series: Vec<StoredSeries>,
    elements: BTreeMap<ElementHandle, Element>,
    next_handle: u64,
    calls: Vec<HostCall>,
    render_syncs: usize,
    registration: RegistrationConfig,
    failing: Option<&'static str>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_registration_config(mut self, config: RegistrationConfig) -> Self {
        self.registration = config;
        self
    }

    /// Append a series; its id is its position.
    pub fn add_series(&mut self, name: impl Into<String>, cloud: PointCloud) -> SeriesRef {
        let series = SeriesRef::new(self.series.len(), name);
        self.series.push(StoredSeries {
            series: series.clone(),
            cloud,
            transformation: Matrix4::identity(),
        });
        series
    }

    pub fn series(&self) -> Vec<SeriesRef> {
        self.series.iter().map(|s| s.series.clone()).collect()
    }

    pub fn cloud(&self, series: &SeriesRef) -> Option<&PointCloud> {
        self.find(series).ok().map(|s| &s.cloud)
    }

    /// Accumulated rigid transform applied to `series` by registration.
    pub fn transformation(&self, series: &SeriesRef) -> Option<Matrix4<f64>> {
        self.find(series).ok().map(|s| s.transformation)
    }

    pub fn elements(&self) -> &BTreeMap<ElementHandle, Element> {
        &self.elements
    }

    pub fn calls(&self) -> &[HostCall] {
        &self.calls
    }

    pub fn count_calls(&self, operation: &str) -> usize {
        self.calls.iter().filter(|c| c.operation() == operation).count()
    }

    pub fn render_syncs(&self) -> usize {
        self.render_syncs
    }

    /// Make every later call of `operation` fail.
    pub fn fail_on(&mut self, operation: &'static str) {
        self.failing = Some(operation);
    }

    pub fn clear_failure(&mut self) {
        self.failing = None;
    }

    pub fn into_clouds(self) -> Vec<(SeriesRef, PointCloud)> {
        self.series.into_iter().map(|s| (s.series, s.cloud)).collect()
    }

    fn check(&self, operation: &'static str) -> HostResult<()> {
        match self.failing {
            Some(op) if op == operation => Err(HostError::Failed(format!("{} rejected", operation))),
            _ => Ok(()),
        }
    }

    fn find(&self, series: &SeriesRef) -> HostResult<&StoredSeries> {
        self.series
            .get(series.id)
            .filter(|s| s.series == *series)
            .ok_or_else(|| HostError::UnknownSeries(series.name.clone()))
    }

    fn find_mut(&mut self, series: &SeriesRef) -> HostResult<&mut StoredSeries> {
        self.series
            .get_mut(series.id)
            .filter(|s| s.series == *series)
            .ok_or_else(|| HostError::UnknownSeries(series.name.clone()))
    }

    fn insert(&mut self, element: Element) -> ElementHandle {
        let handle = ElementHandle(self.next_handle);
        self.next_handle += 1;
        self.elements.insert(handle, element);
        handle
    }
}

impl GeometryHost for MemoryHost {
    fn list_series(&mut self) -> HostResult<Vec<SeriesRef>> {
        self.check("list_series")?;
        self.calls.push(HostCall::ListSeries);
        Ok(self.series())
    }

    fn point_cloud(&mut self, series: &SeriesRef) -> HostResult<PointCloud> {
        self.check("point_cloud")?;
        self.calls.push(HostCall::PointCloud(series.name.clone()));
        Ok(self.find(series)?.cloud.clone())
    }

    fn create_circle(
        &mut self,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        radius: f64,
    ) -> HostResult<ElementHandle> {
        self.check("create_circle")?;
        let handle = self.insert(Element::Circle {
            point: *point,
            normal: *normal,
            radius,
        });
        self.calls.push(HostCall::CreateCircle(handle));
        Ok(handle)
    }

    fn create_plane(&mut self, marker: &PlaneMarker, size: f64) -> HostResult<ElementHandle> {
        self.check("create_plane")?;
        let handle = self.insert(Element::Plane {
            marker: *marker,
            size,
        });
        self.calls.push(HostCall::CreatePlane(handle));
        Ok(handle)
    }

    fn delete_elements(&mut self, handles: &[ElementHandle]) -> HostResult<()> {
        self.check("delete_elements")?;
        if let Some(missing) = handles.iter().find(|h| !self.elements.contains_key(*h)) {
            return Err(HostError::UnknownElement(*missing));
        }
        for handle in handles {
            self.elements.remove(handle);
        }
        self.calls.push(HostCall::DeleteElements(handles.to_vec()));
        Ok(())
    }

    fn wait_for_render_sync(&mut self) -> HostResult<()> {
        self.check("wait_for_render_sync")?;
        self.render_syncs += 1;
        self.calls.push(HostCall::WaitForRenderSync);
        Ok(())
    }

    fn cut_points_below_plane(
        &mut self,
        series: &SeriesRef,
        request: &CropRequest,
    ) -> HostResult<()> {
        self.check("cut_points_below_plane")?;
        let stored = self.find_mut(series)?;
        let removed = stored.cloud.retain(|p, _| !request.is_below(p));
        debug!(series = %series, removed, kept = stored.cloud.len(), "cropped series");
        self.calls.push(HostCall::CutPointsBelowPlane {
            series: series.name.clone(),
            removed,
        });
        Ok(())
    }

    fn register_by_correspondence(
        &mut self,
        reference: &SeriesRef,
        source: &SeriesRef,
        points: &[Point3<f64>],
    ) -> HostResult<RegistrationSummary> {
        self.check("register_by_correspondence")?;
        let result = {
            let target = &self.find(reference)?.cloud;
            registration_by_correspondence(&target.points, points, &self.registration)?
        };

        let stored = self.find_mut(source)?;
        transform_cloud(&mut stored.cloud, &result.transformation);
        stored.transformation = result.transformation * stored.transformation;
        trace!(transformation = ?result.transformation, "applied registration");

        self.calls.push(HostCall::RegisterByCorrespondence {
            reference: reference.name.clone(),
            source: source.name.clone(),
            points: points.to_vec(),
        });
        Ok(RegistrationSummary {
            transformation: result.transformation,
            fitness: result.fitness,
            rmse: result.inlier_rmse,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use align_core::{PlaneAnchor, PlaneSample};

    fn cloud(points: &[[f64; 3]]) -> PointCloud {
        PointCloud::new(
            points.iter().map(|p| Point3::new(p[0], p[1], p[2])).collect(),
            vec![Vector3::y(); points.len()],
        )
        .unwrap()
    }

    #[test]
    fn test_crop_removes_strictly_below() {
        let mut host = MemoryHost::new();
        let a = host.add_series("A", cloud(&[[0.0, -1.0, 0.0], [0.0, 0.0, 0.0], [0.0, 2.0, 0.0]]));
        let anchor = PlaneAnchor {
            index: 1,
            point: Point3::origin(),
            normal: Vector3::y(),
        };
        let request = CropRequest {
            sample: PlaneSample::PointNormal(anchor),
            normal: Vector3::y(),
        };
        host.cut_points_below_plane(&a, &request).unwrap();

        let kept = host.cloud(&a).unwrap();
        assert_eq!(kept.points, vec![Point3::origin(), Point3::new(0.0, 2.0, 0.0)]);
        assert_eq!(
            host.calls(),
            &[HostCall::CutPointsBelowPlane {
                series: "A".to_string(),
                removed: 1
            }]
        );
    }

    #[test]
    fn test_elements_lifecycle() {
        let mut host = MemoryHost::new();
        let c = host
            .create_circle(&Point3::origin(), &Vector3::y(), 5.0)
            .unwrap();
        let marker = PlaneMarker::PointNormal {
            point: Point3::origin(),
            normal: Vector3::y(),
        };
        let p = host.create_plane(&marker, 1000.0).unwrap();
        assert_ne!(c, p);
        assert_eq!(host.elements().len(), 2);

        host.delete_elements(&[c, p]).unwrap();
        assert!(host.elements().is_empty());
        assert!(matches!(
            host.delete_elements(&[c]),
            Err(HostError::UnknownElement(h)) if h == c
        ));
    }

    #[test]
    fn test_unknown_series() {
        let mut host = MemoryHost::new();
        let ghost = SeriesRef::new(4, "ghost");
        assert!(matches!(host.point_cloud(&ghost), Err(HostError::UnknownSeries(_))));
    }

    #[test]
    fn test_fail_on() {
        let mut host = MemoryHost::new();
        host.fail_on("wait_for_render_sync");
        assert!(host.wait_for_render_sync().is_err());
        assert_eq!(host.render_syncs(), 0);
        host.clear_failure();
        host.wait_for_render_sync().unwrap();
        assert_eq!(host.render_syncs(), 1);
        assert_eq!(host.count_calls("wait_for_render_sync"), 1);
    }
}
