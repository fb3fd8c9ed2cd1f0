//! Per-series driver: find the base plane, crop below it, and register every
//! later series onto the first one through its above-plane points.
//!
//! Each series walks the state machine
//!
//! ```text
//! Loaded -> PlaneFound -> Cropped -> Cleaned                      (reference)
//! Loaded -> PlaneFound -> Cropped -> Partitioned -> Aligned -> Cleaned
//! ```
//!
//! A failure stops the run at the failing series. Temporary markers created
//! for that series are still deleted on a best-effort basis.

use std::fmt;

use align_core::{Error, ErrorKind, OrientedPlane, Partition, PointCloud, Result};
use align_point_cloud::cpu::{partition_points, PlaneOrienter, PlaneSegmenter};
use nalgebra::Vector3;
use tracing::{debug, info, info_span, warn};

use crate::config::AlignConfig;
use crate::crop::CropPlanner;
use crate::host::{ElementHandle, GeometryHost, PlaneMarker, RegistrationSummary, SeriesRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeriesState {
    Loaded,
    PlaneFound,
    Cropped,
    Partitioned,
    Aligned,
    Cleaned,
}

impl SeriesState {
    /// Legal successor check. The reference series skips partitioning and
    /// registration.
    pub fn can_advance_to(self, next: SeriesState, is_reference: bool) -> bool {
        use SeriesState::*;
        matches!(
            (self, next, is_reference),
            (Loaded, PlaneFound, _)
                | (PlaneFound, Cropped, _)
                | (Cropped, Cleaned, true)
                | (Cropped, Partitioned, false)
                | (Partitioned, Aligned, false)
                | (Aligned, Cleaned, false)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == SeriesState::Cleaned
    }
}

impl fmt::Display for SeriesState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SeriesState::Loaded => "Loaded",
            SeriesState::PlaneFound => "PlaneFound",
            SeriesState::Cropped => "Cropped",
            SeriesState::Partitioned => "Partitioned",
            SeriesState::Aligned => "Aligned",
            SeriesState::Cleaned => "Cleaned",
        };
        f.write_str(name)
    }
}

/// Why a run stopped: the series, the last state it reached and the cause.
#[derive(Debug, thiserror::Error)]
#[error("series {series} failed after reaching {state}: {source}")]
pub struct SeriesFailure {
    pub series: SeriesRef,
    /// Position of the series in the processing order.
    pub position: usize,
    pub state: SeriesState,
    #[source]
    pub source: Error,
}

impl SeriesFailure {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AlignError {
    #[error("listing project series failed: {0}")]
    ListSeries(#[source] Error),

    #[error(transparent)]
    Series(#[from] SeriesFailure),
}

impl AlignError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AlignError::ListSeries(e) => e.kind(),
            AlignError::Series(f) => f.kind(),
        }
    }
}

/// What happened to one series during a successful run.
#[derive(Debug, Clone)]
pub struct SeriesOutcome {
    pub series: SeriesRef,
    pub state: SeriesState,
    pub point_count: usize,
    pub plane_points: usize,
    pub normal: Vector3<f64>,
    /// `None` for the reference series.
    pub partition: Option<Partition>,
    pub registration: Option<RegistrationSummary>,
}

impl SeriesOutcome {
    pub fn is_reference(&self) -> bool {
        self.partition.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlignmentReport {
    pub outcomes: Vec<SeriesOutcome>,
}

impl AlignmentReport {
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn reference(&self) -> Option<&SeriesOutcome> {
        self.outcomes.first()
    }

    pub fn registrations(&self) -> impl Iterator<Item = (&SeriesRef, &RegistrationSummary)> {
        self.outcomes
            .iter()
            .filter_map(|o| o.registration.as_ref().map(|r| (&o.series, r)))
    }
}

/// Bookkeeping for the series currently in flight.
struct SeriesRun {
    state: SeriesState,
    is_reference: bool,
    markers: Vec<ElementHandle>,
}

impl SeriesRun {
    fn new(is_reference: bool) -> Self {
        Self {
            state: SeriesState::Loaded,
            is_reference,
            markers: Vec::new(),
        }
    }

    fn advance(&mut self, next: SeriesState) {
        debug_assert!(
            self.state.can_advance_to(next, self.is_reference),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }
}

/// Drives every series of a project through crop and alignment.
pub struct SeriesAligner<H> {
    host: H,
    config: AlignConfig,
    segmenter: PlaneSegmenter,
    orienter: PlaneOrienter,
    planner: CropPlanner,
}

impl<H: GeometryHost> SeriesAligner<H> {
    pub fn new(host: H, config: AlignConfig) -> Self {
        Self {
            host,
            segmenter: PlaneSegmenter::new(config.segmentation.clone()),
            orienter: PlaneOrienter::new(config.up_axis),
            planner: CropPlanner,
            config,
        }
    }

    pub fn config(&self) -> &AlignConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn host_mut(&mut self) -> &mut H {
        &mut self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Process every series the host lists, in host order.
    pub fn run_project(&mut self) -> std::result::Result<AlignmentReport, AlignError> {
        let series = self
            .host
            .list_series()
            .map_err(|e| AlignError::ListSeries(Error::external("list_series", e)))?;
        Ok(self.run(&series)?)
    }

    /// Process `series` in order. The first one is the reference every other
    /// series is registered onto.
    pub fn run(
        &mut self,
        series: &[SeriesRef],
    ) -> std::result::Result<AlignmentReport, SeriesFailure> {
        let mut report = AlignmentReport::default();
        let Some(reference) = series.first() else {
            info!("no series to align");
            return Ok(report);
        };

        info!(count = series.len(), reference = %reference, "aligning series");
        for (position, current) in series.iter().enumerate() {
            let span = info_span!("series", name = %current.name, position);
            let _guard = span.enter();

            let outcome = self.process(position, current, reference)?;
            report.outcomes.push(outcome);
        }
        info!(count = report.len(), "all series aligned");
        Ok(report)
    }

    fn process(
        &mut self,
        position: usize,
        series: &SeriesRef,
        reference: &SeriesRef,
    ) -> std::result::Result<SeriesOutcome, SeriesFailure> {
        let mut run = SeriesRun::new(position == 0);
        match self.drive(&mut run, series, reference) {
            Ok(outcome) => Ok(outcome),
            Err(source) => {
                warn!(state = %run.state, error = %source, "series failed");
                self.release_markers(&mut run.markers);
                Err(SeriesFailure {
                    series: series.clone(),
                    position,
                    state: run.state,
                    source,
                })
            }
        }
    }

    fn drive(
        &mut self,
        run: &mut SeriesRun,
        series: &SeriesRef,
        reference: &SeriesRef,
    ) -> Result<SeriesOutcome> {
        let cloud = self
            .host
            .point_cloud(series)
            .map_err(|e| Error::external("point_cloud", e))?;
        debug!(points = cloud.len(), "loaded series cloud");

        let plane = self.segmenter.segment(&cloud)?;
        let oriented = self.orienter.orient(&cloud, &plane)?;
        run.advance(SeriesState::PlaneFound);
        info!(plane_points = plane.len(), normal = ?oriented.normal, "base plane found");

        self.show_plane(run, &oriented)?;

        let request = self.planner.plan(&oriented);
        self.planner.apply(&mut self.host, series, &request)?;
        self.sync()?;
        run.advance(SeriesState::Cropped);

        let mut outcome = SeriesOutcome {
            series: series.clone(),
            state: run.state,
            point_count: cloud.len(),
            plane_points: plane.len(),
            normal: oriented.normal,
            partition: None,
            registration: None,
        };

        if !run.is_reference {
            let partition = partition_points(&cloud, &plane, &oriented)?;
            run.advance(SeriesState::Partitioned);
            debug!(
                above = partition.above.len(),
                below = partition.below.len(),
                on_plane = partition.on_plane,
                "partitioned non-plane points"
            );

            let summary = self.align(run, &cloud, &partition, series, reference)?;
            run.advance(SeriesState::Aligned);
            info!(fitness = summary.fitness, rmse = summary.rmse, "series registered");

            outcome.partition = Some(partition);
            outcome.registration = Some(summary);
        }

        self.delete(&mut run.markers)?;
        run.advance(SeriesState::Cleaned);
        outcome.state = run.state;
        Ok(outcome)
    }

    fn align(
        &mut self,
        run: &mut SeriesRun,
        cloud: &PointCloud,
        partition: &Partition,
        series: &SeriesRef,
        reference: &SeriesRef,
    ) -> Result<RegistrationSummary> {
        let required = self.config.effective_min_correspondences();
        if partition.above.len() < required {
            return Err(Error::UnderdeterminedAlignment {
                required,
                actual: partition.above.len(),
            });
        }

        let points = cloud.extract_coordinates(&partition.above)?;

        if self.config.markers.enabled {
            let normals = cloud.extract_normals(&partition.above)?;
            let mut circles = Vec::with_capacity(points.len());
            for (point, normal) in points.iter().zip(&normals) {
                let handle = self
                    .host
                    .create_circle(point, normal, self.config.markers.circle_radius)
                    .map_err(|e| Error::external("create_circle", e));
                match handle {
                    Ok(h) => circles.push(h),
                    Err(e) => {
                        run.markers.extend(circles);
                        return Err(e);
                    }
                }
            }
            run.markers.extend(circles);
            self.sync()?;
        }

        let summary = self
            .host
            .register_by_correspondence(reference, series, &points)
            .map_err(|e| Error::external("register_by_correspondence", e))?;
        self.sync()?;
        Ok(summary)
    }

    fn show_plane(&mut self, run: &mut SeriesRun, plane: &OrientedPlane) -> Result<()> {
        if !self.config.markers.enabled {
            return Ok(());
        }
        let marker = PlaneMarker::from(&plane.sample);
        let handle = self
            .host
            .create_plane(&marker, self.config.markers.plane_size)
            .map_err(|e| Error::external("create_plane", e))?;
        run.markers.push(handle);
        self.sync()
    }

    fn sync(&mut self) -> Result<()> {
        self.host
            .wait_for_render_sync()
            .map_err(|e| Error::external("wait_for_render_sync", e))
    }

    fn delete(&mut self, markers: &mut Vec<ElementHandle>) -> Result<()> {
        if markers.is_empty() {
            return Ok(());
        }
        self.host
            .delete_elements(markers)
            .map_err(|e| Error::external("delete_elements", e))?;
        markers.clear();
        Ok(())
    }

    fn release_markers(&mut self, markers: &mut Vec<ElementHandle>) {
        if let Err(e) = self.delete(markers) {
            warn!(count = markers.len(), error = %e, "could not delete temporary markers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_transitions() {
        use SeriesState::*;
        assert!(Loaded.can_advance_to(PlaneFound, true));
        assert!(PlaneFound.can_advance_to(Cropped, true));
        assert!(Cropped.can_advance_to(Cleaned, true));
        assert!(!Cropped.can_advance_to(Partitioned, true));
        assert!(!Partitioned.can_advance_to(Aligned, true));
    }

    #[test]
    fn test_non_reference_transitions() {
        use SeriesState::*;
        assert!(Cropped.can_advance_to(Partitioned, false));
        assert!(Partitioned.can_advance_to(Aligned, false));
        assert!(Aligned.can_advance_to(Cleaned, false));
        assert!(!Cropped.can_advance_to(Cleaned, false));
        assert!(!Loaded.can_advance_to(Cropped, false));
        assert!(!Cleaned.can_advance_to(Loaded, false));
        assert!(Cleaned.is_terminal());
    }

    #[test]
    fn test_failure_reports_kind() {
        let failure = SeriesFailure {
            series: SeriesRef::new(1, "B"),
            position: 1,
            state: SeriesState::Partitioned,
            source: Error::UnderdeterminedAlignment {
                required: 3,
                actual: 2,
            },
        };
        assert_eq!(failure.kind(), ErrorKind::UnderdeterminedAlignment);
        let text = failure.to_string();
        assert!(text.contains("B (#1)"));
        assert!(text.contains("Partitioned"));
    }
}
