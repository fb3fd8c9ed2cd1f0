//! Above/below partitioning of the points that are not on the plane.

use align_core::{Error, OrientedPlane, Partition, PointCloud, Result, Side};
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use tracing::debug;

/// Classify every non-plane point of `cloud` by the sign of
/// `dot(point - anchor, normal)`. Points with an exactly-zero product are
/// counted in `on_plane` and belong to neither side. A non-finite product
/// is an `InvalidInput` error.
pub fn partition_by_normal(
    cloud: &PointCloud,
    plane: &[usize],
    normal: &Vector3<f64>,
    anchor: &Point3<f64>,
) -> Result<Partition> {
    cloud.check_indices(plane)?;

    let mut in_plane = vec![false; cloud.len()];
    for &i in plane {
        in_plane[i] = true;
    }

    let signed: Vec<Option<f64>> = cloud
        .points
        .par_iter()
        .zip(in_plane.par_iter())
        .map(|(p, &skip)| (!skip).then(|| (p - anchor).dot(normal)))
        .collect();

    let mut partition = Partition::default();
    for (index, value) in signed.into_iter().enumerate() {
        let Some(value) = value else {
            continue;
        };
        if !value.is_finite() {
            return Err(Error::InvalidInput(format!(
                "Point {} has a non-finite distance to the plane",
                index
            )));
        }
        match Side::from_signed(value) {
            Some(Side::Above) => partition.above.push(index),
            Some(Side::Below) => partition.below.push(index),
            None => partition.on_plane += 1,
        }
    }

    if partition.on_plane > 0 {
        debug!(
            count = partition.on_plane,
            "points exactly on the plane left unclassified"
        );
    }

    Ok(partition)
}

/// Partition against an oriented plane, anchored at its first sampled point.
pub fn partition_points(
    cloud: &PointCloud,
    plane: &[usize],
    oriented: &OrientedPlane,
) -> Result<Partition> {
    partition_by_normal(cloud, plane, &oriented.normal, &oriented.anchor())
}
