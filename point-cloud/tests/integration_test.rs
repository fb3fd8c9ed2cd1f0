/// Integration tests for the point-cloud crate
/// Runs segmentation, orientation and partitioning together on synthetic scans
use align_core::{PointCloud, UpAxis};
use align_point_cloud::cpu::{partition_points, PlaneOrienter, PlaneSegmenter};
use align_point_cloud::SegmentationConfig;
use nalgebra::{Point3, Vector3};

/// Base plate on y = 2 (spacing 5), a box standing on it and a few stray
/// points underneath the plate.
fn synthetic_scan() -> PointCloud {
    let mut points = Vec::new();
    for i in 0..12 {
        for j in 0..12 {
            points.push(Point3::new(i as f64 * 5.0, 2.0, j as f64 * 5.0));
        }
    }
    for i in 0..4 {
        for j in 0..4 {
            for h in 1..4 {
                points.push(Point3::new(
                    20.0 + i as f64 * 3.0,
                    2.0 + h as f64 * 6.0,
                    20.0 + j as f64 * 3.0,
                ));
            }
        }
    }
    for k in 0..7 {
        points.push(Point3::new(k as f64 * 8.0, -10.0 - k as f64, 13.0));
    }
    let n = points.len();
    PointCloud::new(points, vec![Vector3::y(); n]).unwrap()
}

#[test]
fn test_partition_is_disjoint_and_complete() {
    let pc = synthetic_scan();
    let plane = PlaneSegmenter::new(SegmentationConfig::default())
        .segment(&pc)
        .unwrap();
    assert_eq!(plane.len(), 144);

    let oriented = PlaneOrienter::new(UpAxis::Y).orient(&pc, &plane).unwrap();
    let part = partition_points(&pc, &plane, &oriented).unwrap();

    assert!(part.is_disjoint());
    assert_eq!(part.on_plane, 0);
    assert_eq!(part.above.len(), 48);
    assert_eq!(part.below.len(), 7);

    let mut all: Vec<usize> = plane
        .iter()
        .chain(part.above.iter())
        .chain(part.below.iter())
        .copied()
        .collect();
    all.sort_unstable();
    assert_eq!(all, (0..pc.len()).collect::<Vec<_>>());
    for i in &plane {
        assert!(!part.above.contains(i) && !part.below.contains(i));
    }
}

#[test]
fn test_partition_after_crop_has_no_below() {
    let mut pc = synthetic_scan();
    let segmenter = PlaneSegmenter::new(SegmentationConfig::default());
    let orienter = PlaneOrienter::new(UpAxis::Y);

    let plane = segmenter.segment(&pc).unwrap();
    let oriented = orienter.orient(&pc, &plane).unwrap();
    let removed = pc.retain(|p, _| oriented.signed_distance(p) >= 0.0);
    assert_eq!(removed, 7);

    let plane = segmenter.segment(&pc).unwrap();
    let oriented = orienter.orient(&pc, &plane).unwrap();
    let part = partition_points(&pc, &plane, &oriented).unwrap();
    assert!(part.below.is_empty());
    assert_eq!(part.above.len(), 48);
}

#[test]
fn test_four_coplanar_points_split_fifth_and_sixth() {
    let points = vec![
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(10.0, 0.0, 0.0),
        Point3::new(10.0, 0.0, 10.0),
        Point3::new(0.0, 0.0, 10.0),
        Point3::new(5.0, 5.0, 5.0),
        Point3::new(5.0, -5.0, 5.0),
    ];
    let pc = PointCloud::new(points, vec![Vector3::y(); 6]).unwrap();
    let plane = vec![0, 1, 2, 3];

    let oriented = PlaneOrienter::new(UpAxis::Y).orient(&pc, &plane).unwrap();
    assert!((oriented.normal - Vector3::y()).norm() < 1e-12);

    let part = partition_points(&pc, &plane, &oriented).unwrap();
    assert_eq!(part.above, vec![4]);
    assert_eq!(part.below, vec![5]);
}

#[test]
fn test_segmentation_returns_subset_of_indices() {
    let points: Vec<Point3<f64>> = (0..30)
        .map(|i| {
            let t = i as f64;
            Point3::new(t.sin() * 20.0, t.cos() * 3.0, t * 1.5)
        })
        .collect();
    let pc = PointCloud::new(points, vec![Vector3::z(); 30]).unwrap();
    let plane = PlaneSegmenter::new(SegmentationConfig::default())
        .segment(&pc)
        .unwrap();
    assert!(!plane.is_empty());
    assert!(plane.iter().all(|&i| i < pc.len()));
    assert!(plane.windows(2).all(|w| w[0] < w[1]));
}
