use align_core::{ErrorKind, PlaneAnchor, PointCloud};
use nalgebra::{Point3, Vector3};

#[test]
fn test_point_cloud_result_handling() {
    let points = vec![Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0)];

    // 1. Valid normals
    let normals = vec![Vector3::new(0.0, 0.0, 1.0), Vector3::new(0.0, 0.0, 1.0)];
    let cloud = PointCloud::new(points.clone(), normals);
    assert!(cloud.is_ok());

    // 2. Invalid normals (count mismatch)
    let bad_normals = vec![Vector3::new(0.0, 0.0, 1.0)];
    let bad = PointCloud::new(points, bad_normals);
    let err = bad.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidInput);
    assert!(err.to_string().contains("Normal count"));
}

#[test]
fn test_plane_anchor_from_cloud() {
    let cloud = PointCloud::new(
        vec![Point3::new(1.0, 2.0, 3.0), Point3::new(4.0, 5.0, 6.0)],
        vec![Vector3::y(), Vector3::z()],
    )
    .unwrap();

    let anchor = PlaneAnchor::from_cloud(&cloud, 1).unwrap();
    assert_eq!(anchor.index, 1);
    assert_eq!(anchor.point, Point3::new(4.0, 5.0, 6.0));
    assert_eq!(anchor.normal, Vector3::z());

    assert!(PlaneAnchor::from_cloud(&cloud, 2).is_err());
}

#[test]
fn test_empty_cloud() {
    let cloud = PointCloud::default();
    assert!(cloud.is_empty());
    assert_eq!(cloud.len(), 0);
    assert!(cloud.coordinate(0).is_none());
    assert!(cloud.extract_coordinates(&[]).unwrap().is_empty());
}
