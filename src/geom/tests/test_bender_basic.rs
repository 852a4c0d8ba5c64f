use approx::assert_abs_diff_eq;

use super::straight_node;
use crate::geom::{
    BendError, CubicBezierCurve, FillingMode, GeomMesh, MeshBender, Point3, SourceMesh, Spline,
    Tolerance, Vec3, box_mesh,
};

fn ten_long() -> Spline {
    Spline::new(straight_node(0.0), straight_node(10.0))
}

fn box_source() -> SourceMesh {
    SourceMesh::build(&box_mesh([2.0, 1.0, 1.0]))
}

fn flat_source() -> SourceMesh {
    SourceMesh::build(&GeomMesh::new(
        vec![[0.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        vec![0, 1, 2],
    ))
}

#[test]
fn once_stretches_the_source_over_the_path() {
    let spline = ten_long();
    let source = box_source();
    let mut bender = MeshBender::new(source.clone());
    bender.compute(&spline).unwrap();

    let mesh = bender.mesh();
    assert_eq!(mesh.vertex_count(), 24);
    assert_eq!(mesh.indices, source.triangles());
    let tol = Tolerance::new(1e-9);
    for (bent, original) in mesh.positions.iter().zip(source.vertices()) {
        let p = original.position;
        let expected = Point3::new((p.x + 1.0) / 2.0 * 10.0, p.y, p.z);
        assert!(tol.approx_eq_point3(Point3::from(*bent), expected), "{bent:?} vs {expected:?}");
    }
    for (normal, original) in mesh.normals.as_ref().unwrap().iter().zip(source.vertices()) {
        assert!(tol.approx_eq_vec3(Vec3::from(*normal), original.normal));
    }
    assert_eq!(bender.diagnostics().copy_count, 1);
    assert_eq!(bender.diagnostics().path_sample_count, 2);
}

#[test]
fn once_respects_the_interval() {
    let spline = ten_long();
    let mut bender = MeshBender::new(box_source());
    bender.set_interval(2.0, Some(6.0)).unwrap();
    bender.compute(&spline).unwrap();

    let xs: Vec<f64> = bender.mesh().positions.iter().map(|p| p[0]).collect();
    let min = xs.iter().copied().fold(f64::INFINITY, f64::min);
    let max = xs.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert_abs_diff_eq!(min, 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(max, 6.0, epsilon = 1e-9);
}

#[test]
fn bends_along_a_single_curve() {
    let curve = CubicBezierCurve::new(straight_node(0.0), straight_node(10.0));
    let mut bender = MeshBender::new(box_source());
    bender.compute(&curve).unwrap();

    let max = bender
        .mesh()
        .positions
        .iter()
        .map(|p| p[0])
        .fold(f64::NEG_INFINITY, f64::max);
    assert_abs_diff_eq!(max, 10.0, epsilon = 1e-9);
}

#[test]
fn repeat_lays_whole_copies() {
    let spline = ten_long();
    let mut bender = MeshBender::new(box_source());
    bender.set_filling_mode(FillingMode::Repeat);
    bender.compute(&spline).unwrap();

    let mesh = bender.mesh();
    assert_eq!(bender.diagnostics().copy_count, 5);
    assert_eq!(mesh.vertex_count(), 5 * 24);
    assert_eq!(mesh.indices.len(), 5 * 36);
    assert!(mesh.has_valid_indices());

    // each copy indexes only its own vertices
    for (copy, triangles) in mesh.indices.chunks(36).enumerate() {
        let base = (copy * 24) as u32;
        assert!(triangles.iter().all(|&i| i >= base && i < base + 24));
    }

    let tol = Tolerance::new(1e-9);
    let source = box_source();
    for copy in 0..5 {
        for (i, original) in source.vertices().iter().enumerate() {
            let p = original.position;
            let bent = Point3::from(mesh.positions[copy * 24 + i]);
            let expected = Point3::new(p.x + 1.0 + 2.0 * copy as f64, p.y, p.z);
            assert!(tol.approx_eq_point3(bent, expected));
        }
    }
}

#[test]
fn repeat_drops_the_partial_copy() {
    let spline = ten_long();
    let mut bender = MeshBender::new(box_source());
    bender.set_filling_mode(FillingMode::Repeat);
    bender.set_interval(0.0, Some(9.0)).unwrap();
    bender.compute(&spline).unwrap();

    assert_eq!(bender.diagnostics().copy_count, 4);
    assert_eq!(bender.mesh().vertex_count(), 4 * 24);
}

#[test]
fn repeat_with_short_interval_is_empty() {
    let spline = ten_long();
    let mut bender = MeshBender::new(box_source());
    bender.set_filling_mode(FillingMode::Repeat);
    bender.set_interval(0.0, Some(1.5)).unwrap();
    bender.compute(&spline).unwrap();

    assert!(bender.mesh().is_empty());
    assert!(bender.diagnostics().has_warnings());
}

#[test]
fn repeat_refuses_more_copies_than_indices_can_address() {
    let spline = ten_long();
    let sliver = box_source().scale(Vec3::new(1e-9, 1.0, 1.0));
    let mut bender = MeshBender::new(sliver);
    bender.set_filling_mode(FillingMode::Repeat);

    let result = bender.compute(&spline);
    assert!(matches!(
        result,
        Err(BendError::TooManyCopies { vertex_count: 24, .. })
    ));
    assert!(bender.mesh().is_empty());
    assert_eq!(bender.rebuild_count(), 0);
}

#[test]
fn zero_extent_source_collapses_to_the_start() {
    let spline = ten_long();
    let mut bender = MeshBender::new(flat_source());
    bender.set_interval(3.0, None).unwrap();
    bender.compute(&spline).unwrap();

    assert!(bender.diagnostics().has_warnings());
    for p in &bender.mesh().positions {
        assert_abs_diff_eq!(p[0], 3.0, epsilon = 1e-9);
    }

    bender.set_filling_mode(FillingMode::Repeat);
    bender.compute(&spline).unwrap();
    assert!(bender.mesh().is_empty());
    assert!(bender.diagnostics().has_warnings());
}

#[test]
fn malformed_interval_is_rejected_on_set() {
    let mut bender = MeshBender::new(box_source());
    assert_eq!(
        bender.set_interval(-1.0, None),
        Err(BendError::InvalidInterval {
            start: -1.0,
            end: None,
            length: None,
        })
    );
    assert!(bender.set_interval(4.0, Some(4.0)).is_err());
    assert!(bender.set_interval(f64::NAN, None).is_err());
    assert_eq!(bender.interval().start, 0.0);
}

#[test]
fn interval_past_the_path_end_fails_on_compute() {
    let spline = ten_long();
    let mut bender = MeshBender::new(box_source());
    bender.set_interval(5.0, Some(20.0)).unwrap();

    let err = bender.compute(&spline).unwrap_err();
    assert!(matches!(
        err,
        BendError::InvalidInterval {
            length: Some(l),
            ..
        } if (l - 10.0).abs() < 1e-9
    ));

    bender.set_interval(12.0, None).unwrap();
    assert!(bender.compute(&spline).is_err());
}

#[test]
fn missing_source_fails() {
    let spline = ten_long();
    let mut bender = MeshBender::default();
    assert_eq!(bender.compute_if_needed(&spline), Err(BendError::MissingSource));
}

#[test]
fn rebuilds_only_when_something_changed() {
    let mut spline = ten_long();
    let mut bender = MeshBender::new(box_source());

    assert!(bender.compute_if_needed(&spline).unwrap());
    assert!(!bender.compute_if_needed(&spline).unwrap());
    assert_eq!(bender.rebuild_count(), 1);

    bender.set_filling_mode(FillingMode::Once);
    assert!(!bender.is_dirty(&spline));

    spline.set_node_position(1, Point3::new(12.0, 0.0, 0.0)).unwrap();
    spline.set_node_direction(1, Point3::new(13.0, 0.0, 0.0)).unwrap();
    assert!(bender.is_dirty(&spline));
    assert!(bender.compute_if_needed(&spline).unwrap());
    assert_eq!(bender.rebuild_count(), 2);

    let max = bender
        .mesh()
        .positions
        .iter()
        .map(|p| p[0])
        .fold(f64::NEG_INFINITY, f64::max);
    assert_abs_diff_eq!(max, 12.0, epsilon = 1e-9);

    bender.request_rebuild();
    assert!(bender.compute_if_needed(&spline).unwrap());
    assert_eq!(bender.rebuild_count(), 3);
}

#[test]
fn mirrored_source_is_reported() {
    let spline = ten_long();
    let mut bender = MeshBender::new(box_source().scale(Vec3::new(1.0, 1.0, -1.0)));
    bender.compute(&spline).unwrap();

    assert!(bender.diagnostics().winding_reversed);
    assert_eq!(bender.mesh().triangle_count(), 12);
    assert!(bender.diagnostics().summary().contains("reversed"));
}
