use spline_engine::geom::{ExtrusionSegment, Point3, ProfileVertex, Spline, SplineNode};
use spline_engine::snapshot::{mesh_snapshot, normalize_snapshot_text};

use std::path::{Path, PathBuf};

fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("golden")
}

fn fixture_path(name: &str) -> PathBuf {
    fixtures_dir().join(name)
}

fn assert_or_update_fixture(name: &str, actual: &str) {
    let path = fixture_path(name);
    let actual = normalize_snapshot_text(actual);

    if std::env::var_os("SPLINE_UPDATE_GOLDENS").is_some() {
        std::fs::create_dir_all(fixtures_dir()).expect("create fixtures dir");
        std::fs::write(&path, actual).expect("write golden fixture");
        return;
    }

    let expected = std::fs::read_to_string(&path)
        .unwrap_or_else(|err| panic!("missing fixture `{}`: {err}", path.display()));
    let expected = normalize_snapshot_text(&expected);

    assert_eq!(
        actual, expected,
        "golden mismatch for `{name}` (set SPLINE_UPDATE_GOLDENS=1 to update)"
    );
}

fn straight_spline(length: f64) -> Spline {
    Spline::new(
        SplineNode::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)),
        SplineNode::new(Point3::new(length, 0.0, 0.0), Point3::new(length + 1.0, 0.0, 0.0)),
    )
}

#[test]
fn golden_extrude_triangle_coarse() {
    let spline = straight_spline(10.0);
    let mut segment = ExtrusionSegment::new(ProfileVertex::default_shape());
    segment.set_sample_spacing(5.0).expect("valid spacing");
    segment.compute(&spline).expect("extrusion should succeed");

    let diag = segment.diagnostics();
    assert_eq!(diag.path_sample_count, 3);
    assert_eq!(diag.open_edge_count, 6);
    assert_eq!(diag.non_manifold_edge_count, 0);

    let snap = mesh_snapshot("extrude_triangle_coarse", segment.mesh(), diag)
        .expect("consistent mesh buffers");
    assert_or_update_fixture("extrude_triangle_coarse.snap", &snap);
}

#[test]
fn snapshots_are_deterministic() {
    let spline = Spline::default();
    let build = || {
        let mut segment = ExtrusionSegment::new(ProfileVertex::default_shape());
        segment.compute(&spline).expect("extrusion should succeed");
        mesh_snapshot("default_spline", segment.mesh(), segment.diagnostics())
            .expect("consistent mesh buffers")
    };
    assert_eq!(build(), build());
}
