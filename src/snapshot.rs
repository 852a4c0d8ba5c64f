//! Golden snapshot text for generated meshes.
//!
//! Floats are quantised to [`SNAPSHOT_QUANTIZE`] and printed with a fixed
//! number of decimals, so snapshots are stable across platforms and small
//! floating-point drift.

use std::fmt::Write as _;

use crate::geom::{GeomMesh, GeomMeshDiagnostics};

pub const SNAPSHOT_QUANTIZE: f64 = 1e-6;
pub const SNAPSHOT_DECIMALS: usize = 6;

/// Full snapshot for one operation: header, diagnostics, then the mesh.
///
/// Returns an error if the mesh buffers are inconsistent.
pub fn mesh_snapshot(op: &str, mesh: &GeomMesh, diag: &GeomMeshDiagnostics) -> Result<String, String> {
    mesh.validate()?;
    let mut out = String::new();
    let _ = writeln!(out, "# spline-engine golden v1");
    let _ = writeln!(out, "op {op}");
    let _ = writeln!(out, "quantize {SNAPSHOT_QUANTIZE:.1e}");
    write_diagnostics(&mut out, diag);
    write_mesh(&mut out, mesh);
    Ok(normalize_snapshot_text(&out))
}

/// Unix line endings and exactly one trailing newline.
#[must_use]
pub fn normalize_snapshot_text(text: &str) -> String {
    let normalized = text.replace("\r\n", "\n");
    if normalized.ends_with('\n') {
        normalized
    } else {
        format!("{normalized}\n")
    }
}

#[must_use]
pub fn quantize_f64(value: f64) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let value = if value == -0.0 { 0.0 } else { value };
    let q = (value / SNAPSHOT_QUANTIZE).round() * SNAPSHOT_QUANTIZE;
    if q == -0.0 { 0.0 } else { q }
}

fn write_f64(out: &mut String, value: f64) {
    let value = quantize_f64(value);
    let _ = write!(out, "{value:.SNAPSHOT_DECIMALS$}");
}

fn write_vec3_line(out: &mut String, prefix: &str, v: [f64; 3]) {
    let _ = write!(out, "{prefix} ");
    write_f64(out, v[0]);
    out.push(' ');
    write_f64(out, v[1]);
    out.push(' ');
    write_f64(out, v[2]);
    out.push('\n');
}

fn write_vec2_line(out: &mut String, prefix: &str, v: [f64; 2]) {
    let _ = write!(out, "{prefix} ");
    write_f64(out, v[0]);
    out.push(' ');
    write_f64(out, v[1]);
    out.push('\n');
}

fn write_diagnostics(out: &mut String, diag: &GeomMeshDiagnostics) {
    let _ = writeln!(out, "mesh_diag.vertex_count {}", diag.vertex_count);
    let _ = writeln!(out, "mesh_diag.triangle_count {}", diag.triangle_count);
    let _ = writeln!(out, "mesh_diag.path_sample_count {}", diag.path_sample_count);
    let _ = writeln!(out, "mesh_diag.copy_count {}", diag.copy_count);
    let _ = writeln!(out, "mesh_diag.winding_reversed {}", diag.winding_reversed);
    let _ = writeln!(
        out,
        "mesh_diag.degenerate_triangle_count {}",
        diag.degenerate_triangle_count
    );
    let _ = writeln!(out, "mesh_diag.open_edge_count {}", diag.open_edge_count);
    let _ = writeln!(
        out,
        "mesh_diag.non_manifold_edge_count {}",
        diag.non_manifold_edge_count
    );
    let _ = writeln!(out, "mesh_diag.warning_count {}", diag.warnings.len());
    for (idx, warning) in diag.warnings.iter().enumerate() {
        let _ = writeln!(out, "mesh_diag.warning.{idx} {warning}");
    }
}

fn write_mesh(out: &mut String, mesh: &GeomMesh) {
    let _ = writeln!(out, "mesh.vertex_count {}", mesh.positions.len());
    let _ = writeln!(out, "mesh.triangle_count {}", mesh.indices.len() / 3);
    let _ = writeln!(out, "mesh.has_uvs {}", mesh.uvs.is_some());
    let _ = writeln!(out, "mesh.has_normals {}", mesh.normals.is_some());

    let _ = writeln!(out, "mesh.positions {}", mesh.positions.len());
    for p in mesh.positions.iter().copied() {
        write_vec3_line(out, "p", p);
    }

    let _ = writeln!(out, "mesh.indices {}", mesh.indices.len());
    for tri in mesh.indices.chunks_exact(3) {
        let _ = writeln!(out, "i {} {} {}", tri[0], tri[1], tri[2]);
    }

    if let Some(uvs) = mesh.uvs.as_ref() {
        let _ = writeln!(out, "mesh.uvs {}", uvs.len());
        for uv in uvs.iter().copied() {
            write_vec2_line(out, "uv", uv);
        }
    } else {
        let _ = writeln!(out, "mesh.uvs none");
    }

    if let Some(normals) = mesh.normals.as_ref() {
        let _ = writeln!(out, "mesh.normals {}", normals.len());
        for n in normals.iter().copied() {
            write_vec3_line(out, "n", n);
        }
    } else {
        let _ = writeln!(out, "mesh.normals none");
    }
}
