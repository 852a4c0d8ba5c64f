//! Mesh diagnostics for bent and extruded meshes.
//!
//! Every rebuild produces a [`GeomMeshDiagnostics`] next to the mesh. Hosts can
//! use it to spot degenerate output (collapsed rings, zero-extent sources) and
//! to check the topology of extrusion tubes.
//!
//! ```ignore
//! use spline_engine::geom::ExtrusionSegment;
//!
//! segment.compute_if_needed(&spline)?;
//! let diagnostics = segment.diagnostics();
//! if !diagnostics.is_manifold() {
//!     eprintln!("{}", diagnostics);
//! }
//! ```

use std::fmt;

use super::metrics::GeomTimingReport;

/// Topology and quality report for a generated mesh.
///
/// - `open_edge_count`: edges with a single adjacent triangle. An open tube has
///   two boundary rings, so an extrusion with an `n`-vertex profile reports `2n`.
/// - `non_manifold_edge_count`: edges shared by more than two triangles.
/// - `degenerate_triangle_count`: zero-area triangles (kept, only counted).
#[derive(Debug, Default, Clone, PartialEq)]
pub struct GeomMeshDiagnostics {
    pub vertex_count: usize,
    pub triangle_count: usize,

    /// Extrusion rings, or distinct bend distances sampled by the bender.
    pub path_sample_count: usize,

    /// Source copies laid along the path; zero for extrusions.
    pub copy_count: usize,

    /// Set when a mirroring source scale flipped the triangle winding.
    pub winding_reversed: bool,

    pub degenerate_triangle_count: usize,
    pub open_edge_count: usize,
    pub non_manifold_edge_count: usize,

    /// Per-phase rebuild timings, present only with `mesh_engine_metrics` on
    /// native targets.
    pub timing: Option<GeomTimingReport>,

    /// e.g. "source mesh has zero extent along X".
    pub warnings: Vec<String>,
}

impl GeomMeshDiagnostics {
    #[must_use]
    pub fn is_watertight(&self) -> bool {
        self.open_edge_count == 0
    }

    #[must_use]
    pub fn is_manifold(&self) -> bool {
        self.non_manifold_edge_count == 0
    }

    /// Manifold, free of zero-area triangles and without warnings. Open edges
    /// are expected on tubes and do not count against it.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.is_manifold() && self.degenerate_triangle_count == 0 && !self.has_warnings()
    }

    #[must_use]
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        self.warnings.push(warning.into());
    }

    /// Fold the report of another generator into this one, for a mesh built by
    /// appending both outputs. Timing is left alone.
    pub fn merge(&mut self, other: &GeomMeshDiagnostics) {
        let GeomMeshDiagnostics {
            vertex_count,
            triangle_count,
            path_sample_count,
            copy_count,
            winding_reversed,
            degenerate_triangle_count,
            open_edge_count,
            non_manifold_edge_count,
            timing: _,
            warnings,
        } = other;

        self.vertex_count += vertex_count;
        self.triangle_count += triangle_count;
        self.path_sample_count += path_sample_count;
        self.copy_count += copy_count;
        self.winding_reversed |= winding_reversed;
        self.degenerate_triangle_count += degenerate_triangle_count;
        self.open_edge_count += open_edge_count;
        self.non_manifold_edge_count += non_manifold_edge_count;
        self.warnings.extend_from_slice(warnings);
    }

    /// One-line form for log output, e.g. `V:303 T:600 samples:101 open:6`.
    /// Zero counts are left out.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut out = format!("V:{} T:{}", self.vertex_count, self.triangle_count);
        let counters = [
            ("samples", self.path_sample_count),
            ("copies", if self.copy_count > 1 { self.copy_count } else { 0 }),
            ("degenerate", self.degenerate_triangle_count),
            ("open", self.open_edge_count),
            ("non-manifold", self.non_manifold_edge_count),
            ("warnings", self.warnings.len()),
        ];
        for (label, count) in counters {
            if count > 0 {
                out.push_str(&format!(" {label}:{count}"));
            }
        }
        if self.winding_reversed {
            out.push_str(" reversed");
        }
        out
    }
}

impl fmt::Display for GeomMeshDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_clean() { "clean" } else { "needs attention" };
        writeln!(f, "mesh ({state})")?;
        writeln!(
            f,
            "  {} vertices, {} triangles, {} path samples",
            self.vertex_count, self.triangle_count, self.path_sample_count
        )?;
        if self.copy_count > 0 {
            writeln!(f, "  {} source copies", self.copy_count)?;
        }
        if self.winding_reversed {
            writeln!(f, "  winding reversed by a mirroring scale")?;
        }
        writeln!(
            f,
            "  edges: {} open, {} non-manifold; degenerate triangles: {}",
            self.open_edge_count, self.non_manifold_edge_count, self.degenerate_triangle_count
        )?;
        for warning in &self.warnings {
            writeln!(f, "  warning: {warning}")?;
        }
        if let Some(timing) = &self.timing {
            writeln!(f, "  rebuilt in {:.3} ms", timing.total_ms())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_tube_is_clean_but_not_watertight() {
        let tube = GeomMeshDiagnostics {
            open_edge_count: 6,
            ..Default::default()
        };
        assert!(!tube.is_watertight());
        assert!(tube.is_clean());

        let mut warned = tube.clone();
        warned.add_warning("interval is shorter than the source mesh");
        assert!(!warned.is_clean());
    }

    #[test]
    fn test_merge_sums_counts_and_keeps_warnings() {
        let mut extrusion = GeomMeshDiagnostics {
            vertex_count: 303,
            triangle_count: 600,
            path_sample_count: 101,
            open_edge_count: 6,
            ..Default::default()
        };
        let bend = GeomMeshDiagnostics {
            vertex_count: 120,
            triangle_count: 60,
            path_sample_count: 10,
            copy_count: 5,
            open_edge_count: 120,
            winding_reversed: true,
            warnings: vec!["source mesh has zero extent along X".to_string()],
            ..Default::default()
        };

        extrusion.merge(&bend);

        assert_eq!(extrusion.vertex_count, 423);
        assert_eq!(extrusion.triangle_count, 660);
        assert_eq!(extrusion.path_sample_count, 111);
        assert_eq!(extrusion.copy_count, 5);
        assert_eq!(extrusion.open_edge_count, 126);
        assert!(extrusion.winding_reversed);
        assert_eq!(extrusion.warnings.len(), 1);
    }

    #[test]
    fn test_summary_skips_zero_counts() {
        let diag = GeomMeshDiagnostics {
            vertex_count: 303,
            triangle_count: 600,
            path_sample_count: 101,
            open_edge_count: 6,
            ..Default::default()
        };
        assert_eq!(diag.summary(), "V:303 T:600 samples:101 open:6");

        let once = GeomMeshDiagnostics {
            copy_count: 1,
            winding_reversed: true,
            ..Default::default()
        };
        assert_eq!(once.summary(), "V:0 T:0 reversed");
    }

    #[test]
    fn test_display_lists_problems() {
        let diag = GeomMeshDiagnostics {
            vertex_count: 100,
            triangle_count: 50,
            degenerate_triangle_count: 2,
            warnings: vec!["ring collapsed".to_string()],
            ..Default::default()
        };

        let output = diag.to_string();
        assert!(output.starts_with("mesh (needs attention)"));
        assert!(output.contains("100 vertices, 50 triangles"));
        assert!(output.contains("degenerate triangles: 2"));
        assert!(output.contains("warning: ring collapsed"));
    }
}
