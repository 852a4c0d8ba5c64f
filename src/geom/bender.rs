//! Deforms a source mesh along a curve or a spline interval.

use std::collections::HashMap;

use super::curve::{CurveError, PathInterval, Revision, SamplePath};
use super::diagnostics::GeomMeshDiagnostics;
use super::mesh::GeomMesh;
use super::metrics::{GeomMetrics, TimingBucket};
use super::sample::{CurveSample, MeshVertex};
use super::source_mesh::SourceMesh;
use super::Tolerance;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum BendError {
    #[error("mesh bender has no source mesh")]
    MissingSource,
    #[error("invalid interval start {start}, end {end:?} (path length {length:?})")]
    InvalidInterval {
        start: f64,
        end: Option<f64>,
        length: Option<f64>,
    },
    #[error("{copies} copies of a {vertex_count}-vertex source do not fit in u32 indices")]
    TooManyCopies { copies: usize, vertex_count: usize },
    #[error(transparent)]
    Curve(#[from] CurveError),
}

/// How the source is laid along the interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FillingMode {
    /// One copy stretched to cover the whole interval.
    #[default]
    Once,
    /// As many whole copies at natural length as fit in the interval.
    Repeat,
}

/// Mesh bender with a {clean, dirty} rebuild state.
///
/// Setters only mark the bender dirty; [`compute_if_needed`](Self::compute_if_needed)
/// rebuilds once per batch of changes, including changes of the path itself
/// (detected through its revision stamp).
#[derive(Debug, Clone, Default)]
pub struct MeshBender {
    source: Option<SourceMesh>,
    interval: PathInterval,
    mode: FillingMode,
    dirty: bool,
    built_from: Option<Revision>,
    mesh: GeomMesh,
    diagnostics: GeomMeshDiagnostics,
    rebuild_count: u64,
}

impl MeshBender {
    #[must_use]
    pub fn new(source: SourceMesh) -> Self {
        Self {
            source: Some(source),
            dirty: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn source(&self) -> Option<&SourceMesh> {
        self.source.as_ref()
    }

    pub fn set_source(&mut self, source: SourceMesh) {
        if self.source.as_ref() != Some(&source) {
            self.source = Some(source);
            self.dirty = true;
        }
    }

    #[must_use]
    pub const fn interval(&self) -> PathInterval {
        self.interval
    }

    /// Restrict bending to `[start, end]`; `end: None` follows the path end.
    ///
    /// Bounds are checked against the path length again at compute time.
    pub fn set_interval(&mut self, start: f64, end: Option<f64>) -> Result<(), BendError> {
        let interval = PathInterval::new(start, end);
        if !interval.is_well_formed() {
            return Err(BendError::InvalidInterval {
                start,
                end,
                length: None,
            });
        }
        if self.interval != interval {
            self.interval = interval;
            self.dirty = true;
        }
        Ok(())
    }

    #[must_use]
    pub const fn filling_mode(&self) -> FillingMode {
        self.mode
    }

    pub fn set_filling_mode(&mut self, mode: FillingMode) {
        if self.mode != mode {
            self.mode = mode;
            self.dirty = true;
        }
    }

    /// Force the next [`compute_if_needed`](Self::compute_if_needed) to rebuild.
    pub fn request_rebuild(&mut self) {
        self.dirty = true;
    }

    #[must_use]
    pub fn is_dirty<P: SamplePath + ?Sized>(&self, path: &P) -> bool {
        self.dirty || self.built_from != Some(path.revision())
    }

    /// Rebuild if anything changed since the last build. Returns whether a
    /// rebuild happened.
    pub fn compute_if_needed<P: SamplePath + ?Sized>(&mut self, path: &P) -> Result<bool, BendError> {
        if !self.is_dirty(path) {
            return Ok(false);
        }
        self.compute(path)?;
        Ok(true)
    }

    /// Rebuild unconditionally.
    pub fn compute<P: SamplePath + ?Sized>(&mut self, path: &P) -> Result<(), BendError> {
        let source = self.source.as_ref().ok_or(BendError::MissingSource)?;
        let length = path.length();
        let (start, end) =
            self.interval
                .resolve(length)
                .ok_or(BendError::InvalidInterval {
                    start: self.interval.start,
                    end: self.interval.end,
                    length: Some(length),
                })?;

        let mut metrics = GeomMetrics::default();
        metrics.begin();
        let mut diagnostics = GeomMeshDiagnostics {
            winding_reversed: source.is_mirrored(),
            ..GeomMeshDiagnostics::default()
        };

        let (vertices, triangles) = match self.mode {
            FillingMode::Once => fill_once(source, path, start, end, &mut metrics, &mut diagnostics)?,
            FillingMode::Repeat => fill_repeat(source, path, start, end, &mut metrics, &mut diagnostics)?,
        };

        let mesh = GeomMesh::from_vertices(&vertices, triangles);
        let topology = mesh.diagnose(&mut metrics);
        diagnostics.vertex_count = topology.vertex_count;
        diagnostics.triangle_count = topology.triangle_count;
        diagnostics.degenerate_triangle_count = topology.degenerate_triangle_count;
        diagnostics.open_edge_count = topology.open_edge_count;
        diagnostics.non_manifold_edge_count = topology.non_manifold_edge_count;
        diagnostics.timing = metrics.end();

        self.rebuild_count += 1;
        log::debug!(
            "mesh bender rebuild #{} ({:?}, [{start:.4}, {end:.4}]): {}",
            self.rebuild_count,
            self.mode,
            diagnostics.summary()
        );

        self.mesh = mesh;
        self.diagnostics = diagnostics;
        self.dirty = false;
        self.built_from = Some(path.revision());
        Ok(())
    }

    #[must_use]
    pub fn mesh(&self) -> &GeomMesh {
        &self.mesh
    }

    #[must_use]
    pub fn diagnostics(&self) -> &GeomMeshDiagnostics {
        &self.diagnostics
    }

    /// Number of rebuilds performed so far.
    #[must_use]
    pub const fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }
}

/// Path samples keyed by distance, so vertices sharing a bend coordinate
/// sample the path once.
struct SampleCache<'a, P: SamplePath + ?Sized> {
    path: &'a P,
    samples: HashMap<u64, CurveSample>,
}

impl<'a, P: SamplePath + ?Sized> SampleCache<'a, P> {
    fn new(path: &'a P) -> Self {
        Self {
            path,
            samples: HashMap::new(),
        }
    }

    fn get(&mut self, distance: f64) -> Result<CurveSample, CurveError> {
        if let Some(sample) = self.samples.get(&distance.to_bits()) {
            return Ok(*sample);
        }
        let sample = self.path.sample_at_distance(distance)?;
        self.samples.insert(distance.to_bits(), sample);
        Ok(sample)
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

fn fill_once<P: SamplePath + ?Sized>(
    source: &SourceMesh,
    path: &P,
    start: f64,
    end: f64,
    metrics: &mut GeomMetrics,
    diagnostics: &mut GeomMeshDiagnostics,
) -> Result<(Vec<MeshVertex>, Vec<u32>), BendError> {
    if source.length() <= 0.0 {
        log::warn!("source mesh has zero extent along X, every vertex bends at the interval start");
        diagnostics.add_warning("source mesh has zero extent along X");
    }

    let span = end - start;
    let mut cache = SampleCache::new(path);
    let mut vertices = Vec::with_capacity(source.vertices().len());
    for vertex in source.vertices() {
        let rate = if source.length() > 0.0 {
            (vertex.position.x - source.min_x()).abs() / source.length()
        } else {
            0.0
        };
        let distance = (start + rate * span).min(end);
        let sample = metrics.time(TimingBucket::CurveSampling, || cache.get(distance))?;
        vertices.push(metrics.time(TimingBucket::Bending, || sample.get_bent(vertex)));
    }

    diagnostics.path_sample_count = cache.len();
    diagnostics.copy_count = 1;
    Ok((vertices, source.triangles().to_vec()))
}

fn fill_repeat<P: SamplePath + ?Sized>(
    source: &SourceMesh,
    path: &P,
    start: f64,
    end: f64,
    metrics: &mut GeomMetrics,
    diagnostics: &mut GeomMeshDiagnostics,
) -> Result<(Vec<MeshVertex>, Vec<u32>), BendError> {
    let extent = source.length();
    if extent <= 0.0 {
        log::warn!("source mesh has zero extent along X, nothing to repeat");
        diagnostics.add_warning("source mesh has zero extent along X");
        return Ok((Vec::new(), Vec::new()));
    }

    let span = end - start;
    let copies = ((span + Tolerance::LOOSE.eps) / extent).floor() as usize;
    if copies == 0 {
        log::warn!("interval of length {span} is shorter than the source extent {extent}");
        diagnostics.add_warning("interval is shorter than the source mesh");
        return Ok((Vec::new(), Vec::new()));
    }

    let vertex_count = source.vertices().len();
    let fits = copies
        .checked_mul(vertex_count)
        .is_some_and(|total| u32::try_from(total).is_ok());
    if !fits {
        return Err(BendError::TooManyCopies {
            copies,
            vertex_count,
        });
    }

    let mut cache = SampleCache::new(path);
    let mut vertices = Vec::with_capacity(vertex_count * copies);
    let mut triangles = Vec::with_capacity(source.triangles().len() * copies);

    for copy in 0..copies {
        let offset = copy as f64 * extent;
        for vertex in source.vertices() {
            let distance = (start + vertex.position.x - source.min_x() + offset).min(end);
            let sample = metrics.time(TimingBucket::CurveSampling, || cache.get(distance))?;
            vertices.push(metrics.time(TimingBucket::Bending, || sample.get_bent(vertex)));
        }
        let base = (copy * vertex_count) as u32;
        triangles.extend(source.triangles().iter().map(|i| i + base));
    }

    diagnostics.path_sample_count = cache.len();
    diagnostics.copy_count = copies;
    Ok((vertices, triangles))
}
