use super::curve::{CurveError, PathInterval, Revision, SamplePath};
use super::diagnostics::GeomMeshDiagnostics;
use super::mesh::GeomMesh;
use super::metrics::{GeomMetrics, TimingBucket};
use super::sample::{CurveSample, MeshVertex};
use super::{Point3, Tolerance, Vec2, Vec3};

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ExtrusionError {
    #[error("sample spacing must be greater than 0 (was {spacing})")]
    NonPositiveSampleSpacing { spacing: f64 },
    #[error("sample spacing must be finite")]
    NonFiniteSampleSpacing,
    #[error("extrusion shape has no vertices")]
    EmptyShape,
    #[error("invalid interval start {start}, end {end:?} (path length {length:?})")]
    InvalidInterval {
        start: f64,
        end: Option<f64>,
        length: Option<f64>,
    },
    #[error(transparent)]
    Curve(#[from] CurveError),
}

/// One vertex of a 2D cross-section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileVertex {
    pub point: Vec2,
    pub normal: Vec2,
    /// Texture U coordinate.
    pub u: f64,
}

impl ProfileVertex {
    #[must_use]
    pub const fn new(point: Vec2, normal: Vec2, u: f64) -> Self {
        Self { point, normal, u }
    }

    /// Local vertex for the bend frame; profile X maps to local -Z.
    fn to_local(self, v: f64) -> MeshVertex {
        MeshVertex::new(
            Point3::new(0.0, self.point.y, -self.point.x),
            Vec3::new(0.0, self.normal.y, -self.normal.x),
            Vec2::new(self.u, v),
        )
    }
}

/// Sweeps a closed 2D profile along a curve or spline interval into a tube.
///
/// Rings are placed every `sample_spacing` along the interval, plus one ring
/// exactly at the end. Consecutive rings are joined by a quad strip that wraps
/// from the last profile vertex back to the first.
#[derive(Debug, Clone)]
pub struct ExtrusionSegment {
    shape: Vec<ProfileVertex>,
    sample_spacing: f64,
    texture_scale: f64,
    texture_offset: f64,
    interval: PathInterval,
    dirty: bool,
    built_from: Option<Revision>,
    mesh: GeomMesh,
    diagnostics: GeomMeshDiagnostics,
    rebuild_count: u64,
}

impl Default for ExtrusionSegment {
    fn default() -> Self {
        Self {
            shape: Vec::new(),
            sample_spacing: Self::DEFAULT_SAMPLE_SPACING,
            texture_scale: 1.0,
            texture_offset: 0.0,
            interval: PathInterval::FULL,
            dirty: true,
            built_from: None,
            mesh: GeomMesh::default(),
            diagnostics: GeomMeshDiagnostics::default(),
            rebuild_count: 0,
        }
    }
}

impl ExtrusionSegment {
    pub const DEFAULT_SAMPLE_SPACING: f64 = 0.1;

    #[must_use]
    pub fn new(shape: Vec<ProfileVertex>) -> Self {
        Self {
            shape,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn shape(&self) -> &[ProfileVertex] {
        &self.shape
    }

    pub fn set_shape(&mut self, shape: Vec<ProfileVertex>) {
        if self.shape != shape {
            self.shape = shape;
            self.dirty = true;
        }
    }

    #[must_use]
    pub const fn sample_spacing(&self) -> f64 {
        self.sample_spacing
    }

    pub fn set_sample_spacing(&mut self, spacing: f64) -> Result<(), ExtrusionError> {
        if !spacing.is_finite() {
            return Err(ExtrusionError::NonFiniteSampleSpacing);
        }
        if spacing <= 0.0 {
            return Err(ExtrusionError::NonPositiveSampleSpacing { spacing });
        }
        if self.sample_spacing != spacing {
            self.sample_spacing = spacing;
            self.dirty = true;
        }
        Ok(())
    }

    #[must_use]
    pub const fn texture_scale(&self) -> f64 {
        self.texture_scale
    }

    pub fn set_texture_scale(&mut self, scale: f64) {
        if self.texture_scale != scale {
            self.texture_scale = scale;
            self.dirty = true;
        }
    }

    #[must_use]
    pub const fn texture_offset(&self) -> f64 {
        self.texture_offset
    }

    pub fn set_texture_offset(&mut self, offset: f64) {
        if self.texture_offset != offset {
            self.texture_offset = offset;
            self.dirty = true;
        }
    }

    #[must_use]
    pub const fn interval(&self) -> PathInterval {
        self.interval
    }

    pub fn set_interval(&mut self, start: f64, end: Option<f64>) -> Result<(), ExtrusionError> {
        let interval = PathInterval::new(start, end);
        if !interval.is_well_formed() {
            return Err(ExtrusionError::InvalidInterval {
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

    pub fn request_rebuild(&mut self) {
        self.dirty = true;
    }

    #[must_use]
    pub fn is_dirty<P: SamplePath + ?Sized>(&self, path: &P) -> bool {
        self.dirty || self.built_from != Some(path.revision())
    }

    /// Rebuild if a setter or the path changed since the last build.
    pub fn compute_if_needed<P: SamplePath + ?Sized>(
        &mut self,
        path: &P,
    ) -> Result<bool, ExtrusionError> {
        if !self.is_dirty(path) {
            return Ok(false);
        }
        self.compute(path)?;
        Ok(true)
    }

    pub fn compute<P: SamplePath + ?Sized>(&mut self, path: &P) -> Result<(), ExtrusionError> {
        if self.shape.is_empty() {
            return Err(ExtrusionError::EmptyShape);
        }
        let length = path.length();
        let (start, end) = self
            .interval
            .resolve(length)
            .ok_or(ExtrusionError::InvalidInterval {
                start: self.interval.start,
                end: self.interval.end,
                length: Some(length),
            })?;

        let mut metrics = GeomMetrics::default();
        metrics.begin();

        let rings = metrics.time(TimingBucket::CurveSampling, || {
            sample_rings(path, start, end, self.sample_spacing)
        })?;

        let mesh = metrics.time(TimingBucket::Extrusion, || {
            let vertices = self.ring_vertices(&rings);
            let triangles = tube_triangles(self.shape.len(), rings.len());
            GeomMesh::from_vertices(&vertices, triangles)
        });

        let mut diagnostics = mesh.diagnose(&mut metrics);
        diagnostics.path_sample_count = rings.len();
        diagnostics.timing = metrics.end();

        self.rebuild_count += 1;
        log::debug!(
            "extrusion rebuild #{} (spacing {}, [{start:.4}, {end:.4}]): {}",
            self.rebuild_count,
            self.sample_spacing,
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

    #[must_use]
    pub const fn rebuild_count(&self) -> u64 {
        self.rebuild_count
    }

    fn ring_vertices(&self, rings: &[(f64, CurveSample)]) -> Vec<MeshVertex> {
        let mut vertices = Vec::with_capacity(rings.len() * self.shape.len());
        for (distance, sample) in rings {
            let v = self.texture_scale * (distance + self.texture_offset);
            vertices.extend(
                self.shape
                    .iter()
                    .map(|profile| sample.get_bent(&profile.to_local(v))),
            );
        }
        vertices
    }
}

/// Path distances and samples for every ring: `start + i * spacing` while
/// below `end`, then `end` itself.
fn sample_rings<P: SamplePath + ?Sized>(
    path: &P,
    start: f64,
    end: f64,
    spacing: f64,
) -> Result<Vec<(f64, CurveSample)>, CurveError> {
    let mut rings = Vec::new();
    let mut i = 0usize;
    loop {
        let distance = start + i as f64 * spacing;
        // a ring closer than the tolerance to the end would duplicate it
        if distance >= end - Tolerance::LOOSE.eps {
            break;
        }
        rings.push((distance, path.sample_at_distance(distance)?));
        i += 1;
    }
    rings.push((end, path.sample_at_distance(end)?));
    Ok(rings)
}

/// Quad strip between consecutive rings of `ring_size` vertices, wrapping the
/// last vertex of each ring back to the first.
fn tube_triangles(ring_size: usize, ring_count: usize) -> Vec<u32> {
    let n = ring_size as i64;
    let mut triangles = Vec::with_capacity(ring_size * ring_count.saturating_sub(1) * 6);
    for ring in 0..ring_count.saturating_sub(1) as i64 {
        let mut index = ring * n;
        for j in 0..n {
            let offset = if j == n - 1 { -(n - 1) } else { 1 };
            let a = index + n;
            let b = index;
            let c = index + offset;
            let d = index + offset + n;
            triangles.extend([c, b, a, a, d, c].map(|i| i as u32));
            index += 1;
        }
    }
    triangles
}
