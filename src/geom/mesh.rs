use std::collections::HashMap;

use super::diagnostics::GeomMeshDiagnostics;
use super::metrics::{GeomMetrics, TimingBucket};
use super::sample::MeshVertex;
use super::{Point3, Tolerance};

/// Triangle mesh buffers handed to hosts.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GeomMesh {
    pub positions: Vec<[f64; 3]>,
    pub indices: Vec<u32>,
    pub uvs: Option<Vec<[f64; 2]>>,
    pub normals: Option<Vec<[f64; 3]>>,
}

impl GeomMesh {
    /// Create a new mesh with positions and indices only.
    #[must_use]
    pub fn new(positions: Vec<[f64; 3]>, indices: Vec<u32>) -> Self {
        Self {
            positions,
            indices,
            uvs: None,
            normals: None,
        }
    }

    #[must_use]
    pub fn with_attributes(
        positions: Vec<[f64; 3]>,
        indices: Vec<u32>,
        uvs: Option<Vec<[f64; 2]>>,
        normals: Option<Vec<[f64; 3]>>,
    ) -> Self {
        Self {
            positions,
            indices,
            uvs,
            normals,
        }
    }

    /// Build a fully attributed mesh from bent vertices.
    #[must_use]
    pub fn from_vertices(vertices: &[MeshVertex], indices: Vec<u32>) -> Self {
        Self {
            positions: vertices.iter().map(|v| v.position.to_array()).collect(),
            indices,
            uvs: Some(vertices.iter().map(|v| v.uv.to_array()).collect()),
            normals: Some(vertices.iter().map(|v| v.normal.to_array()).collect()),
        }
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Every index refers to an existing vertex.
    #[must_use]
    pub fn has_valid_indices(&self) -> bool {
        u32::try_from(self.positions.len()).is_ok_and(|n| self.indices.iter().all(|&i| i < n))
    }

    /// Check the invariants hosts rely on when uploading the buffers: a whole
    /// number of triangles, finite positions, indices in range and attribute
    /// buffers as long as `positions`.
    pub fn validate(&self) -> Result<(), String> {
        if self.indices.len() % 3 != 0 {
            return Err(format!(
                "index buffer of length {} is not a triangle list",
                self.indices.len()
            ));
        }
        if let Some(vertex) = self.positions.iter().position(|p| p.iter().any(|c| !c.is_finite())) {
            return Err(format!("vertex {vertex} has a non-finite coordinate"));
        }
        if !self.has_valid_indices() {
            return Err(format!(
                "index out of range for {} vertices",
                self.positions.len()
            ));
        }
        let n = self.positions.len();
        if let Some(len) = self.uvs.as_ref().map(Vec::len).filter(|&len| len != n) {
            return Err(format!("{len} uvs for {n} vertices"));
        }
        if let Some(len) = self.normals.as_ref().map(Vec::len).filter(|&len| len != n) {
            return Err(format!("{len} normals for {n} vertices"));
        }
        Ok(())
    }

    /// Returns the position buffer as a flat slice: `[x0, y0, z0, x1, y1, z1, ...]`.
    #[must_use]
    pub fn positions_flat(&self) -> &[f64] {
        flatten_f64_array_slice::<3>(&self.positions)
    }

    /// Returns the UV buffer as a flat slice: `[u0, v0, u1, v1, ...]`.
    #[must_use]
    pub fn uvs_flat(&self) -> Option<&[f64]> {
        self.uvs.as_deref().map(flatten_f64_array_slice::<2>)
    }

    #[must_use]
    pub fn normals_flat(&self) -> Option<&[f64]> {
        self.normals.as_deref().map(flatten_f64_array_slice::<3>)
    }

    /// Append `other`, offsetting its indices past the current vertices.
    ///
    /// An attribute buffer survives only when both meshes carry it, except
    /// when `self` is still empty.
    pub fn append(&mut self, other: &GeomMesh) {
        if self.is_empty() {
            self.clone_from(other);
            return;
        }
        let base = self.positions.len() as u32;
        self.positions.extend_from_slice(&other.positions);
        self.indices.extend(other.indices.iter().map(|i| i + base));
        self.uvs = match (self.uvs.take(), &other.uvs) {
            (Some(mut uvs), Some(more)) => {
                uvs.extend_from_slice(more);
                Some(uvs)
            }
            _ => None,
        };
        self.normals = match (self.normals.take(), &other.normals) {
            (Some(mut normals), Some(more)) => {
                normals.extend_from_slice(more);
                Some(normals)
            }
            _ => None,
        };
    }

    /// Topology and quality report for this mesh.
    #[must_use]
    pub fn diagnose(&self, metrics: &mut GeomMetrics) -> GeomMeshDiagnostics {
        metrics.time(TimingBucket::Diagnostics, || {
            let points: Vec<Point3> = self.positions.iter().copied().map(Point3::from).collect();
            let (open_edge_count, non_manifold_edge_count) = count_edge_topology(&self.indices);
            GeomMeshDiagnostics {
                vertex_count: self.vertex_count(),
                triangle_count: self.triangle_count(),
                degenerate_triangle_count: count_degenerate_triangles(
                    &points,
                    &self.indices,
                    Tolerance::ZERO_LENGTH,
                ),
                open_edge_count,
                non_manifold_edge_count,
                ..GeomMeshDiagnostics::default()
            }
        })
    }
}

fn flatten_f64_array_slice<const N: usize>(data: &[[f64; N]]) -> &[f64] {
    let count = data.len().checked_mul(N).unwrap_or(0);
    let ptr = data.as_ptr().cast::<f64>();
    // SAFETY: `[[f64; N]]` is stored contiguously, and we compute the element count as `len * N`.
    unsafe { std::slice::from_raw_parts(ptr, count) }
}

/// Copy of `indices` with every triangle's first two corners swapped.
#[must_use]
pub fn reversed_triangles(indices: &[u32]) -> Vec<u32> {
    let mut out = indices.to_vec();
    for tri in out.chunks_exact_mut(3) {
        tri.swap(0, 1);
    }
    out
}

/// Returns `(open_edges, non_manifold_edges)`. Edges are undirected.
pub(crate) fn count_edge_topology(indices: &[u32]) -> (usize, usize) {
    let mut edge_counts: HashMap<(u32, u32), u32> = HashMap::new();

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0], tri[1], tri[2]);
        if i0 == i1 || i1 == i2 || i0 == i2 {
            continue;
        }
        for (ea, eb) in [(i0, i1), (i1, i2), (i2, i0)] {
            let key = if ea <= eb { (ea, eb) } else { (eb, ea) };
            *edge_counts.entry(key).or_insert(0) += 1;
        }
    }

    edge_counts
        .values()
        .fold((0, 0), |(open, non_manifold), &count| match count {
            1 => (open + 1, non_manifold),
            c if c > 2 => (open, non_manifold + 1),
            _ => (open, non_manifold),
        })
}

pub(crate) fn count_degenerate_triangles(points: &[Point3], indices: &[u32], tol: Tolerance) -> usize {
    indices
        .chunks_exact(3)
        .filter(|tri| {
            let (Some(a), Some(b), Some(c)) = (
                points.get(tri[0] as usize),
                points.get(tri[1] as usize),
                points.get(tri[2] as usize),
            ) else {
                return true;
            };
            let area2 = b.sub_point(*a).cross(c.sub_point(*a)).length_squared();
            !area2.is_finite() || area2 <= tol.eps_squared()
        })
        .count()
}

/// Area-weighted vertex normals. Vertices with no usable adjacent face get +Z.
pub(crate) fn compute_smooth_normals(points: &[Point3], indices: &[u32]) -> Vec<[f64; 3]> {
    let mut normals = vec![[0.0, 0.0, 0.0]; points.len()];

    for tri in indices.chunks_exact(3) {
        let (i0, i1, i2) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        let (Some(a), Some(b), Some(c)) = (points.get(i0), points.get(i1), points.get(i2)) else {
            continue;
        };
        let n = b.sub_point(*a).cross(c.sub_point(*a));
        for i in [i0, i1, i2] {
            normals[i][0] += n.x;
            normals[i][1] += n.y;
            normals[i][2] += n.z;
        }
    }

    for n in &mut normals {
        let len = (n[0] * n[0] + n[1] * n[1] + n[2] * n[2]).sqrt();
        if len.is_finite() && len > 0.0 {
            let inv = 1.0 / len;
            n[0] *= inv;
            n[1] *= inv;
            n[2] *= inv;
        } else {
            *n = [0.0, 0.0, 1.0];
        }
    }

    normals
}

/// Axis-aligned box mesh centred on the origin with per-face normals and UVs.
///
/// Faces do not share vertices, so the mesh has 24 vertices and 12 triangles.
#[must_use]
pub fn box_mesh(size: [f64; 3]) -> GeomMesh {
    let [hx, hy, hz] = size.map(|s| s * 0.5);
    // (normal, u axis, v axis)
    let faces: [([f64; 3], [f64; 3], [f64; 3]); 6] = [
        ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
        ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
        ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
        ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
        ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
    ];

    let mut positions = Vec::with_capacity(24);
    let mut normals = Vec::with_capacity(24);
    let mut uvs = Vec::with_capacity(24);
    let mut indices = Vec::with_capacity(36);

    for (n, u, v) in faces {
        let base = positions.len() as u32;
        for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
            let p = [
                (n[0] + u[0] * su + v[0] * sv) * hx,
                (n[1] + u[1] * su + v[1] * sv) * hy,
                (n[2] + u[2] * su + v[2] * sv) * hz,
            ];
            positions.push(p);
            normals.push(n);
            uvs.push([(su + 1.0) * 0.5, (sv + 1.0) * 0.5]);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    GeomMesh::with_attributes(positions, indices, Some(uvs), Some(normals))
}
