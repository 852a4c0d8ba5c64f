//! Pre-transformed source geometry for the mesh bender.

use super::mesh::{GeomMesh, compute_smooth_normals, reversed_triangles};
use super::sample::MeshVertex;
use super::{BBox, Point3, Quat, Vec2, Vec3};

/// Immutable source mesh with its transform applied.
///
/// Each fluent call returns a new value whose vertices, triangles and X extent
/// are already materialised. Transforms apply per vertex in the order rotate,
/// scale, translate, regardless of the order of the calls.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMesh {
    base: Vec<MeshVertex>,
    base_triangles: Vec<u32>,
    rotation: Quat,
    scale: Vec3,
    translation: Vec3,
    vertices: Vec<MeshVertex>,
    triangles: Vec<u32>,
    min_x: f64,
    length: f64,
}

impl SourceMesh {
    /// Take a mesh as is. Missing normals become smooth vertex normals and
    /// missing UVs default to `(0, 0)`.
    #[must_use]
    pub fn build(mesh: &GeomMesh) -> Self {
        let points: Vec<Point3> = mesh.positions.iter().copied().map(Point3::from).collect();
        let normals = match &mesh.normals {
            Some(normals) if normals.len() == points.len() => normals.clone(),
            _ => compute_smooth_normals(&points, &mesh.indices),
        };
        let base = points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let uv = mesh
                    .uvs
                    .as_ref()
                    .and_then(|uvs| uvs.get(i))
                    .map_or(Vec2::ZERO, |&uv| Vec2::from(uv));
                MeshVertex::new(*p, Vec3::from(normals[i]), uv)
            })
            .collect();

        Self::materialize(
            base,
            mesh.indices.clone(),
            Quat::IDENTITY,
            Vec3::ONE,
            Vec3::ZERO,
        )
    }

    #[must_use]
    pub fn rotate(self, rotation: Quat) -> Self {
        Self::materialize(self.base, self.base_triangles, rotation, self.scale, self.translation)
    }

    #[must_use]
    pub fn scale(self, scale: Vec3) -> Self {
        Self::materialize(self.base, self.base_triangles, self.rotation, scale, self.translation)
    }

    #[must_use]
    pub fn translate(self, translation: Vec3) -> Self {
        Self::materialize(self.base, self.base_triangles, self.rotation, self.scale, translation)
    }

    #[must_use]
    pub fn vertices(&self) -> &[MeshVertex] {
        &self.vertices
    }

    #[must_use]
    pub fn triangles(&self) -> &[u32] {
        &self.triangles
    }

    /// Smallest X of the transformed vertices.
    #[must_use]
    pub const fn min_x(&self) -> f64 {
        self.min_x
    }

    /// Extent of the transformed vertices along X.
    #[must_use]
    pub const fn length(&self) -> f64 {
        self.length
    }

    #[must_use]
    pub const fn rotation(&self) -> Quat {
        self.rotation
    }

    #[must_use]
    pub const fn scale_factors(&self) -> Vec3 {
        self.scale
    }

    #[must_use]
    pub const fn translation(&self) -> Vec3 {
        self.translation
    }

    /// Whether the scale mirrors the mesh (odd number of negative axes).
    #[must_use]
    pub fn is_mirrored(&self) -> bool {
        is_mirroring(self.scale)
    }

    fn materialize(
        base: Vec<MeshVertex>,
        base_triangles: Vec<u32>,
        rotation: Quat,
        scale: Vec3,
        translation: Vec3,
    ) -> Self {
        let vertices: Vec<MeshVertex> = base
            .iter()
            .map(|v| {
                let position = rotation.rotate_vec(v.position.to_vec3()).scale_by(scale) + translation;
                let normal = rotation.rotate_vec(v.normal).scale_by(scale);
                MeshVertex::new(
                    Point3::from(position),
                    normal.normalized().unwrap_or(v.normal),
                    v.uv,
                )
            })
            .collect();

        let triangles = if is_mirroring(scale) {
            reversed_triangles(&base_triangles)
        } else {
            base_triangles.clone()
        };

        let points: Vec<Point3> = vertices.iter().map(|v| v.position).collect();
        let (min_x, length) = BBox::from_points(&points)
            .map_or((0.0, 0.0), |bbox| (bbox.min.x, bbox.size().x));

        Self {
            base,
            base_triangles,
            rotation,
            scale,
            translation,
            vertices,
            triangles,
            min_x,
            length,
        }
    }
}

fn is_mirroring(scale: Vec3) -> bool {
    let negatives = [scale.x, scale.y, scale.z]
        .iter()
        .filter(|s| **s < 0.0)
        .count();
    negatives % 2 == 1
}
