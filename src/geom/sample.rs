//! Curve samples and the vertex bending primitive.

use super::{Point3, Quat, Vec2, Vec3};

/// A mesh vertex in the local space of a source mesh or a profile ring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshVertex {
    pub position: Point3,
    pub normal: Vec3,
    pub uv: Vec2,
}

impl MeshVertex {
    #[must_use]
    pub const fn new(position: Point3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
        }
    }
}

/// Snapshot of every curve attribute at one point along a curve.
///
/// Samples are immutable. `distance_in_curve` and `time_in_curve` are local to
/// the curve that produced the sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurveSample {
    location: Point3,
    tangent: Vec3,
    up: Vec3,
    scale: Vec2,
    roll: f64,
    distance_in_curve: f64,
    time_in_curve: f64,
}

impl CurveSample {
    #[must_use]
    pub fn new(
        location: Point3,
        tangent: Vec3,
        up: Vec3,
        scale: Vec2,
        roll: f64,
        distance_in_curve: f64,
        time_in_curve: f64,
    ) -> Self {
        Self {
            location,
            tangent,
            up,
            scale,
            roll,
            distance_in_curve,
            time_in_curve,
        }
    }

    #[must_use]
    pub const fn location(&self) -> Point3 {
        self.location
    }

    /// Unit tangent.
    #[must_use]
    pub const fn tangent(&self) -> Vec3 {
        self.tangent
    }

    #[must_use]
    pub const fn up(&self) -> Vec3 {
        self.up
    }

    #[must_use]
    pub const fn scale(&self) -> Vec2 {
        self.scale
    }

    /// Roll in degrees.
    #[must_use]
    pub const fn roll(&self) -> f64 {
        self.roll
    }

    #[must_use]
    pub const fn distance_in_curve(&self) -> f64 {
        self.distance_in_curve
    }

    #[must_use]
    pub const fn time_in_curve(&self) -> f64 {
        self.time_in_curve
    }

    /// Orientation of the sample frame: +Z along the tangent, +Y toward the
    /// rolled up vector made perpendicular to the tangent.
    #[must_use]
    pub fn rotation(&self) -> Quat {
        let rolled_up = Quat::from_axis_angle_degrees(Vec3::Z, self.roll).rotate_vec(self.up);
        let up_vector = rolled_up
            .cross(self.tangent)
            .normalized()
            .map_or(self.up, |side| self.tangent.cross(side));
        Quat::look_rotation(self.tangent, up_vector)
    }

    /// Interpolate every field; the tangent is re-normalised.
    #[must_use]
    pub fn lerp(a: &Self, b: &Self, t: f64) -> Self {
        let tangent = a.tangent.lerp(b.tangent, t);
        Self {
            location: a.location.lerp(b.location, t),
            tangent: tangent.normalized().unwrap_or(a.tangent),
            up: a.up.lerp(b.up, t),
            scale: a.scale.lerp(b.scale, t),
            roll: a.roll + (b.roll - a.roll) * t,
            distance_in_curve: a.distance_in_curve + (b.distance_in_curve - a.distance_in_curve) * t,
            time_in_curve: a.time_in_curve + (b.time_in_curve - a.time_in_curve) * t,
        }
    }

    /// Move a local vertex into the frame of this sample.
    ///
    /// The local X axis is the bend axis and is collapsed; the vertex is
    /// scaled in Y/Z, rolled around X, then rotated and translated onto the
    /// curve. The UV is passed through.
    #[must_use]
    pub fn get_bent(&self, vertex: &MeshVertex) -> MeshVertex {
        let scaled = vertex
            .position
            .to_vec3()
            .scale_by(Vec3::new(0.0, self.scale.y, self.scale.x));

        let roll = Quat::from_axis_angle_degrees(Vec3::X, self.roll);
        let mut position = roll.rotate_vec(scaled);
        let normal = roll.rotate_vec(vertex.normal);
        position.x = 0.0;

        let q = self.rotation() * Quat::from_euler_y_degrees(-90.0);
        MeshVertex {
            position: self.location + q.rotate_vec(position),
            normal: q.rotate_vec(normal),
            uv: vertex.uv,
        }
    }
}
