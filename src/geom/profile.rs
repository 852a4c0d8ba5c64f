//! Ready-made extrusion profiles.

use super::Vec2;
use super::extrusion::ProfileVertex;

impl ProfileVertex {
    /// A small triangle, enough for an extrusion to be visible.
    #[must_use]
    pub fn default_shape() -> Vec<Self> {
        vec![
            Self::new(Vec2::new(0.0, 0.5), Vec2::new(0.0, 1.0), 0.0),
            Self::new(Vec2::new(1.0, -0.5), Vec2::new(1.0, -1.0), 0.33),
            Self::new(Vec2::new(-1.0, -0.5), Vec2::new(-1.0, -1.0), 0.66),
        ]
    }

    /// Same vertex reflected across the profile's Y axis.
    #[must_use]
    pub fn mirrored(self) -> Self {
        Self::new(
            Vec2::new(-self.point.x, self.point.y),
            Vec2::new(-self.normal.x, self.normal.y),
            self.u,
        )
    }
}

/// Half profile closed by two flat bases: the last vertex again with a +Y
/// normal, the half profile, then the first vertex again with a -Y normal.
#[must_use]
pub fn half_profile_with_base(half: &[ProfileVertex]) -> Vec<ProfileVertex> {
    let (Some(first), Some(last)) = (half.first(), half.last()) else {
        return Vec::new();
    };
    let mut out = Vec::with_capacity(half.len() + 2);
    out.push(ProfileVertex { normal: Vec2::UP, ..*last });
    out.extend_from_slice(half);
    out.push(ProfileVertex { normal: Vec2::DOWN, ..*first });
    out
}

/// Symmetric closed profile built from one half.
///
/// Order: the half, its top base and the mirrored top base, the mirrored half
/// in reverse, then the mirrored bottom base and the bottom base.
#[must_use]
pub fn mirrored_profile(half: &[ProfileVertex]) -> Vec<ProfileVertex> {
    let (Some(first), Some(last)) = (half.first(), half.last()) else {
        return Vec::new();
    };
    let top = ProfileVertex { normal: Vec2::UP, ..*last };
    let bottom = ProfileVertex { normal: Vec2::DOWN, ..*first };

    let mut out = Vec::with_capacity(half.len() * 2 + 4);
    out.extend_from_slice(half);
    out.push(top);
    out.push(top.mirrored());
    out.extend(half.iter().rev().map(|v| v.mirrored()));
    out.push(bottom.mirrored());
    out.push(bottom);
    out
}
