//! Spline control nodes.

use super::{Point3, Vec2, Vec3};

/// How the incoming handle of a node relates to its outgoing handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TangentMode {
    /// `direction_in` is always the reflection of `direction_out` through the
    /// node position.
    #[default]
    Mirrored,
    /// `direction_in` is edited independently.
    Free,
}

/// A control point with absolute Bézier handles and orientation attributes.
///
/// Setters return `true` when the node actually changed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineNode {
    position: Point3,
    direction_out: Point3,
    direction_in: Point3,
    up: Vec3,
    scale: Vec2,
    roll: f64,
    tangent_mode: TangentMode,
}

impl SplineNode {
    /// Node at `position` with an absolute outgoing handle at `direction`.
    #[must_use]
    pub fn new(position: Point3, direction: Point3) -> Self {
        Self {
            position,
            direction_out: direction,
            direction_in: direction.mirrored_through(position),
            up: Vec3::Y,
            scale: Vec2::ONE,
            roll: 0.0,
            tangent_mode: TangentMode::Mirrored,
        }
    }

    #[must_use]
    pub fn with_up(mut self, up: Vec3) -> Self {
        self.up = up;
        self
    }

    #[must_use]
    pub fn with_scale(mut self, scale: Vec2) -> Self {
        self.scale = scale;
        self
    }

    #[must_use]
    pub fn with_roll(mut self, roll: f64) -> Self {
        self.roll = roll;
        self
    }

    /// Switch to free handles with an explicit incoming handle.
    #[must_use]
    pub fn with_direction_in(mut self, direction_in: Point3) -> Self {
        self.tangent_mode = TangentMode::Free;
        self.direction_in = direction_in;
        self
    }

    #[must_use]
    pub const fn position(&self) -> Point3 {
        self.position
    }

    /// Absolute outgoing handle.
    #[must_use]
    pub const fn direction(&self) -> Point3 {
        self.direction_out
    }

    /// Absolute incoming handle.
    #[must_use]
    pub const fn direction_in(&self) -> Point3 {
        self.direction_in
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
    pub const fn tangent_mode(&self) -> TangentMode {
        self.tangent_mode
    }

    pub fn set_position(&mut self, position: Point3) -> bool {
        if self.position == position {
            return false;
        }
        self.position = position;
        self.sync_direction_in();
        true
    }

    pub fn set_direction(&mut self, direction: Point3) -> bool {
        if self.direction_out == direction {
            return false;
        }
        self.direction_out = direction;
        self.sync_direction_in();
        true
    }

    /// Set the incoming handle. Mirrored nodes move their outgoing handle to
    /// the reflection instead.
    pub fn set_direction_in(&mut self, direction_in: Point3) -> bool {
        match self.tangent_mode {
            TangentMode::Mirrored => self.set_direction(direction_in.mirrored_through(self.position)),
            TangentMode::Free => {
                if self.direction_in == direction_in {
                    return false;
                }
                self.direction_in = direction_in;
                true
            }
        }
    }

    pub fn set_up(&mut self, up: Vec3) -> bool {
        if self.up == up {
            return false;
        }
        self.up = up;
        true
    }

    pub fn set_scale(&mut self, scale: Vec2) -> bool {
        if self.scale == scale {
            return false;
        }
        self.scale = scale;
        true
    }

    pub fn set_roll(&mut self, roll: f64) -> bool {
        if self.roll == roll {
            return false;
        }
        self.roll = roll;
        true
    }

    /// Switching back to mirrored discards the free incoming handle.
    pub fn set_tangent_mode(&mut self, mode: TangentMode) -> bool {
        if self.tangent_mode == mode {
            return false;
        }
        self.tangent_mode = mode;
        self.sync_direction_in();
        true
    }

    /// Make this node an exact copy of `other` (loop closing).
    pub(crate) fn copy_transform_from(&mut self, other: &SplineNode) -> bool {
        if self == other {
            return false;
        }
        *self = *other;
        true
    }

    fn sync_direction_in(&mut self) {
        if self.tangent_mode == TangentMode::Mirrored {
            self.direction_in = self.direction_out.mirrored_through(self.position);
        }
    }
}
