//! Procedural edits applied to a whole spline.

use super::{Vec2, Vec3};
use super::spline::{Spline, SplineError};

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum ShapingError {
    #[error("curvature must be in [0, 1] (was {0})")]
    CurvatureOutOfRange(f64),
    #[error(transparent)]
    Spline(#[from] SplineError),
}

/// Options for [`smooth_spline`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SmoothOptions {
    /// Fraction of the average neighbour distance used as handle length.
    pub curvature: f64,
}

impl Default for SmoothOptions {
    fn default() -> Self {
        Self { curvature: 0.3 }
    }
}

/// Set every node handle from its neighbours so the spline passes smoothly
/// through the node positions.
///
/// The handle points along the sum of the unit vectors from the previous node
/// and toward the next node, with a length of `curvature` times the average
/// neighbour distance. Looped splines wrap their neighbours around.
pub fn smooth_spline(spline: &mut Spline, options: SmoothOptions) -> Result<(), ShapingError> {
    if !(0.0..=1.0).contains(&options.curvature) {
        return Err(ShapingError::CurvatureOutOfRange(options.curvature));
    }

    let positions: Vec<_> = spline.distinct_nodes().iter().map(|n| n.position()).collect();
    let count = positions.len();
    let is_loop = spline.is_loop();

    for (i, &position) in positions.iter().enumerate() {
        let previous = match i {
            0 if is_loop => positions.get(count - 1),
            0 => None,
            _ => positions.get(i - 1),
        };
        let next = if i + 1 < count {
            positions.get(i + 1)
        } else if is_loop {
            positions.first()
        } else {
            None
        };

        let mut direction = Vec3::ZERO;
        let mut average = 0.0;
        if let Some(&previous) = previous {
            let to_previous = position - previous;
            average += to_previous.length();
            direction = direction + to_previous.normalized().unwrap_or_default();
        }
        if let Some(&next) = next {
            let to_next = next - position;
            average += to_next.length();
            direction = direction + to_next.normalized().unwrap_or_default();
        }
        average *= 0.5;

        let handle = direction.normalized().unwrap_or_default() * (average * options.curvature);
        spline.set_node_direction(i, position + handle)?;
    }

    log::debug!(
        "smoothed {count} nodes (curvature {}, loop {is_loop})",
        options.curvature
    );
    Ok(())
}

/// Start and end values for [`apply_scale_roll_gradient`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleRollGradient {
    pub start_scale: f64,
    pub end_scale: f64,
    /// Degrees.
    pub start_roll: f64,
    pub end_roll: f64,
}

impl Default for ScaleRollGradient {
    fn default() -> Self {
        Self {
            start_scale: 1.0,
            end_scale: 1.0,
            start_roll: 0.0,
            end_roll: 0.0,
        }
    }
}

/// Give each node a uniform scale and a roll interpolated by its distance
/// along the spline.
pub fn apply_scale_roll_gradient(
    spline: &mut Spline,
    gradient: ScaleRollGradient,
) -> Result<(), ShapingError> {
    let total = spline.length();
    let curve_lengths: Vec<f64> = spline.curves().iter().map(|c| c.length()).collect();

    let mut travelled = 0.0;
    for index in 0..spline.node_count() {
        if index > 0 {
            travelled += curve_lengths[index - 1];
        }
        let rate = if total > 0.0 {
            (travelled / total).clamp(0.0, 1.0)
        } else {
            0.0
        };
        let scale = gradient.start_scale + (gradient.end_scale - gradient.start_scale) * rate;
        let roll = gradient.start_roll + (gradient.end_roll - gradient.start_roll) * rate;

        // the closing node of a loop follows node 0
        if spline.is_loop() && index == spline.node_count() - 1 {
            break;
        }
        spline.set_node_scale(index, Vec2::ONE * scale)?;
        spline.set_node_roll(index, roll)?;
    }
    Ok(())
}
