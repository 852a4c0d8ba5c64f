//! Multi-segment spline with arena storage.
//!
//! The spline owns its nodes and curves; `curves[i]` always joins `nodes[i]`
//! and `nodes[i + 1]`. Curves hold snapshots of their two nodes, and every
//! mutation that goes through the spline pushes the new node values into the
//! adjacent curves before returning, so the sample tables are never stale.
//!
//! A looped spline carries one extra closing node at the end that mirrors the
//! first node. Editing either of the two copies the whole node onto the other.

use super::curve::{CubicBezierCurve, CurveError, Revision, SamplePath};
use super::node::{SplineNode, TangentMode};
use super::sample::CurveSample;
use super::{Point3, Vec2, Vec3};

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum SplineError {
    #[error("cannot insert a node at index 0, use a new spline or insert after the first node")]
    InsertAtStart,
    #[error("node index {index} is out of range for {count} nodes")]
    NodeIndexOutOfRange { index: usize, count: usize },
    #[error("spline would be left with {count} nodes, at least {min} are required")]
    TooFewNodes { count: usize, min: usize },
    #[error("the closing node of a looped spline cannot be removed, disable the loop first")]
    LoopClosingNode,
    #[error(transparent)]
    Curve(#[from] CurveError),
}

/// Change notifications, drained by the owner of the spline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SplineEvent {
    NodeListChanged { added: Vec<usize>, removed: Vec<usize> },
    CurveChanged { curve_index: usize },
}

/// Closest point on a spline to a query point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplineProjection {
    pub curve_index: usize,
    pub sample: CurveSample,
    /// Distance from the start of the spline.
    pub distance: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Spline {
    nodes: Vec<SplineNode>,
    curves: Vec<CubicBezierCurve>,
    length: f64,
    is_loop: bool,
    revision: Revision,
    events: Vec<SplineEvent>,
}

impl Spline {
    pub const MIN_NODES: usize = 2;
    pub const MIN_LOOP_NODES: usize = 3;

    #[must_use]
    pub fn new(first: SplineNode, second: SplineNode) -> Self {
        let mut spline = Self {
            nodes: vec![first, second],
            curves: vec![CubicBezierCurve::new(first, second)],
            length: 0.0,
            is_loop: false,
            revision: Revision::next(),
            events: Vec::new(),
        };
        spline.update_length();
        spline
    }

    /// Open spline through `nodes`.
    pub fn from_nodes(nodes: Vec<SplineNode>) -> Result<Self, SplineError> {
        if nodes.len() < Self::MIN_NODES {
            return Err(SplineError::TooFewNodes {
                count: nodes.len(),
                min: Self::MIN_NODES,
            });
        }
        let curves = nodes
            .windows(2)
            .map(|pair| CubicBezierCurve::new(pair[0], pair[1]))
            .collect();
        let mut spline = Self {
            nodes,
            curves,
            length: 0.0,
            is_loop: false,
            revision: Revision::next(),
            events: Vec::new(),
        };
        spline.update_length();
        Ok(spline)
    }

    #[must_use]
    pub fn nodes(&self) -> &[SplineNode] {
        &self.nodes
    }

    /// Nodes without the closing node of a loop.
    #[must_use]
    pub fn distinct_nodes(&self) -> &[SplineNode] {
        if self.is_loop {
            &self.nodes[..self.nodes.len() - 1]
        } else {
            &self.nodes
        }
    }

    #[must_use]
    pub fn node(&self, index: usize) -> Option<&SplineNode> {
        self.nodes.get(index)
    }

    #[must_use]
    pub fn curves(&self) -> &[CubicBezierCurve] {
        &self.curves
    }

    #[must_use]
    pub fn curve(&self, index: usize) -> Option<&CubicBezierCurve> {
        self.curves.get(index)
    }

    #[must_use]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn curve_count(&self) -> usize {
        self.curves.len()
    }

    #[must_use]
    pub const fn length(&self) -> f64 {
        self.length
    }

    #[must_use]
    pub const fn is_loop(&self) -> bool {
        self.is_loop
    }

    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// Take all pending change notifications.
    pub fn drain_events(&mut self) -> Vec<SplineEvent> {
        std::mem::take(&mut self.events)
    }

    #[must_use]
    pub fn has_pending_events(&self) -> bool {
        !self.events.is_empty()
    }

    /// Append a node and return its index. On a looped spline the node goes
    /// just before the closing node.
    pub fn add_node(&mut self, node: SplineNode) -> usize {
        if self.is_loop {
            let index = self.nodes.len() - 1;
            self.insert_unchecked(index, node);
            return index;
        }

        let index = self.nodes.len();
        let previous = self.nodes[index - 1];
        self.nodes.push(node);
        self.curves.push(CubicBezierCurve::new(previous, node));
        self.events.push(SplineEvent::NodeListChanged {
            added: vec![index],
            removed: Vec::new(),
        });
        self.events.push(SplineEvent::CurveChanged {
            curve_index: index - 1,
        });
        self.touch();
        index
    }

    /// Insert `node` at `index`, splitting the curve that ended there.
    pub fn insert_node(&mut self, index: usize, node: SplineNode) -> Result<(), SplineError> {
        if index == 0 {
            return Err(SplineError::InsertAtStart);
        }
        if index >= self.nodes.len() {
            return Err(SplineError::NodeIndexOutOfRange {
                index,
                count: self.nodes.len(),
            });
        }
        self.insert_unchecked(index, node);
        Ok(())
    }

    fn insert_unchecked(&mut self, index: usize, node: SplineNode) {
        let next = self.nodes[index];
        self.nodes.insert(index, node);
        self.curves[index - 1].connect_end(node);
        self.curves.insert(index, CubicBezierCurve::new(node, next));

        self.events.push(SplineEvent::NodeListChanged {
            added: vec![index],
            removed: Vec::new(),
        });
        self.events.push(SplineEvent::CurveChanged {
            curve_index: index - 1,
        });
        self.events.push(SplineEvent::CurveChanged { curve_index: index });
        self.touch();
    }

    /// Insert a copy of node `index` right after it and return the new index.
    /// Copies of the last node, or of the closing node of a loop, are appended.
    pub fn duplicate_node(&mut self, index: usize) -> Result<usize, SplineError> {
        let count = self.nodes.len();
        let node = *self
            .nodes
            .get(index)
            .ok_or(SplineError::NodeIndexOutOfRange { index, count })?;
        let copy = SplineNode::new(node.position(), node.direction());
        if index + 1 >= count {
            return Ok(self.add_node(copy));
        }
        self.insert_unchecked(index + 1, copy);
        Ok(index + 1)
    }

    /// Remove the node at `index` and return it. The spline is left untouched
    /// on error.
    pub fn remove_node(&mut self, index: usize) -> Result<SplineNode, SplineError> {
        let count = self.nodes.len();
        if index >= count {
            return Err(SplineError::NodeIndexOutOfRange { index, count });
        }
        let last = count - 1;
        if self.is_loop && index == last {
            return Err(SplineError::LoopClosingNode);
        }
        let min = if self.is_loop {
            Self::MIN_LOOP_NODES
        } else {
            Self::MIN_NODES
        };
        if count <= min {
            return Err(SplineError::TooFewNodes {
                count: count - 1,
                min,
            });
        }

        let removed = self.nodes.remove(index);
        if index == last {
            self.curves.remove(index - 1);
        } else {
            self.curves.remove(index);
            if index > 0 {
                let next = self.nodes[index];
                self.curves[index - 1].connect_end(next);
                self.events.push(SplineEvent::CurveChanged {
                    curve_index: index - 1,
                });
            }
        }
        self.events.push(SplineEvent::NodeListChanged {
            added: Vec::new(),
            removed: vec![index],
        });

        if self.is_loop && index == 0 {
            // The new first node is the loop anchor now.
            self.sync_loop_partner(0);
        }
        self.touch();
        Ok(removed)
    }

    /// Apply `edit` to node `index` and propagate the result to the adjacent
    /// curves and, on a loop, to the partner node.
    ///
    /// `edit` returns whether it changed anything; unchanged nodes raise no
    /// notification.
    pub fn update_node(
        &mut self,
        index: usize,
        edit: impl FnOnce(&mut SplineNode) -> bool,
    ) -> Result<bool, SplineError> {
        let count = self.nodes.len();
        let node = self
            .nodes
            .get_mut(index)
            .ok_or(SplineError::NodeIndexOutOfRange { index, count })?;
        if !edit(node) {
            return Ok(false);
        }
        self.refresh_curves_around(index);
        if self.is_loop {
            self.sync_loop_partner(index);
        }
        self.touch();
        Ok(true)
    }

    pub fn set_node_position(&mut self, index: usize, position: Point3) -> Result<bool, SplineError> {
        self.update_node(index, |n| n.set_position(position))
    }

    pub fn set_node_direction(&mut self, index: usize, direction: Point3) -> Result<bool, SplineError> {
        self.update_node(index, |n| n.set_direction(direction))
    }

    pub fn set_node_direction_in(
        &mut self,
        index: usize,
        direction_in: Point3,
    ) -> Result<bool, SplineError> {
        self.update_node(index, |n| n.set_direction_in(direction_in))
    }

    pub fn set_node_up(&mut self, index: usize, up: Vec3) -> Result<bool, SplineError> {
        self.update_node(index, |n| n.set_up(up))
    }

    pub fn set_node_scale(&mut self, index: usize, scale: Vec2) -> Result<bool, SplineError> {
        self.update_node(index, |n| n.set_scale(scale))
    }

    pub fn set_node_roll(&mut self, index: usize, roll: f64) -> Result<bool, SplineError> {
        self.update_node(index, |n| n.set_roll(roll))
    }

    pub fn set_node_tangent_mode(
        &mut self,
        index: usize,
        mode: TangentMode,
    ) -> Result<bool, SplineError> {
        self.update_node(index, |n| n.set_tangent_mode(mode))
    }

    /// Close or open the spline.
    ///
    /// Closing appends a copy of the first node; opening removes it again.
    pub fn set_loop(&mut self, is_loop: bool) {
        if self.is_loop == is_loop {
            return;
        }
        if is_loop {
            let first = self.nodes[0];
            let index = self.nodes.len();
            let previous = self.nodes[index - 1];
            self.nodes.push(first);
            self.curves.push(CubicBezierCurve::new(previous, first));
            self.events.push(SplineEvent::NodeListChanged {
                added: vec![index],
                removed: Vec::new(),
            });
            self.events.push(SplineEvent::CurveChanged {
                curve_index: index - 1,
            });
        } else {
            let index = self.nodes.len() - 1;
            self.nodes.pop();
            self.curves.pop();
            self.events.push(SplineEvent::NodeListChanged {
                added: Vec::new(),
                removed: vec![index],
            });
        }
        self.is_loop = is_loop;
        log::debug!(
            "spline loop {}: {} nodes, {} curves",
            if is_loop { "closed" } else { "opened" },
            self.nodes.len(),
            self.curves.len()
        );
        self.touch();
    }

    /// Sample at spline time `t` in `[0, node_count - 1]`; the integer part
    /// selects the curve and the remainder is the local time.
    pub fn sample(&self, t: f64) -> Result<CurveSample, SplineError> {
        let max = (self.nodes.len() - 1) as f64;
        if !t.is_finite() || t < 0.0 || t > max {
            return Err(CurveError::TimeOutOfRange { time: t, max }.into());
        }
        let index = (t.floor() as usize).min(self.curves.len() - 1);
        Ok(self.curves[index].sample_at_time(t - index as f64)?)
    }

    /// Sample at distance `d` from the start of the spline.
    pub fn sample_at_distance(&self, distance: f64) -> Result<CurveSample, CurveError> {
        let (index, local) = self.locate_distance(distance)?;
        self.curves[index].sample_at_distance(local)
    }

    /// Curve index and local distance for a spline distance.
    pub fn locate_distance(&self, distance: f64) -> Result<(usize, f64), CurveError> {
        if !distance.is_finite() || distance < 0.0 || distance > self.length {
            return Err(CurveError::DistanceOutOfRange {
                distance,
                length: self.length,
            });
        }
        let last = self.curves.len() - 1;
        let mut remaining = distance;
        for (i, curve) in self.curves.iter().enumerate() {
            if i == last {
                // absorbs the rounding between the summed length and the walk
                return Ok((i, remaining.clamp(0.0, curve.length())));
            }
            if remaining > curve.length() {
                remaining -= curve.length();
            } else {
                return Ok((i, remaining));
            }
        }
        Err(CurveError::SampleTableInconsistent)
    }

    /// Closest projection of `point` across all curves.
    pub fn projection_sample(&self, point: Point3) -> Result<SplineProjection, SplineError> {
        let mut best: Option<(SplineProjection, f64)> = None;
        let mut offset = 0.0;
        for (curve_index, curve) in self.curves.iter().enumerate() {
            let sample = curve.projection_sample(point)?;
            let d2 = sample.location().distance_squared_to(point);
            if best.as_ref().is_none_or(|(_, best_d2)| d2 < *best_d2) {
                best = Some((
                    SplineProjection {
                        curve_index,
                        sample,
                        distance: offset + sample.distance_in_curve(),
                    },
                    d2,
                ));
            }
            offset += curve.length();
        }
        best.map(|(projection, _)| projection)
            .ok_or(SplineError::Curve(CurveError::EmptySampleTable))
    }

    fn refresh_curves_around(&mut self, index: usize) {
        let node = self.nodes[index];
        if index > 0 {
            self.curves[index - 1].connect_end(node);
            self.events.push(SplineEvent::CurveChanged {
                curve_index: index - 1,
            });
        }
        if index < self.curves.len() {
            self.curves[index].connect_start(node);
            self.events.push(SplineEvent::CurveChanged { curve_index: index });
        }
    }

    /// Copy node `index` onto its loop partner when it is the first or the
    /// closing node. Writes fields directly, so it never re-enters itself.
    fn sync_loop_partner(&mut self, index: usize) {
        let last = self.nodes.len() - 1;
        let partner = if index == 0 {
            last
        } else if index == last {
            0
        } else {
            return;
        };
        let source = self.nodes[index];
        if self.nodes[partner].copy_transform_from(&source) {
            self.refresh_curves_around(partner);
        }
    }

    fn update_length(&mut self) {
        self.length = self.curves.iter().map(CubicBezierCurve::length).sum();
    }

    fn touch(&mut self) {
        self.update_length();
        self.revision = Revision::next();
    }
}

/// Two nodes bending around the Z axis, a visible starting point for editing.
impl Default for Spline {
    fn default() -> Self {
        Self::new(
            SplineNode::new(Point3::new(5.0, 0.0, 0.0), Point3::new(5.0, 0.0, -3.0)),
            SplineNode::new(Point3::new(10.0, 0.0, 0.0), Point3::new(10.0, 0.0, 3.0)),
        )
    }
}

impl SamplePath for Spline {
    fn length(&self) -> f64 {
        self.length
    }

    fn sample_at_distance(&self, distance: f64) -> Result<CurveSample, CurveError> {
        Spline::sample_at_distance(self, distance)
    }

    fn revision(&self) -> Revision {
        self.revision
    }
}
