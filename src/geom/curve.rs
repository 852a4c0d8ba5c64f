use std::sync::atomic::{AtomicU64, Ordering};

use super::node::SplineNode;
use super::sample::CurveSample;
use super::{Point3, Tolerance, Vec3};

/// Number of sampling steps per curve. The table holds `STEP_COUNT + 1` samples.
pub const STEP_COUNT: usize = 30;

#[derive(Debug, thiserror::Error, Clone, PartialEq)]
pub enum CurveError {
    #[error("time {time} is outside [0, {max}]")]
    TimeOutOfRange { time: f64, max: f64 },
    #[error("distance {distance} is outside [0, {length}]")]
    DistanceOutOfRange { distance: f64, length: f64 },
    #[error("sample table has no bracketing pair for the query")]
    SampleTableInconsistent,
    #[error("sample table is empty")]
    EmptySampleTable,
}

/// Monotonic change stamp.
///
/// Every curve recompute and every spline mutation takes a fresh stamp, so a
/// consumer can detect changes by comparing the stamp it last built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Revision(u64);

impl Revision {
    #[must_use]
    pub fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(1);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Anything that can be walked by arc length: a single curve or a whole spline.
pub trait SamplePath {
    fn length(&self) -> f64;

    fn sample_at_distance(&self, distance: f64) -> Result<CurveSample, CurveError>;

    /// Stamp that changes whenever the geometry of the path changes.
    fn revision(&self) -> Revision;
}

/// A distance interval along a path. `end: None` means the end of the path.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PathInterval {
    pub start: f64,
    pub end: Option<f64>,
}

impl PathInterval {
    pub const FULL: Self = Self {
        start: 0.0,
        end: None,
    };

    #[must_use]
    pub const fn new(start: f64, end: Option<f64>) -> Self {
        Self { start, end }
    }

    /// Checks that do not depend on the path.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        if !self.start.is_finite() || self.start < 0.0 {
            return false;
        }
        match self.end {
            None => true,
            Some(end) => end.is_finite() && end > self.start,
        }
    }

    /// Resolve against a path length, returning `(start, end)`.
    ///
    /// `start` must lie in `[0, length)` (a zero-length path accepts 0) and an
    /// explicit end in `(start, length]`.
    #[must_use]
    pub fn resolve(&self, length: f64) -> Option<(f64, f64)> {
        if !self.is_well_formed() {
            return None;
        }
        let start_ok = self.start < length || (self.start == 0.0 && length == 0.0);
        if !start_ok {
            return None;
        }
        let end = match self.end {
            None => length,
            Some(end) if end <= length + Tolerance::LOOSE.eps => end.min(length),
            Some(_) => return None,
        };
        Some((self.start, end))
    }
}

/// Cubic Bézier segment between two node snapshots, with an arc-length table.
///
/// Distance and time lookups interpolate between table entries rather than
/// re-evaluating the polynomial, so their error is bounded by the
/// `1 / STEP_COUNT` sampling resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct CubicBezierCurve {
    n1: SplineNode,
    n2: SplineNode,
    samples: Vec<CurveSample>,
    length: f64,
    revision: Revision,
}

impl CubicBezierCurve {
    #[must_use]
    pub fn new(n1: SplineNode, n2: SplineNode) -> Self {
        let mut curve = Self {
            n1,
            n2,
            samples: Vec::with_capacity(STEP_COUNT + 1),
            length: 0.0,
            revision: Revision::next(),
        };
        curve.recompute_samples();
        curve
    }

    #[must_use]
    pub const fn start_node(&self) -> &SplineNode {
        &self.n1
    }

    #[must_use]
    pub const fn end_node(&self) -> &SplineNode {
        &self.n2
    }

    /// Replace the start node snapshot and resample.
    pub fn connect_start(&mut self, node: SplineNode) {
        self.n1 = node;
        self.recompute_samples();
    }

    /// Replace the end node snapshot and resample.
    pub fn connect_end(&mut self, node: SplineNode) {
        self.n2 = node;
        self.recompute_samples();
    }

    #[must_use]
    pub fn control_points(&self) -> [Point3; 4] {
        [
            self.n1.position(),
            self.n1.direction(),
            self.n2.direction_in(),
            self.n2.position(),
        ]
    }

    #[must_use]
    pub const fn length(&self) -> f64 {
        self.length
    }

    #[must_use]
    pub fn samples(&self) -> &[CurveSample] {
        &self.samples
    }

    #[must_use]
    pub const fn revision(&self) -> Revision {
        self.revision
    }

    /// Exact Bézier location at `t`.
    pub fn location_at(&self, t: f64) -> Result<Point3, CurveError> {
        check_time(t)?;
        Ok(self.evaluate(t))
    }

    /// Unit tangent at `t`.
    pub fn tangent_at(&self, t: f64) -> Result<Vec3, CurveError> {
        check_time(t)?;
        Ok(self.tangent_unchecked(t))
    }

    pub fn sample_at_time(&self, time: f64) -> Result<CurveSample, CurveError> {
        check_time(time)?;
        self.lookup(time, CurveSample::time_in_curve)
    }

    pub fn sample_at_distance(&self, distance: f64) -> Result<CurveSample, CurveError> {
        if !distance.is_finite() || distance < 0.0 || distance > self.length {
            return Err(CurveError::DistanceOutOfRange {
                distance,
                length: self.length,
            });
        }
        self.lookup(distance, CurveSample::distance_in_curve)
    }

    /// Sample on the curve closest to `point`, refined on the nearest chord of
    /// the table.
    pub fn projection_sample(&self, point: Point3) -> Result<CurveSample, CurveError> {
        let closest = self
            .samples
            .iter()
            .enumerate()
            .map(|(i, s)| (i, s.location().distance_squared_to(point)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
            .ok_or(CurveError::EmptySampleTable)?;

        let last = self.samples.len() - 1;
        if last == 0 {
            return Ok(self.samples[0]);
        }
        let (prev, next) = if closest == 0 {
            (0, 1)
        } else if closest == last {
            (last - 1, last)
        } else {
            let to_prev = self.samples[closest - 1].location().distance_squared_to(point);
            let to_next = self.samples[closest + 1].location().distance_squared_to(point);
            if to_prev < to_next {
                (closest - 1, closest)
            } else {
                (closest, closest + 1)
            }
        };

        let a = &self.samples[prev];
        let b = &self.samples[next];
        let chord = b.location() - a.location();
        let chord_len2 = chord.length_squared();
        let rate = if chord_len2 > Tolerance::ZERO_LENGTH.eps_squared() {
            ((point - a.location()).dot(chord) / chord_len2).clamp(0.0, 1.0)
        } else {
            0.0
        };
        Ok(CurveSample::lerp(a, b, rate))
    }

    /// Rebuild the sample table from the current node snapshots.
    pub fn recompute_samples(&mut self) {
        self.samples.clear();
        self.length = 0.0;

        if self.is_degenerate() {
            self.fill_degenerate();
            return;
        }

        let mut previous = self.evaluate(0.0);
        for i in 0..STEP_COUNT {
            let t = i as f64 / STEP_COUNT as f64;
            let location = self.evaluate(t);
            self.length += previous.distance_to(location);
            previous = location;
            let sample = self.create_sample(self.length, t);
            self.samples.push(sample);
        }
        self.length += previous.distance_to(self.evaluate(1.0));
        let last = self.create_sample(self.length, 1.0);
        self.samples.push(last);

        self.revision = Revision::next();
        log::trace!(
            "curve resampled: {} samples, length {:.6}",
            self.samples.len(),
            self.length
        );
    }

    /// All four control points within `Tolerance::ZERO_LENGTH` of the start.
    fn is_degenerate(&self) -> bool {
        let [p0, rest @ ..] = self.control_points();
        rest.iter()
            .all(|p| p.distance_squared_to(p0) <= Tolerance::ZERO_LENGTH.eps_squared())
    }

    /// Zero-length table pinned to the start point, so rounding in the
    /// polynomial cannot leak into the length or the tangents.
    fn fill_degenerate(&mut self) {
        let [p0, .., p3] = self.control_points();
        let tangent = (p3 - p0).normalized().unwrap_or(Vec3::Z);
        log::warn!("curve control points coincide at {p0:?}, using a zero-length table");
        for i in 0..=STEP_COUNT {
            let t = i as f64 / STEP_COUNT as f64;
            let sample = CurveSample::new(
                p0,
                tangent,
                self.n1.up().lerp(self.n2.up(), t),
                self.n1.scale().lerp(self.n2.scale(), t),
                self.n1.roll() + (self.n2.roll() - self.n1.roll()) * t,
                0.0,
                t,
            );
            self.samples.push(sample);
        }
        self.revision = Revision::next();
    }

    /// Smallest vector length that is not rounding noise for these control
    /// points.
    fn noise_floor(&self) -> f64 {
        let magnitude = self
            .control_points()
            .iter()
            .map(|p| p.x.abs().max(p.y.abs()).max(p.z.abs()))
            .fold(1.0, f64::max);
        64.0 * f64::EPSILON * magnitude
    }

    fn create_sample(&self, distance: f64, t: f64) -> CurveSample {
        CurveSample::new(
            self.evaluate(t),
            self.tangent_unchecked(t),
            self.n1.up().lerp(self.n2.up(), t),
            self.n1.scale().lerp(self.n2.scale(), t),
            self.n1.roll() + (self.n2.roll() - self.n1.roll()) * t,
            distance,
            t,
        )
    }

    /// Bracket `key` in the table with a binary search and interpolate.
    fn lookup(&self, key: f64, field: fn(&CurveSample) -> f64) -> Result<CurveSample, CurveError> {
        if self.samples.is_empty() {
            return Err(CurveError::EmptySampleTable);
        }
        let idx = self.samples.partition_point(|s| field(s) < key);
        if idx == 0 {
            return Ok(self.samples[0]);
        }
        let next = self
            .samples
            .get(idx)
            .ok_or(CurveError::SampleTableInconsistent)?;
        let prev = &self.samples[idx - 1];
        let span = field(next) - field(prev);
        let local = if span > 0.0 {
            (key - field(prev)) / span
        } else {
            0.0
        };
        Ok(CurveSample::lerp(prev, next, local))
    }

    fn evaluate(&self, t: f64) -> Point3 {
        let [p0, p1, p2, p3] = self.control_points().map(Point3::to_vec3);
        let omt = 1.0 - t;
        let omt2 = omt * omt;
        let t2 = t * t;
        Point3::from(p0 * (omt2 * omt) + p1 * (3.0 * omt2 * t) + p2 * (3.0 * omt * t2) + p3 * (t2 * t))
    }

    /// Derivative direction at `t`. Coincident control points fall back to a
    /// finite difference, then the chord, then +Z.
    fn tangent_unchecked(&self, t: f64) -> Vec3 {
        let [p0, p1, p2, p3] = self.control_points().map(Point3::to_vec3);
        let omt = 1.0 - t;
        let omt2 = omt * omt;
        let t2 = t * t;
        let derivative = p0 * (-omt2) + p1 * (3.0 * omt2 - 2.0 * omt) + p2 * (-3.0 * t2 + 2.0 * t) + p3 * t2;

        let floor = self.noise_floor();
        if derivative.length() > floor.max(Tolerance::ZERO_LENGTH.eps) {
            if let Some(tangent) = derivative.normalized() {
                return tangent;
            }
        }

        let h = Tolerance::DERIVATIVE.eps;
        let t0 = (t - h).max(0.0);
        let t1 = (t + h).min(1.0);
        let difference = self.evaluate(t1) - self.evaluate(t0);
        if difference.length() > floor {
            if let Some(tangent) = difference.normalized() {
                return tangent;
            }
        }

        log::warn!("degenerate curve tangent at t={t}, using chord direction");
        (p3 - p0).normalized().unwrap_or(Vec3::Z)
    }
}

impl SamplePath for CubicBezierCurve {
    fn length(&self) -> f64 {
        self.length
    }

    fn sample_at_distance(&self, distance: f64) -> Result<CurveSample, CurveError> {
        CubicBezierCurve::sample_at_distance(self, distance)
    }

    fn revision(&self) -> Revision {
        self.revision
    }
}

fn check_time(t: f64) -> Result<(), CurveError> {
    if t.is_finite() && (0.0..=1.0).contains(&t) {
        Ok(())
    } else {
        Err(CurveError::TimeOutOfRange { time: t, max: 1.0 })
    }
}
