//! Opt-in timing hooks for mesh rebuilds.
//!
//! Timing is only collected when the `mesh_engine_metrics` feature is enabled and
//! the target is not `wasm32` (`std::time::Instant` is unavailable there). In every
//! other configuration [`GeomMetrics`] is a zero-sized type whose calls compile to
//! plain closure invocations.
//!
//! ```ignore
//! use spline_engine::geom::{GeomMetrics, TimingBucket};
//!
//! let mut metrics = GeomMetrics::default();
//! metrics.begin();
//! let mesh = metrics.time(TimingBucket::Extrusion, || build_rings(path));
//! if let Some(report) = metrics.end() {
//!     println!("extrusion: {} ns", report.extrusion_ns);
//! }
//! ```

/// Phases of a mesh rebuild that can be timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimingBucket {
    /// Curve sample lookups and sample cache fills.
    CurveSampling,
    Bending,
    /// Ring vertices and the quad strip.
    Extrusion,
    /// Edge topology and degenerate-triangle counting.
    Diagnostics,
}

/// Nanoseconds spent per [`TimingBucket`] during one rebuild.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct GeomTimingReport {
    pub curve_sampling_ns: u64,
    pub bending_ns: u64,
    pub extrusion_ns: u64,
    pub diagnostics_ns: u64,
}

impl GeomTimingReport {
    #[must_use]
    pub fn total_ns(&self) -> u64 {
        [
            self.curve_sampling_ns,
            self.bending_ns,
            self.extrusion_ns,
            self.diagnostics_ns,
        ]
        .into_iter()
        .fold(0, u64::saturating_add)
    }

    #[must_use]
    pub fn total_ms(&self) -> f64 {
        self.total_ns() as f64 / 1_000_000.0
    }

    #[cfg_attr(
        not(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32"))),
        allow(dead_code)
    )]
    fn bucket_mut(&mut self, bucket: TimingBucket) -> &mut u64 {
        match bucket {
            TimingBucket::CurveSampling => &mut self.curve_sampling_ns,
            TimingBucket::Bending => &mut self.bending_ns,
            TimingBucket::Extrusion => &mut self.extrusion_ns,
            TimingBucket::Diagnostics => &mut self.diagnostics_ns,
        }
    }
}

cfg_if::cfg_if! {
    if #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))] {
        /// Accumulator for timing rebuild phases.
        #[derive(Debug, Default)]
        pub struct GeomMetrics {
            report: GeomTimingReport,
        }

        impl GeomMetrics {
            pub fn begin(&mut self) {
                self.report = GeomTimingReport::default();
            }

            #[must_use]
            pub fn end(&self) -> Option<GeomTimingReport> {
                Some(self.report.clone())
            }

            /// Runs `f` and adds its wall time to `bucket`.
            pub fn time<R>(&mut self, bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
                let start = std::time::Instant::now();
                let result = f();
                let nanos = u64::try_from(start.elapsed().as_nanos()).unwrap_or(u64::MAX);
                let slot = self.report.bucket_mut(bucket);
                *slot = slot.saturating_add(nanos);
                result
            }
        }
    } else {
        /// Accumulator for timing rebuild phases; disabled in this build, so
        /// [`end`](Self::end) always returns `None`.
        #[derive(Debug, Default)]
        pub struct GeomMetrics;

        impl GeomMetrics {
            pub fn begin(&mut self) {}

            #[must_use]
            pub fn end(&self) -> Option<GeomTimingReport> {
                None
            }

            pub fn time<R>(&mut self, _bucket: TimingBucket, f: impl FnOnce() -> R) -> R {
                f()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timing_report_total() {
        let report = GeomTimingReport {
            curve_sampling_ns: 1000,
            bending_ns: 2000,
            extrusion_ns: 3000,
            diagnostics_ns: 0,
        };
        assert_eq!(report.total_ns(), 6000);
        assert!((report.total_ms() - 0.006).abs() < 1e-9);

        let saturated = GeomTimingReport {
            bending_ns: u64::MAX,
            extrusion_ns: 1,
            ..Default::default()
        };
        assert_eq!(saturated.total_ns(), u64::MAX);
    }

    #[test]
    fn test_time_returns_closure_result() {
        let mut metrics = GeomMetrics::default();
        metrics.begin();
        assert_eq!(metrics.time(TimingBucket::Bending, || 42), 42);
    }

    #[cfg(not(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32"))))]
    #[test]
    fn test_disabled_metrics_report_nothing() {
        let mut metrics = GeomMetrics::default();
        metrics.begin();
        metrics.time(TimingBucket::Extrusion, || ());
        assert!(metrics.end().is_none());
    }

    #[cfg(all(feature = "mesh_engine_metrics", not(target_arch = "wasm32")))]
    #[test]
    fn test_enabled_metrics_fill_the_bucket() {
        let mut metrics = GeomMetrics::default();
        metrics.begin();
        metrics.time(TimingBucket::CurveSampling, || std::thread::sleep(std::time::Duration::from_millis(1)));
        let report = metrics.end().expect("metrics enabled");
        assert!(report.curve_sampling_ns > 0);
        assert_eq!(report.bending_ns, 0);
    }
}
