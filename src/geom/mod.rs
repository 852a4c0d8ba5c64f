mod bender;
mod core;
mod curve;
mod diagnostics;
mod extrusion;
mod mesh;
mod metrics;
mod node;
mod profile;
mod sample;
mod shaping;
mod source_mesh;
mod spline;

pub use bender::{BendError, FillingMode, MeshBender};
pub use core::{BBox, Point3, Quat, Tolerance, Vec2, Vec3};
pub use curve::{
    CubicBezierCurve, CurveError, PathInterval, Revision, STEP_COUNT, SamplePath,
};
pub use diagnostics::GeomMeshDiagnostics;
pub use extrusion::{ExtrusionError, ExtrusionSegment, ProfileVertex};
pub use mesh::{GeomMesh, box_mesh, reversed_triangles};
pub use metrics::{GeomMetrics, GeomTimingReport, TimingBucket};
pub use node::{SplineNode, TangentMode};
pub use profile::{half_profile_with_base, mirrored_profile};
pub use sample::{CurveSample, MeshVertex};
pub use shaping::{
    ScaleRollGradient, ShapingError, SmoothOptions, apply_scale_roll_gradient, smooth_spline,
};
pub use source_mesh::SourceMesh;
pub use spline::{Spline, SplineError, SplineEvent, SplineProjection};

#[cfg(test)]
mod tests;
