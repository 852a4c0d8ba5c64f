//! Host-agnostic driver for one spline and the meshes generated from it.
//!
//! Edits go to the spline directly; [`EngineSession::tick`] is called once per
//! frame and rebuilds only the generators whose inputs changed.

use thiserror::Error;

use crate::geom::{
    BendError, ExtrusionError, ExtrusionSegment, GeomMesh, GeomMeshDiagnostics, MeshBender,
    Point3, ScaleRollGradient, ShapingError, SmoothOptions, Spline, SplineError, SplineNode,
    apply_scale_roll_gradient, smooth_spline,
};
use crate::parse::{self, ParseError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Spline(#[from] SplineError),
    #[error(transparent)]
    Extrusion(#[from] ExtrusionError),
    #[error(transparent)]
    Bend(#[from] BendError),
    #[error(transparent)]
    Shaping(#[from] ShapingError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

#[derive(Debug, Clone, Default)]
pub struct EngineSession {
    spline: Spline,
    extrusion: Option<ExtrusionSegment>,
    bender: Option<MeshBender>,
    mesh: GeomMesh,
    diagnostics: GeomMeshDiagnostics,
    /// Set when a generator was added or removed, so the combined mesh must be
    /// recomposed even if nothing rebuilt.
    recompose: bool,
    frame: u64,
}

impl EngineSession {
    #[must_use]
    pub fn new(spline: Spline) -> Self {
        Self {
            spline,
            ..Self::default()
        }
    }

    /// Session for a spline document, with its extrusion profile if present.
    pub fn from_document(xml: &str) -> Result<Self, SessionError> {
        let mut session = Self::default();
        session.load_document(xml)?;
        Ok(session)
    }

    /// Replace the spline and extrusion profile with the ones in `xml`. The
    /// bender, if any, is kept and follows the new spline.
    pub fn load_document(&mut self, xml: &str) -> Result<(), SessionError> {
        let document = parse::parse_str(xml)?;
        self.spline = document.spline;
        self.extrusion = document.profile;
        self.recompose = true;
        log::debug!(
            "session loaded spline with {} nodes (length {:.4})",
            self.spline.node_count(),
            self.spline.length()
        );
        Ok(())
    }

    pub fn to_document(&self) -> Result<String, SessionError> {
        Ok(parse::to_xml(&self.spline, self.extrusion.as_ref())?)
    }

    #[must_use]
    pub fn spline(&self) -> &Spline {
        &self.spline
    }

    /// Direct access for edits the session has no shortcut for. Changes are
    /// picked up by the next [`tick`](Self::tick) through the spline revision.
    pub fn spline_mut(&mut self) -> &mut Spline {
        &mut self.spline
    }

    pub fn add_node(&mut self, node: SplineNode) -> usize {
        self.spline.add_node(node)
    }

    pub fn duplicate_node(&mut self, index: usize) -> Result<usize, SessionError> {
        Ok(self.spline.duplicate_node(index)?)
    }

    pub fn remove_node(&mut self, index: usize) -> Result<SplineNode, SessionError> {
        Ok(self.spline.remove_node(index)?)
    }

    pub fn set_node_position(&mut self, index: usize, position: Point3) -> Result<bool, SessionError> {
        Ok(self.spline.set_node_position(index, position)?)
    }

    pub fn set_node_direction(&mut self, index: usize, direction: Point3) -> Result<bool, SessionError> {
        Ok(self.spline.set_node_direction(index, direction)?)
    }

    pub fn set_loop(&mut self, is_loop: bool) {
        self.spline.set_loop(is_loop);
    }

    pub fn smooth(&mut self, options: SmoothOptions) -> Result<(), SessionError> {
        Ok(smooth_spline(&mut self.spline, options)?)
    }

    pub fn apply_gradient(&mut self, gradient: ScaleRollGradient) -> Result<(), SessionError> {
        Ok(apply_scale_roll_gradient(&mut self.spline, gradient)?)
    }

    #[must_use]
    pub fn extrusion(&self) -> Option<&ExtrusionSegment> {
        self.extrusion.as_ref()
    }

    pub fn extrusion_mut(&mut self) -> Option<&mut ExtrusionSegment> {
        self.extrusion.as_mut()
    }

    pub fn set_extrusion(&mut self, extrusion: Option<ExtrusionSegment>) {
        self.extrusion = extrusion;
        self.recompose = true;
    }

    #[must_use]
    pub fn bender(&self) -> Option<&MeshBender> {
        self.bender.as_ref()
    }

    pub fn bender_mut(&mut self) -> Option<&mut MeshBender> {
        self.bender.as_mut()
    }

    pub fn set_bender(&mut self, bender: Option<MeshBender>) {
        self.bender = bender;
        self.recompose = true;
    }

    /// Run one frame: rebuild what changed and return the combined mesh when
    /// it differs from the previous frame.
    pub fn tick(&mut self) -> Result<Option<&GeomMesh>, SessionError> {
        self.frame += 1;
        let events = self.spline.drain_events();
        if !events.is_empty() {
            log::trace!("frame {}: {} spline change events", self.frame, events.len());
        }

        let mut rebuilt = false;
        if let Some(extrusion) = self.extrusion.as_mut() {
            rebuilt |= extrusion.compute_if_needed(&self.spline)?;
        }
        if let Some(bender) = self.bender.as_mut() {
            rebuilt |= bender.compute_if_needed(&self.spline)?;
        }
        if !rebuilt && !self.recompose {
            return Ok(None);
        }

        self.compose();
        self.recompose = false;
        log::debug!("frame {}: {}", self.frame, self.diagnostics.summary());
        Ok(Some(&self.mesh))
    }

    /// Combined output of the generators as of the last [`tick`](Self::tick).
    #[must_use]
    pub fn mesh(&self) -> &GeomMesh {
        &self.mesh
    }

    #[must_use]
    pub fn diagnostics(&self) -> &GeomMeshDiagnostics {
        &self.diagnostics
    }

    fn compose(&mut self) {
        let mut mesh = GeomMesh::default();
        let mut diagnostics = GeomMeshDiagnostics::default();
        if let Some(extrusion) = &self.extrusion {
            mesh.append(extrusion.mesh());
            diagnostics.merge(extrusion.diagnostics());
        }
        if let Some(bender) = &self.bender {
            mesh.append(bender.mesh());
            diagnostics.merge(bender.diagnostics());
        }
        self.mesh = mesh;
        self.diagnostics = diagnostics;
    }
}

#[cfg(test)]
mod tests {
    use super::{EngineSession, SessionError};
    use crate::geom::{
        BendError, ExtrusionSegment, FillingMode, MeshBender, Point3, ProfileVertex, SourceMesh,
        Spline, SplineError, SplineNode, box_mesh,
    };

    fn straight_session() -> EngineSession {
        let spline = Spline::new(
            SplineNode::new(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 0.0, 0.0)),
            SplineNode::new(Point3::new(10.0, 0.0, 0.0), Point3::new(11.0, 0.0, 0.0)),
        );
        EngineSession::new(spline)
    }

    #[test]
    fn tick_reports_only_changed_frames() {
        let mut session = straight_session();
        assert!(session.tick().unwrap().is_none());

        session.set_extrusion(Some(ExtrusionSegment::new(ProfileVertex::default_shape())));
        let mesh = session.tick().unwrap().expect("first frame builds");
        assert_eq!(mesh.vertex_count(), 303);
        assert!(session.tick().unwrap().is_none());

        session.set_node_position(1, Point3::new(10.0, 2.0, 0.0)).unwrap();
        assert!(session.tick().unwrap().is_some());
        assert_eq!(session.extrusion().unwrap().rebuild_count(), 2);

        // unchanged value, nothing to do
        session.set_node_position(1, Point3::new(10.0, 2.0, 0.0)).unwrap();
        assert!(session.tick().unwrap().is_none());
    }

    #[test]
    fn generators_are_combined() {
        let mut session = straight_session();
        session.set_extrusion(Some(ExtrusionSegment::new(ProfileVertex::default_shape())));
        let mut bender = MeshBender::new(SourceMesh::build(&box_mesh([2.0, 1.0, 1.0])));
        bender.set_filling_mode(FillingMode::Repeat);
        session.set_bender(Some(bender));

        let mesh = session.tick().unwrap().unwrap();
        assert_eq!(mesh.vertex_count(), 303 + 5 * 24);
        assert!(mesh.validate().is_ok());
        assert_eq!(session.diagnostics().copy_count, 5);

        session.set_extrusion(None);
        let mesh = session.tick().unwrap().expect("removing a generator recomposes");
        assert_eq!(mesh.vertex_count(), 5 * 24);
    }

    #[test]
    fn errors_leave_the_session_usable() {
        let mut session = straight_session();
        assert!(matches!(
            session.remove_node(0),
            Err(SessionError::Spline(SplineError::TooFewNodes { .. }))
        ));

        session.set_bender(Some(MeshBender::default()));
        assert!(matches!(
            session.tick(),
            Err(SessionError::Bend(BendError::MissingSource))
        ));

        session.set_bender(None);
        assert!(session.tick().unwrap().is_some());
        assert!(session.mesh().is_empty());
    }

    #[test]
    fn document_round_trip_keeps_the_profile() {
        let mut session = straight_session();
        let mut extrusion = ExtrusionSegment::new(ProfileVertex::default_shape());
        extrusion.set_sample_spacing(0.5).unwrap();
        session.set_extrusion(Some(extrusion));
        session.set_loop(true);

        let xml = session.to_document().unwrap();
        let mut loaded = EngineSession::from_document(&xml).unwrap();

        assert!(loaded.spline().is_loop());
        assert_eq!(loaded.spline().nodes(), session.spline().nodes());
        assert_eq!(loaded.extrusion().unwrap().sample_spacing(), 0.5);
        assert!(loaded.tick().unwrap().is_some());
    }

    #[test]
    fn bad_document_is_reported() {
        let mut session = straight_session();
        assert!(matches!(
            session.load_document("<spline/>"),
            Err(SessionError::Parse(_))
        ));
        assert_eq!(session.spline().node_count(), 2);
    }
}
