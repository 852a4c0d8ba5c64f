//! XML documents for splines and their extrusion profile.
//!
//! ```xml
//! <spline loop="true">
//!   <node roll="0" tangent="mirrored">
//!     <position x="0" y="0" z="0"/>
//!     <direction x="1" y="0" z="0"/>
//!     <up x="0" y="1" z="0"/>
//!     <scale x="1" y="1"/>
//!   </node>
//!   <!-- more nodes -->
//!   <profile spacing="0.1" textureScale="1" textureOffset="0">
//!     <vertex u="0"><point x="0" y="0.5"/><normal x="0" y="1"/></vertex>
//!   </profile>
//! </spline>
//! ```
//!
//! A looped spline stores its distinct nodes only; the closing node is
//! recreated on load. Free nodes carry an extra `<direction_in>` element.

use quick_xml::de::from_str;
use quick_xml::se::to_string_with_root;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geom::{
    ExtrusionError, ExtrusionSegment, Point3, ProfileVertex, Spline, SplineError, SplineNode,
    TangentMode, Vec2, Vec3,
};

/// Result type for reading and writing spline documents.
pub type ParseResult<T> = Result<T, ParseError>;

#[derive(Debug, Error)]
pub enum ParseError {
    /// The document is not well-formed XML or does not match the layout.
    /// Also reported when writing fails.
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::DeError),
    #[error("invalid spline document: {0}")]
    Invalid(String),
    #[error(transparent)]
    Spline(#[from] SplineError),
    #[error(transparent)]
    Extrusion(#[from] ExtrusionError),
}

/// A loaded spline plus the extrusion profile stored next to it, if any.
#[derive(Debug, Clone)]
pub struct SplineDocument {
    pub spline: Spline,
    pub profile: Option<ExtrusionSegment>,
}

/// Read a spline document.
pub fn parse_str(input: &str) -> ParseResult<SplineDocument> {
    let document: XmlSpline = from_str(input)?;
    log::debug!(
        "parsing spline document: {} nodes, loop {}, profile {}",
        document.nodes.len(),
        document.is_loop,
        document.profile.is_some()
    );

    let nodes = document
        .nodes
        .iter()
        .enumerate()
        .map(|(index, node)| node.to_node(index))
        .collect::<ParseResult<Vec<_>>>()?;
    let mut spline = Spline::from_nodes(nodes)?;
    spline.set_loop(document.is_loop);
    // a freshly loaded spline has nothing to report
    spline.drain_events();

    let profile = document
        .profile
        .map(XmlProfile::into_segment)
        .transpose()?;

    Ok(SplineDocument { spline, profile })
}

/// Write `spline` and an optional extrusion profile as a document.
pub fn to_xml(spline: &Spline, profile: Option<&ExtrusionSegment>) -> ParseResult<String> {
    let document = XmlSpline {
        is_loop: spline.is_loop(),
        nodes: spline.distinct_nodes().iter().map(XmlNode::from_node).collect(),
        profile: profile.map(XmlProfile::from_segment),
    };
    Ok(to_string_with_root("spline", &document)?)
}

fn finite_point(point: &XmlPoint3, what: &str, index: usize) -> ParseResult<Point3> {
    if [point.x, point.y, point.z].iter().all(|c| c.is_finite()) {
        Ok(Point3::new(point.x, point.y, point.z))
    } else {
        Err(ParseError::Invalid(format!(
            "node {index}: {what} has a non-finite coordinate"
        )))
    }
}

fn finite_vec2(point: &XmlPoint2, what: &str, index: usize) -> ParseResult<Vec2> {
    let v = Vec2::new(point.x, point.y);
    if v.is_finite() {
        Ok(v)
    } else {
        Err(ParseError::Invalid(format!(
            "{what} {index} has a non-finite coordinate"
        )))
    }
}

fn default_spacing() -> f64 {
    ExtrusionSegment::DEFAULT_SAMPLE_SPACING
}

fn default_texture_scale() -> f64 {
    1.0
}

fn default_tangent() -> String {
    TANGENT_MIRRORED.to_owned()
}

const TANGENT_MIRRORED: &str = "mirrored";
const TANGENT_FREE: &str = "free";

#[derive(Debug, Deserialize, Serialize)]
struct XmlSpline {
    #[serde(rename = "@loop", default)]
    is_loop: bool,
    #[serde(rename = "node", default)]
    nodes: Vec<XmlNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    profile: Option<XmlProfile>,
}

#[derive(Debug, Deserialize, Serialize)]
struct XmlNode {
    #[serde(rename = "@roll", default)]
    roll: f64,
    #[serde(rename = "@tangent", default = "default_tangent")]
    tangent: String,
    position: XmlPoint3,
    direction: XmlPoint3,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    direction_in: Option<XmlPoint3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    up: Option<XmlPoint3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scale: Option<XmlPoint2>,
}

impl XmlNode {
    fn from_node(node: &SplineNode) -> Self {
        let (tangent, direction_in) = match node.tangent_mode() {
            TangentMode::Mirrored => (TANGENT_MIRRORED, None),
            TangentMode::Free => (TANGENT_FREE, Some(node.direction_in().into())),
        };
        Self {
            roll: node.roll(),
            tangent: tangent.to_owned(),
            position: node.position().into(),
            direction: node.direction().into(),
            direction_in,
            up: Some(Point3::from(node.up()).into()),
            scale: Some(XmlPoint2 {
                x: node.scale().x,
                y: node.scale().y,
            }),
        }
    }

    fn to_node(&self, index: usize) -> ParseResult<SplineNode> {
        if !self.roll.is_finite() {
            return Err(ParseError::Invalid(format!("node {index}: roll is not finite")));
        }
        let position = finite_point(&self.position, "position", index)?;
        let direction = finite_point(&self.direction, "direction", index)?;
        let mut node = SplineNode::new(position, direction).with_roll(self.roll);

        if let Some(up) = &self.up {
            node = node.with_up(Vec3::from(finite_point(up, "up", index)?));
        }
        if let Some(scale) = &self.scale {
            node = node.with_scale(finite_vec2(scale, "node scale", index)?);
        }

        match self.tangent.as_str() {
            TANGENT_MIRRORED => Ok(node),
            TANGENT_FREE => {
                let direction_in = match &self.direction_in {
                    Some(point) => finite_point(point, "direction_in", index)?,
                    None => node.direction_in(),
                };
                Ok(node.with_direction_in(direction_in))
            }
            other => Err(ParseError::Invalid(format!(
                "node {index}: unknown tangent mode '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct XmlProfile {
    #[serde(rename = "@spacing", default = "default_spacing")]
    spacing: f64,
    #[serde(rename = "@textureScale", default = "default_texture_scale")]
    texture_scale: f64,
    #[serde(rename = "@textureOffset", default)]
    texture_offset: f64,
    #[serde(rename = "vertex", default)]
    vertices: Vec<XmlProfileVertex>,
}

impl XmlProfile {
    fn from_segment(segment: &ExtrusionSegment) -> Self {
        Self {
            spacing: segment.sample_spacing(),
            texture_scale: segment.texture_scale(),
            texture_offset: segment.texture_offset(),
            vertices: segment
                .shape()
                .iter()
                .map(|v| XmlProfileVertex {
                    u: v.u,
                    point: XmlPoint2 {
                        x: v.point.x,
                        y: v.point.y,
                    },
                    normal: XmlPoint2 {
                        x: v.normal.x,
                        y: v.normal.y,
                    },
                })
                .collect(),
        }
    }

    fn into_segment(self) -> ParseResult<ExtrusionSegment> {
        if self.vertices.is_empty() {
            return Err(ExtrusionError::EmptyShape.into());
        }
        if !self.texture_scale.is_finite() || !self.texture_offset.is_finite() {
            return Err(ParseError::Invalid(
                "profile texture scale and offset must be finite".to_owned(),
            ));
        }

        let shape = self
            .vertices
            .iter()
            .enumerate()
            .map(|(index, v)| {
                if !v.u.is_finite() {
                    return Err(ParseError::Invalid(format!(
                        "profile vertex {index} has a non-finite u"
                    )));
                }
                Ok(ProfileVertex::new(
                    finite_vec2(&v.point, "profile vertex", index)?,
                    finite_vec2(&v.normal, "profile normal", index)?,
                    v.u,
                ))
            })
            .collect::<ParseResult<Vec<_>>>()?;

        let mut segment = ExtrusionSegment::new(shape);
        segment.set_sample_spacing(self.spacing)?;
        segment.set_texture_scale(self.texture_scale);
        segment.set_texture_offset(self.texture_offset);
        Ok(segment)
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct XmlProfileVertex {
    #[serde(rename = "@u", default)]
    u: f64,
    point: XmlPoint2,
    normal: XmlPoint2,
}

#[derive(Debug, Deserialize, Serialize)]
struct XmlPoint3 {
    #[serde(rename = "@x")]
    x: f64,
    #[serde(rename = "@y")]
    y: f64,
    #[serde(rename = "@z")]
    z: f64,
}

impl From<Point3> for XmlPoint3 {
    fn from(p: Point3) -> Self {
        Self {
            x: p.x,
            y: p.y,
            z: p.z,
        }
    }
}

#[derive(Debug, Deserialize, Serialize)]
struct XmlPoint2 {
    #[serde(rename = "@x")]
    x: f64,
    #[serde(rename = "@y")]
    y: f64,
}

#[cfg(test)]
mod tests {
    use super::{ParseError, parse_str, to_xml};
    use crate::geom::{
        ExtrusionError, Point3, ProfileVertex, SplineError, TangentMode, Vec2, Vec3,
    };

    const SQUARE: &str = r#"
        <spline loop="true">
          <node roll="15">
            <position x="0" y="0" z="0"/>
            <direction x="2" y="-2" z="0"/>
          </node>
          <node>
            <position x="10" y="0" z="0"/>
            <direction x="12" y="2" z="0"/>
            <up x="0" y="0" z="1"/>
            <scale x="2" y="0.5"/>
          </node>
          <node tangent="free">
            <position x="10" y="10" z="0"/>
            <direction x="8" y="12" z="0"/>
            <direction_in x="10" y="7" z="0"/>
          </node>
          <profile spacing="0.25" textureScale="2" textureOffset="0.5">
            <vertex u="0"><point x="0" y="0.5"/><normal x="0" y="1"/></vertex>
            <vertex u="0.5"><point x="1" y="-0.5"/><normal x="1" y="-1"/></vertex>
            <vertex u="1"><point x="-1" y="-0.5"/><normal x="-1" y="-1"/></vertex>
          </profile>
        </spline>
    "#;

    #[test]
    fn parses_looped_spline_with_profile() {
        let document = parse_str(SQUARE).expect("document parsed");
        let spline = &document.spline;

        assert!(spline.is_loop());
        assert_eq!(spline.distinct_nodes().len(), 3);
        assert_eq!(spline.node_count(), 4);
        assert_eq!(spline.nodes()[3], spline.nodes()[0]);
        assert!(!spline.has_pending_events());

        let first = spline.nodes()[0];
        assert_eq!(first.roll(), 15.0);
        assert_eq!(first.up(), Vec3::Y);
        assert_eq!(first.scale(), Vec2::ONE);
        assert_eq!(first.direction_in(), Point3::new(-2.0, 2.0, 0.0));

        let second = spline.nodes()[1];
        assert_eq!(second.up(), Vec3::Z);
        assert_eq!(second.scale(), Vec2::new(2.0, 0.5));

        let third = spline.nodes()[2];
        assert_eq!(third.tangent_mode(), TangentMode::Free);
        assert_eq!(third.direction_in(), Point3::new(10.0, 7.0, 0.0));

        let profile = document.profile.expect("profile present");
        assert_eq!(profile.shape().len(), 3);
        assert_eq!(profile.sample_spacing(), 0.25);
        assert_eq!(profile.texture_scale(), 2.0);
        assert_eq!(profile.texture_offset(), 0.5);
        assert_eq!(profile.shape()[1].u, 0.5);
    }

    #[test]
    fn written_document_reads_back() {
        let document = parse_str(SQUARE).unwrap();
        let xml = to_xml(&document.spline, document.profile.as_ref()).unwrap();
        assert!(xml.starts_with("<spline"));
        assert_eq!(xml.matches("<node").count(), 3);

        let again = parse_str(&xml).unwrap();
        assert_eq!(again.spline.nodes(), document.spline.nodes());
        assert_eq!(again.spline.is_loop(), document.spline.is_loop());
        let profile = again.profile.unwrap();
        assert_eq!(profile.shape(), document.profile.unwrap().shape());
        assert_eq!(profile.sample_spacing(), 0.25);
    }

    #[test]
    fn spline_without_profile() {
        let xml = r#"
            <spline>
              <node><position x="0" y="0" z="0"/><direction x="1" y="0" z="0"/></node>
              <node><position x="10" y="0" z="0"/><direction x="11" y="0" z="0"/></node>
            </spline>
        "#;
        let document = parse_str(xml).unwrap();
        assert!(!document.spline.is_loop());
        assert!(document.profile.is_none());
        assert!((document.spline.length() - 10.0).abs() < 1e-9);

        let written = to_xml(&document.spline, None).unwrap();
        assert!(!written.contains("<profile"));
        assert!(!written.contains("direction_in"));
    }

    #[test]
    fn single_node_is_rejected() {
        let xml = r#"
            <spline>
              <node><position x="0" y="0" z="0"/><direction x="1" y="0" z="0"/></node>
            </spline>
        "#;
        assert!(matches!(
            parse_str(xml),
            Err(ParseError::Spline(SplineError::TooFewNodes { count: 1, min: 2 }))
        ));
    }

    #[test]
    fn bad_values_are_rejected() {
        let tangent = r#"
            <spline>
              <node tangent="sideways"><position x="0" y="0" z="0"/><direction x="1" y="0" z="0"/></node>
              <node><position x="10" y="0" z="0"/><direction x="11" y="0" z="0"/></node>
            </spline>
        "#;
        assert!(matches!(parse_str(tangent), Err(ParseError::Invalid(_))));

        let nan = r#"
            <spline>
              <node><position x="NaN" y="0" z="0"/><direction x="1" y="0" z="0"/></node>
              <node><position x="10" y="0" z="0"/><direction x="11" y="0" z="0"/></node>
            </spline>
        "#;
        assert!(matches!(parse_str(nan), Err(ParseError::Invalid(_))));

        let spacing = r#"
            <spline>
              <node><position x="0" y="0" z="0"/><direction x="1" y="0" z="0"/></node>
              <node><position x="10" y="0" z="0"/><direction x="11" y="0" z="0"/></node>
              <profile spacing="0"><vertex><point x="0" y="0"/><normal x="0" y="1"/></vertex></profile>
            </spline>
        "#;
        assert!(matches!(
            parse_str(spacing),
            Err(ParseError::Extrusion(ExtrusionError::NonPositiveSampleSpacing { .. }))
        ));

        assert!(matches!(parse_str("<spline><node>"), Err(ParseError::Xml(_))));
    }

    #[test]
    fn default_profile_settings() {
        let xml = r#"
            <spline>
              <node><position x="0" y="0" z="0"/><direction x="1" y="0" z="0"/></node>
              <node><position x="10" y="0" z="0"/><direction x="11" y="0" z="0"/></node>
              <profile>
                <vertex u="0"><point x="0" y="0.5"/><normal x="0" y="1"/></vertex>
                <vertex u="0.33"><point x="1" y="-0.5"/><normal x="1" y="-1"/></vertex>
                <vertex u="0.66"><point x="-1" y="-0.5"/><normal x="-1" y="-1"/></vertex>
              </profile>
            </spline>
        "#;
        let profile = parse_str(xml).unwrap().profile.unwrap();
        assert_eq!(profile.shape(), ProfileVertex::default_shape().as_slice());
        assert_eq!(profile.sample_spacing(), 0.1);
        assert_eq!(profile.texture_scale(), 1.0);
        assert_eq!(profile.texture_offset(), 0.0);
    }
}
