//! Persisted spline documents.

pub mod spline_xml;

pub use spline_xml::{ParseError, ParseResult, SplineDocument, parse_str, to_xml};
