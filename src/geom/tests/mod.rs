mod test_bender_basic;
mod test_shaping_basic;

use crate::geom::{Point3, SplineNode};

/// Node on the X axis with its handle one unit further along +X.
fn straight_node(x: f64) -> SplineNode {
    SplineNode::new(Point3::new(x, 0.0, 0.0), Point3::new(x + 1.0, 0.0, 0.0))
}
