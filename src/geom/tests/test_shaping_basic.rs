use std::f64::consts::FRAC_1_SQRT_2;

use approx::assert_abs_diff_eq;

use super::straight_node;
use crate::geom::{
    Point3, ScaleRollGradient, ShapingError, SmoothOptions, Spline, SplineNode, Tolerance,
    apply_scale_roll_gradient, smooth_spline,
};

fn corner_path() -> Spline {
    Spline::from_nodes(
        [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0)]
            .into_iter()
            .map(|(x, y)| SplineNode::new(Point3::new(x, y, 0.0), Point3::new(x, y, 0.0)))
            .collect(),
    )
    .unwrap()
}

#[test]
fn smoothing_an_open_path() {
    let mut spline = corner_path();
    smooth_spline(&mut spline, SmoothOptions::default()).unwrap();

    let tol = Tolerance::new(1e-9);
    let h = 3.0 * FRAC_1_SQRT_2;
    assert!(tol.approx_eq_point3(spline.nodes()[0].direction(), Point3::new(1.5, 0.0, 0.0)));
    assert!(tol.approx_eq_point3(spline.nodes()[1].direction(), Point3::new(10.0 + h, h, 0.0)));
    assert!(tol.approx_eq_point3(spline.nodes()[2].direction(), Point3::new(10.0, 11.5, 0.0)));

    let middle = spline.nodes()[1];
    assert!(tol.approx_eq_point3(middle.direction_in(), Point3::new(10.0 - h, -h, 0.0)));
    assert_eq!(spline.curves()[0].control_points()[2], middle.direction_in());
}

#[test]
fn smoothing_a_loop_wraps_around() {
    let mut spline = corner_path();
    spline.add_node(SplineNode::new(Point3::new(0.0, 10.0, 0.0), Point3::new(0.0, 10.0, 0.0)));
    spline.set_loop(true);
    smooth_spline(&mut spline, SmoothOptions::default()).unwrap();

    let h = 3.0 * FRAC_1_SQRT_2;
    let tol = Tolerance::new(1e-9);
    assert!(tol.approx_eq_point3(spline.nodes()[0].direction(), Point3::new(h, -h, 0.0)));
    assert!(tol.approx_eq_point3(spline.nodes()[3].direction(), Point3::new(-h, 10.0 - h, 0.0)));
    assert_eq!(spline.nodes()[4], spline.nodes()[0]);
}

#[test]
fn smoothing_rejects_bad_curvature() {
    let mut spline = corner_path();
    let before = spline.clone();
    assert_eq!(
        smooth_spline(&mut spline, SmoothOptions { curvature: 1.5 }),
        Err(ShapingError::CurvatureOutOfRange(1.5))
    );
    assert!(smooth_spline(&mut spline, SmoothOptions { curvature: f64::NAN }).is_err());
    assert_eq!(spline, before);
}

#[test]
fn gradient_interpolates_by_distance() {
    let mut spline = Spline::from_nodes(vec![
        straight_node(0.0),
        straight_node(10.0),
        straight_node(20.0),
    ])
    .unwrap();
    let gradient = ScaleRollGradient {
        start_scale: 1.0,
        end_scale: 3.0,
        start_roll: 0.0,
        end_roll: 90.0,
    };
    apply_scale_roll_gradient(&mut spline, gradient).unwrap();

    let nodes = spline.nodes();
    assert_abs_diff_eq!(nodes[0].scale().x, 1.0, epsilon = 1e-12);
    assert_abs_diff_eq!(nodes[1].scale().x, 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(nodes[1].scale().y, 2.0, epsilon = 1e-9);
    assert_abs_diff_eq!(nodes[1].roll(), 45.0, epsilon = 1e-9);
    assert_abs_diff_eq!(nodes[2].scale().x, 3.0, epsilon = 1e-9);
    assert_abs_diff_eq!(nodes[2].roll(), 90.0, epsilon = 1e-9);

    // the curves see the new node values
    assert_abs_diff_eq!(spline.curves()[0].end_node().roll(), 45.0, epsilon = 1e-9);
}

#[test]
fn gradient_on_a_loop_leaves_the_closing_node_to_the_first() {
    let mut spline = corner_path();
    spline.add_node(SplineNode::new(Point3::new(0.0, 10.0, 0.0), Point3::new(1.0, 10.0, 0.0)));
    smooth_spline(&mut spline, SmoothOptions::default()).unwrap();
    spline.set_loop(true);

    apply_scale_roll_gradient(
        &mut spline,
        ScaleRollGradient {
            start_scale: 0.5,
            end_scale: 2.0,
            ..ScaleRollGradient::default()
        },
    )
    .unwrap();

    let last = spline.node_count() - 1;
    assert_eq!(spline.nodes()[last], spline.nodes()[0]);
    assert_abs_diff_eq!(spline.nodes()[0].scale().x, 0.5, epsilon = 1e-12);
    assert!(spline.nodes()[3].scale().x > spline.nodes()[1].scale().x);
}
