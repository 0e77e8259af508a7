// Copyright 2025 the Quadrille Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Geometry utilities for line segments and Bézier curves.
//!
//! The partitioner only ever sees lines and *monotone* quadratic curves;
//! the solvers here rely on that. Cubics appear only transiently inside the
//! legalizer, which reduces them to quadratics.

use crate::Point;

/// Tolerance for parametric and positional comparisons.
pub const EPSILON: f32 = 0.001;

#[inline]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
fn det2x2(m: &[f32; 4]) -> f32 {
    m[0] * m[3] - m[1] * m[2]
}

#[inline]
fn det3x3(m: &[f32; 9]) -> f32 {
    m[0] * det2x2(&[m[4], m[5], m[7], m[8]]) - m[1] * det2x2(&[m[3], m[5], m[6], m[8]])
        + m[2] * det2x2(&[m[3], m[4], m[6], m[7]])
}

/// A straight line segment.
#[derive(Clone, Copy, Debug)]
pub struct Line {
    pub p0: Point,
    pub p1: Point,
}

impl Line {
    #[inline]
    pub fn new(p0: Point, p1: Point) -> Line {
        Line { p0, p1 }
    }

    #[inline]
    pub fn sample(&self, t: f32) -> Point {
        self.p0.lerp(self.p1, t)
    }

    /// Which side of the line the point falls on, as a signed area.
    #[inline]
    pub fn side(&self, point: Point) -> f32 {
        (self.p1 - self.p0).cross(point - self.p0)
    }
}

/// A quadratic Bézier curve.
#[derive(Clone, Copy, Debug)]
pub struct Curve {
    pub p0: Point,
    pub control_point: Point,
    pub p1: Point,
}

impl Curve {
    #[inline]
    pub fn new(p0: Point, control_point: Point, p1: Point) -> Curve {
        Curve {
            p0,
            control_point,
            p1,
        }
    }

    #[inline]
    pub fn sample(&self, t: f32) -> Point {
        let (ap1, bp1) = (
            self.p0.lerp(self.control_point, t),
            self.control_point.lerp(self.p1, t),
        );
        ap1.lerp(bp1, t)
    }

    /// The parametric time of the curve's local extremum along one axis,
    /// if it lies strictly inside the segment.
    #[inline]
    pub fn local_extremum(p0: f32, p1: f32, p2: f32) -> Option<f32> {
        let denom = p0 - 2.0 * p1 + p2;
        if denom == 0.0 {
            return None;
        }
        let t = (p0 - p1) / denom;
        if t > EPSILON && t < 1.0 - EPSILON {
            Some(t)
        } else {
            None
        }
    }

    #[inline]
    pub fn local_x_extremum(&self) -> Option<f32> {
        Curve::local_extremum(self.p0.x, self.control_point.x, self.p1.x)
    }

    #[inline]
    pub fn local_y_extremum(&self) -> Option<f32> {
        Curve::local_extremum(self.p0.y, self.control_point.y, self.p1.y)
    }

    /// The implicitized side function for quadratics.
    ///
    /// See T.W. Sederberg, "Computer Aided Geometric Design Course Notes"
    /// § 17.6.1.
    fn side(&self, point: Point) -> f32 {
        fn l(factor: f32, point: Point, point_i: Point, point_j: Point) -> f32 {
            factor
                * det3x3(&[
                    point.x, point.y, 1.0, point_i.x, point_i.y, 1.0, point_j.x, point_j.y, 1.0,
                ])
        }

        let l20 = l(1.0, point, self.p1, self.p0);
        det2x2(&[
            l(2.0, point, self.p1, self.control_point),
            l20,
            l20,
            l(2.0, point, self.control_point, self.p0),
        ])
    }
}

/// A quadratic curve split at parametric time `t` by de Casteljau: the two
/// halves are `(ap0, ap1, ap2bp0)` and `(ap2bp0, bp1, bp2)`.
#[derive(Clone, Copy, Debug)]
pub struct SubdividedQuadraticBezier {
    pub ap0: Point,
    pub ap1: Point,
    pub ap2bp0: Point,
    pub bp1: Point,
    pub bp2: Point,
}

impl SubdividedQuadraticBezier {
    pub fn new(t: f32, p0: Point, p1: Point, p2: Point) -> SubdividedQuadraticBezier {
        let (ap1, bp1) = (p0.lerp(p1, t), p1.lerp(p2, t));
        let ap2bp0 = ap1.lerp(bp1, t);
        SubdividedQuadraticBezier {
            ap0: p0,
            ap1,
            ap2bp0,
            bp1,
            bp2: p2,
        }
    }
}

/// A cubic Bézier curve. Only the legalizer deals in cubics.
#[derive(Clone, Copy, Debug)]
pub struct CubicBezier {
    pub p0: Point,
    pub p1: Point,
    pub p2: Point,
    pub p3: Point,
}

impl CubicBezier {
    #[inline]
    pub fn new(p0: Point, p1: Point, p2: Point, p3: Point) -> CubicBezier {
        CubicBezier { p0, p1, p2, p3 }
    }

    pub fn sample(&self, t: f32) -> Point {
        let (ab, bc, cd) = (
            self.p0.lerp(self.p1, t),
            self.p1.lerp(self.p2, t),
            self.p2.lerp(self.p3, t),
        );
        let (abbc, bccd) = (ab.lerp(bc, t), bc.lerp(cd, t));
        abbc.lerp(bccd, t)
    }

    /// Splits the curve in half by de Casteljau.
    pub fn split_in_half(&self) -> (CubicBezier, CubicBezier) {
        let t = 0.5;
        let (ab, bc, cd) = (
            self.p0.lerp(self.p1, t),
            self.p1.lerp(self.p2, t),
            self.p2.lerp(self.p3, t),
        );
        let (abbc, bccd) = (ab.lerp(bc, t), bc.lerp(cd, t));
        let mid = abbc.lerp(bccd, t);
        (
            CubicBezier::new(self.p0, ab, abbc, mid),
            CubicBezier::new(mid, bccd, cd, self.p3),
        )
    }

    /// An upper bound on the distance between this cubic and its
    /// single-quadratic approximation.
    ///
    /// See T.W. Sederberg, "Computer Aided Geometric Design Course Notes"
    /// § 2.6, "Distance Between Two Bézier Curves".
    pub fn approx_quadratic_error(&self) -> f32 {
        let delta_ctrl_0 = (self.p0 - self.p1 * 3.0) + (self.p2 * 3.0 - self.p3);
        let delta_ctrl_1 = (self.p1 * 3.0 - self.p0) + (self.p3 - self.p2 * 3.0);
        f32::max(delta_ctrl_0.length(), delta_ctrl_1.length()) / 6.0
    }

    /// The control point of the best single-quadratic approximation: the
    /// midpoint of the two extrapolated quadratic control points.
    pub fn approx_quadratic_control_point(&self) -> Point {
        let approx_ctrl_0 = (self.p1 * 3.0 - self.p0) * 0.5;
        let approx_ctrl_1 = (self.p2 * 3.0 - self.p3) * 0.5;
        approx_ctrl_0.lerp(approx_ctrl_1, 0.5)
    }
}

/// Solves the line `p0`→`p1` for the parametric time at the given x.
///
/// Clamped to `[0, 1]`; a vertical line yields 0.
pub fn solve_line_t_for_x(x: f32, p0: Point, p1: Point) -> f32 {
    if p0.x == p1.x {
        return 0.0;
    }
    ((x - p0.x) / (p1.x - p0.x)).clamp(0.0, 1.0)
}

/// Solves an x-monotone quadratic curve for the parametric time at the
/// given x, clamped to `[0, 1]`.
pub fn solve_quadratic_bezier_t_for_x(x: f32, p0: Point, p1: Point, p2: Point) -> f32 {
    // x(t) = (1-t)² p0 + 2t(1-t) p1 + t² p2, rearranged to at² + bt + c = x.
    let a = p0.x - 2.0 * p1.x + p2.x;
    let b = 2.0 * (p1.x - p0.x);
    let c = p0.x - x;

    if a.abs() < EPSILON {
        if b == 0.0 {
            return 0.0;
        }
        return (-c / b).clamp(0.0, 1.0);
    }

    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 {
        // The curve never reaches this x; clamp to the nearer end.
        return if (p0.x - x).abs() < (p2.x - x).abs() {
            0.0
        } else {
            1.0
        };
    }

    // Citardauq form for numeric stability.
    let q = -0.5 * (b + b.signum() * discriminant.sqrt());
    for t in [q / a, c / q] {
        if (-EPSILON..=1.0 + EPSILON).contains(&t) {
            return t.clamp(0.0, 1.0);
        }
    }
    0.0
}

/// Samples an x-monotone quadratic curve at the given x.
#[inline]
pub fn sample_quadratic_bezier_at_x(x: f32, p0: Point, p1: Point, p2: Point) -> Point {
    Curve::new(p0, p1, p2).sample(solve_quadratic_bezier_t_for_x(x, p0, p1, p2))
}

/// The crossing point of two line segments, if it lies strictly inside
/// both.
// https://stackoverflow.com/a/565282
pub fn line_line_crossing_point(a_p0: Point, a_p1: Point, b_p0: Point, b_p1: Point) -> Option<Point> {
    let (p, r) = (a_p0, a_p1 - a_p0);
    let (q, s) = (b_p0, b_p1 - b_p0);

    let rs = r.cross(s);
    if rs.abs() < EPSILON {
        return None;
    }

    let t = (q - p).cross(s) / rs;
    if t < EPSILON || t > 1.0 - EPSILON {
        return None;
    }

    let u = (q - p).cross(r) / rs;
    if u < EPSILON || u > 1.0 - EPSILON {
        return None;
    }

    Some(p + r * t)
}

/// Bisection search for the crossing of a monotone parametric segment with
/// an implicit side function.
///
/// Requires that any curves be monotone.
///
/// See T.W. Sederberg, "Computer Aided Geometric Design Course Notes"
/// § 17.8.
fn crossing_point<Sample, Side>(sample: Sample, side: Side) -> Option<Point>
where
    Sample: Fn(f32) -> Point,
    Side: Fn(Point) -> f32,
{
    let (mut t_min, mut t_max) = (0.0_f32, 1.0_f32);
    let side_min = side(sample(t_min)).signum();
    let side_max = side(sample(t_max)).signum();
    if side_min == side_max {
        return None;
    }

    while t_max - t_min > EPSILON {
        let t_mid = lerp(t_min, t_max, 0.5);
        let side_mid = side(sample(t_mid)).signum();
        if side_mid == side_min {
            t_min = t_mid;
        } else if side_mid == side_max {
            t_max = t_mid;
        } else {
            break;
        }
    }

    let t = lerp(t_min, t_max, 0.5);
    if t < EPSILON || t > 1.0 - EPSILON {
        return None;
    }
    Some(sample(t))
}

/// The crossing point of a line segment and an x-monotone quadratic curve,
/// if it lies strictly inside both.
pub fn line_quadratic_bezier_crossing_point(
    a_p0: Point,
    a_p1: Point,
    b_p0: Point,
    b_p1: Point,
    b_p2: Point,
) -> Option<Point> {
    let line = Line::new(a_p0, a_p1);
    let curve = Curve::new(b_p0, b_p1, b_p2);
    crossing_point(|t| curve.sample(t), |p| line.side(p))
}

/// The crossing point of two x-monotone quadratic curves, if it lies
/// strictly inside both.
pub fn quadratic_bezier_quadratic_bezier_crossing_point(
    a_p0: Point,
    a_p1: Point,
    a_p2: Point,
    b_p0: Point,
    b_p1: Point,
    b_p2: Point,
) -> Option<Point> {
    let a = Curve::new(a_p0, a_p1, a_p2);
    let b = Curve::new(b_p0, b_p1, b_p2);
    crossing_point(|t| a.sample(t), |p| b.side(p))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_t_for_x() {
        let (p0, p1) = (Point::new(2.0, 0.0), Point::new(6.0, 4.0));
        assert_eq!(solve_line_t_for_x(4.0, p0, p1), 0.5);
        assert_eq!(solve_line_t_for_x(-10.0, p0, p1), 0.0);
        assert_eq!(solve_line_t_for_x(100.0, p0, p1), 1.0);
        // Vertical line.
        assert_eq!(
            solve_line_t_for_x(2.0, Point::new(2.0, 0.0), Point::new(2.0, 5.0)),
            0.0
        );
    }

    #[test]
    fn quadratic_t_for_x_monotone() {
        let (p0, p1, p2) = (
            Point::new(0.0, 0.0),
            Point::new(3.0, 8.0),
            Point::new(10.0, 10.0),
        );
        for x in [0.0, 1.5, 4.2, 7.7, 10.0] {
            let t = solve_quadratic_bezier_t_for_x(x, p0, p1, p2);
            let sampled = Curve::new(p0, p1, p2).sample(t);
            assert!((sampled.x - x).abs() < 0.01, "x {x} resolved to {sampled:?}");
        }
    }

    #[test]
    fn degenerate_quadratic_is_linear() {
        // Control point collinear and centered: a == 0.
        let (p0, p1, p2) = (
            Point::new(0.0, 0.0),
            Point::new(5.0, 5.0),
            Point::new(10.0, 10.0),
        );
        let t = solve_quadratic_bezier_t_for_x(2.5, p0, p1, p2);
        assert!((t - 0.25).abs() < 0.001);
    }

    #[test]
    fn line_crossings() {
        let crossing = line_line_crossing_point(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
            Point::new(10.0, 0.0),
        )
        .unwrap();
        assert!((crossing.x - 5.0).abs() < 0.01 && (crossing.y - 5.0).abs() < 0.01);

        // Parallel lines never cross.
        assert!(line_line_crossing_point(
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(0.0, 1.0),
            Point::new(10.0, 1.0),
        )
        .is_none());

        // Crossings at shared endpoints don't count.
        assert!(line_line_crossing_point(
            Point::new(0.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 0.0),
            Point::new(10.0, -10.0),
        )
        .is_none());
    }

    #[test]
    fn line_curve_crossing() {
        // A monotone descending curve crossing a horizontal line. For this
        // control polygon y(t) is exactly 4 - 8t and x(t) is exactly 10t,
        // so the crossing with y = 2 is (2.5, 2).
        let crossing = line_quadratic_bezier_crossing_point(
            Point::new(0.0, 2.0),
            Point::new(10.0, 2.0),
            Point::new(0.0, 4.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, -4.0),
        )
        .unwrap();
        assert!((crossing.y - 2.0).abs() < 0.05);
        assert!((crossing.x - 2.5).abs() < 0.05);
    }

    #[test]
    fn cubic_split_is_continuous() {
        let cubic = CubicBezier::new(
            Point::new(0.0, 0.0),
            Point::new(2.0, 8.0),
            Point::new(8.0, -4.0),
            Point::new(10.0, 3.0),
        );
        let (a, b) = cubic.split_in_half();
        assert_eq!(a.p3, b.p0);
        let mid = cubic.sample(0.5);
        assert!((mid.x - a.p3.x).abs() < 0.001 && (mid.y - a.p3.y).abs() < 0.001);
    }

    #[test]
    fn extremum_of_bowed_curve() {
        // x goes 0 → -2 → 4: not monotone, extremum inside.
        let curve = Curve::new(
            Point::new(0.0, 0.0),
            Point::new(-4.0, 5.0),
            Point::new(4.0, 10.0),
        );
        let t = curve.local_x_extremum().unwrap();
        assert!(t > 0.0 && t < 1.0);

        // Monotone in y.
        assert!(curve.local_y_extremum().is_none());
    }
}
