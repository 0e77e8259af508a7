// Copyright 2025 the Quadrille Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Normalizes raw path-construction commands into endpoint, control-point,
//! and subpath arrays.
//!
//! Legalization enforces the two invariants the partitioner sweep relies
//! on: no cubics (every curve is a single-control-point quadratic) and
//! every stored segment is monotone along both axes. Cubics are reduced by
//! recursive midpoint subdivision until a quadratic approximation meets the
//! configured tolerance.

use smallvec::{smallvec, SmallVec};

use crate::geometry::{Curve, CubicBezier, SubdividedQuadraticBezier};
use crate::kurbo::PathEl;
use crate::{Endpoint, Point, Subpath};

/// Default upper bound, in path units, on the distance between a cubic
/// segment and its quadratic approximation.
pub const DEFAULT_APPROX_TOLERANCE: f32 = 0.25;

/// Cap on recursive cubic subdivision depth.
const MAX_SUBDIVISIONS: u8 = 16;

/// Accumulates one path's construction commands and exposes the legalized
/// arrays.
///
/// State persists across commands for the lifetime of one path build;
/// create a fresh `Legalizer` for each path. All subpaths are implicitly
/// closed. Calling a drawing command before the first `move_to` is a
/// contract violation and panics.
pub struct Legalizer {
    endpoints: Vec<Endpoint>,
    control_points: Vec<Point>,
    subpaths: Vec<Subpath>,
    tolerance: f32,
}

impl Default for Legalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Legalizer {
    #[inline]
    pub fn new() -> Legalizer {
        Legalizer::with_tolerance(DEFAULT_APPROX_TOLERANCE)
    }

    /// Creates a legalizer with an explicit cubic-approximation tolerance.
    #[inline]
    pub fn with_tolerance(tolerance: f32) -> Legalizer {
        Legalizer {
            endpoints: vec![],
            control_points: vec![],
            subpaths: vec![],
            tolerance,
        }
    }

    /// The legalized endpoints, valid until the next mutating call.
    #[inline]
    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// The legalized control points, valid until the next mutating call.
    #[inline]
    pub fn control_points(&self) -> &[Point] {
        &self.control_points
    }

    /// The legalized subpaths, valid until the next mutating call.
    #[inline]
    pub fn subpaths(&self) -> &[Subpath] {
        &self.subpaths
    }

    /// Starts a new subpath, implicitly finalizing any open one.
    pub fn move_to(&mut self, position: Point) {
        let first_endpoint_index = self.endpoints.len() as u32;
        self.subpaths.push(Subpath {
            first_endpoint_index,
            last_endpoint_index: first_endpoint_index + 1,
        });
        self.endpoints.push(Endpoint {
            position,
            control_point_index: u32::MAX,
            subpath_index: (self.subpaths.len() - 1) as u32,
        });
    }

    /// All subpaths are implicitly closed, so this is a no-op kept for
    /// command-stream compatibility.
    #[inline]
    pub fn close_path(&mut self) {}

    pub fn line_to(&mut self, position: Point) {
        self.subpaths
            .last_mut()
            .expect("`line_to()` called before `move_to()`")
            .last_endpoint_index += 1;
        self.endpoints.push(Endpoint {
            position,
            control_point_index: u32::MAX,
            subpath_index: (self.subpaths.len() - 1) as u32,
        });
    }

    /// Appends a quadratic curve, splitting it into monotone pieces.
    pub fn quadratic_curve_to(&mut self, control_point: Point, position: Point) {
        let p0 = self.current_position("`quadratic_curve_to()`");
        self.monotone_quadratic_curve_to(Curve::new(p0, control_point, position));
    }

    /// Appends a cubic curve, reducing it to one or more quadratics.
    ///
    /// The cubic is split in half recursively until the distance bound
    /// between each piece and its single-quadratic approximation drops
    /// under the configured tolerance (or the depth cap is reached), then
    /// each piece is emitted as a monotone quadratic fan.
    pub fn bezier_curve_to(&mut self, point1: Point, point2: Point, position: Point) {
        let p0 = self.current_position("`bezier_curve_to()`");

        let mut worklist: SmallVec<[(CubicBezier, u8); 8]> =
            smallvec![(CubicBezier::new(p0, point1, point2, position), 0)];
        while let Some((cubic, depth)) = worklist.pop() {
            if depth >= MAX_SUBDIVISIONS || cubic.approx_quadratic_error() < self.tolerance {
                let curve = Curve::new(cubic.p0, cubic.approx_quadratic_control_point(), cubic.p3);
                self.monotone_quadratic_curve_to(curve);
                continue;
            }
            let (a, b) = cubic.split_in_half();
            worklist.push((b, depth + 1));
            worklist.push((a, depth + 1));
        }
    }

    /// Feeds a kurbo path-element stream through the command interface.
    pub fn extend_path(&mut self, path: impl IntoIterator<Item = PathEl>) {
        for el in path {
            match el {
                PathEl::MoveTo(p) => self.move_to(Point::from_kurbo(p)),
                PathEl::LineTo(p) => self.line_to(Point::from_kurbo(p)),
                PathEl::QuadTo(c, p) => {
                    self.quadratic_curve_to(Point::from_kurbo(c), Point::from_kurbo(p));
                }
                PathEl::CurveTo(c1, c2, p) => self.bezier_curve_to(
                    Point::from_kurbo(c1),
                    Point::from_kurbo(c2),
                    Point::from_kurbo(p),
                ),
                PathEl::ClosePath => self.close_path(),
            }
        }
    }

    fn current_position(&self, command: &str) -> Point {
        let subpath = self
            .subpaths
            .last()
            .unwrap_or_else(|| panic!("{command} called before `move_to()`"));
        self.endpoints[subpath.last_endpoint_index as usize - 1].position
    }

    /// Splits a quadratic at its x and y extrema so every stored segment is
    /// monotone, then appends the pieces.
    fn monotone_quadratic_curve_to(&mut self, curve: Curve) {
        let mut x_monotone: SmallVec<[Curve; 2]> = SmallVec::new();
        match curve.local_x_extremum() {
            None => x_monotone.push(curve),
            Some(t) => {
                let split = SubdividedQuadraticBezier::new(t, curve.p0, curve.control_point, curve.p1);
                x_monotone.push(Curve::new(split.ap0, split.ap1, split.ap2bp0));
                x_monotone.push(Curve::new(split.ap2bp0, split.bp1, split.bp2));
            }
        }

        for curve in x_monotone {
            match curve.local_y_extremum() {
                None => self.push_quadratic(curve.control_point, curve.p1),
                Some(t) => {
                    let split =
                        SubdividedQuadraticBezier::new(t, curve.p0, curve.control_point, curve.p1);
                    self.push_quadratic(split.ap1, split.ap2bp0);
                    self.push_quadratic(split.bp1, split.bp2);
                }
            }
        }
    }

    fn push_quadratic(&mut self, control_point: Point, position: Point) {
        self.subpaths
            .last_mut()
            .expect("curve command called before `move_to()`")
            .last_endpoint_index += 1;
        self.control_points.push(control_point);
        self.endpoints.push(Endpoint {
            position,
            control_point_index: (self.control_points.len() - 1) as u32,
            subpath_index: (self.subpaths.len() - 1) as u32,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kurbo::{Rect, Shape};

    fn segments(legalizer: &Legalizer) -> Vec<(Point, Option<Point>, Point)> {
        let endpoints = legalizer.endpoints();
        let mut result = vec![];
        for window in endpoints.windows(2) {
            let control_point = match window[1].control_point_index {
                u32::MAX => None,
                index => Some(legalizer.control_points()[index as usize]),
            };
            result.push((window[0].position, control_point, window[1].position));
        }
        result
    }

    #[test]
    fn square_commands() {
        let mut legalizer = Legalizer::new();
        legalizer.move_to(Point::new(0.0, 0.0));
        legalizer.line_to(Point::new(10.0, 0.0));
        legalizer.line_to(Point::new(10.0, 10.0));
        legalizer.line_to(Point::new(0.0, 10.0));
        legalizer.close_path();

        assert_eq!(legalizer.endpoints().len(), 4);
        assert_eq!(legalizer.control_points().len(), 0);
        assert_eq!(legalizer.subpaths().len(), 1);
        assert_eq!(legalizer.subpaths()[0].first_endpoint_index, 0);
        assert_eq!(legalizer.subpaths()[0].last_endpoint_index, 4);
    }

    #[test]
    fn monotone_quadratic_split() {
        let mut legalizer = Legalizer::new();
        legalizer.move_to(Point::new(0.0, 0.0));
        // x runs 0 → -8 → 8: not x-monotone, must split.
        legalizer.quadratic_curve_to(Point::new(-8.0, 5.0), Point::new(8.0, 10.0));

        assert!(legalizer.endpoints().len() > 2);
        for (p0, control_point, p1) in segments(&legalizer) {
            if let Some(c) = control_point {
                assert!(
                    (c.x - p0.x) * (p1.x - c.x) >= -0.01,
                    "segment not x-monotone: {p0:?} {c:?} {p1:?}"
                );
                assert!(
                    (c.y - p0.y) * (p1.y - c.y) >= -0.01,
                    "segment not y-monotone: {p0:?} {c:?} {p1:?}"
                );
            }
        }
    }

    #[test]
    fn cubic_reduction_stays_within_tolerance() {
        let tolerance = 0.1;
        let mut legalizer = Legalizer::with_tolerance(tolerance);
        legalizer.move_to(Point::new(0.0, 0.0));
        let cubic = CubicBezier::new(
            Point::new(0.0, 0.0),
            Point::new(10.0, 40.0),
            Point::new(30.0, -40.0),
            Point::new(40.0, 0.0),
        );
        legalizer.bezier_curve_to(cubic.p1, cubic.p2, cubic.p3);

        // Endpoints of the whole curve are preserved exactly.
        let endpoints = legalizer.endpoints();
        assert_eq!(endpoints.first().unwrap().position, cubic.p0);
        assert_eq!(endpoints.last().unwrap().position, cubic.p3);

        // Every approximated point stays near the cubic. The subdivision
        // bound is per piece, so allow a small slop across pieces.
        for (p0, control_point, p1) in segments(&legalizer) {
            let Some(c) = control_point else { continue };
            let curve = Curve::new(p0, c, p1);
            for i in 1..8 {
                let point = curve.sample(i as f32 / 8.0);
                let mut nearest = f32::MAX;
                for j in 0..=256 {
                    let cubic_point = cubic.sample(j as f32 / 256.0);
                    nearest = nearest.min((cubic_point - point).length());
                }
                assert!(nearest < tolerance * 2.0, "point {point:?} off by {nearest}");
            }
        }
    }

    #[test]
    fn extend_path_matches_commands() {
        let mut by_path = Legalizer::new();
        by_path.extend_path(Rect::new(0.0, 0.0, 10.0, 10.0).to_path(0.1));

        let mut by_commands = Legalizer::new();
        by_commands.move_to(Point::new(0.0, 0.0));
        by_commands.line_to(Point::new(10.0, 0.0));
        by_commands.line_to(Point::new(10.0, 10.0));
        by_commands.line_to(Point::new(0.0, 10.0));
        by_commands.close_path();

        assert_eq!(by_path.endpoints().len(), by_commands.endpoints().len());
        for (a, b) in by_path.endpoints().iter().zip(by_commands.endpoints()) {
            assert_eq!(a.position, b.position);
        }
    }

    #[test]
    #[should_panic(expected = "before `move_to()`")]
    fn line_before_move_panics() {
        let mut legalizer = Legalizer::new();
        legalizer.line_to(Point::new(1.0, 1.0));
    }
}
