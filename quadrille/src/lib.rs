// Copyright 2025 the Quadrille Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Quadrille turns vector paths into GPU-renderable primitives.
//!
//! The pipeline has three stages, each consuming only the previous stage's
//! output arrays:
//!
//! 1. [`legalizer::Legalizer`] normalizes raw path commands (moves, lines,
//!    quadratic and cubic curves, closes) into endpoint, control-point, and
//!    subpath arrays. Cubics are reduced to x-monotone quadratics.
//! 2. [`partitioner::Partitioner`] sweeps the legalized subpaths and
//!    decomposes their fill regions into non-overlapping [`BQuad`]s, plus
//!    the vertex and index buffers that coverage-based antialiasing needs.
//! 3. [`tessellator::Tessellator`] computes per-b-quad tessellation levels
//!    and, depending on the antialiasing mode, explicit vertex/index or
//!    edge-instance buffers ready for upload.
//!
//! This crate produces intermediate geometric buffers only; it does not
//! rasterize pixels or manage GPU memory. A C-callable embedding surface is
//! available behind the `capi` feature.

use bytemuck::{Pod, Zeroable};

pub use peniko::kurbo;

#[cfg(feature = "capi")]
pub mod capi;
pub mod geometry;
pub mod legalizer;
pub mod partitioner;
pub mod tessellator;

/// A 2D point in single precision.
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    /// The point `(0, 0)`.
    pub const ZERO: Self = Self::new(0.0, 0.0);

    #[inline]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Linear interpolation between `self` and `other`.
    #[inline]
    pub fn lerp(self, other: Self, t: f32) -> Self {
        self + (other - self) * t
    }

    /// The 2D cross product (z component of the 3D cross product).
    #[inline]
    pub fn cross(self, other: Self) -> f32 {
        self.x * other.y - self.y * other.x
    }

    #[inline]
    pub fn length(self) -> f32 {
        self.x.hypot(self.y)
    }

    #[inline]
    pub fn from_kurbo(p: kurbo::Point) -> Self {
        Self::new(p.x as f32, p.y as f32)
    }

    #[inline]
    pub fn to_kurbo(self) -> kurbo::Point {
        kurbo::Point::new(f64::from(self.x), f64::from(self.y))
    }
}

impl core::ops::Add for Point {
    type Output = Self;

    #[inline]
    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl core::ops::Sub for Point {
    type Output = Self;

    #[inline]
    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl core::ops::Mul<f32> for Point {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: f32) -> Self {
        Self::new(self.x * rhs, self.y * rhs)
    }
}

/// One on-curve point of a legalized path.
///
/// If the segment *ending* at this endpoint is a quadratic curve,
/// `control_point_index` indexes the control-point array; for a line
/// segment it is `u32::MAX`.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct Endpoint {
    pub position: Point,
    /// `u32::MAX` if the incoming segment is a line.
    pub control_point_index: u32,
    /// Index of the owning subpath.
    pub subpath_index: u32,
}

/// A contiguous contour: the half-open endpoint range `[first, last)`.
///
/// Endpoint order encodes the traversal (winding) direction. All subpaths
/// are implicitly closed.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct Subpath {
    pub first_endpoint_index: u32,
    pub last_endpoint_index: u32,
}

impl Subpath {
    /// Number of endpoints in this subpath.
    #[inline]
    pub fn len(&self) -> u32 {
        self.last_endpoint_index - self.first_endpoint_index
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The atomic fill unit: a region bounded above and below by one edge each
/// (a line or a single quadratic curve).
///
/// All six fields index the partitioner's b-vertex array; the control-point
/// indices are `u32::MAX` when the corresponding edge is a line. Padded to
/// 32 bytes for GPU upload.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct BQuad {
    pub upper_left_vertex_index: u32,
    pub upper_control_point_vertex_index: u32,
    pub upper_right_vertex_index: u32,
    pad0: u32,
    pub lower_left_vertex_index: u32,
    pub lower_control_point_vertex_index: u32,
    pub lower_right_vertex_index: u32,
    pad1: u32,
}

impl BQuad {
    #[inline]
    pub fn new(
        upper_left_vertex_index: u32,
        upper_control_point_vertex_index: u32,
        upper_right_vertex_index: u32,
        lower_left_vertex_index: u32,
        lower_control_point_vertex_index: u32,
        lower_right_vertex_index: u32,
    ) -> BQuad {
        BQuad {
            upper_left_vertex_index,
            upper_control_point_vertex_index,
            upper_right_vertex_index,
            lower_left_vertex_index,
            lower_control_point_vertex_index,
            lower_right_vertex_index,
            pad0: 0,
            pad1: 0,
        }
    }
}

/// Classification of a b-vertex, fixed at emission time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum BVertexKind {
    /// An endpoint with even edge parity.
    Endpoint0 = 0,
    /// An endpoint with odd edge parity.
    Endpoint1 = 1,
    /// A control point whose curve bulges away from the fill.
    ConvexControlPoint = 2,
    /// A control point whose curve bulges into the fill.
    ConcaveControlPoint = 3,
}

impl BVertexKind {
    fn tex_coord(self) -> [u8; 2] {
        match self {
            BVertexKind::Endpoint0 => [0, 0],
            BVertexKind::Endpoint1 => [2, 2],
            BVertexKind::ConvexControlPoint | BVertexKind::ConcaveControlPoint => [1, 0],
        }
    }

    fn sign(self) -> i8 {
        match self {
            BVertexKind::Endpoint0 | BVertexKind::Endpoint1 => 0,
            BVertexKind::ConvexControlPoint => -1,
            BVertexKind::ConcaveControlPoint => 1,
        }
    }
}

/// A vertex of the partitioned mesh, consumed by the coverage-based
/// antialiasing shaders.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct BVertex {
    pub position: Point,
    pub path_id: u32,
    /// Loop–Blinn curve texture coordinate, derived from the kind.
    pub tex_coord: [u8; 2],
    kind: u8,
    pad: u8,
}

impl BVertex {
    #[inline]
    pub fn new(position: Point, kind: BVertexKind, path_id: u32) -> BVertex {
        BVertex {
            position,
            path_id,
            tex_coord: kind.tex_coord(),
            kind: kind as u8,
            pad: 0,
        }
    }

    /// Classifies a control point as convex or concave relative to the fill
    /// direction. `bottom` is true for the lower edge of a region, where the
    /// fill lies above the edge.
    pub fn control_point(
        left_endpoint_position: Point,
        control_point_position: Point,
        right_endpoint_position: Point,
        path_id: u32,
        bottom: bool,
    ) -> BVertex {
        let control_point_vector = control_point_position - left_endpoint_position;
        let right_vector = right_endpoint_position - left_endpoint_position;
        let kind = if (right_vector.cross(control_point_vector) < 0.0) ^ bottom {
            BVertexKind::ConvexControlPoint
        } else {
            BVertexKind::ConcaveControlPoint
        };
        BVertex::new(control_point_position, kind, path_id)
    }

    #[inline]
    pub fn kind(&self) -> BVertexKind {
        match self.kind {
            0 => BVertexKind::Endpoint0,
            1 => BVertexKind::Endpoint1,
            2 => BVertexKind::ConvexControlPoint,
            _ => BVertexKind::ConcaveControlPoint,
        }
    }

    /// Curve sign for the Loop–Blinn fragment test: -1 convex, +1 concave,
    /// 0 for endpoints.
    #[inline]
    pub fn sign(&self) -> i8 {
        self.kind().sign()
    }
}

/// Two b-vertex indices bounding a line edge.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct LineIndices {
    pub left_vertex_index: u32,
    pub right_vertex_index: u32,
}

impl LineIndices {
    #[inline]
    pub fn new(left_vertex_index: u32, right_vertex_index: u32) -> LineIndices {
        LineIndices {
            left_vertex_index,
            right_vertex_index,
        }
    }
}

/// Three b-vertex indices bounding a quadratic curve edge.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct CurveIndices {
    pub left_vertex_index: u32,
    pub right_vertex_index: u32,
    pub control_point_vertex_index: u32,
    pad: u32,
}

impl CurveIndices {
    #[inline]
    pub fn new(
        left_vertex_index: u32,
        control_point_vertex_index: u32,
        right_vertex_index: u32,
    ) -> CurveIndices {
        CurveIndices {
            left_vertex_index,
            right_vertex_index,
            control_point_vertex_index,
            pad: 0,
        }
    }
}

/// A tessellated sample along one b-quad edge: the bounding b-vertices plus
/// the parametric time of the sample, in `[0, 1]`.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct Vertex {
    pub left_b_vertex_index: u32,
    pub control_point_b_vertex_index: u32,
    pub right_b_vertex_index: u32,
    pub time: f32,
    pub path_id: u32,
    pad: u32,
}

impl Vertex {
    #[inline]
    pub fn new(
        path_id: u32,
        left_b_vertex_index: u32,
        control_point_b_vertex_index: u32,
        right_b_vertex_index: u32,
        time: f32,
    ) -> Vertex {
        Vertex {
            left_b_vertex_index,
            control_point_b_vertex_index,
            right_b_vertex_index,
            time,
            path_id,
            pad: 0,
        }
    }
}

/// One edge span consumed by the coverage antialiasing shader pass:
/// the bounding b-vertices plus the parametric interval it covers.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct EdgeInstance {
    pub left_b_vertex_index: u32,
    pub control_point_b_vertex_index: u32,
    pub right_b_vertex_index: u32,
    pub left_time: f32,
    pub right_time: f32,
    pad: u32,
}

impl EdgeInstance {
    #[inline]
    pub fn new(
        left_b_vertex_index: u32,
        control_point_b_vertex_index: u32,
        right_b_vertex_index: u32,
        left_time: f32,
        right_time: f32,
    ) -> EdgeInstance {
        EdgeInstance {
            left_b_vertex_index,
            control_point_b_vertex_index,
            right_b_vertex_index,
            left_time,
            right_time,
            pad: 0,
        }
    }
}

/// How the downstream renderer antialiases the partitioned mesh.
///
/// The tessellator only produces the buffers matching its bound mode;
/// querying the other mode's outputs yields empty slices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum AntialiasingMode {
    /// Hardware multisampling over explicitly tessellated triangles.
    Msaa = 0,
    /// Analytic curve-coverage antialiasing (the Levien technique) over
    /// per-edge instances.
    Ecaa = 1,
}

/// Which regions of a multi-contour path count as filled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum FillRule {
    Winding = 0,
    EvenOdd = 1,
}

/// Errors reported by this crate.
#[derive(Clone, Debug, thiserror::Error)]
pub enum Error {
    /// The subpath range passed to `partition` does not lie within the
    /// bound subpath array, or is inverted.
    #[error("invalid subpath range {first}..{last} (bound subpath count {count})")]
    InvalidSubpathRange { first: u32, last: u32, count: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn b_vertex_control_point_classification() {
        // Upper edge, curve bulging up and away from the fill below it.
        let v = BVertex::control_point(
            Point::new(0.0, 10.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 10.0),
            0,
            false,
        );
        assert_eq!(v.kind(), BVertexKind::ConvexControlPoint);
        assert_eq!(v.sign(), -1);

        // Same curve as the lower edge of a region: it now bulges into the
        // fill above it.
        let v = BVertex::control_point(
            Point::new(0.0, 10.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 10.0),
            0,
            true,
        );
        assert_eq!(v.kind(), BVertexKind::ConcaveControlPoint);
        assert_eq!(v.sign(), 1);
    }

    #[test]
    fn gpu_layout() {
        assert_eq!(core::mem::size_of::<BQuad>(), 32);
        assert_eq!(core::mem::size_of::<BVertex>(), 16);
        assert_eq!(core::mem::size_of::<Vertex>(), 24);
        assert_eq!(core::mem::size_of::<EdgeInstance>(), 24);
    }
}
