// Copyright 2025 the Quadrille Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! C-callable embedding surface.
//!
//! Each pipeline component crosses the boundary as an opaque handle with an
//! explicit destroy function. Arrays cross as a pointer plus an out-count
//! and are borrowed: they stay valid until the next mutating call on the
//! owning handle, never longer. No errors cross as unwinds; fallible calls
//! return a nonzero status instead.
//!
//! All functions are unsafe in the usual FFI sense: handles must be live
//! pointers from the corresponding `_new` call and array arguments must
//! reference `count` valid elements.

use std::slice;

use crate::legalizer::Legalizer;
use crate::partitioner::Partitioner;
use crate::tessellator::{QuadTessLevels, Tessellator};
use crate::{
    AntialiasingMode, BQuad, BVertex, CurveIndices, EdgeInstance, Endpoint, FillRule, LineIndices,
    Point, Subpath, Vertex,
};

/// A row-major 2×3 affine transform:
/// `x' = m00·x + m01·y + m02`, `y' = m10·x + m11·y + m12`.
#[derive(Clone, Copy, Debug)]
#[repr(C)]
pub struct QdMatrix2DF32 {
    pub m00: f32,
    pub m01: f32,
    pub m02: f32,
    pub m10: f32,
    pub m11: f32,
    pub m12: f32,
}

impl QdMatrix2DF32 {
    fn to_affine(self) -> crate::kurbo::Affine {
        crate::kurbo::Affine::new([
            f64::from(self.m00),
            f64::from(self.m10),
            f64::from(self.m01),
            f64::from(self.m11),
            f64::from(self.m02),
            f64::from(self.m12),
        ])
    }
}

unsafe fn write_count<T>(out_count: *mut u32, values: &[T]) -> *const T {
    if !out_count.is_null() {
        *out_count = values.len() as u32;
    }
    values.as_ptr()
}

/// Installs a diagnostics sink for the whole process, reading the standard
/// `RUST_LOG` filter. Returns 1 on success and 0 if a logger was already
/// installed; either way the library stays usable.
#[no_mangle]
pub extern "C" fn qd_init_diagnostics() -> u32 {
    u32::from(env_logger::try_init().is_ok())
}

#[no_mangle]
pub extern "C" fn qd_legalizer_new() -> *mut Legalizer {
    Box::into_raw(Box::new(Legalizer::new()))
}

/// # Safety
/// `legalizer` must come from `qd_legalizer_new` and not be destroyed twice.
#[no_mangle]
pub unsafe extern "C" fn qd_legalizer_destroy(legalizer: *mut Legalizer) {
    drop(Box::from_raw(legalizer));
}

#[no_mangle]
pub unsafe extern "C" fn qd_legalizer_endpoints(
    legalizer: *const Legalizer,
    out_endpoint_count: *mut u32,
) -> *const Endpoint {
    write_count(out_endpoint_count, (*legalizer).endpoints())
}

#[no_mangle]
pub unsafe extern "C" fn qd_legalizer_control_points(
    legalizer: *const Legalizer,
    out_control_point_count: *mut u32,
) -> *const Point {
    write_count(out_control_point_count, (*legalizer).control_points())
}

#[no_mangle]
pub unsafe extern "C" fn qd_legalizer_subpaths(
    legalizer: *const Legalizer,
    out_subpath_count: *mut u32,
) -> *const Subpath {
    write_count(out_subpath_count, (*legalizer).subpaths())
}

#[no_mangle]
pub unsafe extern "C" fn qd_legalizer_move_to(legalizer: *mut Legalizer, position: *const Point) {
    (*legalizer).move_to(*position);
}

#[no_mangle]
pub unsafe extern "C" fn qd_legalizer_close_path(legalizer: *mut Legalizer) {
    (*legalizer).close_path();
}

#[no_mangle]
pub unsafe extern "C" fn qd_legalizer_line_to(legalizer: *mut Legalizer, endpoint: *const Point) {
    (*legalizer).line_to(*endpoint);
}

#[no_mangle]
pub unsafe extern "C" fn qd_legalizer_quadratic_curve_to(
    legalizer: *mut Legalizer,
    control_point: *const Point,
    endpoint: *const Point,
) {
    (*legalizer).quadratic_curve_to(*control_point, *endpoint);
}

#[no_mangle]
pub unsafe extern "C" fn qd_legalizer_bezier_curve_to(
    legalizer: *mut Legalizer,
    point1: *const Point,
    point2: *const Point,
    endpoint: *const Point,
) {
    (*legalizer).bezier_curve_to(*point1, *point2, *endpoint);
}

#[no_mangle]
pub extern "C" fn qd_partitioner_new() -> *mut Partitioner {
    Box::into_raw(Box::new(Partitioner::new()))
}

/// # Safety
/// `partitioner` must come from `qd_partitioner_new` and not be destroyed
/// twice.
#[no_mangle]
pub unsafe extern "C" fn qd_partitioner_destroy(partitioner: *mut Partitioner) {
    drop(Box::from_raw(partitioner));
}

#[no_mangle]
pub unsafe extern "C" fn qd_partitioner_init(
    partitioner: *mut Partitioner,
    endpoints: *const Endpoint,
    endpoint_count: u32,
    control_points: *const Point,
    control_point_count: u32,
    subpaths: *const Subpath,
    subpath_count: u32,
) {
    (*partitioner).init(
        slice::from_raw_parts(endpoints, endpoint_count as usize),
        slice::from_raw_parts(control_points, control_point_count as usize),
        slice::from_raw_parts(subpaths, subpath_count as usize),
    );
}

/// `fill_rule` is 0 for nonzero winding, anything else for even-odd.
#[no_mangle]
pub unsafe extern "C" fn qd_partitioner_set_fill_rule(
    partitioner: *mut Partitioner,
    fill_rule: u32,
) {
    let fill_rule = if fill_rule == 0 {
        FillRule::Winding
    } else {
        FillRule::EvenOdd
    };
    (*partitioner).set_fill_rule(fill_rule);
}

/// Returns 0 on success and 1 if the subpath range is invalid.
#[no_mangle]
pub unsafe extern "C" fn qd_partitioner_partition(
    partitioner: *mut Partitioner,
    path_id: u32,
    first_subpath_index: u32,
    last_subpath_index: u32,
) -> u32 {
    match (*partitioner).partition(path_id, first_subpath_index, last_subpath_index) {
        Ok(()) => 0,
        Err(_) => 1,
    }
}

#[no_mangle]
pub unsafe extern "C" fn qd_partitioner_b_quads(
    partitioner: *const Partitioner,
    out_b_quad_count: *mut u32,
) -> *const BQuad {
    write_count(out_b_quad_count, (*partitioner).b_quads())
}

#[no_mangle]
pub unsafe extern "C" fn qd_partitioner_b_vertices(
    partitioner: *const Partitioner,
    out_b_vertex_count: *mut u32,
) -> *const BVertex {
    write_count(out_b_vertex_count, (*partitioner).b_vertices())
}

#[no_mangle]
pub unsafe extern "C" fn qd_partitioner_cover_interior_indices(
    partitioner: *const Partitioner,
    out_index_count: *mut u32,
) -> *const u32 {
    write_count(out_index_count, (*partitioner).cover_indices().interior_indices)
}

#[no_mangle]
pub unsafe extern "C" fn qd_partitioner_cover_curve_indices(
    partitioner: *const Partitioner,
    out_index_count: *mut u32,
) -> *const u32 {
    write_count(out_index_count, (*partitioner).cover_indices().curve_indices)
}

#[no_mangle]
pub unsafe extern "C" fn qd_partitioner_edge_upper_line_indices(
    partitioner: *const Partitioner,
    out_count: *mut u32,
) -> *const LineIndices {
    write_count(out_count, (*partitioner).edge_indices().upper_line_indices)
}

#[no_mangle]
pub unsafe extern "C" fn qd_partitioner_edge_upper_curve_indices(
    partitioner: *const Partitioner,
    out_count: *mut u32,
) -> *const CurveIndices {
    write_count(out_count, (*partitioner).edge_indices().upper_curve_indices)
}

#[no_mangle]
pub unsafe extern "C" fn qd_partitioner_edge_lower_line_indices(
    partitioner: *const Partitioner,
    out_count: *mut u32,
) -> *const LineIndices {
    write_count(out_count, (*partitioner).edge_indices().lower_line_indices)
}

#[no_mangle]
pub unsafe extern "C" fn qd_partitioner_edge_lower_curve_indices(
    partitioner: *const Partitioner,
    out_count: *mut u32,
) -> *const CurveIndices {
    write_count(out_count, (*partitioner).edge_indices().lower_curve_indices)
}

/// `antialiasing_mode` is 0 for MSAA, anything else for ECAA.
///
/// Takes the partitioner's b-quad and b-vertex arrays directly; the
/// b-vertices carry the endpoint and control-point positions, so no
/// separate endpoint/control-point arrays are passed.
#[no_mangle]
pub unsafe extern "C" fn qd_tessellator_new(
    b_quads: *const BQuad,
    b_quad_count: u32,
    b_vertices: *const BVertex,
    b_vertex_count: u32,
    antialiasing_mode: u32,
) -> *mut Tessellator {
    let antialiasing_mode = if antialiasing_mode == 0 {
        AntialiasingMode::Msaa
    } else {
        AntialiasingMode::Ecaa
    };
    Box::into_raw(Box::new(Tessellator::new(
        slice::from_raw_parts(b_quads, b_quad_count as usize),
        slice::from_raw_parts(b_vertices, b_vertex_count as usize),
        antialiasing_mode,
    )))
}

/// # Safety
/// `tessellator` must come from `qd_tessellator_new` and not be destroyed
/// twice.
#[no_mangle]
pub unsafe extern "C" fn qd_tessellator_destroy(tessellator: *mut Tessellator) {
    drop(Box::from_raw(tessellator));
}

#[no_mangle]
pub unsafe extern "C" fn qd_tessellator_compute_hull(
    tessellator: *mut Tessellator,
    transform: *const QdMatrix2DF32,
) {
    (*tessellator).compute_hull(&(*transform).to_affine());
}

#[no_mangle]
pub unsafe extern "C" fn qd_tessellator_compute_domain(tessellator: *mut Tessellator) {
    (*tessellator).compute_domain();
}

#[no_mangle]
pub unsafe extern "C" fn qd_tessellator_tess_levels(
    tessellator: *const Tessellator,
    out_tess_level_count: *mut u32,
) -> *const QuadTessLevels {
    write_count(out_tess_level_count, (*tessellator).tess_levels())
}

#[no_mangle]
pub unsafe extern "C" fn qd_tessellator_vertices(
    tessellator: *const Tessellator,
    out_vertex_count: *mut u32,
) -> *const Vertex {
    write_count(out_vertex_count, (*tessellator).vertices())
}

#[no_mangle]
pub unsafe extern "C" fn qd_tessellator_msaa_indices(
    tessellator: *const Tessellator,
    out_index_count: *mut u32,
) -> *const u32 {
    write_count(out_index_count, (*tessellator).msaa_indices())
}

#[no_mangle]
pub unsafe extern "C" fn qd_tessellator_edge_instances(
    tessellator: *const Tessellator,
    out_edge_instance_count: *mut u32,
) -> *const EdgeInstance {
    write_count(out_edge_instance_count, (*tessellator).edge_instances())
}

#[no_mangle]
pub unsafe extern "C" fn qd_tessellator_levien_indices(
    tessellator: *const Tessellator,
    out_index_count: *mut u32,
) -> *const u32 {
    write_count(out_index_count, (*tessellator).levien_indices())
}
