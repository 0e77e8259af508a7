// Copyright 2025 the Quadrille Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decomposes legalized subpath ranges into non-overlapping b-quads.
//!
//! The partitioner runs a sweep along +X over the endpoints of the bound
//! subpaths. Event points are ordered by x, tie-broken by y and then input
//! index, so identical input always yields identical output. An active-edge
//! list ordered top to bottom tracks the edges the sweep line currently
//! intersects; at each topology change (edge insertion, removal, or
//! crossing) the filled regions that end at the event are emitted as
//! b-quads by pairing a top and a bottom active edge.
//!
//! Alongside the b-quads, the partitioner emits the b-vertex array and the
//! cover/edge index buffers consumed by coverage-based antialiasing.

use std::cmp::{self, Ordering};
use std::collections::BinaryHeap;

use log::debug;

use crate::geometry::{self, SubdividedQuadraticBezier};
use crate::{
    BQuad, BVertex, BVertexKind, CurveIndices, Endpoint, Error, FillRule, LineIndices, Point,
    Subpath,
};

/// Partitions the fill regions of legalized subpaths into b-quads.
///
/// Holds one input binding (set by [`Partitioner::init`]) and one derived
/// output set, replaced wholesale by each [`Partitioner::partition`] call.
/// The input arrays are copied in, so the binding cannot be mutated behind
/// the partitioner's back; output accessors borrow the partitioner and are
/// invalidated by the next mutating call.
pub struct Partitioner {
    endpoints: Vec<Endpoint>,
    control_points: Vec<Point>,
    subpaths: Vec<Subpath>,

    fill_rule: FillRule,

    b_quads: Vec<BQuad>,
    b_vertices: Vec<BVertex>,
    cover_indices: CoverIndicesBuffer,
    edge_indices: EdgeIndicesBuffer,

    heap: BinaryHeap<SweepPoint>,
    visited_points: Vec<bool>,
    active_edges: Vec<ActiveEdge>,
    path_id: u32,
}

impl Default for Partitioner {
    fn default() -> Self {
        Self::new()
    }
}

impl Partitioner {
    #[inline]
    pub fn new() -> Partitioner {
        Partitioner {
            endpoints: vec![],
            control_points: vec![],
            subpaths: vec![],

            fill_rule: FillRule::Winding,

            b_quads: vec![],
            b_vertices: vec![],
            cover_indices: CoverIndicesBuffer::new(),
            edge_indices: EdgeIndicesBuffer::new(),

            heap: BinaryHeap::new(),
            visited_points: vec![],
            active_edges: vec![],
            path_id: 0,
        }
    }

    /// Binds input arrays, replacing any prior binding and invalidating all
    /// prior outputs.
    pub fn init(&mut self, endpoints: &[Endpoint], control_points: &[Point], subpaths: &[Subpath]) {
        self.endpoints.clear();
        self.endpoints.extend_from_slice(endpoints);
        self.control_points.clear();
        self.control_points.extend_from_slice(control_points);
        self.subpaths.clear();
        self.subpaths.extend_from_slice(subpaths);
    }

    #[inline]
    pub fn set_fill_rule(&mut self, new_fill_rule: FillRule) {
        self.fill_rule = new_fill_rule;
    }

    /// Decomposes the fill regions of the given contiguous subpath range
    /// (half-open) into b-quads, replacing all prior outputs.
    ///
    /// Subpaths with fewer than two endpoints contribute nothing. For
    /// self-intersecting subpaths the result is unspecified.
    pub fn partition(
        &mut self,
        path_id: u32,
        first_subpath_index: u32,
        last_subpath_index: u32,
    ) -> Result<(), Error> {
        if first_subpath_index > last_subpath_index
            || last_subpath_index as usize > self.subpaths.len()
        {
            return Err(Error::InvalidSubpathRange {
                first: first_subpath_index,
                last: last_subpath_index,
                count: self.subpaths.len() as u32,
            });
        }

        self.b_quads.clear();
        self.b_vertices.clear();
        self.cover_indices.clear();
        self.edge_indices.clear();
        self.heap.clear();
        self.active_edges.clear();
        self.visited_points.clear();
        self.visited_points
            .resize(self.endpoints.len() * 2, false);

        self.path_id = path_id;

        self.init_heap(first_subpath_index, last_subpath_index);

        while self.process_next_point() {}
        Ok(())
    }

    /// The emitted b-quads, valid until the next mutating call.
    #[inline]
    pub fn b_quads(&self) -> &[BQuad] {
        &self.b_quads
    }

    /// The emitted b-vertices, valid until the next mutating call.
    #[inline]
    pub fn b_vertices(&self) -> &[BVertex] {
        &self.b_vertices
    }

    /// Interior and curve triangle lists for the coverage pass, valid until
    /// the next mutating call.
    #[inline]
    pub fn cover_indices(&self) -> CoverIndices<'_> {
        self.cover_indices.as_ref()
    }

    /// Top/bottom line and curve edge lists for edge antialiasing, valid
    /// until the next mutating call.
    #[inline]
    pub fn edge_indices(&self) -> EdgeIndices<'_> {
        self.edge_indices.as_ref()
    }

    fn init_heap(&mut self, first_subpath_index: u32, last_subpath_index: u32) {
        for subpath in
            &self.subpaths[(first_subpath_index as usize)..(last_subpath_index as usize)]
        {
            // Degenerate subpaths bound no area.
            if subpath.len() < 2 {
                continue;
            }
            for endpoint_index in subpath.first_endpoint_index..subpath.last_endpoint_index {
                if let EndpointClass::Min = self.classify_endpoint(endpoint_index) {
                    let new_point = self.create_point_from_endpoint(endpoint_index);
                    self.heap.push(new_point);
                }
            }
        }
    }

    fn process_next_point(&mut self) -> bool {
        let point = match self.heap.peek() {
            Some(point) => *point,
            None => return false,
        };

        if self.already_visited_point(&point) {
            self.heap.pop();
            return true;
        }

        debug!(
            "processing point {}: {:?} ({:?})",
            point.endpoint_index,
            point.position,
            point.point_type
        );

        self.mark_point_as_visited(&point);

        let matching_active_edges = self.find_right_point_in_active_edge_list(point.endpoint_index);
        match point.point_type {
            PointType::Endpoint => match matching_active_edges.count {
                0 => self.process_min_endpoint(point.endpoint_index),
                1 => self.process_regular_endpoint(
                    point.endpoint_index,
                    matching_active_edges.indices[0],
                ),
                2 => self.process_max_endpoint(point.endpoint_index, matching_active_edges.indices),
                _ => debug_assert!(false),
            },
            PointType::CrossingBelow => {
                // The edge may already have been removed or reordered by an
                // endpoint event at the same position.
                if matching_active_edges.count > 0 {
                    self.process_crossing_point(point.position.x, matching_active_edges.indices[0]);
                }
            }
        }

        true
    }

    fn process_min_endpoint(&mut self, endpoint_index: u32) {
        debug!("... MIN point");

        let next_active_edge_index = self.find_point_between_active_edges(endpoint_index);

        let endpoint = self.endpoints[endpoint_index as usize];
        if self.should_fill_above_active_edge(next_active_edge_index) {
            self.emit_b_quad_above(next_active_edge_index, endpoint.position.x);
        }

        self.add_new_edges_for_min_point(endpoint_index, next_active_edge_index);

        let prev_endpoint_index = self.prev_endpoint_of(endpoint_index);
        let next_endpoint_index = self.next_endpoint_of(endpoint_index);
        let new_point = self.create_point_from_endpoint(next_endpoint_index);
        *self.heap.peek_mut().unwrap() = new_point;
        if next_endpoint_index != prev_endpoint_index {
            let new_point = self.create_point_from_endpoint(prev_endpoint_index);
            self.heap.push(new_point);
        }

        self.add_crossings_to_heap_if_necessary(next_active_edge_index, next_active_edge_index + 2);
    }

    fn process_regular_endpoint(&mut self, endpoint_index: u32, active_edge_index: u32) {
        debug!("... REGULAR point: active edge {}", active_edge_index);

        let endpoint = self.endpoints[endpoint_index as usize];
        let bottom = self.should_fill_above_active_edge(active_edge_index);
        if !bottom {
            self.emit_b_quad_below(active_edge_index, endpoint.position.x);
        } else {
            self.emit_b_quad_above(active_edge_index, endpoint.position.x);
        }

        let prev_endpoint_index = self.prev_endpoint_of(endpoint_index);
        let next_endpoint_index = self.next_endpoint_of(endpoint_index);

        {
            let path_id = self.path_id;
            let active_edge = &mut self.active_edges[active_edge_index as usize];
            active_edge.left_vertex_index = self.b_vertices.len() as u32;
            active_edge.control_point_vertex_index = active_edge.left_vertex_index + 1;

            let endpoint_position =
                self.endpoints[active_edge.right_endpoint_index as usize].position;
            self.b_vertices
                .push(BVertex::new(endpoint_position, active_edge.endpoint_kind(), path_id));

            active_edge.toggle_parity();

            if active_edge.left_to_right {
                active_edge.right_endpoint_index = next_endpoint_index;
            } else {
                active_edge.right_endpoint_index = prev_endpoint_index;
            }
        }

        let right_endpoint_index =
            self.active_edges[active_edge_index as usize].right_endpoint_index;
        let new_point = self.create_point_from_endpoint(right_endpoint_index);
        *self.heap.peek_mut().unwrap() = new_point;

        let control_point_index = if self.active_edges[active_edge_index as usize].left_to_right {
            self.control_point_index_before_endpoint(next_endpoint_index)
        } else {
            self.control_point_index_after_endpoint(prev_endpoint_index)
        };

        match control_point_index {
            u32::MAX => {
                self.active_edges[active_edge_index as usize].control_point_vertex_index = u32::MAX;
            }
            control_point_index => {
                self.active_edges[active_edge_index as usize].control_point_vertex_index =
                    self.b_vertices.len() as u32;

                let left_vertex_index =
                    self.active_edges[active_edge_index as usize].left_vertex_index;
                let control_point_position = self.control_points[control_point_index as usize];
                let control_point_b_vertex = BVertex::control_point(
                    self.b_vertices[left_vertex_index as usize].position,
                    control_point_position,
                    new_point.position,
                    self.path_id,
                    bottom,
                );
                self.b_vertices.push(control_point_b_vertex);
            }
        }

        self.add_crossings_to_heap_if_necessary(active_edge_index, active_edge_index + 2);
    }

    fn process_max_endpoint(&mut self, endpoint_index: u32, active_edge_indices: [u32; 2]) {
        debug!("... MAX point: active edges {:?}", active_edge_indices);

        debug_assert!(
            active_edge_indices[0] < active_edge_indices[1],
            "Matching active edge indices in wrong order when processing MAX point"
        );

        let endpoint = self.endpoints[endpoint_index as usize];

        if self.should_fill_above_active_edge(active_edge_indices[0]) {
            self.emit_b_quad_above(active_edge_indices[0], endpoint.position.x);
        }
        if self.should_fill_above_active_edge(active_edge_indices[1]) {
            self.emit_b_quad_above(active_edge_indices[1], endpoint.position.x);
        }
        if self.should_fill_below_active_edge(active_edge_indices[1]) {
            self.emit_b_quad_below(active_edge_indices[1], endpoint.position.x);
        }

        self.heap.pop();

        self.active_edges.remove(active_edge_indices[1] as usize);
        self.active_edges.remove(active_edge_indices[0] as usize);

        self.add_crossings_to_heap_if_necessary(active_edge_indices[0], active_edge_indices[0] + 2);
    }

    fn process_crossing_point(&mut self, x: f32, upper_active_edge_index: u32) {
        debug!("... CROSSING point: upper active edge {}", upper_active_edge_index);

        if self.should_fill_above_active_edge(upper_active_edge_index) {
            self.emit_b_quad_above(upper_active_edge_index, x);
        }
        if self.should_fill_below_active_edge(upper_active_edge_index) {
            self.emit_b_quad_below(upper_active_edge_index, x);
        }

        // Swap the two edges across the crossing.
        let lower_active_edge_index = upper_active_edge_index + 1;
        if (lower_active_edge_index as usize) < self.active_edges.len() {
            self.active_edges
                .swap(upper_active_edge_index as usize, lower_active_edge_index as usize);
        }
    }

    fn add_new_edges_for_min_point(&mut self, endpoint_index: u32, next_active_edge_index: u32) {
        self.active_edges
            .insert(next_active_edge_index as usize, ActiveEdge::default());
        self.active_edges
            .insert(next_active_edge_index as usize, ActiveEdge::default());

        let prev_endpoint_index = self.prev_endpoint_of(endpoint_index);
        let next_endpoint_index = self.next_endpoint_of(endpoint_index);

        let left_vertex_index = self.b_vertices.len() as u32;
        let position = self.endpoints[endpoint_index as usize].position;
        self.b_vertices
            .push(BVertex::new(position, BVertexKind::Endpoint0, self.path_id));

        let prev_endpoint = self.endpoints[prev_endpoint_index as usize];
        let next_endpoint = self.endpoints[next_endpoint_index as usize];
        let prev_vector = prev_endpoint.position - position;
        let next_vector = next_endpoint.position - position;

        let (upper_control_point_index, lower_control_point_index);
        {
            let new_active_edges = &mut self.active_edges
                [next_active_edge_index as usize..next_active_edge_index as usize + 2];
            new_active_edges[0].left_vertex_index = left_vertex_index;
            new_active_edges[1].left_vertex_index = left_vertex_index;
            new_active_edges[0].toggle_parity();
            new_active_edges[1].toggle_parity();

            if prev_vector.cross(next_vector) >= 0.0 {
                new_active_edges[0].right_endpoint_index = prev_endpoint_index;
                new_active_edges[1].right_endpoint_index = next_endpoint_index;
                new_active_edges[0].left_to_right = false;
                new_active_edges[1].left_to_right = true;

                upper_control_point_index =
                    self.endpoints[endpoint_index as usize].control_point_index;
                lower_control_point_index =
                    self.endpoints[next_endpoint_index as usize].control_point_index;
            } else {
                new_active_edges[0].right_endpoint_index = next_endpoint_index;
                new_active_edges[1].right_endpoint_index = prev_endpoint_index;
                new_active_edges[0].left_to_right = true;
                new_active_edges[1].left_to_right = false;

                upper_control_point_index =
                    self.endpoints[next_endpoint_index as usize].control_point_index;
                lower_control_point_index =
                    self.endpoints[endpoint_index as usize].control_point_index;
            }
        }

        for (edge_offset, control_point_index, bottom) in [
            (0_usize, upper_control_point_index, false),
            (1_usize, lower_control_point_index, true),
        ] {
            let edge_index = next_active_edge_index as usize + edge_offset;
            match control_point_index {
                u32::MAX => self.active_edges[edge_index].control_point_vertex_index = u32::MAX,
                control_point_index => {
                    self.active_edges[edge_index].control_point_vertex_index =
                        self.b_vertices.len() as u32;

                    let control_point_position =
                        self.control_points[control_point_index as usize];
                    let right_vertex_position = self.endpoints
                        [self.active_edges[edge_index].right_endpoint_index as usize]
                        .position;
                    let control_point_b_vertex = BVertex::control_point(
                        position,
                        control_point_position,
                        right_vertex_position,
                        self.path_id,
                        bottom,
                    );
                    self.b_vertices.push(control_point_b_vertex);
                }
            }
        }
    }

    fn should_fill_below_active_edge(&self, active_edge_index: u32) -> bool {
        if (active_edge_index as usize) + 1 == self.active_edges.len() {
            return false;
        }

        match self.fill_rule {
            FillRule::EvenOdd => active_edge_index % 2 == 0,
            FillRule::Winding => self.winding_number_below_active_edge(active_edge_index) != 0,
        }
    }

    fn should_fill_above_active_edge(&self, active_edge_index: u32) -> bool {
        active_edge_index > 0 && self.should_fill_below_active_edge(active_edge_index - 1)
    }

    fn winding_number_above_active_edge(&self, active_edge_index: u32) -> i32 {
        if active_edge_index == 0 {
            0
        } else {
            self.winding_number_below_active_edge(active_edge_index - 1)
        }
    }

    fn winding_number_below_active_edge(&self, active_edge_index: u32) -> i32 {
        let mut winding_number = 0;
        for active_edge in &self.active_edges[0..(active_edge_index as usize + 1)] {
            if active_edge.left_to_right {
                winding_number += 1;
            } else {
                winding_number -= 1;
            }
        }
        winding_number
    }

    fn emit_b_quad_below(&mut self, upper_active_edge_index: u32, right_x: f32) {
        let mut lower_active_edge_index = upper_active_edge_index + 1;

        if self.fill_rule == FillRule::Winding {
            let active_edge_count = self.active_edges.len() as u32;
            let mut winding_number = self.winding_number_below_active_edge(lower_active_edge_index);
            while lower_active_edge_index + 1 < active_edge_count && winding_number != 0 {
                lower_active_edge_index += 1;
                if self.active_edges[lower_active_edge_index as usize].left_to_right {
                    winding_number += 1;
                } else {
                    winding_number -= 1;
                }
            }
        }

        self.emit_b_quad_above(lower_active_edge_index, right_x);
    }

    fn emit_b_quad_above(&mut self, lower_active_edge_index: u32, right_x: f32) {
        debug_assert!(
            lower_active_edge_index > 0,
            "Can't emit b_quads above the top active edge"
        );

        let mut upper_active_edge_index = lower_active_edge_index - 1;

        if self.fill_rule == FillRule::Winding {
            let mut winding_number = self.winding_number_above_active_edge(upper_active_edge_index);
            while upper_active_edge_index > 0 && winding_number != 0 {
                upper_active_edge_index -= 1;
                if self.active_edges[upper_active_edge_index as usize].left_to_right {
                    winding_number -= 1;
                } else {
                    winding_number += 1;
                }
            }
        }

        // A region both of whose edges were already consumed up to the
        // event x is zero-width; emitting it would add degenerate quads to
        // the output.
        let upper_left_x = self.b_vertices
            [self.active_edges[upper_active_edge_index as usize].left_vertex_index as usize]
            .position
            .x;
        let lower_left_x = self.b_vertices
            [self.active_edges[lower_active_edge_index as usize].left_vertex_index as usize]
            .position
            .x;
        if upper_left_x >= right_x && lower_left_x >= right_x {
            return;
        }

        let upper_curve = self.subdivide_active_edge_at(upper_active_edge_index, right_x);
        let lower_curve = self.subdivide_active_edge_at(lower_active_edge_index, right_x);

        let upper_shape = upper_curve.shape(&self.b_vertices);
        let lower_shape = lower_curve.shape(&self.b_vertices);

        match upper_shape {
            Shape::Flat => self
                .edge_indices
                .upper_line_indices
                .push(LineIndices::new(upper_curve.left_curve_left, upper_curve.middle_point)),
            Shape::Convex | Shape::Concave => {
                self.edge_indices.upper_curve_indices.push(CurveIndices::new(
                    upper_curve.left_curve_left,
                    upper_curve.left_curve_control_point,
                    upper_curve.middle_point,
                ));
            }
        }
        match lower_shape {
            Shape::Flat => self
                .edge_indices
                .lower_line_indices
                .push(LineIndices::new(lower_curve.left_curve_left, lower_curve.middle_point)),
            Shape::Convex | Shape::Concave => {
                self.edge_indices.lower_curve_indices.push(CurveIndices::new(
                    lower_curve.left_curve_left,
                    lower_curve.left_curve_control_point,
                    lower_curve.middle_point,
                ));
            }
        }

        debug!(
            "... emitting b-quad: UL {} LL {} UR {} LR {}",
            upper_curve.left_curve_left,
            lower_curve.left_curve_left,
            upper_curve.middle_point,
            lower_curve.middle_point
        );

        match (upper_shape, lower_shape) {
            (Shape::Flat, Shape::Flat)
            | (Shape::Flat, Shape::Convex)
            | (Shape::Convex, Shape::Flat)
            | (Shape::Convex, Shape::Convex) => {
                self.cover_indices.interior_indices.extend([
                    upper_curve.left_curve_left,
                    upper_curve.middle_point,
                    lower_curve.left_curve_left,
                    lower_curve.middle_point,
                    lower_curve.left_curve_left,
                    upper_curve.middle_point,
                ]);
                if upper_shape != Shape::Flat {
                    self.cover_indices.curve_indices.extend([
                        upper_curve.left_curve_control_point,
                        upper_curve.middle_point,
                        upper_curve.left_curve_left,
                    ]);
                }
                if lower_shape != Shape::Flat {
                    self.cover_indices.curve_indices.extend([
                        lower_curve.left_curve_control_point,
                        lower_curve.left_curve_left,
                        lower_curve.middle_point,
                    ]);
                }
            }

            (Shape::Concave, Shape::Flat) | (Shape::Concave, Shape::Convex) => {
                self.cover_indices.interior_indices.extend([
                    upper_curve.left_curve_left,
                    upper_curve.left_curve_control_point,
                    lower_curve.left_curve_left,
                    upper_curve.middle_point,
                    lower_curve.middle_point,
                    upper_curve.left_curve_control_point,
                    lower_curve.middle_point,
                    lower_curve.left_curve_left,
                    upper_curve.left_curve_control_point,
                ]);
                self.cover_indices.curve_indices.extend([
                    upper_curve.left_curve_control_point,
                    upper_curve.left_curve_left,
                    upper_curve.middle_point,
                ]);
                if lower_shape != Shape::Flat {
                    self.cover_indices.curve_indices.extend([
                        lower_curve.left_curve_control_point,
                        lower_curve.left_curve_left,
                        lower_curve.middle_point,
                    ]);
                }
            }

            (Shape::Flat, Shape::Concave) | (Shape::Convex, Shape::Concave) => {
                self.cover_indices.interior_indices.extend([
                    upper_curve.left_curve_left,
                    upper_curve.middle_point,
                    lower_curve.left_curve_control_point,
                    upper_curve.middle_point,
                    lower_curve.middle_point,
                    lower_curve.left_curve_control_point,
                    upper_curve.left_curve_left,
                    lower_curve.left_curve_control_point,
                    lower_curve.left_curve_left,
                ]);
                self.cover_indices.curve_indices.extend([
                    lower_curve.left_curve_control_point,
                    lower_curve.middle_point,
                    lower_curve.left_curve_left,
                ]);
                if upper_shape != Shape::Flat {
                    self.cover_indices.curve_indices.extend([
                        upper_curve.left_curve_control_point,
                        upper_curve.middle_point,
                        upper_curve.left_curve_left,
                    ]);
                }
            }

            (Shape::Concave, Shape::Concave) => {
                self.cover_indices.interior_indices.extend([
                    upper_curve.left_curve_left,
                    upper_curve.left_curve_control_point,
                    lower_curve.left_curve_left,
                    lower_curve.left_curve_left,
                    upper_curve.left_curve_control_point,
                    lower_curve.left_curve_control_point,
                    upper_curve.middle_point,
                    lower_curve.left_curve_control_point,
                    upper_curve.left_curve_control_point,
                    upper_curve.middle_point,
                    lower_curve.middle_point,
                    lower_curve.left_curve_control_point,
                ]);
                self.cover_indices.curve_indices.extend([
                    upper_curve.left_curve_control_point,
                    upper_curve.left_curve_left,
                    upper_curve.middle_point,
                    lower_curve.left_curve_control_point,
                    lower_curve.middle_point,
                    lower_curve.left_curve_left,
                ]);
            }
        }

        self.b_quads.push(BQuad::new(
            upper_curve.left_curve_left,
            upper_curve.left_curve_control_point,
            upper_curve.middle_point,
            lower_curve.left_curve_left,
            lower_curve.left_curve_control_point,
            lower_curve.middle_point,
        ));
    }

    fn already_visited_point(&self, point: &SweepPoint) -> bool {
        let index = point.endpoint_index as usize * 2 + point.point_type as usize;
        self.visited_points.get(index).copied().unwrap_or(false)
    }

    fn mark_point_as_visited(&mut self, point: &SweepPoint) {
        self.visited_points[point.endpoint_index as usize * 2 + point.point_type as usize] = true;
    }

    fn find_right_point_in_active_edge_list(&self, endpoint_index: u32) -> MatchingActiveEdges {
        let mut matching_active_edges = MatchingActiveEdges {
            indices: [0, 0],
            count: 0,
        };

        for (active_edge_index, active_edge) in self.active_edges.iter().enumerate() {
            if active_edge.right_endpoint_index == endpoint_index {
                matching_active_edges.indices[matching_active_edges.count as usize] =
                    active_edge_index as u32;
                matching_active_edges.count += 1;
                if matching_active_edges.count == 2 {
                    break;
                }
            }
        }

        matching_active_edges
    }

    fn classify_endpoint(&self, endpoint_index: u32) -> EndpointClass {
        // Create temporary points just for the comparison.
        let point = self.create_point_from_endpoint(endpoint_index);
        let prev_point = self.create_point_from_endpoint(self.prev_endpoint_of(endpoint_index));
        let next_point = self.create_point_from_endpoint(self.next_endpoint_of(endpoint_index));

        // Remember to reverse, because the comparison is reversed (as the
        // heap is a max-heap).
        match (prev_point.cmp(&point).reverse(), next_point.cmp(&point).reverse()) {
            (Ordering::Less, Ordering::Less) => EndpointClass::Max,
            (Ordering::Less, _) | (_, Ordering::Less) => EndpointClass::Regular,
            (_, _) => EndpointClass::Min,
        }
    }

    fn find_point_between_active_edges(&self, endpoint_index: u32) -> u32 {
        let endpoint = &self.endpoints[endpoint_index as usize];
        match self.active_edges.iter().position(|active_edge| {
            self.solve_active_edge_y_for_x(endpoint.position.x, active_edge) > endpoint.position.y
        }) {
            Some(active_edge_index) => active_edge_index as u32,
            None => self.active_edges.len() as u32,
        }
    }

    fn solve_active_edge_t_for_x(&self, x: f32, active_edge: &ActiveEdge) -> f32 {
        let left_vertex_position =
            self.b_vertices[active_edge.left_vertex_index as usize].position;
        let right_endpoint_position =
            self.endpoints[active_edge.right_endpoint_index as usize].position;
        match active_edge.control_point_vertex_index {
            u32::MAX => {
                geometry::solve_line_t_for_x(x, left_vertex_position, right_endpoint_position)
            }
            control_point_vertex_index => {
                let control_point =
                    self.b_vertices[control_point_vertex_index as usize].position;
                geometry::solve_quadratic_bezier_t_for_x(
                    x,
                    left_vertex_position,
                    control_point,
                    right_endpoint_position,
                )
            }
        }
    }

    fn solve_active_edge_y_for_x(&self, x: f32, active_edge: &ActiveEdge) -> f32 {
        self.sample_active_edge(self.solve_active_edge_t_for_x(x, active_edge), active_edge)
            .y
    }

    fn sample_active_edge(&self, t: f32, active_edge: &ActiveEdge) -> Point {
        let left_vertex_position =
            self.b_vertices[active_edge.left_vertex_index as usize].position;
        let right_endpoint_position =
            self.endpoints[active_edge.right_endpoint_index as usize].position;
        match active_edge.control_point_vertex_index {
            u32::MAX => left_vertex_position.lerp(right_endpoint_position, t),
            control_point_vertex_index => {
                let control_point =
                    self.b_vertices[control_point_vertex_index as usize].position;
                geometry::Curve::new(left_vertex_position, control_point, right_endpoint_position)
                    .sample(t)
            }
        }
    }

    fn add_crossings_to_heap_if_necessary(
        &mut self,
        mut first_active_edge_index: u32,
        mut last_active_edge_index: u32,
    ) {
        if self.active_edges.is_empty() {
            return;
        }

        first_active_edge_index = first_active_edge_index.saturating_sub(1);
        last_active_edge_index =
            cmp::min(last_active_edge_index + 1, self.active_edges.len() as u32);
        if first_active_edge_index + 1 > last_active_edge_index {
            return;
        }

        for upper_active_edge_index in first_active_edge_index..(last_active_edge_index - 1) {
            let crossing_position =
                match self.crossing_point_for_active_edge(upper_active_edge_index) {
                    None => continue,
                    Some(crossing_point) => crossing_point,
                };

            let new_point = SweepPoint {
                position: crossing_position,
                endpoint_index: self.active_edges[upper_active_edge_index as usize]
                    .right_endpoint_index,
                point_type: PointType::CrossingBelow,
            };

            self.heap.push(new_point);
        }
    }

    fn crossing_point_for_active_edge(&self, upper_active_edge_index: u32) -> Option<Point> {
        let lower_active_edge_index = upper_active_edge_index + 1;

        let upper_active_edge = &self.active_edges[upper_active_edge_index as usize];
        let lower_active_edge = &self.active_edges[lower_active_edge_index as usize];
        if upper_active_edge.left_vertex_index == lower_active_edge.left_vertex_index
            || upper_active_edge.right_endpoint_index == lower_active_edge.right_endpoint_index
        {
            return None;
        }

        let upper_left_vertex_position =
            self.b_vertices[upper_active_edge.left_vertex_index as usize].position;
        let upper_right_endpoint_position =
            self.endpoints[upper_active_edge.right_endpoint_index as usize].position;
        let lower_left_vertex_position =
            self.b_vertices[lower_active_edge.left_vertex_index as usize].position;
        let lower_right_endpoint_position =
            self.endpoints[lower_active_edge.right_endpoint_index as usize].position;

        match (
            upper_active_edge.control_point_vertex_index,
            lower_active_edge.control_point_vertex_index,
        ) {
            (u32::MAX, u32::MAX) => geometry::line_line_crossing_point(
                upper_left_vertex_position,
                upper_right_endpoint_position,
                lower_left_vertex_position,
                lower_right_endpoint_position,
            ),
            (upper_control_point_vertex_index, u32::MAX) => {
                let upper_control_point =
                    self.b_vertices[upper_control_point_vertex_index as usize].position;
                geometry::line_quadratic_bezier_crossing_point(
                    lower_left_vertex_position,
                    lower_right_endpoint_position,
                    upper_left_vertex_position,
                    upper_control_point,
                    upper_right_endpoint_position,
                )
            }
            (u32::MAX, lower_control_point_vertex_index) => {
                let lower_control_point =
                    self.b_vertices[lower_control_point_vertex_index as usize].position;
                geometry::line_quadratic_bezier_crossing_point(
                    upper_left_vertex_position,
                    upper_right_endpoint_position,
                    lower_left_vertex_position,
                    lower_control_point,
                    lower_right_endpoint_position,
                )
            }
            (upper_control_point_vertex_index, lower_control_point_vertex_index) => {
                let upper_control_point =
                    self.b_vertices[upper_control_point_vertex_index as usize].position;
                let lower_control_point =
                    self.b_vertices[lower_control_point_vertex_index as usize].position;
                geometry::quadratic_bezier_quadratic_bezier_crossing_point(
                    upper_left_vertex_position,
                    upper_control_point,
                    upper_right_endpoint_position,
                    lower_left_vertex_position,
                    lower_control_point,
                    lower_right_endpoint_position,
                )
            }
        }
    }

    fn subdivide_active_edge_at(&mut self, active_edge_index: u32, x: f32) -> SubdividedActiveEdge {
        let t = self.solve_active_edge_t_for_x(x, &self.active_edges[active_edge_index as usize]);

        let bottom = self.should_fill_above_active_edge(active_edge_index);
        let path_id = self.path_id;

        let active_edge = &mut self.active_edges[active_edge_index as usize];
        let left_curve_left = active_edge.left_vertex_index;

        let left_curve_control_point_vertex_index;
        match active_edge.control_point_vertex_index {
            u32::MAX => {
                let left_point_position = self.b_vertices[left_curve_left as usize].position;
                let right_point =
                    self.endpoints[active_edge.right_endpoint_index as usize].position;
                let middle_point = left_point_position.lerp(right_point, t);

                active_edge.left_vertex_index = self.b_vertices.len() as u32;
                self.b_vertices
                    .push(BVertex::new(middle_point, active_edge.endpoint_kind(), path_id));

                active_edge.toggle_parity();

                left_curve_control_point_vertex_index = u32::MAX;
            }
            _ => {
                let left_endpoint_position =
                    self.b_vertices[active_edge.left_vertex_index as usize].position;
                let right_endpoint_position =
                    self.endpoints[active_edge.right_endpoint_index as usize].position;
                let subdivision = SubdividedQuadraticBezier::new(
                    t,
                    left_endpoint_position,
                    self.b_vertices[active_edge.control_point_vertex_index as usize].position,
                    right_endpoint_position,
                );

                left_curve_control_point_vertex_index = self.b_vertices.len() as u32;
                active_edge.left_vertex_index = left_curve_control_point_vertex_index + 1;
                active_edge.control_point_vertex_index = left_curve_control_point_vertex_index + 2;

                let middle_kind = active_edge.endpoint_kind();
                self.b_vertices.extend([
                    BVertex::control_point(
                        left_endpoint_position,
                        subdivision.ap1,
                        subdivision.ap2bp0,
                        path_id,
                        bottom,
                    ),
                    BVertex::new(subdivision.ap2bp0, middle_kind, path_id),
                    BVertex::control_point(
                        subdivision.ap2bp0,
                        subdivision.bp1,
                        right_endpoint_position,
                        path_id,
                        bottom,
                    ),
                ]);

                active_edge.toggle_parity();
            }
        }

        SubdividedActiveEdge {
            left_curve_left,
            left_curve_control_point: left_curve_control_point_vertex_index,
            middle_point: self.active_edges[active_edge_index as usize].left_vertex_index,
        }
    }

    fn prev_endpoint_of(&self, endpoint_index: u32) -> u32 {
        let endpoint = &self.endpoints[endpoint_index as usize];
        let subpath = &self.subpaths[endpoint.subpath_index as usize];
        if endpoint_index > subpath.first_endpoint_index {
            endpoint_index - 1
        } else {
            subpath.last_endpoint_index - 1
        }
    }

    fn next_endpoint_of(&self, endpoint_index: u32) -> u32 {
        let endpoint = &self.endpoints[endpoint_index as usize];
        let subpath = &self.subpaths[endpoint.subpath_index as usize];
        if endpoint_index + 1 < subpath.last_endpoint_index {
            endpoint_index + 1
        } else {
            subpath.first_endpoint_index
        }
    }

    fn create_point_from_endpoint(&self, endpoint_index: u32) -> SweepPoint {
        SweepPoint {
            position: self.endpoints[endpoint_index as usize].position,
            endpoint_index,
            point_type: PointType::Endpoint,
        }
    }

    fn control_point_index_before_endpoint(&self, endpoint_index: u32) -> u32 {
        self.endpoints[endpoint_index as usize].control_point_index
    }

    fn control_point_index_after_endpoint(&self, endpoint_index: u32) -> u32 {
        self.control_point_index_before_endpoint(self.next_endpoint_of(endpoint_index))
    }
}

#[derive(Debug, Clone)]
struct CoverIndicesBuffer {
    interior_indices: Vec<u32>,
    curve_indices: Vec<u32>,
}

impl CoverIndicesBuffer {
    fn new() -> CoverIndicesBuffer {
        CoverIndicesBuffer {
            interior_indices: vec![],
            curve_indices: vec![],
        }
    }

    fn clear(&mut self) {
        self.interior_indices.clear();
        self.curve_indices.clear();
    }

    fn as_ref(&self) -> CoverIndices<'_> {
        CoverIndices {
            interior_indices: &self.interior_indices,
            curve_indices: &self.curve_indices,
        }
    }
}

/// Triangle lists covering the partitioned interior: opaque triangles plus
/// Loop–Blinn curve triangles.
#[derive(Debug, Clone, Copy)]
pub struct CoverIndices<'a> {
    pub interior_indices: &'a [u32],
    pub curve_indices: &'a [u32],
}

#[derive(Debug, Clone)]
struct EdgeIndicesBuffer {
    upper_line_indices: Vec<LineIndices>,
    upper_curve_indices: Vec<CurveIndices>,
    lower_line_indices: Vec<LineIndices>,
    lower_curve_indices: Vec<CurveIndices>,
}

impl EdgeIndicesBuffer {
    fn new() -> EdgeIndicesBuffer {
        EdgeIndicesBuffer {
            upper_line_indices: vec![],
            upper_curve_indices: vec![],
            lower_line_indices: vec![],
            lower_curve_indices: vec![],
        }
    }

    fn clear(&mut self) {
        self.upper_line_indices.clear();
        self.upper_curve_indices.clear();
        self.lower_line_indices.clear();
        self.lower_curve_indices.clear();
    }

    fn as_ref(&self) -> EdgeIndices<'_> {
        EdgeIndices {
            upper_line_indices: &self.upper_line_indices,
            upper_curve_indices: &self.upper_curve_indices,
            lower_line_indices: &self.lower_line_indices,
            lower_curve_indices: &self.lower_curve_indices,
        }
    }
}

/// Per-edge index lists for the edge antialiasing passes, split by side
/// and by segment kind.
#[derive(Debug, Clone, Copy)]
pub struct EdgeIndices<'a> {
    pub upper_line_indices: &'a [LineIndices],
    pub upper_curve_indices: &'a [CurveIndices],
    pub lower_line_indices: &'a [LineIndices],
    pub lower_curve_indices: &'a [CurveIndices],
}

#[derive(Debug, Clone, Copy)]
struct SweepPoint {
    position: Point,
    endpoint_index: u32,
    point_type: PointType,
}

impl PartialEq for SweepPoint {
    #[inline]
    fn eq(&self, other: &SweepPoint) -> bool {
        self.position == other.position && self.endpoint_index == other.endpoint_index
    }
}

impl Eq for SweepPoint {}

impl PartialOrd for SweepPoint {
    #[inline]
    fn partial_cmp(&self, other: &SweepPoint) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SweepPoint {
    // Reverse, because `std::collections::BinaryHeap` is a *max*-heap! Ties
    // break by y and then by input index for determinism.
    #[inline]
    fn cmp(&self, other: &SweepPoint) -> Ordering {
        match other.position.x.partial_cmp(&self.position.x) {
            None | Some(Ordering::Equal) => {}
            Some(ordering) => return ordering,
        }
        match other.position.y.partial_cmp(&self.position.y) {
            None | Some(Ordering::Equal) => {}
            Some(ordering) => return ordering,
        }
        other.endpoint_index.cmp(&self.endpoint_index)
    }
}

#[derive(Debug, Clone, Copy)]
struct ActiveEdge {
    left_vertex_index: u32,
    control_point_vertex_index: u32,
    right_endpoint_index: u32,
    left_to_right: bool,
    parity: bool,
}

impl Default for ActiveEdge {
    fn default() -> ActiveEdge {
        ActiveEdge {
            left_vertex_index: 0,
            control_point_vertex_index: u32::MAX,
            right_endpoint_index: 0,
            left_to_right: false,
            parity: false,
        }
    }
}

impl ActiveEdge {
    fn toggle_parity(&mut self) {
        self.parity = !self.parity;
    }

    fn endpoint_kind(&self) -> BVertexKind {
        if !self.parity {
            BVertexKind::Endpoint0
        } else {
            BVertexKind::Endpoint1
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct SubdividedActiveEdge {
    left_curve_left: u32,
    left_curve_control_point: u32,
    middle_point: u32,
}

impl SubdividedActiveEdge {
    fn shape(&self, b_vertices: &[BVertex]) -> Shape {
        if self.left_curve_control_point == u32::MAX {
            Shape::Flat
        } else if b_vertices[self.left_curve_control_point as usize].sign() < 0 {
            Shape::Convex
        } else {
            Shape::Concave
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[repr(u8)]
enum PointType {
    Endpoint = 0,
    CrossingBelow = 1,
}

#[derive(Debug, Clone, Copy)]
enum EndpointClass {
    Min,
    Regular,
    Max,
}

#[derive(Debug, Clone, Copy)]
struct MatchingActiveEdges {
    indices: [u32; 2],
    count: u8,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Shape {
    Flat,
    Convex,
    Concave,
}
