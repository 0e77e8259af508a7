// Copyright 2025 the Quadrille Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Computes per-b-quad tessellation levels and expands them into the
//! buffers the bound antialiasing mode consumes.
//!
//! Levels are derived from the transformed control-polygon arc length of
//! each edge, so callers re-run [`Tessellator::compute_hull`] whenever the
//! view transform changes. MSAA mode expands the levels into explicit
//! parametric sample rows and a triangle list; ECAA mode emits one edge
//! instance per tessellated span for the analytic coverage pass instead.

use bytemuck::{Pod, Zeroable};
use half::f16;

use crate::kurbo::Affine;
use crate::{AntialiasingMode, BQuad, BVertex, EdgeInstance, Point, Vertex};

/// Hardware cap on a single patch's tessellation level.
pub const MAX_TESS_LEVEL: u32 = 64;

/// One tessellation level per this many transformed path units of edge
/// arc length.
const UNITS_PER_TESS_LEVEL: f32 = 4.0;

/// Expands a partition result into tessellation levels and mode-specific
/// vertex, index, or edge-instance buffers.
///
/// The partition arrays are copied in at construction, so the tessellator
/// stays valid independently of the partitioner that produced them. Only
/// the outputs matching the bound mode are populated; querying the other
/// mode's outputs yields empty slices.
pub struct Tessellator {
    b_quads: Vec<BQuad>,
    b_vertices: Vec<BVertex>,
    antialiasing_mode: AntialiasingMode,

    tess_levels: Vec<QuadTessLevels>,
    vertices: Vec<Vertex>,
    msaa_indices: Vec<u32>,
    edge_instances: Vec<EdgeInstance>,
    levien_indices: Vec<u32>,
}

/// Outer and inner tessellation levels for one b-quad patch, stored
/// half-precision to match the GPU tessellation-control input width.
///
/// `outer` is `[1, upper edge, 1, lower edge]`; `inner` is
/// `[max(upper, lower), 0]`.
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
#[repr(C)]
pub struct QuadTessLevels {
    pub outer: [f16; 4],
    pub inner: [f16; 2],
}

impl QuadTessLevels {
    fn new() -> QuadTessLevels {
        QuadTessLevels {
            outer: [f16::ZERO; 4],
            inner: [f16::ZERO; 2],
        }
    }
}

impl Tessellator {
    pub fn new(
        b_quads: &[BQuad],
        b_vertices: &[BVertex],
        antialiasing_mode: AntialiasingMode,
    ) -> Tessellator {
        Tessellator {
            b_quads: b_quads.to_vec(),
            b_vertices: b_vertices.to_vec(),
            antialiasing_mode,

            tess_levels: vec![QuadTessLevels::new(); b_quads.len()],
            vertices: vec![],
            msaa_indices: vec![],
            edge_instances: vec![],
            levien_indices: vec![],
        }
    }

    /// Recomputes each b-quad's tessellation levels under the given view
    /// transform.
    ///
    /// Levels are proportional to the transformed control-polygon arc
    /// length of each edge and clamped to `[1, MAX_TESS_LEVEL]`, so no
    /// geometry is ever dropped and no patch exceeds the hardware cap.
    pub fn compute_hull(&mut self, transform: &Affine) {
        for b_quad_index in 0..self.tess_levels.len() {
            let b_quad = self.b_quads[b_quad_index];

            let upper_tess_level = self.tess_level_for_edge(
                b_quad.upper_left_vertex_index,
                b_quad.upper_control_point_vertex_index,
                b_quad.upper_right_vertex_index,
                transform,
            );
            let lower_tess_level = self.tess_level_for_edge(
                b_quad.lower_left_vertex_index,
                b_quad.lower_control_point_vertex_index,
                b_quad.lower_right_vertex_index,
                transform,
            );

            let tess_levels = &mut self.tess_levels[b_quad_index];
            tess_levels.outer[0] = f16::ONE;
            tess_levels.outer[1] = f16::from_f32(upper_tess_level as f32);
            tess_levels.outer[2] = f16::ONE;
            tess_levels.outer[3] = f16::from_f32(lower_tess_level as f32);
            tess_levels.inner[0] =
                f16::from_f32(upper_tess_level.max(lower_tess_level) as f32);
            tess_levels.inner[1] = f16::ZERO;
        }
    }

    /// Expands the computed levels into the bound mode's buffers,
    /// replacing any prior expansion.
    pub fn compute_domain(&mut self) {
        self.vertices.clear();
        self.msaa_indices.clear();
        self.edge_instances.clear();
        self.levien_indices.clear();

        for b_quad_index in 0..self.tess_levels.len() {
            let tess_levels = self.tess_levels[b_quad_index];
            let b_quad = self.b_quads[b_quad_index];

            let upper_tess_level = f32::from(tess_levels.outer[1]) as u32;
            let lower_tess_level = f32::from(tess_levels.outer[3]) as u32;
            let tess_level = upper_tess_level.max(lower_tess_level).max(1);

            match self.antialiasing_mode {
                AntialiasingMode::Msaa => {
                    let path_id =
                        self.b_vertices[b_quad.upper_left_vertex_index as usize].path_id;

                    let first_upper_vertex_index = self.vertices.len() as u32;
                    self.vertices.extend((0..=tess_level).map(|index| {
                        Vertex::new(
                            path_id,
                            b_quad.upper_left_vertex_index,
                            b_quad.upper_control_point_vertex_index,
                            b_quad.upper_right_vertex_index,
                            index as f32 / tess_level as f32,
                        )
                    }));

                    let first_lower_vertex_index = self.vertices.len() as u32;
                    self.vertices.extend((0..=tess_level).map(|index| {
                        Vertex::new(
                            path_id,
                            b_quad.lower_left_vertex_index,
                            b_quad.lower_control_point_vertex_index,
                            b_quad.lower_right_vertex_index,
                            index as f32 / tess_level as f32,
                        )
                    }));

                    // Two triangles per sample column.
                    self.msaa_indices.reserve(tess_level as usize * 6);
                    for index in 0..tess_level {
                        self.msaa_indices.extend([
                            first_upper_vertex_index + index,
                            first_upper_vertex_index + index + 1,
                            first_lower_vertex_index + index,
                            first_upper_vertex_index + index + 1,
                            first_lower_vertex_index + index + 1,
                            first_lower_vertex_index + index,
                        ]);
                    }
                }
                AntialiasingMode::Ecaa => {
                    self.emit_edge_instances(
                        b_quad.upper_left_vertex_index,
                        b_quad.upper_control_point_vertex_index,
                        b_quad.upper_right_vertex_index,
                        tess_level,
                    );
                    self.emit_edge_instances(
                        b_quad.lower_left_vertex_index,
                        b_quad.lower_control_point_vertex_index,
                        b_quad.lower_right_vertex_index,
                        tess_level,
                    );
                }
            }
        }
    }

    fn emit_edge_instances(
        &mut self,
        left_b_vertex_index: u32,
        control_point_b_vertex_index: u32,
        right_b_vertex_index: u32,
        tess_level: u32,
    ) {
        for index in 0..tess_level {
            self.edge_instances.push(EdgeInstance::new(
                left_b_vertex_index,
                control_point_b_vertex_index,
                right_b_vertex_index,
                index as f32 / tess_level as f32,
                (index + 1) as f32 / tess_level as f32,
            ));
            self.levien_indices
                .extend([left_b_vertex_index, right_b_vertex_index]);
        }
    }

    fn tess_level_for_edge(
        &self,
        left_endpoint_index: u32,
        control_point_index: u32,
        right_endpoint_index: u32,
        transform: &Affine,
    ) -> u32 {
        // Lines never need subdivision.
        if control_point_index == u32::MAX {
            return 1;
        }

        let p0 = transform_point(transform, self.b_vertices[left_endpoint_index as usize].position);
        let p1 =
            transform_point(transform, self.b_vertices[control_point_index as usize].position);
        let p2 =
            transform_point(transform, self.b_vertices[right_endpoint_index as usize].position);

        // The control polygon length bounds the arc length from above.
        let length = (p1 - p0).length() + (p2 - p1).length();
        (1 + (length / UNITS_PER_TESS_LEVEL) as u32).min(MAX_TESS_LEVEL)
    }

    /// Per-b-quad tessellation levels, valid after `compute_hull`.
    #[inline]
    pub fn tess_levels(&self) -> &[QuadTessLevels] {
        &self.tess_levels
    }

    /// MSAA sample rows; empty in ECAA mode.
    #[inline]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// MSAA triangle list; empty in ECAA mode.
    #[inline]
    pub fn msaa_indices(&self) -> &[u32] {
        &self.msaa_indices
    }

    /// ECAA per-span edge records; empty in MSAA mode.
    #[inline]
    pub fn edge_instances(&self) -> &[EdgeInstance] {
        &self.edge_instances
    }

    /// Flattened b-vertex index pairs, one per ECAA edge instance; empty
    /// in MSAA mode.
    #[inline]
    pub fn levien_indices(&self) -> &[u32] {
        &self.levien_indices
    }
}

fn transform_point(transform: &Affine, point: Point) -> Point {
    Point::from_kurbo(*transform * point.to_kurbo())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legalizer::Legalizer;
    use crate::partitioner::Partitioner;

    fn partition_semicircle_like() -> Partitioner {
        let mut legalizer = Legalizer::new();
        legalizer.move_to(Point::new(0.0, 0.0));
        legalizer.quadratic_curve_to(Point::new(10.0, 12.0), Point::new(20.0, 0.0));
        legalizer.close_path();

        let mut partitioner = Partitioner::new();
        partitioner.init(
            legalizer.endpoints(),
            legalizer.control_points(),
            legalizer.subpaths(),
        );
        partitioner.partition(0, 0, 1).unwrap();
        partitioner
    }

    fn partition_square() -> Partitioner {
        let mut legalizer = Legalizer::new();
        legalizer.move_to(Point::new(0.0, 0.0));
        legalizer.line_to(Point::new(10.0, 0.0));
        legalizer.line_to(Point::new(10.0, 10.0));
        legalizer.line_to(Point::new(0.0, 10.0));
        legalizer.close_path();

        let mut partitioner = Partitioner::new();
        partitioner.init(
            legalizer.endpoints(),
            legalizer.control_points(),
            legalizer.subpaths(),
        );
        partitioner.partition(0, 0, 1).unwrap();
        partitioner
    }

    #[test]
    fn line_edges_tessellate_at_level_one() {
        let partitioner = partition_square();
        let mut tessellator = Tessellator::new(
            partitioner.b_quads(),
            partitioner.b_vertices(),
            AntialiasingMode::Msaa,
        );
        tessellator.compute_hull(&Affine::IDENTITY);

        for levels in tessellator.tess_levels() {
            assert_eq!(f32::from(levels.outer[1]), 1.0);
            assert_eq!(f32::from(levels.outer[3]), 1.0);
            assert_eq!(f32::from(levels.inner[0]), 1.0);
        }
    }

    #[test]
    fn tess_levels_stay_within_hardware_bounds() {
        let partitioner = partition_semicircle_like();
        let mut tessellator = Tessellator::new(
            partitioner.b_quads(),
            partitioner.b_vertices(),
            AntialiasingMode::Msaa,
        );

        for scale in [0.0001, 1.0, 1.0e6] {
            tessellator.compute_hull(&Affine::scale(scale));
            for levels in tessellator.tess_levels() {
                for level in levels.outer.iter().chain(levels.inner[..1].iter()) {
                    let level = f32::from(*level);
                    assert!(
                        (1.0..=MAX_TESS_LEVEL as f32).contains(&level),
                        "level {level} out of range at scale {scale}"
                    );
                }
            }
        }
    }

    #[test]
    fn curve_levels_grow_with_magnification() {
        let partitioner = partition_semicircle_like();
        let mut tessellator = Tessellator::new(
            partitioner.b_quads(),
            partitioner.b_vertices(),
            AntialiasingMode::Msaa,
        );

        tessellator.compute_hull(&Affine::IDENTITY);
        let near: f32 = tessellator
            .tess_levels()
            .iter()
            .map(|levels| f32::from(levels.inner[0]))
            .sum();

        tessellator.compute_hull(&Affine::scale(16.0));
        let far: f32 = tessellator
            .tess_levels()
            .iter()
            .map(|levels| f32::from(levels.inner[0]))
            .sum();

        assert!(far > near, "magnification did not raise levels: {near} vs {far}");
    }

    #[test]
    fn msaa_domain_is_isolated_from_ecaa_outputs() {
        let partitioner = partition_semicircle_like();
        let mut tessellator = Tessellator::new(
            partitioner.b_quads(),
            partitioner.b_vertices(),
            AntialiasingMode::Msaa,
        );
        tessellator.compute_hull(&Affine::IDENTITY);
        tessellator.compute_domain();

        assert!(!tessellator.vertices().is_empty());
        assert_eq!(tessellator.msaa_indices().len() % 3, 0);
        assert!(!tessellator.msaa_indices().is_empty());
        let vertex_count = tessellator.vertices().len() as u32;
        assert!(tessellator.msaa_indices().iter().all(|&i| i < vertex_count));

        assert!(tessellator.edge_instances().is_empty());
        assert!(tessellator.levien_indices().is_empty());
    }

    #[test]
    fn ecaa_domain_is_isolated_from_msaa_outputs() {
        let partitioner = partition_semicircle_like();
        let mut tessellator = Tessellator::new(
            partitioner.b_quads(),
            partitioner.b_vertices(),
            AntialiasingMode::Ecaa,
        );
        tessellator.compute_hull(&Affine::IDENTITY);
        tessellator.compute_domain();

        assert!(!tessellator.edge_instances().is_empty());
        assert_eq!(
            tessellator.levien_indices().len(),
            tessellator.edge_instances().len() * 2
        );
        for instance in tessellator.edge_instances() {
            assert!(instance.left_time >= 0.0);
            assert!(instance.right_time <= 1.0);
            assert!(instance.left_time < instance.right_time);
        }

        assert!(tessellator.vertices().is_empty());
        assert!(tessellator.msaa_indices().is_empty());
    }

    #[test]
    fn ecaa_expansion_matches_computed_levels() {
        let partitioner = partition_semicircle_like();
        let mut tessellator = Tessellator::new(
            partitioner.b_quads(),
            partitioner.b_vertices(),
            AntialiasingMode::Ecaa,
        );
        tessellator.compute_hull(&Affine::scale(8.0));
        tessellator.compute_domain();

        let expected_spans: u32 = tessellator
            .tess_levels()
            .iter()
            .map(|levels| {
                let level = f32::from(levels.inner[0]) as u32;
                level.max(1) * 2
            })
            .sum();
        assert_eq!(tessellator.edge_instances().len() as u32, expected_spans);
    }

    #[test]
    fn parametric_samples_cover_the_unit_interval() {
        let partitioner = partition_semicircle_like();
        let mut tessellator = Tessellator::new(
            partitioner.b_quads(),
            partitioner.b_vertices(),
            AntialiasingMode::Msaa,
        );
        tessellator.compute_hull(&Affine::scale(8.0));
        tessellator.compute_domain();

        for vertex in tessellator.vertices() {
            assert!((0.0..=1.0).contains(&vertex.time));
        }
        let has_start = tessellator.vertices().iter().any(|v| v.time == 0.0);
        let has_end = tessellator.vertices().iter().any(|v| v.time == 1.0);
        assert!(has_start && has_end);
    }
}
