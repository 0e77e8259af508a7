// Copyright 2025 the Quadrille Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! End-to-end pipeline tests: legalize, partition, tessellate.

use quadrille::kurbo::Affine;
use quadrille::legalizer::Legalizer;
use quadrille::partitioner::Partitioner;
use quadrille::tessellator::{Tessellator, MAX_TESS_LEVEL};
use quadrille::{AntialiasingMode, BQuad, BVertex, BVertexKind, FillRule, Point};

fn legalize_polygon(points: &[Point]) -> Legalizer {
    let mut legalizer = Legalizer::new();
    let mut iter = points.iter();
    legalizer.move_to(*iter.next().unwrap());
    for point in iter {
        legalizer.line_to(*point);
    }
    legalizer.close_path();
    legalizer
}

fn partition(legalizer: &Legalizer, fill_rule: FillRule) -> Partitioner {
    let mut partitioner = Partitioner::new();
    partitioner.init(
        legalizer.endpoints(),
        legalizer.control_points(),
        legalizer.subpaths(),
    );
    partitioner.set_fill_rule(fill_rule);
    let subpath_count = legalizer.subpaths().len() as u32;
    partitioner.partition(0, 0, subpath_count).unwrap();
    partitioner
}

fn shoelace_area(points: &[Point]) -> f32 {
    let mut twice_area = 0.0;
    for (i, a) in points.iter().enumerate() {
        let b = points[(i + 1) % points.len()];
        twice_area += a.x * b.y - b.x * a.y;
    }
    (twice_area * 0.5).abs()
}

/// Numerically integrates y dx along one b-quad edge, left to right.
fn edge_integral(b_vertices: &[BVertex], left: u32, control: u32, right: u32) -> f32 {
    const STEPS: usize = 256;
    let p0 = b_vertices[left as usize].position;
    let p1 = b_vertices[right as usize].position;

    let sample: Box<dyn Fn(f32) -> Point> = match control {
        u32::MAX => Box::new(move |t| p0.lerp(p1, t)),
        control => {
            let c = b_vertices[control as usize].position;
            Box::new(move |t| quadrille::geometry::Curve::new(p0, c, p1).sample(t))
        }
    };

    let mut integral = 0.0;
    let mut prev = sample(0.0);
    for i in 1..=STEPS {
        let next = sample(i as f32 / STEPS as f32);
        integral += 0.5 * (prev.y + next.y) * (next.x - prev.x);
        prev = next;
    }
    integral
}

/// Area enclosed between a b-quad's lower and upper edges.
fn b_quad_area(partitioner: &Partitioner, b_quad: &BQuad) -> f32 {
    let v = partitioner.b_vertices();
    let lower = edge_integral(
        v,
        b_quad.lower_left_vertex_index,
        b_quad.lower_control_point_vertex_index,
        b_quad.lower_right_vertex_index,
    );
    let upper = edge_integral(
        v,
        b_quad.upper_left_vertex_index,
        b_quad.upper_control_point_vertex_index,
        b_quad.upper_right_vertex_index,
    );
    (lower - upper).abs()
}

fn total_area(partitioner: &Partitioner) -> f32 {
    partitioner
        .b_quads()
        .iter()
        .map(|b_quad| b_quad_area(partitioner, b_quad))
        .sum()
}

#[test]
fn unit_square_yields_one_b_quad_with_input_corners() {
    let corners = [
        Point::new(0.0, 0.0),
        Point::new(10.0, 0.0),
        Point::new(10.0, 10.0),
        Point::new(0.0, 10.0),
    ];
    let partitioner = partition(&legalize_polygon(&corners), FillRule::Winding);

    assert_eq!(partitioner.b_quads().len(), 1);
    let b_quad = partitioner.b_quads()[0];

    let v = partitioner.b_vertices();
    let ul = v[b_quad.upper_left_vertex_index as usize].position;
    let ur = v[b_quad.upper_right_vertex_index as usize].position;
    let ll = v[b_quad.lower_left_vertex_index as usize].position;
    let lr = v[b_quad.lower_right_vertex_index as usize].position;

    // Consistent winding: upper edge above lower, left of right.
    assert!(ul.y < ll.y && ur.y < lr.y);
    assert!(ul.x < ur.x && ll.x < lr.x);

    for corner in corners {
        assert!(
            [ul, ur, ll, lr].contains(&corner),
            "input corner {corner:?} missing from b-quad corners"
        );
    }
}

#[test]
fn polygon_b_quad_areas_sum_to_polygon_area() {
    let points = [
        Point::new(0.0, 0.0),
        Point::new(30.0, -10.0),
        Point::new(60.0, 0.0),
        Point::new(55.0, 30.0),
        Point::new(30.0, 40.0),
        Point::new(5.0, 30.0),
    ];
    let partitioner = partition(&legalize_polygon(&points), FillRule::Winding);

    let expected = shoelace_area(&points);
    let actual = total_area(&partitioner);
    assert!(
        (actual - expected).abs() < expected * 1.0e-3,
        "partitioned area {actual} vs polygon area {expected}"
    );
}

#[test]
fn b_quads_do_not_overlap() {
    let points = [
        Point::new(0.0, 0.0),
        Point::new(30.0, -10.0),
        Point::new(60.0, 0.0),
        Point::new(55.0, 30.0),
        Point::new(30.0, 40.0),
        Point::new(5.0, 30.0),
    ];
    let partitioner = partition(&legalize_polygon(&points), FillRule::Winding);
    let v = partitioner.b_vertices();

    let spans: Vec<(f32, f32, f32, f32)> = partitioner
        .b_quads()
        .iter()
        .map(|q| {
            let ul = v[q.upper_left_vertex_index as usize].position;
            let ur = v[q.upper_right_vertex_index as usize].position;
            let ll = v[q.lower_left_vertex_index as usize].position;
            let lr = v[q.lower_right_vertex_index as usize].position;
            (ul.x, ur.x, (ul.y + ur.y) * 0.5, (ll.y + lr.y) * 0.5)
        })
        .collect();

    for (i, a) in spans.iter().enumerate() {
        assert!(a.0 < a.1, "zero- or negative-width b-quad emitted");
        for b in &spans[i + 1..] {
            let x_overlap = a.0.max(b.0) < a.1.min(b.1) - 1.0e-3;
            if !x_overlap {
                continue;
            }
            // Quads sharing an x range must be vertically disjoint.
            let vertically_disjoint = a.3 <= b.2 + 1.0e-3 || b.3 <= a.2 + 1.0e-3;
            assert!(vertically_disjoint, "overlapping b-quads: {a:?} {b:?}");
        }
    }
}

#[test]
fn repeated_pipelines_are_bit_identical() {
    let points = [
        Point::new(0.0, 0.0),
        Point::new(30.0, -10.0),
        Point::new(60.0, 0.0),
        Point::new(30.0, 40.0),
    ];
    let first = partition(&legalize_polygon(&points), FillRule::Winding);
    let second = partition(&legalize_polygon(&points), FillRule::Winding);

    assert_eq!(
        bytemuck::cast_slice::<BQuad, u8>(first.b_quads()),
        bytemuck::cast_slice::<BQuad, u8>(second.b_quads())
    );
    assert_eq!(
        bytemuck::cast_slice::<BVertex, u8>(first.b_vertices()),
        bytemuck::cast_slice::<BVertex, u8>(second.b_vertices())
    );
}

#[test]
fn hole_reduces_area_by_inner_contour() {
    let mut legalizer = Legalizer::new();
    // Outer contour.
    legalizer.move_to(Point::new(0.0, 0.0));
    legalizer.line_to(Point::new(100.0, 0.0));
    legalizer.line_to(Point::new(100.0, 100.0));
    legalizer.line_to(Point::new(0.0, 100.0));
    legalizer.close_path();
    // Inner contour, wound the other way.
    legalizer.move_to(Point::new(25.0, 25.0));
    legalizer.line_to(Point::new(25.0, 75.0));
    legalizer.line_to(Point::new(75.0, 75.0));
    legalizer.line_to(Point::new(75.0, 25.0));
    legalizer.close_path();

    let partitioner = partition(&legalizer, FillRule::Winding);
    let area = total_area(&partitioner);
    assert!(
        (area - 7500.0).abs() < 1.0,
        "hole not subtracted: area {area}"
    );
}

#[test]
fn fill_rules_agree_on_a_simple_polygon() {
    let points = [
        Point::new(0.0, 0.0),
        Point::new(30.0, -10.0),
        Point::new(60.0, 0.0),
        Point::new(55.0, 30.0),
        Point::new(30.0, 40.0),
        Point::new(5.0, 30.0),
    ];
    let expected = shoelace_area(&points);
    for fill_rule in [FillRule::Winding, FillRule::EvenOdd] {
        let partitioner = partition(&legalize_polygon(&points), fill_rule);
        let area = total_area(&partitioner);
        assert!(
            (area - expected).abs() < expected * 1.0e-3,
            "{fill_rule:?} area {area} vs {expected}"
        );
    }
}

#[test]
fn even_odd_excludes_nested_same_winding_contour() {
    let mut legalizer = Legalizer::new();
    legalizer.move_to(Point::new(0.0, 0.0));
    legalizer.line_to(Point::new(100.0, 0.0));
    legalizer.line_to(Point::new(100.0, 100.0));
    legalizer.line_to(Point::new(0.0, 100.0));
    legalizer.close_path();
    // Inner contour wound the same way: still a hole under even-odd.
    legalizer.move_to(Point::new(25.0, 25.0));
    legalizer.line_to(Point::new(75.0, 25.0));
    legalizer.line_to(Point::new(75.0, 75.0));
    legalizer.line_to(Point::new(25.0, 75.0));
    legalizer.close_path();

    let even_odd_area = total_area(&partition(&legalizer, FillRule::EvenOdd));
    assert!((even_odd_area - 7500.0).abs() < 1.0, "even-odd: {even_odd_area}");
}

#[test]
fn curved_region_area_is_preserved() {
    // Region between a chord and a quadratic arc: the enclosed area is
    // two thirds of the control triangle's.
    let mut legalizer = Legalizer::new();
    legalizer.move_to(Point::new(0.0, 0.0));
    legalizer.quadratic_curve_to(Point::new(10.0, 12.0), Point::new(20.0, 0.0));
    legalizer.close_path();

    let partitioner = partition(&legalizer, FillRule::Winding);
    let area = total_area(&partitioner);
    assert!((area - 80.0).abs() < 0.5, "curved area {area}");
}

#[test]
fn convex_region_control_points_are_tagged_convex() {
    let mut legalizer = Legalizer::new();
    legalizer.move_to(Point::new(0.0, 0.0));
    legalizer.quadratic_curve_to(Point::new(10.0, 12.0), Point::new(20.0, 0.0));
    legalizer.close_path();

    let partitioner = partition(&legalizer, FillRule::Winding);
    let mut control_point_count = 0;
    for b_vertex in partitioner.b_vertices() {
        match b_vertex.kind() {
            BVertexKind::ConvexControlPoint => control_point_count += 1,
            BVertexKind::ConcaveControlPoint => {
                panic!("convex region produced a concave control point");
            }
            BVertexKind::Endpoint0 | BVertexKind::Endpoint1 => {}
        }
    }
    assert!(control_point_count > 0);
}

#[test]
fn concave_region_control_points_are_tagged_concave() {
    // Square whose top edge sags into the fill: the curve-chord region
    // (two thirds of the control triangle) is carved out of the square.
    let mut legalizer = Legalizer::new();
    legalizer.move_to(Point::new(0.0, 0.0));
    legalizer.quadratic_curve_to(Point::new(10.0, 8.0), Point::new(20.0, 0.0));
    legalizer.line_to(Point::new(20.0, 20.0));
    legalizer.line_to(Point::new(0.0, 20.0));
    legalizer.close_path();

    let partitioner = partition(&legalizer, FillRule::Winding);

    let mut concave_count = 0;
    for b_vertex in partitioner.b_vertices() {
        match b_vertex.kind() {
            BVertexKind::ConcaveControlPoint => concave_count += 1,
            BVertexKind::ConvexControlPoint => {
                panic!("inward-bulging edge produced a convex control point");
            }
            BVertexKind::Endpoint0 | BVertexKind::Endpoint1 => {}
        }
    }
    assert!(concave_count > 0);

    let area = total_area(&partitioner);
    let expected = 400.0 - 80.0 * 2.0 / 3.0;
    assert!((area - expected).abs() < 0.5, "concave area {area} vs {expected}");
}

#[test]
fn tessellation_levels_clamp_under_extreme_scale() {
    let mut legalizer = Legalizer::new();
    legalizer.move_to(Point::new(0.0, 0.0));
    legalizer.quadratic_curve_to(Point::new(10.0, 12.0), Point::new(20.0, 0.0));
    legalizer.close_path();

    let partitioner = partition(&legalizer, FillRule::Winding);
    let mut tessellator = Tessellator::new(
        partitioner.b_quads(),
        partitioner.b_vertices(),
        AntialiasingMode::Msaa,
    );
    tessellator.compute_hull(&Affine::scale(1.0e9));

    for levels in tessellator.tess_levels() {
        for level in levels.outer {
            let level = f32::from(level);
            assert!((1.0..=MAX_TESS_LEVEL as f32).contains(&level));
        }
    }
}

#[test]
fn edge_instances_reference_partition_vertices() {
    let mut legalizer = Legalizer::new();
    legalizer.move_to(Point::new(0.0, 0.0));
    legalizer.quadratic_curve_to(Point::new(10.0, 12.0), Point::new(20.0, 0.0));
    legalizer.close_path();

    let partitioner = partition(&legalizer, FillRule::Winding);
    let mut tessellator = Tessellator::new(
        partitioner.b_quads(),
        partitioner.b_vertices(),
        AntialiasingMode::Ecaa,
    );
    tessellator.compute_hull(&Affine::IDENTITY);
    tessellator.compute_domain();

    let b_vertex_count = partitioner.b_vertices().len() as u32;
    for instance in tessellator.edge_instances() {
        assert!(instance.left_b_vertex_index < b_vertex_count);
        assert!(instance.right_b_vertex_index < b_vertex_count);
        assert!(
            instance.control_point_b_vertex_index == u32::MAX
                || instance.control_point_b_vertex_index < b_vertex_count
        );
    }
    for &index in tessellator.levien_indices() {
        assert!(index < b_vertex_count);
    }
}
