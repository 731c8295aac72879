//! Exact boolean combination of polygons using `geo`'s boolean ops.
//!
//! Slower than even-odd filling but correct for overlapping polygons and
//! overlapping holes. Output rings are oriented exterior-positive,
//! holes-negative so they can be filled with the non-zero rule.

use geo::orient::Direction;
use geo::{BooleanOps, Coord, LineString, MultiPolygon, Orient, Polygon};
use glam::DVec2;

use crate::polygon::fill::CompoundPath;
use crate::polygon::types::{Bounds, Ring, SimplifiedPolygon};

fn to_line_string(ring: &[DVec2]) -> LineString<f64> {
    LineString::from(
        ring.iter()
            .map(|p| Coord { x: p.x, y: p.y })
            .collect::<Vec<_>>(),
    )
}

fn ring_polygon(ring: &[DVec2]) -> MultiPolygon<f64> {
    MultiPolygon::new(vec![Polygon::new(to_line_string(ring), vec![])])
}

/// Exterior minus the union of its holes.
pub fn polygon_area(polygon: &SimplifiedPolygon) -> MultiPolygon<f64> {
    let exterior = ring_polygon(&polygon.exterior);
    if polygon.holes.is_empty() {
        return exterior;
    }
    let holes = polygon
        .holes
        .iter()
        .fold(MultiPolygon::new(vec![]), |acc, hole| acc.union(&ring_polygon(hole)));
    exterior.difference(&holes)
}

/// Union of every polygon's area.
pub fn union_all<'a>(polygons: impl IntoIterator<Item = &'a SimplifiedPolygon>) -> MultiPolygon<f64> {
    polygons
        .into_iter()
        .fold(MultiPolygon::new(vec![]), |acc, p| acc.union(&polygon_area(p)))
}

/// One path covering exactly the union of the polygons.
pub fn combine_polygons<'a>(polygons: impl IntoIterator<Item = &'a SimplifiedPolygon>) -> CompoundPath {
    to_path(union_all(polygons))
}

/// The viewport rectangle minus every polygon.
pub fn subtract_from_rect<'a>(
    viewport: &Bounds,
    polygons: impl IntoIterator<Item = &'a SimplifiedPolygon>,
) -> CompoundPath {
    let rect = ring_polygon(&viewport.to_ring());
    to_path(rect.difference(&union_all(polygons)))
}

fn to_path(area: MultiPolygon<f64>) -> CompoundPath {
    let area = area.orient(Direction::Default);
    let mut rings: Vec<Ring> = Vec::new();
    for polygon in area.iter() {
        rings.push(from_line_string(polygon.exterior()));
        rings.extend(polygon.interiors().iter().map(from_line_string));
    }
    CompoundPath { rings }
}

fn from_line_string(ls: &LineString<f64>) -> Ring {
    let mut ring: Ring = ls.coords().map(|c| DVec2::new(c.x, c.y)).collect();
    if ring.len() >= 2 && ring.first() == ring.last() {
        ring.pop();
    }
    ring
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::fill::FillRule;
    use crate::polygon::mesh::signed_area;
    use crate::polygon::types::PolygonKey;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(x0, y0),
            DVec2::new(x0, y0 + size),
            DVec2::new(x0 + size, y0 + size),
            DVec2::new(x0 + size, y0),
        ]
    }

    fn poly(exterior: Vec<DVec2>, holes: Vec<Vec<DVec2>>) -> SimplifiedPolygon {
        let bounds = Bounds::from_points(&exterior).unwrap();
        SimplifiedPolygon {
            key: PolygonKey(0),
            world: 0,
            exterior,
            holes,
            bounds,
            generation: 1,
        }
    }

    #[test]
    fn test_overlap_is_solid() {
        let a = poly(square(0.0, 0.0, 10.0), vec![]);
        let b = poly(square(5.0, 5.0, 10.0), vec![]);
        let path = combine_polygons([&a, &b]);
        assert!(path.covers(DVec2::new(7.0, 7.0), FillRule::NonZero));
        assert!(path.covers(DVec2::new(2.0, 2.0), FillRule::NonZero));
        assert!(!path.covers(DVec2::new(2.0, 12.0), FillRule::NonZero));
    }

    #[test]
    fn test_hole_is_subtracted_with_orientation() {
        let p = poly(square(0.0, 0.0, 10.0), vec![square(3.0, 3.0, 4.0)]);
        let path = combine_polygons([&p]);
        assert_eq!(path.rings.len(), 2);
        assert!(signed_area(&path.rings[0]) > 0.0);
        assert!(signed_area(&path.rings[1]) < 0.0);
        assert!(!path.covers(DVec2::new(5.0, 5.0), FillRule::NonZero));
        assert!(path.covers(DVec2::new(1.0, 1.0), FillRule::NonZero));
    }
}
