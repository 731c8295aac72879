//! Optional structural checks on projected rings (off by default).

use geo::line_intersection::{line_intersection, LineIntersection};
use geo::{Contains, Coord, Line, LineString, Polygon};
use glam::DVec2;

use crate::polygon::types::ProjectedPolygon;

fn coord(p: DVec2) -> Coord<f64> {
    Coord { x: p.x, y: p.y }
}

/// Ring edges, skipping zero-length ones and the implicit closing edge
/// when the ring is already explicitly closed.
fn edges(ring: &[DVec2]) -> Vec<Line<f64>> {
    let n = ring.len();
    let closed = n >= 2 && ring[0] == ring[n - 1];
    let count = if closed { n - 1 } else { n };
    (0..count)
        .map(|i| Line::new(coord(ring[i]), coord(ring[(i + 1) % n])))
        .filter(|l| l.start != l.end)
        .collect()
}

/// Whether any two non-adjacent edges touch, or adjacent edges overlap.
pub fn ring_self_intersects(ring: &[DVec2]) -> bool {
    let edges = edges(ring);
    let n = edges.len();
    for i in 0..n {
        for j in i + 1..n {
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);
            match line_intersection(edges[i], edges[j]) {
                None => {}
                Some(LineIntersection::Collinear { .. }) => return true,
                Some(LineIntersection::SinglePoint { .. }) if !adjacent => return true,
                Some(LineIntersection::SinglePoint { .. }) => {}
            }
        }
    }
    false
}

/// First problem found with a polygon's rings, if any.
pub fn validate_polygon(polygon: &ProjectedPolygon) -> Result<(), String> {
    if ring_self_intersects(&polygon.exterior) {
        return Err("exterior ring intersects itself".to_string());
    }
    let to_ls = |r: &[DVec2]| LineString::from(r.iter().map(|&p| coord(p)).collect::<Vec<_>>());
    let exterior = Polygon::new(to_ls(&polygon.exterior), vec![]);
    for (i, hole) in polygon.holes.iter().enumerate() {
        if ring_self_intersects(hole) {
            return Err(format!("hole {i} intersects itself"));
        }
        if !exterior.contains(&to_ls(hole)) {
            return Err(format!("hole {i} is not inside the exterior ring"));
        }
    }
    Ok(())
}
