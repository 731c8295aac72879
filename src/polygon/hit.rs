//! Point queries against the geometry that was actually drawn.

use std::sync::Arc;

use glam::DVec2;

use crate::polygon::types::{RenderedPolygon, SimplifiedPolygon, SourcePolygon};

/// Ray-casting point-in-ring test.
pub fn ring_contains(ring: &[DVec2], p: DVec2) -> bool {
    if ring.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[i], ring[j]);
        if (a.y > p.y) != (b.y > p.y) && p.x < (b.x - a.x) * (p.y - a.y) / (b.y - a.y) + a.x {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Inside the exterior and outside every hole.
pub fn polygon_contains(polygon: &SimplifiedPolygon, p: DVec2) -> bool {
    polygon.bounds.contains(p)
        && ring_contains(&polygon.exterior, p)
        && !polygon.holes.iter().any(|hole| ring_contains(hole, p))
}

/// A polygon under the query point.
#[derive(Debug)]
pub struct PolygonHit<R> {
    /// Position of the source in the frame's input slice
    pub index: usize,
    /// World copy that matched
    pub world: i32,
    pub polygon: Arc<SourcePolygon<R>>,
}

impl<R> PolygonHit<R> {
    pub fn user_data(&self) -> &R {
        self.polygon.user_data()
    }
}

impl<R> Clone for PolygonHit<R> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            world: self.world,
            polygon: Arc::clone(&self.polygon),
        }
    }
}

/// Receives hit-test results.
pub trait HitNotifier<R> {
    fn on_hits(&mut self, point: DVec2, hits: &[PolygonHit<R>]);
}

impl<R, F> HitNotifier<R> for F
where
    F: FnMut(DVec2, &[PolygonHit<R>]),
{
    fn on_hits(&mut self, point: DVec2, hits: &[PolygonHit<R>]) {
        self(point, hits)
    }
}

/// Polygons containing `point`, topmost (last painted) first.
///
/// A source that is drawn in several worlds is reported once, for its
/// topmost matching instance.
pub fn hit_test<R>(rendered: &[RenderedPolygon<R>], point: DVec2) -> Vec<PolygonHit<R>> {
    let mut hits: Vec<PolygonHit<R>> = Vec::new();
    for r in rendered.iter().rev() {
        if hits.iter().any(|h| h.index == r.index) {
            continue;
        }
        if polygon_contains(&r.geometry, point) {
            hits.push(PolygonHit {
                index: r.index,
                world: r.geometry.world,
                polygon: Arc::clone(&r.source),
            });
        }
    }
    hits
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::fill::FillMethod;
    use crate::polygon::types::{Bounds, LatLng, PolygonKey};

    fn square(x0: f64, y0: f64, size: f64) -> Vec<DVec2> {
        vec![
            DVec2::new(x0, y0),
            DVec2::new(x0, y0 + size),
            DVec2::new(x0 + size, y0 + size),
            DVec2::new(x0 + size, y0),
        ]
    }

    fn rendered(index: usize, exterior: Vec<DVec2>, holes: Vec<Vec<DVec2>>) -> RenderedPolygon<&'static str> {
        let bounds = Bounds::from_points(&exterior).unwrap();
        let names = ["a", "b", "c"];
        RenderedPolygon {
            index,
            source: Arc::new(SourcePolygon::new(vec![LatLng::default(); 3], vec![], names[index])),
            geometry: Arc::new(SimplifiedPolygon {
                key: PolygonKey(index as u128),
                world: 0,
                exterior,
                holes,
                bounds,
                generation: 1,
            }),
            fill_method: FillMethod::EvenOdd,
        }
    }

    #[test]
    fn test_hole_excludes_point() {
        let set = vec![rendered(0, square(0.0, 0.0, 10.0), vec![square(3.0, 3.0, 4.0)])];
        assert!(hit_test(&set, DVec2::new(5.0, 5.0)).is_empty());
        let hits = hit_test(&set, DVec2::new(1.0, 1.0));
        assert_eq!(hits.len(), 1);
        assert_eq!(*hits[0].user_data(), "a");
    }

    #[test]
    fn test_topmost_first() {
        let set = vec![
            rendered(0, square(0.0, 0.0, 10.0), vec![]),
            rendered(1, square(5.0, 5.0, 10.0), vec![]),
            rendered(2, square(50.0, 50.0, 10.0), vec![]),
        ];
        let hits = hit_test(&set, DVec2::new(7.0, 7.0));
        let order: Vec<usize> = hits.iter().map(|h| h.index).collect();
        assert_eq!(order, vec![1, 0]);
    }

    #[test]
    fn test_closure_notifier() {
        let set = vec![rendered(0, square(0.0, 0.0, 10.0), vec![])];
        let mut seen = Vec::new();
        let mut notifier = |_: DVec2, hits: &[PolygonHit<&'static str>]| {
            seen.extend(hits.iter().map(|h| *h.user_data()));
        };
        let hits = hit_test(&set, DVec2::new(2.0, 2.0));
        notifier.on_hits(DVec2::new(2.0, 2.0), &hits);
        assert_eq!(seen, vec!["a"]);
    }
}
