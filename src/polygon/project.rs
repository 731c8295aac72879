//! Geographic rings to screen-space rings, with world-wrap replication.

use glam::DVec2;

use crate::polygon::types::{distinct_len, Bounds, LatLng, ProjectedPolygon, Ring, SourcePolygon};

/// Upper bound on world copies generated in each direction.
const MAX_WORLD_COPIES: i32 = 64;

/// Camera state supplied by the view layer for one frame.
pub trait Camera {
    /// Geographic coordinate to screen pixels (primary world).
    fn project(&self, point: LatLng) -> DVec2;

    /// Screen pixels back to geographic coordinates.
    fn unproject(&self, point: DVec2) -> LatLng;

    /// Visible screen rectangle.
    fn visible_bounds(&self) -> Bounds;

    fn zoom(&self) -> f64;

    /// Whether the projection tiles horizontally (antimeridian replication).
    fn supports_world_wrap(&self) -> bool;

    /// Screen width of one world copy at the current zoom.
    fn world_width(&self) -> f64;

    /// Changes whenever any parameter that affects `project` changes.
    fn projection_key(&self) -> u64;
}

/// Project a source polygon into every world instance that may be visible.
///
/// Returns `None` when the exterior has fewer than 3 distinct points or any
/// vertex projects to a non-finite position.
/// The primary world (index 0) is always present; extra copies are added
/// only when wrapping is active and their bounding box touches the viewport.
pub fn project_polygon<R, C: Camera + ?Sized>(
    source: &SourcePolygon<R>,
    camera: &C,
    draw_in_single_world: bool,
) -> Option<Vec<ProjectedPolygon>> {
    if distinct_len(source.exterior()) < 3 {
        return None;
    }

    let world_width = camera.world_width();
    let wrap = camera.supports_world_wrap()
        && !draw_in_single_world
        && world_width.is_finite()
        && world_width > 0.0;

    let mut exterior = project_ring(source.exterior(), camera);
    let mut holes: Vec<Ring> = source
        .holes()
        .iter()
        .map(|hole| project_ring(hole, camera))
        .collect();

    if !std::iter::once(&exterior).chain(holes.iter()).flatten().all(|p| p.is_finite()) {
        return None;
    }

    if wrap {
        unwrap_ring(&mut exterior, world_width);
        let anchor = exterior[0].x;
        for hole in &mut holes {
            align_ring(hole, anchor, world_width);
            unwrap_ring(hole, world_width);
        }
    }

    let bounds = Bounds::from_points(&exterior)?;
    let primary = ProjectedPolygon {
        world: 0,
        exterior,
        holes,
        bounds,
    };

    if !wrap {
        return Some(vec![primary]);
    }

    let visible = camera.visible_bounds();
    let mut worlds = Vec::new();

    for step in [-1i32, 1] {
        for k in 1..=MAX_WORLD_COPIES {
            let world = step * k;
            let shifted = bounds.translate(DVec2::new(world as f64 * world_width, 0.0));
            if (step > 0 && shifted.min.x > visible.max.x) || (step < 0 && shifted.max.x < visible.min.x) {
                break;
            }
            if shifted.overlaps(&visible) {
                worlds.push(shift_polygon(&primary, world, world_width));
            }
        }
    }

    worlds.push(primary);
    worlds.sort_by_key(|p| p.world);
    Some(worlds)
}

fn project_ring<C: Camera + ?Sized>(ring: &[LatLng], camera: &C) -> Ring {
    ring.iter().map(|&p| camera.project(p)).collect()
}

/// Make a ring continuous across the antimeridian: each vertex is moved by
/// whole world widths to the copy closest to its predecessor.
fn unwrap_ring(ring: &mut [DVec2], world_width: f64) {
    let half = world_width * 0.5;
    let mut shift = 0.0;
    for i in 1..ring.len() {
        let prev = ring[i - 1].x;
        let mut x = ring[i].x + shift;
        if (x - prev).abs() > half {
            let dx = ((prev - x) / world_width).round() * world_width;
            x += dx;
            shift += dx;
        }
        ring[i].x = x;
    }
}

/// Move a whole ring so its first vertex is the copy closest to `anchor_x`.
fn align_ring(ring: &mut [DVec2], anchor_x: f64, world_width: f64) {
    let Some(first) = ring.first() else {
        return;
    };
    let k = ((anchor_x - first.x) / world_width).round();
    if k != 0.0 {
        let dx = k * world_width;
        ring.iter_mut().for_each(|p| p.x += dx);
    }
}

fn shift_polygon(polygon: &ProjectedPolygon, world: i32, world_width: f64) -> ProjectedPolygon {
    let offset = DVec2::new(world as f64 * world_width, 0.0);
    let shift = |ring: &Ring| -> Ring { ring.iter().map(|&p| p + offset).collect() };
    ProjectedPolygon {
        world,
        exterior: shift(&polygon.exterior),
        holes: polygon.holes.iter().map(shift).collect(),
        bounds: polygon.bounds.translate(offset),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// lon/lat straight to x/y, 360 px per world
    struct FlatCamera {
        visible: Bounds,
        wrap: bool,
    }

    impl Camera for FlatCamera {
        fn project(&self, p: LatLng) -> DVec2 {
            DVec2::new(p.lon, p.lat)
        }
        fn unproject(&self, p: DVec2) -> LatLng {
            LatLng::new(p.y, p.x)
        }
        fn visible_bounds(&self) -> Bounds {
            self.visible
        }
        fn zoom(&self) -> f64 {
            1.0
        }
        fn supports_world_wrap(&self) -> bool {
            self.wrap
        }
        fn world_width(&self) -> f64 {
            360.0
        }
        fn projection_key(&self) -> u64 {
            0
        }
    }

    fn square(x0: f64, y0: f64, size: f64) -> Vec<LatLng> {
        vec![
            LatLng::new(y0, x0),
            LatLng::new(y0 + size, x0),
            LatLng::new(y0 + size, x0 + size),
            LatLng::new(y0, x0 + size),
        ]
    }

    #[test]
    fn test_degenerate_exterior_is_rejected() {
        let cam = FlatCamera {
            visible: Bounds::new(DVec2::splat(-180.0), DVec2::splat(180.0)),
            wrap: false,
        };
        let line = SourcePolygon::new(vec![LatLng::new(0.0, 0.0), LatLng::new(1.0, 1.0)], vec![], ());
        assert!(project_polygon(&line, &cam, false).is_none());
    }

    #[test]
    fn test_non_finite_vertex_is_rejected() {
        let cam = FlatCamera {
            visible: Bounds::new(DVec2::splat(-180.0), DVec2::splat(180.0)),
            wrap: true,
        };
        let mut ring = square(0.0, 0.0, 10.0);
        ring[2].lon = f64::INFINITY;
        let poly = SourcePolygon::new(ring, vec![], ());
        assert!(project_polygon(&poly, &cam, false).is_none());

        let hole = vec![LatLng::new(1.0, 1.0), LatLng::new(2.0, f64::NAN), LatLng::new(2.0, 2.0)];
        let poly = SourcePolygon::new(square(0.0, 0.0, 10.0), vec![hole], ());
        assert!(project_polygon(&poly, &cam, false).is_none());
    }

    #[test]
    fn test_far_longitude_unwraps_in_one_step() {
        let cam = FlatCamera {
            visible: Bounds::new(DVec2::splat(-180.0), DVec2::splat(180.0)),
            wrap: true,
        };
        let ring = vec![LatLng::new(0.0, 0.0), LatLng::new(10.0, 1e15), LatLng::new(10.0, 10.0)];
        let poly = SourcePolygon::new(ring, vec![], ());
        let worlds = project_polygon(&poly, &cam, false).unwrap();
        let primary = worlds.iter().find(|w| w.world == 0).unwrap();
        for pair in primary.exterior.windows(2) {
            assert!((pair[1].x - pair[0].x).abs() <= 180.0);
        }
        assert!(worlds.len() <= 3);
    }

    #[test]
    fn test_single_world_without_wrap() {
        let cam = FlatCamera {
            visible: Bounds::new(DVec2::new(-540.0, -90.0), DVec2::new(540.0, 90.0)),
            wrap: false,
        };
        let poly = SourcePolygon::new(square(0.0, 0.0, 10.0), vec![], ());
        let worlds = project_polygon(&poly, &cam, false).unwrap();
        assert_eq!(worlds.len(), 1);
        assert_eq!(worlds[0].world, 0);
        assert_eq!(worlds[0].bounds.max, DVec2::splat(10.0));
    }

    #[test]
    fn test_world_copies_cover_wide_viewport() {
        let cam = FlatCamera {
            visible: Bounds::new(DVec2::new(-540.0, -90.0), DVec2::new(540.0, 90.0)),
            wrap: true,
        };
        let poly = SourcePolygon::new(square(0.0, 0.0, 10.0), vec![], ());
        let worlds = project_polygon(&poly, &cam, false).unwrap();
        let ids: Vec<i32> = worlds.iter().map(|w| w.world).collect();
        assert_eq!(ids, vec![-1, 0, 1]);
        assert_eq!(worlds[2].exterior[0], DVec2::new(360.0, 0.0));

        let single = project_polygon(&poly, &cam, true).unwrap();
        assert_eq!(single.len(), 1);
    }

    #[test]
    fn test_antimeridian_ring_is_unwrapped() {
        let cam = FlatCamera {
            visible: Bounds::new(DVec2::new(-180.0, -90.0), DVec2::new(180.0, 90.0)),
            wrap: true,
        };
        let ring = vec![
            LatLng::new(0.0, 170.0),
            LatLng::new(10.0, 170.0),
            LatLng::new(10.0, -170.0),
            LatLng::new(0.0, -170.0),
        ];
        let poly = SourcePolygon::new(ring, vec![], ());
        let worlds = project_polygon(&poly, &cam, false).unwrap();
        let primary = worlds.iter().find(|w| w.world == 0).unwrap();
        assert_eq!(primary.bounds.width(), 20.0);
        assert_eq!(primary.exterior[2].x, 190.0);
        // The copy one world to the left pokes into the viewport at -170..-190.
        assert!(worlds.iter().any(|w| w.world == -1));
    }
}
