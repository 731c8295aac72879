//! Label anchor computation. Text layout is left to the renderer.

use geo::{Centroid, Coord, LineString, Polygon};
use glam::DVec2;

use crate::polygon::types::SimplifiedPolygon;

/// Where a polygon label is anchored.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LabelPlacement {
    /// Area centroid of the simplified polygon (holes subtracted)
    #[default]
    Centroid,
    /// Center of the bounding box
    BoundsCenter,
}

/// A label to draw at a screen position.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelCommand {
    pub text: String,
    pub anchor: DVec2,
    pub polygon: usize,
}

pub fn label_anchor(polygon: &SimplifiedPolygon, placement: LabelPlacement) -> DVec2 {
    match placement {
        LabelPlacement::BoundsCenter => polygon.bounds.center(),
        LabelPlacement::Centroid => {
            let ring = |r: &[DVec2]| LineString::from(r.iter().map(|p| Coord { x: p.x, y: p.y }).collect::<Vec<_>>());
            let geo_polygon = Polygon::new(
                ring(&polygon.exterior),
                polygon.holes.iter().map(|h| ring(h)).collect(),
            );
            geo_polygon
                .centroid()
                .map(|c| DVec2::new(c.x(), c.y()))
                .filter(|c| c.is_finite())
                .unwrap_or_else(|| polygon.bounds.center())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polygon::types::{Bounds, PolygonKey};

    #[test]
    fn test_centroid_of_l_shape() {
        // L-shape: 10x10 square with the top-right 5x5 quadrant removed.
        let exterior = vec![
            DVec2::new(0.0, 0.0),
            DVec2::new(10.0, 0.0),
            DVec2::new(10.0, 5.0),
            DVec2::new(5.0, 5.0),
            DVec2::new(5.0, 10.0),
            DVec2::new(0.0, 10.0),
        ];
        let polygon = SimplifiedPolygon {
            key: PolygonKey(0),
            world: 0,
            bounds: Bounds::from_points(&exterior).unwrap(),
            exterior,
            holes: vec![],
            generation: 1,
        };
        let c = label_anchor(&polygon, LabelPlacement::Centroid);
        let expected = 25.0 / 6.0;
        assert!((c.x - expected).abs() < 1e-9);
        assert!((c.y - expected).abs() < 1e-9);
        assert_eq!(label_anchor(&polygon, LabelPlacement::BoundsCenter), DVec2::splat(5.0));
    }
}
