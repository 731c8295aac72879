//! Geometry records shared by every pipeline stage.
//!
//! Source polygons are geographic and owned by the caller. Everything the
//! pipeline derives from them lives in screen space (`DVec2`, y down).

use std::sync::Arc;

use glam::DVec2;

use crate::hash::{fold_f64, hash2};
use crate::polygon::fill::FillMethod;

/// A ring in screen space.
pub type Ring = Vec<DVec2>;

/// Geographic coordinate in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Border descriptor
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: Color,
    pub width: f64,
}

/// Visual style of a polygon.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct PolygonStyle {
    /// Interior color; `None` draws the outline only
    pub fill: Option<Color>,
    pub stroke: Option<StrokeStyle>,
    /// Overrides the layer-wide fill strategy for this polygon
    pub fill_method: Option<FillMethod>,
}

/// Axis-aligned bounding box in screen space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bounds {
    pub min: DVec2,
    pub max: DVec2,
}

impl Bounds {
    pub fn new(min: DVec2, max: DVec2) -> Self {
        Self { min, max }
    }

    /// Bounding box of a point set, `None` when empty.
    pub fn from_points(points: &[DVec2]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .skip(1)
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self { min, max })
    }

    /// Inclusive overlap test: touching edges count as overlapping.
    #[inline]
    pub fn overlaps(&self, other: &Bounds) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
    }

    #[inline]
    pub fn contains(&self, p: DVec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn translate(&self, offset: DVec2) -> Self {
        Self {
            min: self.min + offset,
            max: self.max + offset,
        }
    }

    pub fn center(&self) -> DVec2 {
        (self.min + self.max) * 0.5
    }

    pub fn width(&self) -> f64 {
        self.max.x - self.min.x
    }

    pub fn is_finite(&self) -> bool {
        self.min.is_finite() && self.max.is_finite()
    }

    /// The four corners as a ring, clockwise on a y-down screen.
    pub fn to_ring(&self) -> Ring {
        vec![
            self.min,
            DVec2::new(self.max.x, self.min.y),
            self.max,
            DVec2::new(self.min.x, self.max.y),
        ]
    }
}

/// Geometry fingerprint used as the source identity by the caches.
///
/// Two independently seeded 64-bit lanes, so a collision needs both to
/// match at once.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PolygonKey(pub u128);

/// A caller-owned polygon: geographic rings plus style, label and payload.
///
/// The pipeline never mutates it and never inspects `user_data`.
#[derive(Clone, Debug)]
pub struct SourcePolygon<R> {
    exterior: Vec<LatLng>,
    holes: Vec<Vec<LatLng>>,
    style: PolygonStyle,
    label: Option<String>,
    user_data: R,
    key: PolygonKey,
}

impl<R> SourcePolygon<R> {
    pub fn new(exterior: Vec<LatLng>, holes: Vec<Vec<LatLng>>, user_data: R) -> Self {
        let key = geometry_key(&exterior, &holes);
        Self {
            exterior,
            holes,
            style: PolygonStyle::default(),
            label: None,
            user_data,
            key,
        }
    }

    pub fn with_style(mut self, style: PolygonStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn exterior(&self) -> &[LatLng] {
        &self.exterior
    }

    pub fn holes(&self) -> &[Vec<LatLng>] {
        &self.holes
    }

    pub fn style(&self) -> &PolygonStyle {
        &self.style
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn user_data(&self) -> &R {
        &self.user_data
    }

    pub fn key(&self) -> PolygonKey {
        self.key
    }
}

fn geometry_key(exterior: &[LatLng], holes: &[Vec<LatLng>]) -> PolygonKey {
    let high = geometry_lane(0, exterior, holes);
    let low = geometry_lane(0x9E37_79B9_7F4A_7C15, exterior, holes);
    PolygonKey(((high as u128) << 64) | low as u128)
}

fn geometry_lane(salt: u64, exterior: &[LatLng], holes: &[Vec<LatLng>]) -> u64 {
    let mut seed = hash2(exterior.len() as u64 ^ salt, holes.len() as u64);
    seed = fold_f64(seed, exterior.iter().flat_map(|p| [p.lat, p.lon]));
    for hole in holes {
        seed = hash2(seed, hole.len() as u64);
        seed = fold_f64(seed, hole.iter().flat_map(|p| [p.lat, p.lon]));
    }
    seed
}

/// A source polygon projected into one world instance, unsimplified.
#[derive(Clone, Debug, PartialEq)]
pub struct ProjectedPolygon {
    /// World copy index; 0 is the primary world
    pub world: i32,
    pub exterior: Ring,
    pub holes: Vec<Ring>,
    /// From the unsimplified exterior
    pub bounds: Bounds,
}

/// A projected polygon after per-ring simplification.
///
/// Keeps the bounding box of the unsimplified geometry so culling does not
/// depend on the tolerance.
#[derive(Clone, Debug, PartialEq)]
pub struct SimplifiedPolygon {
    pub key: PolygonKey,
    pub world: i32,
    pub exterior: Ring,
    pub holes: Vec<Ring>,
    pub bounds: Bounds,
    /// Bumped by the cache every time the entry is replaced
    pub generation: u64,
}

impl SimplifiedPolygon {
    /// Exterior followed by every hole, in that order.
    pub fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }
}

/// One drawn instance for the current frame: post-simplification and
/// post-culling, in paint order.
#[derive(Debug)]
pub struct RenderedPolygon<R> {
    /// Position of the source in the frame's input slice
    pub index: usize,
    pub source: Arc<SourcePolygon<R>>,
    pub geometry: Arc<SimplifiedPolygon>,
    pub fill_method: FillMethod,
}

impl<R> Clone for RenderedPolygon<R> {
    fn clone(&self) -> Self {
        Self {
            index: self.index,
            source: Arc::clone(&self.source),
            geometry: Arc::clone(&self.geometry),
            fill_method: self.fill_method,
        }
    }
}

/// Number of distinct points in a ring, saturating at 3.
///
/// Three is all a fill needs, so the scan stops there.
pub fn distinct_len<P: PartialEq>(ring: &[P]) -> usize {
    let mut seen: Vec<&P> = Vec::with_capacity(3);
    for p in ring {
        if !seen.contains(&p) {
            seen.push(p);
            if seen.len() == 3 {
                break;
            }
        }
    }
    seen.len()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_inclusive_overlap() {
        let a = Bounds::new(DVec2::ZERO, DVec2::splat(10.0));
        let touching = Bounds::new(DVec2::new(10.0, 0.0), DVec2::new(20.0, 10.0));
        let apart = Bounds::new(DVec2::new(10.5, 0.0), DVec2::new(20.0, 10.0));
        assert!(a.overlaps(&touching));
        assert!(touching.overlaps(&a));
        assert!(!a.overlaps(&apart));
    }

    #[test]
    fn test_bounds_from_points() {
        let b = Bounds::from_points(&[
            DVec2::new(0.0, 0.0),
            DVec2::new(0.0, 10.0),
            DVec2::new(10.0, 10.0),
            DVec2::new(10.0, 0.0),
        ])
        .unwrap();
        assert_eq!(b.min, DVec2::ZERO);
        assert_eq!(b.max, DVec2::splat(10.0));
        assert!(Bounds::from_points(&[]).is_none());
    }

    #[test]
    fn test_key_depends_on_geometry_only() {
        let ring = vec![
            LatLng::new(0.0, 0.0),
            LatLng::new(1.0, 0.0),
            LatLng::new(1.0, 1.0),
        ];
        let a = SourcePolygon::new(ring.clone(), vec![], 1u8).with_label("a");
        let b = SourcePolygon::new(ring.clone(), vec![], 2u8);
        let c = SourcePolygon::new(ring.clone(), vec![ring.clone()], 1u8);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
    }

    #[test]
    fn test_geometry_key_lanes() {
        let ring = vec![LatLng::new(0.0, 0.0), LatLng::new(1.0, 0.0), LatLng::new(1.0, 1.0)];
        let a = SourcePolygon::new(ring.clone(), vec![], ());
        let b = SourcePolygon::new(ring.clone(), vec![], "other payload");
        assert_eq!(a.key(), b.key());

        let mut moved = ring;
        moved[2].lon = 2.0;
        let c = SourcePolygon::new(moved, vec![], ());
        let (ka, kc) = (a.key().0, c.key().0);
        assert_ne!(ka >> 64, kc >> 64);
        assert_ne!(ka as u64, kc as u64);
        assert_ne!(ka >> 64, ka & u64::MAX as u128);
    }

    #[test]
    fn test_distinct_len() {
        assert_eq!(distinct_len(&[1, 2, 3, 1]), 3);
        assert_eq!(distinct_len(&[1, 2, 3, 4, 5]), 3);
        assert_eq!(distinct_len(&[1, 1, 2]), 2);
        assert_eq!(distinct_len(&[(0, 0), (5, 5), (0, 0), (5, 5)]), 2);
        assert_eq!(distinct_len(&[1, 2]), 2);
        assert_eq!(distinct_len::<i32>(&[]), 0);
    }
}
