use std::f64::consts::PI;

use glam::DVec2;

use crate::hash::{fold_f64, hash2};
use crate::polygon::{Bounds, Camera, LatLng};

/// Latitude where Web Mercator becomes square.
const MAX_LAT: f64 = 85.051_128_78;

const MIN_ZOOM: f64 = 0.5;
const MAX_ZOOM: f64 = 200.0;

/// Viewport representing the visible map area and zoom level
#[derive(Clone, Debug, PartialEq)]
pub struct Viewport {
    /// Center longitude (-180 to 180)
    pub center_lon: f64,
    /// Center latitude (-85 to 85)
    pub center_lat: f64,
    /// Zoom level (higher = more zoomed in)
    pub zoom: f64,
    /// Canvas pixel width
    pub width: usize,
    /// Canvas pixel height
    pub height: usize,
    /// Repeat the world horizontally
    pub wrap: bool,
}

#[inline]
fn mercator_y(lat: f64) -> f64 {
    let lat_rad = lat.clamp(-MAX_LAT, MAX_LAT).to_radians();
    (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / PI) / 2.0
}

impl Viewport {
    pub fn new(center_lon: f64, center_lat: f64, zoom: f64, width: usize, height: usize) -> Self {
        Self {
            center_lon,
            center_lat,
            zoom,
            width,
            height,
            wrap: true,
        }
    }

    /// Create a world view (shows entire world)
    pub fn world(width: usize, height: usize) -> Self {
        Self::new(0.0, 20.0, 1.0, width, height)
    }

    /// Pixels per world at the current zoom
    #[inline]
    fn scale(&self) -> f64 {
        self.zoom * self.width as f64
    }

    #[inline]
    fn center(&self) -> DVec2 {
        DVec2::new((self.center_lon + 180.0) / 360.0, mercator_y(self.center_lat))
    }

    #[inline]
    fn half_size(&self) -> DVec2 {
        DVec2::new(self.width as f64, self.height as f64) * 0.5
    }

    /// Pan the viewport by pixel delta
    pub fn pan(&mut self, dx: f64, dy: f64) {
        let target = self.unproject(self.half_size() + DVec2::new(dx, dy));
        self.center_lon = target.lon;
        self.center_lat = target.lat.clamp(-85.0, 85.0);

        // Wrap longitude
        if self.center_lon > 180.0 {
            self.center_lon -= 360.0;
        } else if self.center_lon < -180.0 {
            self.center_lon += 360.0;
        }
    }

    pub fn zoom_in(&mut self) {
        self.zoom = (self.zoom * 1.5).min(MAX_ZOOM);
    }

    pub fn zoom_out(&mut self) {
        self.zoom = (self.zoom / 1.5).max(MIN_ZOOM);
    }

    /// Zoom in towards a specific pixel location
    pub fn zoom_in_at(&mut self, px: f64, py: f64) {
        self.zoom_at(DVec2::new(px, py), 1.5);
    }

    /// Zoom out from a specific pixel location
    pub fn zoom_out_at(&mut self, px: f64, py: f64) {
        self.zoom_at(DVec2::new(px, py), 1.0 / 1.5);
    }

    /// Zoom by factor, keeping the point under `anchor` fixed
    fn zoom_at(&mut self, anchor: DVec2, factor: f64) {
        let geo = self.unproject(anchor);
        self.zoom = (self.zoom * factor).clamp(MIN_ZOOM, MAX_ZOOM);
        let moved = self.project(geo) - anchor;
        self.pan(moved.x, moved.y);
    }

    /// Unproject pixel coordinates back to geographic coordinates
    pub fn unproject(&self, p: DVec2) -> LatLng {
        let n = (p - self.half_size()) / self.scale() + self.center();
        let lon = n.x * 360.0 - 180.0;
        let lat = (PI * (1.0 - 2.0 * n.y)).sinh().atan().to_degrees();
        LatLng::new(lat, lon)
    }

    /// Project a geographic coordinate to pixel coordinates (primary world)
    pub fn project(&self, p: LatLng) -> DVec2 {
        let n = DVec2::new((p.lon + 180.0) / 360.0, mercator_y(p.lat));
        (n - self.center()) * self.scale() + self.half_size()
    }
}

impl Camera for Viewport {
    fn project(&self, point: LatLng) -> DVec2 {
        Viewport::project(self, point)
    }

    fn unproject(&self, point: DVec2) -> LatLng {
        Viewport::unproject(self, point)
    }

    fn visible_bounds(&self) -> Bounds {
        Bounds::new(DVec2::ZERO, DVec2::new(self.width as f64, self.height as f64))
    }

    fn zoom(&self) -> f64 {
        self.zoom
    }

    fn supports_world_wrap(&self) -> bool {
        self.wrap
    }

    fn world_width(&self) -> f64 {
        self.scale()
    }

    fn projection_key(&self) -> u64 {
        let seed = hash2(self.width as u64, self.height as u64);
        let seed = hash2(seed, self.wrap as u64);
        fold_f64(seed, [self.center_lon, self.center_lat, self.zoom])
    }
}
