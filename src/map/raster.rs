//! Pixel-level drawing on a coverage grid: lines, rings and scanline fills.

use glam::DVec2;

use crate::polygon::{FillRule, Ring};

/// One palette slot per pixel; 0 is empty.
pub struct PixelGrid {
    width: usize,
    height: usize,
    pixels: Vec<u16>,
}

impl PixelGrid {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width * height],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u16 {
        self.pixels[y * self.width + x]
    }

    #[inline]
    pub fn set(&mut self, x: i32, y: i32, slot: u16) {
        if x >= 0 && y >= 0 && (x as usize) < self.width && (y as usize) < self.height {
            self.pixels[y as usize * self.width + x as usize] = slot;
        }
    }
}

/// How densely a fill is stippled.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stipple {
    Solid,
    /// Every other pixel in a checkerboard
    Half,
}

impl Stipple {
    /// Translucent colors are stippled so what is underneath shows through.
    pub fn for_alpha(alpha: u8) -> Self {
        if alpha < 192 {
            Stipple::Half
        } else {
            Stipple::Solid
        }
    }

    #[inline(always)]
    fn keeps(self, x: i32, y: i32) -> bool {
        match self {
            Stipple::Solid => true,
            Stipple::Half => (x + y) & 1 == 0,
        }
    }
}

/// Draw a line using Bresenham's algorithm
pub fn draw_line(grid: &mut PixelGrid, x0: i32, y0: i32, x1: i32, y1: i32, slot: u16) {
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    let mut x = x0;
    let mut y = y0;

    loop {
        grid.set(x, y, slot);

        if x == x1 && y == y1 {
            break;
        }

        let e2 = 2 * err;

        if e2 >= dy {
            if x == x1 {
                break;
            }
            err += dy;
            x += sx;
        }

        if e2 <= dx {
            if y == y1 {
                break;
            }
            err += dx;
            y += sy;
        }
    }
}

/// Closed ring outline. Width above 1 thickens the line by one pixel.
pub fn draw_ring(grid: &mut PixelGrid, ring: &[DVec2], width: f64, slot: u16) {
    if ring.len() < 2 {
        return;
    }
    let limit = (grid.width.max(grid.height) * 4) as f64;
    let clamp = |v: f64| v.clamp(-limit, limit).round() as i32;
    let mut prev = ring[ring.len() - 1];
    for &p in ring {
        let (x0, y0, x1, y1) = (clamp(prev.x), clamp(prev.y), clamp(p.x), clamp(p.y));
        draw_line(grid, x0, y0, x1, y1, slot);
        if width > 1.0 {
            draw_line(grid, x0 + 1, y0, x1 + 1, y1, slot);
            draw_line(grid, x0, y0 + 1, x1, y1 + 1, slot);
        }
        prev = p;
    }
}

/// Scanline fill of a set of rings with the given rule, sampling pixel centers.
pub fn fill_rings(grid: &mut PixelGrid, rings: &[Ring], rule: FillRule, stipple: Stipple, slot: u16) {
    let mut crossings: Vec<(f64, i32)> = Vec::new();
    for y in 0..grid.height {
        let sy = y as f64 + 0.5;
        crossings.clear();
        for ring in rings {
            if ring.len() < 3 {
                continue;
            }
            let mut a = ring[ring.len() - 1];
            for &b in ring {
                if (a.y <= sy) != (b.y <= sy) {
                    let x = a.x + (sy - a.y) * (b.x - a.x) / (b.y - a.y);
                    crossings.push((x, if b.y > a.y { 1 } else { -1 }));
                }
                a = b;
            }
        }
        if crossings.is_empty() {
            continue;
        }
        crossings.sort_by(|l, r| l.0.total_cmp(&r.0));

        let mut winding = 0;
        for pair in crossings.windows(2) {
            let (x_start, dir) = pair[0];
            winding += dir;
            let inside = match rule {
                FillRule::EvenOdd => winding % 2 != 0,
                FillRule::NonZero => winding != 0,
            };
            if !inside {
                continue;
            }
            let from = (x_start - 0.5).ceil().max(0.0) as i32;
            let to = ((pair[1].0 - 0.5).ceil().min(grid.width as f64)) as i32;
            for x in from..to {
                if stipple.keeps(x, y as i32) {
                    grid.set(x, y as i32, slot);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(x0: f64, y0: f64, size: f64) -> Ring {
        vec![
            DVec2::new(x0, y0),
            DVec2::new(x0 + size, y0),
            DVec2::new(x0 + size, y0 + size),
            DVec2::new(x0, y0 + size),
        ]
    }

    fn count(grid: &PixelGrid, slot: u16) -> usize {
        (0..grid.height())
            .flat_map(|y| (0..grid.width()).map(move |x| (x, y)))
            .filter(|&(x, y)| grid.get(x, y) == slot)
            .count()
    }

    #[test]
    fn test_horizontal_line() {
        let mut grid = PixelGrid::new(10, 1);
        draw_line(&mut grid, 0, 0, 9, 0, 1);
        assert_eq!(count(&grid, 1), 10);
    }

    #[test]
    fn test_fill_square_with_hole() {
        let mut grid = PixelGrid::new(20, 20);
        let rings = vec![square(0.0, 0.0, 10.0), square(3.0, 3.0, 4.0)];
        fill_rings(&mut grid, &rings, FillRule::EvenOdd, Stipple::Solid, 1);
        assert_eq!(count(&grid, 1), 100 - 16);
        assert_eq!(grid.get(5, 5), 0);
        assert_eq!(grid.get(1, 1), 1);
    }

    #[test]
    fn test_nonzero_overlap_is_solid() {
        let rings = vec![square(0.0, 0.0, 10.0), square(5.0, 5.0, 10.0)];
        let mut even_odd = PixelGrid::new(20, 20);
        fill_rings(&mut even_odd, &rings, FillRule::EvenOdd, Stipple::Solid, 1);
        let mut non_zero = PixelGrid::new(20, 20);
        fill_rings(&mut non_zero, &rings, FillRule::NonZero, Stipple::Solid, 1);
        assert_eq!(even_odd.get(7, 7), 0);
        assert_eq!(non_zero.get(7, 7), 1);
    }

    #[test]
    fn test_half_stipple() {
        let mut grid = PixelGrid::new(4, 4);
        fill_rings(&mut grid, &[square(0.0, 0.0, 4.0)], FillRule::NonZero, Stipple::Half, 2);
        assert_eq!(count(&grid, 2), 8);
    }
}
