//! Fill strategies and the draw commands they produce.
//!
//! Three strategies render "exterior minus holes":
//! - `EvenOdd`: one compound path, even-odd rule. Overlapping polygons in
//!   the same batch, overlapping holes, and inverted fill over
//!   self-overlapping input render incorrectly; this is accepted.
//! - `ExactCombine`: boolean difference/union computed up front, drawn with
//!   the non-zero rule. Needs backend support for path ops.
//! - `Triangulated`: ear-clipped mesh drawn as opaque triangles.

use std::sync::Arc;

use glam::DVec2;

use crate::polygon::combine;
use crate::polygon::hit::ring_contains;
use crate::polygon::label::LabelCommand;
use crate::polygon::mesh::TriangleMesh;
use crate::polygon::types::{Bounds, Color, Ring, SimplifiedPolygon, StrokeStyle};

/// How a polygon's interior is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FillMethod {
    EvenOdd,
    ExactCombine,
    Triangulated,
}

/// Layer-wide path strategy when the mesh path is not active.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PainterFillMethod {
    #[default]
    EvenOdd,
    ExactCombine,
}

impl From<PainterFillMethod> for FillMethod {
    fn from(m: PainterFillMethod) -> Self {
        match m {
            PainterFillMethod::EvenOdd => FillMethod::EvenOdd,
            PainterFillMethod::ExactCombine => FillMethod::ExactCombine,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FillRule {
    EvenOdd,
    NonZero,
}

/// What the rendering backend can do.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BackendCaps {
    /// Boolean path operations are available
    pub path_combine: bool,
}

impl Default for BackendCaps {
    fn default() -> Self {
        Self { path_combine: true }
    }
}

/// Pick the strategy for one polygon.
///
/// Returns the method and whether exact combine had to be downgraded.
pub fn resolve_fill_method(
    requested: Option<FillMethod>,
    use_alt_rendering: bool,
    painter: PainterFillMethod,
    caps: BackendCaps,
) -> (FillMethod, bool) {
    let method = requested.unwrap_or(if use_alt_rendering {
        FillMethod::Triangulated
    } else {
        painter.into()
    });
    match method {
        FillMethod::ExactCombine if !caps.path_combine => (FillMethod::EvenOdd, true),
        m => (m, false),
    }
}

/// Closed rings drawn as one path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompoundPath {
    pub rings: Vec<Ring>,
}

impl CompoundPath {
    pub fn is_empty(&self) -> bool {
        self.rings.is_empty()
    }

    /// Whether `p` is painted when this path is filled with `rule`.
    pub fn covers(&self, p: DVec2, rule: FillRule) -> bool {
        match rule {
            FillRule::EvenOdd => {
                self.rings.iter().filter(|r| ring_contains(r, p)).count() % 2 == 1
            }
            FillRule::NonZero => self.rings.iter().map(|r| winding_number(r, p)).sum::<i32>() != 0,
        }
    }
}

/// Classic winding number of `ring` around `p`.
pub fn winding_number(ring: &[DVec2], p: DVec2) -> i32 {
    if ring.len() < 3 {
        return 0;
    }
    let mut wn = 0;
    let mut j = ring.len() - 1;
    for i in 0..ring.len() {
        let (a, b) = (ring[j], ring[i]);
        if a.y <= p.y {
            if b.y > p.y && is_left(a, b, p) > 0.0 {
                wn += 1;
            }
        } else if b.y <= p.y && is_left(a, b, p) < 0.0 {
            wn -= 1;
        }
        j = i;
    }
    wn
}

#[inline(always)]
fn is_left(a: DVec2, b: DVec2, p: DVec2) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (p.x - a.x) * (b.y - a.y)
}

/// One instruction for the external rasterizer, in paint order.
#[derive(Clone, Debug)]
pub enum DrawCommand {
    /// Everything in the viewport that is not covered by a polygon.
    InvertedBackground {
        path: CompoundPath,
        rule: FillRule,
        color: Color,
    },
    /// Filled path for a batch of consecutive polygons.
    Fill {
        path: CompoundPath,
        rule: FillRule,
        color: Color,
        /// Source indices in the batch
        polygons: Vec<usize>,
    },
    /// Opaque triangle mesh for one polygon.
    Mesh {
        mesh: Arc<TriangleMesh>,
        color: Color,
        polygon: usize,
    },
    /// Border of one polygon (exterior and holes).
    Outline {
        rings: Vec<Ring>,
        stroke: StrokeStyle,
        polygon: usize,
    },
    Label(LabelCommand),
}

impl DrawCommand {
    /// Whether this command paints `p` as an area fill. Outlines and labels
    /// never cover anything.
    pub fn covers(&self, p: DVec2) -> bool {
        match self {
            DrawCommand::InvertedBackground { path, rule, .. } | DrawCommand::Fill { path, rule, .. } => {
                path.covers(p, *rule)
            }
            DrawCommand::Mesh { mesh, .. } => mesh.triangles().any(|t| triangle_contains(&t, p)),
            DrawCommand::Outline { .. } | DrawCommand::Label(_) => false,
        }
    }

    pub fn fill_color(&self) -> Option<Color> {
        match self {
            DrawCommand::InvertedBackground { color, .. }
            | DrawCommand::Fill { color, .. }
            | DrawCommand::Mesh { color, .. } => Some(*color),
            DrawCommand::Outline { .. } | DrawCommand::Label(_) => None,
        }
    }
}

fn triangle_contains(t: &[DVec2; 3], p: DVec2) -> bool {
    let d1 = is_left(t[0], t[1], p);
    let d2 = is_left(t[1], t[2], p);
    let d3 = is_left(t[2], t[0], p);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

/// Exterior followed by each hole, for even-odd filling.
pub fn even_odd_path<'a>(polygons: impl IntoIterator<Item = &'a SimplifiedPolygon>) -> CompoundPath {
    CompoundPath {
        rings: polygons
            .into_iter()
            .flat_map(|p| p.rings().cloned())
            .collect(),
    }
}

/// Fill command for a batch of polygons sharing a color and path strategy.
pub fn fill_batch(
    batch: &[&SimplifiedPolygon],
    indices: Vec<usize>,
    method: FillMethod,
    color: Color,
) -> Option<DrawCommand> {
    let (path, rule) = match method {
        FillMethod::ExactCombine => (combine::combine_polygons(batch.iter().copied()), FillRule::NonZero),
        FillMethod::EvenOdd | FillMethod::Triangulated => {
            (even_odd_path(batch.iter().copied()), FillRule::EvenOdd)
        }
    };
    (!path.is_empty()).then_some(DrawCommand::Fill {
        path,
        rule,
        color,
        polygons: indices,
    })
}

/// Background covering the viewport minus every polygon.
pub fn inverted_background<'a>(
    viewport: &Bounds,
    polygons: impl IntoIterator<Item = &'a SimplifiedPolygon>,
    method: FillMethod,
    color: Color,
) -> DrawCommand {
    match method {
        FillMethod::ExactCombine => DrawCommand::InvertedBackground {
            path: combine::subtract_from_rect(viewport, polygons),
            rule: FillRule::NonZero,
            color,
        },
        FillMethod::EvenOdd | FillMethod::Triangulated => {
            let mut path = even_odd_path(polygons);
            path.rings.insert(0, viewport.to_ring());
            DrawCommand::InvertedBackground {
                path,
                rule: FillRule::EvenOdd,
                color,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    const RED: Color = Color::rgb(255, 0, 0);

    #[test]
    fn test_resolve_prefers_override() {
        let caps = BackendCaps::default();
        assert_eq!(
            resolve_fill_method(Some(FillMethod::Triangulated), false, PainterFillMethod::EvenOdd, caps),
            (FillMethod::Triangulated, false)
        );
        assert_eq!(
            resolve_fill_method(None, true, PainterFillMethod::ExactCombine, caps),
            (FillMethod::Triangulated, false)
        );
        assert_eq!(
            resolve_fill_method(None, false, PainterFillMethod::ExactCombine, caps),
            (FillMethod::ExactCombine, false)
        );
    }

    #[test]
    fn test_resolve_falls_back_without_path_ops() {
        let caps = BackendCaps { path_combine: false };
        assert_eq!(
            resolve_fill_method(None, false, PainterFillMethod::ExactCombine, caps),
            (FillMethod::EvenOdd, true)
        );
    }

    #[test]
    fn test_even_odd_hole() {
        let p = poly(square(0.0, 0.0, 10.0), vec![square(3.0, 3.0, 4.0)]);
        let cmd = fill_batch(&[&p], vec![0], FillMethod::EvenOdd, RED).unwrap();
        assert!(!cmd.covers(DVec2::new(5.0, 5.0)));
        assert!(cmd.covers(DVec2::new(1.0, 1.0)));
        assert!(!cmd.covers(DVec2::new(11.0, 1.0)));
    }

    #[test]
    fn test_even_odd_overlapping_holes_show_through() {
        // Two overlapping holes: their intersection is painted again.
        let p = poly(
            square(0.0, 0.0, 20.0),
            vec![square(2.0, 2.0, 8.0), square(6.0, 6.0, 8.0)],
        );
        let even_odd = fill_batch(&[&p], vec![0], FillMethod::EvenOdd, RED).unwrap();
        let exact = fill_batch(&[&p], vec![0], FillMethod::ExactCombine, RED).unwrap();
        let both_holes = DVec2::new(8.0, 8.0);
        assert!(even_odd.covers(both_holes));
        assert!(!exact.covers(both_holes));
    }

    #[test]
    fn test_inverted_background() {
        let viewport = Bounds::new(DVec2::ZERO, DVec2::splat(100.0));
        let p = poly(square(10.0, 10.0, 20.0), vec![square(15.0, 15.0, 5.0)]);
        for method in [FillMethod::EvenOdd, FillMethod::ExactCombine] {
            let bg = inverted_background(&viewport, [&p], method, RED);
            assert!(bg.covers(DVec2::new(50.0, 50.0)), "{method:?}");
            assert!(!bg.covers(DVec2::new(12.0, 12.0)), "{method:?}");
            assert!(bg.covers(DVec2::new(17.0, 17.0)), "{method:?}");
        }
    }

    #[test]
    fn test_winding_number_signs() {
        let ring = square(0.0, 0.0, 10.0);
        let mut reversed = ring.clone();
        reversed.reverse();
        let p = DVec2::new(5.0, 5.0);
        assert_eq!(winding_number(&ring, p), -winding_number(&reversed, p));
        assert_eq!(winding_number(&ring, p).abs(), 1);
        assert_eq!(winding_number(&ring, DVec2::new(20.0, 5.0)), 0);
    }
}
