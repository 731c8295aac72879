use crate::polygon::types::Bounds;

/// Whether a polygon with `bounds` should be drawn for `viewport`.
///
/// Touching the viewport edge counts as visible. With culling disabled
/// everything passes.
#[inline]
pub fn is_visible(bounds: &Bounds, viewport: &Bounds, culling: bool) -> bool {
    !culling || bounds.overlaps(viewport)
}
