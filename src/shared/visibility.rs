//! Computes how much of an item is visible within a scrollable viewport.
//!
//! This is called for every item on each scroll event, and once after an item is mounted,
//! so it must stay a cheap, side-effect-free function.

use super::geometry::{Orientation, Rect};

/// Which edges of an item are cut off by the viewport.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Overflow {
    pub left: bool,
    pub right: bool,
    pub top: bool,
    pub bottom: bool,
}

/// The visible portion of an item that at least partially overlaps its viewport.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VisibleRect {
    /// The clipped intersection of the item and the viewport.
    pub rect: Rect,
    pub overflow: Overflow,
}

impl VisibleRect {
    /// Returns `true` if the item is clipped on its leading or trailing edge
    /// along the given scroll axis.
    pub fn is_clipped_along(&self, orientation: Orientation) -> bool {
        match orientation {
            Orientation::Horizontal => self.overflow.left || self.overflow.right,
            Orientation::Vertical => self.overflow.top || self.overflow.bottom,
        }
    }
}

/// Returns the visible part of `item` within `viewport`,
/// or `None` if the two rectangles do not overlap at all.
pub fn compute_visibility(item: &Rect, viewport: &Rect) -> Option<VisibleRect> {
    let rect = item.intersection(viewport)?;
    Some(VisibleRect {
        rect,
        overflow: Overflow {
            left: item.left() < viewport.left(),
            right: item.right() > viewport.right(),
            top: item.top() < viewport.top(),
            bottom: item.bottom() > viewport.bottom(),
        },
    })
}

/// The uniform scale applied to an item that is partially scrolled past the viewport edge:
/// the squared ratio of its visible length to its full length, capped at 1.
pub fn edge_scale(visible_extent: f64, full_extent: f64) -> f64 {
    if full_extent <= 0.0 {
        return 1.0;
    }
    (visible_extent.powi(2) / full_extent.powi(2)).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VIEWPORT: Rect = Rect::new(0.0, 0.0, 100.0, 36.0);

    #[test]
    fn fully_visible_item_has_no_overflow() {
        let item = Rect::new(36.0, 0.0, 36.0, 36.0);
        let visible = compute_visibility(&item, &VIEWPORT).unwrap();
        assert_eq!(visible.rect, item);
        assert_eq!(visible.overflow, Overflow::default());
        assert!(!visible.is_clipped_along(Orientation::Horizontal));
    }

    #[test]
    fn item_outside_viewport_is_none() {
        assert!(compute_visibility(&Rect::new(100.0, 0.0, 36.0, 36.0), &VIEWPORT).is_none());
        assert!(compute_visibility(&Rect::new(-36.0, 0.0, 36.0, 36.0), &VIEWPORT).is_none());
    }

    #[test]
    fn item_crossing_right_edge_is_clipped() {
        let item = Rect::new(82.0, 0.0, 36.0, 36.0);
        let visible = compute_visibility(&item, &VIEWPORT).unwrap();
        assert!(visible.overflow.right);
        assert!(!visible.overflow.left);
        assert_eq!(visible.rect.size.x, 18.0);
        assert!(visible.is_clipped_along(Orientation::Horizontal));
        assert!(!visible.is_clipped_along(Orientation::Vertical));
    }

    #[test]
    fn edge_scale_is_squared_ratio_capped_at_one() {
        assert_eq!(edge_scale(18.0, 36.0), 0.25);
        assert_eq!(edge_scale(36.0, 36.0), 1.0);
        assert_eq!(edge_scale(40.0, 36.0), 1.0);
    }
}
