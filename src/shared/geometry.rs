//! Minimal 2D geometry used for hit-testing, culling, and menu placement.
//!
//! All coordinates are logical pixels, with the origin at the top-left corner.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DVec2 {
    pub x: f64,
    pub y: f64,
}

pub const fn dvec2(x: f64, y: f64) -> DVec2 {
    DVec2 { x, y }
}

/// An axis-aligned rectangle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub pos: DVec2,
    pub size: DVec2,
}

impl Rect {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { pos: dvec2(x, y), size: dvec2(width, height) }
    }

    pub fn left(&self) -> f64 { self.pos.x }
    pub fn top(&self) -> f64 { self.pos.y }
    pub fn right(&self) -> f64 { self.pos.x + self.size.x }
    pub fn bottom(&self) -> f64 { self.pos.y + self.size.y }

    pub fn contains(&self, point: DVec2) -> bool {
        point.x >= self.left() && point.x < self.right()
            && point.y >= self.top() && point.y < self.bottom()
    }

    /// Returns the overlapping area of `self` and `other`,
    /// or `None` if they do not overlap by a non-zero area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.left().max(other.left());
        let top = self.top().max(other.top());
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        (right > left && bottom > top)
            .then(|| Rect::new(left, top, right - left, bottom - top))
    }

    /// The length of this rect along the given axis.
    pub fn extent(&self, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Horizontal => self.size.x,
            Orientation::Vertical => self.size.y,
        }
    }
}

/// The direction in which a list of items is laid out and scrolled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    Horizontal,
    Vertical,
}

/// Extra space that a positioned element needs around its main body,
/// e.g., for a reaction strip attached to the side of a menu.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_touching_rects_is_none() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersection(&b), None);
    }

    #[test]
    fn intersection_clips_to_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(4.0, 2.0, 10.0, 4.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(4.0, 2.0, 6.0, 4.0)));
    }

    #[test]
    fn contains_excludes_far_edges() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert!(r.contains(dvec2(0.0, 0.0)));
        assert!(!r.contains(dvec2(10.0, 5.0)));
    }
}
