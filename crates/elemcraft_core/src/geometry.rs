//! Canvas footprints and overlap detection.
//!
//! # Responsibility
//! - Derive an axis-aligned footprint for every placed element.
//! - Decide whether two placements touch closely enough to combine.
//!
//! # Invariants
//! - Footprint width is `CHAR_WIDTH` times the UTF-16 length of the rendered
//!   `"{emoji} {text}"` label, so astral emoji count twice. This stands in
//!   for rendered glyph width: consistent, not pixel-accurate.
//! - Rectangles that only share an edge do not overlap.
//! - A placement never overlaps itself.

use crate::model::element::{Element, PlacedElement};
use serde::{Deserialize, Serialize};

/// Horizontal advance assumed for every character of a label.
pub const CHAR_WIDTH: f64 = 10.0;
/// Fixed height of every element footprint.
pub const ELEMENT_HEIGHT: f64 = 30.0;

/// A 2D canvas position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle anchored at its top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Strict intersection test; shared edges are treated as separated.
    pub fn intersects(&self, other: &Rect) -> bool {
        let separated = other.left() >= self.right()
            || other.right() <= self.left()
            || other.top() >= self.bottom()
            || other.bottom() <= self.top();
        !separated
    }
}

/// Footprint width of a rendered label, measured in UTF-16 code units.
pub fn label_width(label: &str) -> f64 {
    label.encode_utf16().count() as f64 * CHAR_WIDTH
}

/// Footprint of a placed element at its committed position.
pub fn footprint(element: &PlacedElement) -> Rect {
    let width = label_width(&element.display_label());
    Rect::new(element.x, element.y, width, ELEMENT_HEIGHT)
}

/// Returns whether two placed elements overlap.
pub fn overlaps(a: &PlacedElement, b: &PlacedElement) -> bool {
    if a.id == b.id {
        return false;
    }
    footprint(a).intersects(&footprint(b))
}

/// Top-left anchor that centres a dropped element on the cursor.
pub fn drop_origin(element: &Element, cursor_x: f64, cursor_y: f64) -> Point {
    let width = label_width(&element.display_label());
    Point::new(cursor_x - width / 2.0, cursor_y - ELEMENT_HEIGHT / 2.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn placed(emoji: &str, text: &str, x: f64, y: f64) -> PlacedElement {
        PlacedElement::new(&Element::new(emoji, text), x, y)
    }

    #[test]
    fn width_counts_utf16_units_of_rendered_label() {
        // 🔥 is a surrogate pair: "🔥 fire" is 7 units.
        assert_eq!(label_width("🔥 fire"), 70.0);
        // 🌬️ is a surrogate pair plus a variation selector.
        assert_eq!(label_width(&Element::new("🌬️", "wind").display_label()), 80.0);
        assert_eq!(label_width("ab"), 20.0);
    }

    #[test]
    fn astral_emoji_widen_the_footprint() {
        let fire = placed("🔥", "fire", 0.0, 0.0);
        let water = placed("💧", "water", 65.0, 0.0);
        assert!(overlaps(&fire, &water));
    }

    #[test]
    fn nearby_elements_overlap() {
        let fire = placed("🔥", "fire", 100.0, 100.0);
        let water = placed("💧", "water", 105.0, 100.0);
        assert!(overlaps(&fire, &water));
    }

    #[test]
    fn distant_elements_do_not_overlap() {
        let a = placed("🔥", "fire", 0.0, 0.0);
        let b = placed("🔥", "fire", 500.0, 500.0);
        assert!(!overlaps(&a, &b));
    }

    #[test]
    fn overlap_is_symmetric() {
        let cases = [
            (0.0, 0.0, 30.0, 10.0),
            (0.0, 0.0, 60.0, 0.0),
            (10.0, 10.0, 0.0, 39.0),
            (0.0, 0.0, -59.0, 29.0),
            (0.0, 0.0, 400.0, 0.0),
        ];
        for (ax, ay, bx, by) in cases {
            let a = placed("🔥", "fire", ax, ay);
            let b = placed("💧", "water", bx, by);
            assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
        }
    }

    #[test]
    fn shared_edges_do_not_overlap() {
        // "🔥 fire" is 70 wide; b starts exactly at a.right.
        let a = placed("🔥", "fire", 0.0, 0.0);
        let b = placed("🔥", "fire", 70.0, 0.0);
        assert!(!overlaps(&a, &b));
        assert!(!overlaps(&b, &a));

        let below = placed("🔥", "fire", 0.0, ELEMENT_HEIGHT);
        assert!(!overlaps(&a, &below));

        let nudged = placed("🔥", "fire", 69.5, 0.0);
        assert!(overlaps(&a, &nudged));
    }

    #[test]
    fn element_never_overlaps_itself() {
        let a = placed("🔥", "fire", 0.0, 0.0);
        assert!(!overlaps(&a, &a.clone()));
    }

    #[test]
    fn drop_origin_centres_footprint_on_cursor() {
        let origin = drop_origin(&Element::new("🔥", "fire"), 200.0, 100.0);
        assert_eq!(origin, Point::new(165.0, 85.0));
    }
}
