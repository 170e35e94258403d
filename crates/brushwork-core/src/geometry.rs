use serde::{Deserialize, Serialize};

/// A 2D point in surface coordinates (pixels, y grows downward).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn to_skia(self) -> tiny_skia::Point {
        tiny_skia::Point::from_xy(self.x, self.y)
    }
}

/// An axis-aligned rectangle described by its four edges.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl Rect {
    /// Build a rectangle from two opposite edges on each axis, in any order.
    pub fn from_ltrb(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    pub fn from_xywh(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self::from_ltrb(x, y, x + width, y + height)
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.left + self.right) / 2.0,
            (self.top + self.bottom) / 2.0,
        )
    }

    /// A rectangle with no area still has a position and can be merged.
    pub fn is_empty(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }

    pub fn union(&self, other: &Rect) -> Self {
        Self {
            left: self.left.min(other.left),
            top: self.top.min(other.top),
            right: self.right.max(other.right),
            bottom: self.bottom.max(other.bottom),
        }
    }

    /// Grow every edge outward by `amount`.
    pub fn outset(&self, amount: f32) -> Self {
        Self::from_ltrb(
            self.left - amount,
            self.top - amount,
            self.right + amount,
            self.bottom + amount,
        )
    }

    /// `None` for degenerate rectangles, which tiny-skia refuses to draw.
    pub fn to_skia(&self) -> Option<tiny_skia::Rect> {
        tiny_skia::Rect::from_ltrb(self.left, self.top, self.right, self.bottom)
    }

    pub fn from_skia(rect: tiny_skia::Rect) -> Self {
        Self::from_ltrb(rect.left(), rect.top(), rect.right(), rect.bottom())
    }
}

/// Accumulates the union of every rectangle drawn onto a layer.
///
/// An empty box is distinct from a box at the origin: the first merged
/// rectangle replaces the empty state as-is. Serializes as the rectangle's
/// edges, or `null` while empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundingBox {
    rect: Option<Rect>,
}

impl BoundingBox {
    pub fn new() -> Self {
        Self { rect: None }
    }

    pub fn merge(&mut self, incoming: Rect) {
        self.rect = Some(match self.rect {
            Some(current) => current.union(&incoming),
            None => incoming,
        });
    }

    pub fn merged(mut self, incoming: Rect) -> Self {
        self.merge(incoming);
        self
    }

    pub fn rect(&self) -> Option<Rect> {
        self.rect
    }

    pub fn is_empty(&self) -> bool {
        self.rect.is_none()
    }

    pub fn top(&self) -> Option<f32> {
        self.rect.map(|r| r.top)
    }

    pub fn right(&self) -> Option<f32> {
        self.rect.map(|r| r.right)
    }

    pub fn bottom(&self) -> Option<f32> {
        self.rect.map(|r| r.bottom)
    }

    pub fn left(&self) -> Option<f32> {
        self.rect.map(|r| r.left)
    }
}

impl FromIterator<Rect> for BoundingBox {
    fn from_iter<I: IntoIterator<Item = Rect>>(iter: I) -> Self {
        iter.into_iter().fold(BoundingBox::new(), BoundingBox::merged)
    }
}
