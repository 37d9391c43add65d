//! Integer screen geometry shared by the layout engine and the bridge.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self { Self { x, y } }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn max_x(&self) -> i32 { self.x + self.width }

    pub fn max_y(&self) -> i32 { self.y + self.height }

    pub fn origin(&self) -> Point { Point::new(self.x, self.y) }

    pub fn area(&self) -> i64 { i64::from(self.width.max(0)) * i64::from(self.height.max(0)) }

    pub fn is_empty(&self) -> bool { self.width <= 0 || self.height <= 0 }

    pub fn contains(&self, point: Point) -> bool {
        (self.x..self.max_x()).contains(&point.x) && (self.y..self.max_y()).contains(&point.y)
    }

    pub fn contains_rect(&self, other: Rect) -> bool {
        self.x <= other.x
            && self.y <= other.y
            && self.max_x() >= other.max_x()
            && self.max_y() >= other.max_y()
    }

    pub fn intersection(&self, other: &Rect) -> Rect {
        let min_x = self.x.max(other.x);
        let max_x = self.max_x().min(other.max_x());
        let min_y = self.y.max(other.y);
        let max_y = self.max_y().min(other.max_y());
        Rect::new(min_x, min_y, (max_x - min_x).max(0), (max_y - min_y).max(0))
    }

    /// True when the two rectangles share a region of positive area. Touching
    /// edges do not count.
    pub fn overlaps(&self, other: &Rect) -> bool { !self.intersection(other).is_empty() }

    /// Shrinks each side independently. Sizes never go negative.
    pub fn inset(&self, left: i32, top: i32, right: i32, bottom: i32) -> Rect {
        Rect::new(
            self.x + left,
            self.y + top,
            (self.width - left - right).max(0),
            (self.height - top - bottom).max(0),
        )
    }

    /// Converts an outer rectangle into the client area inside a border of
    /// `border` pixels on every side.
    pub fn without_border(&self, border: i32) -> Rect {
        Rect::new(
            self.x,
            self.y,
            (self.width - 2 * border).max(1),
            (self.height - 2 * border).max(1),
        )
    }

    pub fn center(&self) -> Point { Point::new(self.x + self.width / 2, self.y + self.height / 2) }
}
