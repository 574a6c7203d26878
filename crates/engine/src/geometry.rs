use std::fmt;
use std::ops::{Add, Sub};

use serde::{Deserialize, Serialize};

/// Integer 2D value used for positions, sizes and per-tick deltas.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point2D {
    pub x: i32,
    pub y: i32,
}

impl Point2D {
    pub const ZERO: Point2D = Point2D { x: 0, y: 0 };

    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub const fn translated(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x.saturating_add(dx),
            y: self.y.saturating_add(dy),
        }
    }

    pub const fn half(self) -> Self {
        Self {
            x: self.x / 2,
            y: self.y / 2,
        }
    }
}

impl Add for Point2D {
    type Output = Point2D;

    fn add(self, rhs: Point2D) -> Point2D {
        self.translated(rhs.x, rhs.y)
    }
}

impl Sub for Point2D {
    type Output = Point2D;

    fn sub(self, rhs: Point2D) -> Point2D {
        Point2D {
            x: self.x.saturating_sub(rhs.x),
            y: self.y.saturating_sub(rhs.y),
        }
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Axis-aligned box anchored at its top-left corner.
///
/// Edges that merely touch do not count as an intersection, and a box with a
/// zero or negative extent never intersects anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hitbox {
    pub position: Point2D,
    pub size: Point2D,
}

impl Hitbox {
    pub const fn new(position: Point2D, size: Point2D) -> Self {
        Self { position, size }
    }

    pub fn left(&self) -> i64 {
        i64::from(self.position.x)
    }

    pub fn top(&self) -> i64 {
        i64::from(self.position.y)
    }

    pub fn right(&self) -> i64 {
        self.left() + i64::from(self.size.x)
    }

    pub fn bottom(&self) -> i64 {
        self.top() + i64::from(self.size.y)
    }

    pub fn is_empty(&self) -> bool {
        self.size.x <= 0 || self.size.y <= 0
    }

    pub fn center(&self) -> Point2D {
        self.position + self.size.half()
    }

    pub fn intersects(&self, other: &Hitbox) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.left() < other.right()
            && other.left() < self.right()
            && self.top() < other.bottom()
            && other.top() < self.bottom()
    }

}
