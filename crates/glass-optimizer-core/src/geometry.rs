//! Axis-aligned rectangle primitives shared by the packer, the waste analyzer
//! and the validator. Coordinates are centimetres with the origin at the
//! plate's top-left corner.

use serde::{Deserialize, Serialize};

/// Tolerance for coordinate comparisons.
pub const EPSILON: f64 = 1e-6;

pub fn approx_eq(a: f64, b: f64) -> bool {
    (a - b).abs() <= EPSILON
}

/// Whether a `width` × `height` piece fits inside the available space.
pub fn fits(width: f64, height: f64, available_width: f64, available_height: f64) -> bool {
    width <= available_width + EPSILON && height <= available_height + EPSILON
}

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

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Degenerate rectangles (zero width or height) carry no area.
    pub fn is_empty(&self) -> bool {
        self.width <= EPSILON || self.height <= EPSILON
    }

    /// Area shared with `other`; touching edges share nothing.
    pub fn intersection_area(&self, other: &Rect) -> f64 {
        let w = self.right().min(other.right()) - self.x.max(other.x);
        let h = self.bottom().min(other.bottom()) - self.y.max(other.y);
        if w <= EPSILON || h <= EPSILON {
            0.0
        } else {
            w * h
        }
    }

    pub fn overlaps(&self, other: &Rect) -> bool {
        self.intersection_area(other) > 0.0
    }

    pub fn contains(&self, other: &Rect) -> bool {
        other.x >= self.x - EPSILON
            && other.y >= self.y - EPSILON
            && other.right() <= self.right() + EPSILON
            && other.bottom() <= self.bottom() + EPSILON
    }

    pub fn approx_eq(&self, other: &Rect) -> bool {
        approx_eq(self.x, other.x)
            && approx_eq(self.y, other.y)
            && approx_eq(self.width, other.width)
            && approx_eq(self.height, other.height)
    }
}
