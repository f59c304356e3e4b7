use serde::{Deserialize, Serialize};

use crate::config::{NODE_HEIGHT, NODE_WIDTH, PIN_OFFSET};

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Placement of a piece on the board. Carries no behaviour of its own.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Node {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Node {
    pub fn new(at: Point) -> Self {
        Self::with_size(at, NODE_WIDTH, NODE_HEIGHT)
    }

    pub fn with_size(at: Point, width: f64, height: f64) -> Self {
        Self {
            x: at.x,
            y: at.y,
            width,
            height,
        }
    }

    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn set_position(&mut self, at: Point) {
        self.x = at.x;
        self.y = at.y;
    }

    pub fn contains(&self, point: Point) -> bool {
        point.x >= self.x
            && point.x <= self.x + self.width
            && point.y >= self.y
            && point.y <= self.y + self.height
    }

    /// Location of input pin `index` out of `count`.
    pub fn input_pin(&self, index: usize, count: usize) -> Point {
        Point::new(self.x - PIN_OFFSET, self.pin_y(index, count))
    }

    /// Location of output pin `index` out of `count`.
    pub fn output_pin(&self, index: usize, count: usize) -> Point {
        Point::new(self.x + self.width, self.pin_y(index, count))
    }

    fn pin_y(&self, index: usize, count: usize) -> f64 {
        if count <= 1 {
            self.y + self.height / 2.0
        } else {
            let spacing = self.height / (count + 1) as f64;
            self.y + (index + 1) as f64 * spacing
        }
    }
}
