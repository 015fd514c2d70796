//! Screen-space primitives shared by perception, calibration, and the engine.

use serde::{Deserialize, Serialize};

/// The game client's current on-screen rectangle, in screen pixels.
///
/// Re-resolved at the start of every engine tick; all calibrated positions
/// are offsets from its origin and are never cached across ticks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameWindow {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl GameWindow {
    /// The center half of the window, used for loading/death darkness checks.
    ///
    /// Loading and death screens darken the whole client; sampling the middle
    /// quarter-to-three-quarter band avoids HUD elements at the edges.
    pub fn center_region(&self) -> Rect {
        Rect {
            x: self.x + self.w / 4,
            y: self.y + self.h / 4,
            w: self.w / 2,
            h: self.h / 2,
        }
    }
}

/// An absolute screen point.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// An absolute screen rectangle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: i32,
    pub h: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, w: i32, h: i32) -> Self {
        Self { x, y, w, h }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_region() {
        let win = GameWindow { x: 100, y: 50, w: 800, h: 600 };
        let center = win.center_region();
        assert_eq!(center, Rect::new(300, 200, 400, 300));
    }
}
