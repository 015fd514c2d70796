//! The `Screen` collaborator contract.
//!
//! Everything the engine knows about the outside world goes through this
//! trait: window bounds, region capture, brightness sampling, best-effort
//! text recognition, and humanized input. The engine never touches platform
//! APIs directly, which keeps the state machine testable with a scripted
//! screen.

use anyhow::Result;
use image::GrayImage;

use crate::geometry::{GameWindow, Point, Rect};

pub trait Screen: Send {
    /// Resolves the game client's current on-screen rectangle.
    /// `None` when the client is not running or not visible.
    fn resolve_window(&self) -> Option<GameWindow>;

    /// Captures a screen region as a grayscale snapshot.
    fn capture_region(&self, region: Rect) -> Result<GrayImage>;

    /// Average brightness of a screen region, 0.0–255.0.
    fn average_brightness(&self, region: Rect) -> Result<f32>;

    /// Best-effort text recognition over a region. Returns `Ok("")` when no
    /// text is found; garbled output is the caller's problem.
    fn recognize_text(&self, region: Rect) -> Result<String>;

    /// Clicks at `point` with up to `jitter` pixels of randomized offset and
    /// randomized press/hold/release timing. Fire-and-forget.
    fn click(&self, point: Point, jitter: i32);

    /// Press at `from`, drag vertically by `dy` pixels (positive = down),
    /// release. Used for list scrolling.
    fn drag_vertical(&self, from: Point, dy: i32);
}

impl<T: Screen + ?Sized> Screen for Box<T> {
    fn resolve_window(&self) -> Option<GameWindow> {
        (**self).resolve_window()
    }

    fn capture_region(&self, region: Rect) -> Result<GrayImage> {
        (**self).capture_region(region)
    }

    fn average_brightness(&self, region: Rect) -> Result<f32> {
        (**self).average_brightness(region)
    }

    fn recognize_text(&self, region: Rect) -> Result<String> {
        (**self).recognize_text(region)
    }

    fn click(&self, point: Point, jitter: i32) {
        (**self).click(point, jitter)
    }

    fn drag_vertical(&self, from: Point, dy: i32) {
        (**self).drag_vertical(from, dy)
    }
}

/// Scripted screen for state-machine tests.
///
/// Responses are closures over the queried region, so tests can answer by
/// position ("the resurrect label area reads 'Resurrect'") instead of by
/// call order. Clicks and drags are recorded for assertions.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::sync::Mutex;

    type TextFn = Box<dyn FnMut(Rect) -> String + Send>;
    type BrightnessFn = Box<dyn FnMut(Rect) -> f32 + Send>;
    type FrameFn = Box<dyn FnMut(Rect) -> GrayImage + Send>;

    pub struct MockScreen {
        pub window: Mutex<Option<GameWindow>>,
        on_text: Mutex<TextFn>,
        on_brightness: Mutex<BrightnessFn>,
        on_frame: Mutex<FrameFn>,
        pub clicks: Mutex<Vec<Point>>,
        pub drags: Mutex<Vec<(Point, i32)>>,
    }

    impl MockScreen {
        /// A bright, textless, static screen with a window at the origin.
        pub fn new() -> Self {
            Self {
                window: Mutex::new(Some(GameWindow { x: 0, y: 0, w: 1280, h: 720 })),
                on_text: Mutex::new(Box::new(|_| String::new())),
                on_brightness: Mutex::new(Box::new(|_| 200.0)),
                on_frame: Mutex::new(Box::new(|r| {
                    GrayImage::from_pixel(r.w.max(1) as u32, r.h.max(1) as u32, image::Luma([128]))
                })),
                clicks: Mutex::new(Vec::new()),
                drags: Mutex::new(Vec::new()),
            }
        }

        pub fn with_text(self, f: impl FnMut(Rect) -> String + Send + 'static) -> Self {
            *self.on_text.lock().unwrap() = Box::new(f);
            self
        }

        pub fn with_brightness(self, f: impl FnMut(Rect) -> f32 + Send + 'static) -> Self {
            *self.on_brightness.lock().unwrap() = Box::new(f);
            self
        }

        pub fn with_frames(self, f: impl FnMut(Rect) -> GrayImage + Send + 'static) -> Self {
            *self.on_frame.lock().unwrap() = Box::new(f);
            self
        }

        pub fn click_count(&self) -> usize {
            self.clicks.lock().unwrap().len()
        }
    }

    // Tests hold an `Arc` to inspect recorded input after handing the
    // screen to the machine.
    impl Screen for std::sync::Arc<MockScreen> {
        fn resolve_window(&self) -> Option<GameWindow> {
            (**self).resolve_window()
        }

        fn capture_region(&self, region: Rect) -> Result<GrayImage> {
            (**self).capture_region(region)
        }

        fn average_brightness(&self, region: Rect) -> Result<f32> {
            (**self).average_brightness(region)
        }

        fn recognize_text(&self, region: Rect) -> Result<String> {
            (**self).recognize_text(region)
        }

        fn click(&self, point: Point, jitter: i32) {
            (**self).click(point, jitter)
        }

        fn drag_vertical(&self, from: Point, dy: i32) {
            (**self).drag_vertical(from, dy)
        }
    }

    impl Screen for MockScreen {
        fn resolve_window(&self) -> Option<GameWindow> {
            *self.window.lock().unwrap()
        }

        fn capture_region(&self, region: Rect) -> Result<GrayImage> {
            Ok((self.on_frame.lock().unwrap())(region))
        }

        fn average_brightness(&self, region: Rect) -> Result<f32> {
            Ok((self.on_brightness.lock().unwrap())(region))
        }

        fn recognize_text(&self, region: Rect) -> Result<String> {
            Ok((self.on_text.lock().unwrap())(region))
        }

        fn click(&self, point: Point, _jitter: i32) {
            self.clicks.lock().unwrap().push(point);
        }

        fn drag_vertical(&self, from: Point, dy: i32) {
            self.drags.lock().unwrap().push((from, dy));
        }
    }
}
