//! Perception primitives consumed by the hunt engine.
//!
//! This module provides:
//! - The `Screen` collaborator contract (capture, OCR, brightness, input)
//! - Brightness and frame-difference analysis over captured regions
//! - The arrival stability tracker

pub mod analyze;
pub mod screen;

pub use analyze::{average_brightness, diff_percent, StabilityTracker};
pub use screen::Screen;
