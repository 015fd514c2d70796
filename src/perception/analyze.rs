//! Brightness and frame-difference analysis of captured regions.
//!
//! Everything here is a pure function over grayscale buffers so the engine's
//! visual heuristics can be tested without a screen.

use image::GrayImage;

/// Average intensity of a grayscale image, 0.0 (black) to 255.0 (white).
pub fn average_brightness(img: &GrayImage) -> f32 {
    if img.width() == 0 || img.height() == 0 {
        return 0.0;
    }

    let mut total: f64 = 0.0;
    let pixel_count = (img.width() * img.height()) as f64;
    for pixel in img.pixels() {
        total += pixel[0] as f64;
    }

    (total / pixel_count) as f32
}

/// Percentage of pixels whose intensity differs by more than `level` between
/// two snapshots of the same region.
///
/// A dimension mismatch counts as fully changed (100%): it means the capture
/// region itself shifted, so the frames are not comparable.
pub fn diff_percent(a: &GrayImage, b: &GrayImage, level: u8) -> f32 {
    if a.dimensions() != b.dimensions() {
        return 100.0;
    }
    let total = (a.width() * a.height()) as f32;
    if total == 0.0 {
        return 0.0;
    }

    let changed = a
        .pixels()
        .zip(b.pixels())
        .filter(|(pa, pb)| pa[0].abs_diff(pb[0]) > level)
        .count() as f32;

    changed / total * 100.0
}

/// Declares a monitored region "settled" after enough consecutive
/// low-difference samples.
///
/// Feed it one frame-diff percentage per polling interval; any sample above
/// the threshold resets the run. Used for arrival detection: the character
/// has arrived once the minimap stops changing.
#[derive(Debug)]
pub struct StabilityTracker {
    threshold_pct: f32,
    required: u32,
    consecutive: u32,
}

impl StabilityTracker {
    /// `required` is the number of consecutive stable samples that declare
    /// stability; derived by callers as `ceil(stable_duration / poll)`.
    pub fn new(threshold_pct: f32, required: u32) -> Self {
        Self {
            threshold_pct,
            required: required.max(1),
            consecutive: 0,
        }
    }

    /// Observes one diff sample. Returns true once stability is reached.
    pub fn observe(&mut self, diff_pct: f32) -> bool {
        if diff_pct > self.threshold_pct {
            self.consecutive = 0;
            false
        } else {
            self.consecutive += 1;
            self.consecutive >= self.required
        }
    }

    /// Current run of stable samples.
    pub fn stable_samples(&self) -> u32 {
        self.consecutive
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(w: u32, h: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(w, h, image::Luma([value]))
    }

    #[test]
    fn test_average_brightness() {
        assert_eq!(average_brightness(&gray(4, 4, 0)), 0.0);
        assert_eq!(average_brightness(&gray(4, 4, 200)), 200.0);
        assert_eq!(average_brightness(&GrayImage::new(0, 0)), 0.0);
    }

    #[test]
    fn test_diff_percent_identical() {
        let a = gray(10, 10, 100);
        assert_eq!(diff_percent(&a, &a, 10), 0.0);
    }

    #[test]
    fn test_diff_percent_partial_change() {
        let a = gray(10, 10, 100);
        let mut b = gray(10, 10, 100);
        // Change 5 of 100 pixels by more than the level.
        for x in 0..5 {
            b.put_pixel(x, 0, image::Luma([200]));
        }
        assert_eq!(diff_percent(&a, &b, 10), 5.0);
    }

    #[test]
    fn test_diff_percent_below_level_ignored() {
        let a = gray(10, 10, 100);
        let b = gray(10, 10, 108); // within the 10-level tolerance
        assert_eq!(diff_percent(&a, &b, 10), 0.0);
    }

    #[test]
    fn test_diff_percent_dimension_mismatch() {
        let a = gray(10, 10, 100);
        let b = gray(8, 10, 100);
        assert_eq!(diff_percent(&a, &b, 10), 100.0);
    }

    #[test]
    fn test_stability_triggers_at_third_stable_sample() {
        // Two moving samples, then the view freezes; 3 samples required.
        let mut tracker = StabilityTracker::new(2.0, 3);
        let samples = [10.0, 8.0, 1.0, 0.5, 0.3, 0.2];
        let results: Vec<bool> = samples.iter().map(|&s| tracker.observe(s)).collect();
        assert_eq!(results, vec![false, false, false, false, true, true]);
    }

    #[test]
    fn test_stability_reset_on_movement() {
        let mut tracker = StabilityTracker::new(2.0, 3);
        assert!(!tracker.observe(1.0));
        assert!(!tracker.observe(0.5));
        assert!(!tracker.observe(9.0)); // movement resets the run
        assert_eq!(tracker.stable_samples(), 0);
        assert!(!tracker.observe(0.1));
        assert!(!tracker.observe(0.1));
        assert!(tracker.observe(0.1));
    }
}
