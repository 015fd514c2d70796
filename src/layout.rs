//! Calibration layout: named pixel offsets relative to the window origin.
//!
//! Offsets are captured once by the operator and are immutable at runtime.
//! Absolute positions are recomputed from the current window rectangle on
//! every tick via [`BossLayout::resolve`] and never cached across ticks, so
//! a moved window stays calibrated.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::geometry::{GameWindow, Point, Rect};

fn default_row_height() -> i32 {
    101
}

fn default_visible_rows() -> u32 {
    4
}

fn default_scroll_distance() -> i32 {
    405
}

/// Calibrated anchor offsets, `[x, y]` relative to the window origin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BossLayout {
    /// Boss panel button on the top bar.
    pub panel_button: [i32; 2],
    /// Major-boss tab at the top of the panel.
    pub major_tab: [i32; 2],
    /// Minor-boss tab at the top of the panel.
    pub minor_tab: [i32; 2],
    /// Top-left of the first boss row in the list.
    pub first_row: [i32; 2],
    /// Top-left of the last visible boss row (4th).
    pub last_visible_row: [i32; 2],
    /// Go button on a boss row (any row; the engine offsets per row).
    pub go_button: [i32; 2],
    /// Panel close (X) button.
    pub panel_close: [i32; 2],
    /// Auto-attack toggle above the chat box.
    pub auto_attack_toggle: [i32; 2],
    /// First entry of the auto-attack monster dropdown.
    pub monster_list_first: [i32; 2],
    /// Resurrect button shown on death.
    pub resurrect_button: [i32; 2],
    /// Channel indicator button, top-right.
    pub channel_button: [i32; 2],
    /// Target channel's button inside the channel popup.
    pub channel_target_button: [i32; 2],

    /// Height of one boss row in pixels.
    #[serde(default = "default_row_height")]
    pub row_height: i32,
    /// Rows visible per page.
    #[serde(default = "default_visible_rows")]
    pub visible_rows: u32,
    /// Drag distance that guarantees reaching an end-stop.
    #[serde(default = "default_scroll_distance")]
    pub scroll_distance: i32,
    /// Scrollable list region `[x, y, w, h]` relative to the window origin.
    /// Falls back to a region anchored on `first_row` when absent.
    #[serde(default)]
    pub panel_scroll_region: Option<[i32; 4]>,
}

impl BossLayout {
    /// Computes absolute screen positions for the current window rectangle.
    pub fn resolve(&self, win: &GameWindow) -> HuntAnchors {
        let at = |off: [i32; 2]| Point::new(win.x + off[0], win.y + off[1]);

        let scroll_region = match self.panel_scroll_region {
            Some([x, y, w, h]) => Rect::new(win.x + x, win.y + y, w, h),
            None => {
                let first = at(self.first_row);
                Rect::new(first.x, first.y, 831, 405)
            }
        };

        HuntAnchors {
            panel_button: at(self.panel_button),
            major_tab: at(self.major_tab),
            minor_tab: at(self.minor_tab),
            first_row: at(self.first_row),
            go_button: at(self.go_button),
            panel_close: at(self.panel_close),
            auto_attack_toggle: at(self.auto_attack_toggle),
            monster_list_first: at(self.monster_list_first),
            resurrect_button: at(self.resurrect_button),
            channel_button: at(self.channel_button),
            channel_target_button: at(self.channel_target_button),
            scroll_region,
            row_height: self.row_height,
            visible_rows: self.visible_rows,
            scroll_distance: self.scroll_distance,
        }
    }
}

/// Absolute positions for one tick. Rebuilt from [`BossLayout`] every tick.
#[derive(Clone, Copy, Debug)]
pub struct HuntAnchors {
    pub panel_button: Point,
    pub major_tab: Point,
    pub minor_tab: Point,
    pub first_row: Point,
    pub go_button: Point,
    pub panel_close: Point,
    pub auto_attack_toggle: Point,
    pub monster_list_first: Point,
    pub resurrect_button: Point,
    pub channel_button: Point,
    pub channel_target_button: Point,
    pub scroll_region: Rect,
    pub row_height: i32,
    pub visible_rows: u32,
    pub scroll_distance: i32,
}

impl HuntAnchors {
    /// OCR rect around the channel indicator, wide enough for "CH 10".
    pub fn channel_ocr_region(&self) -> Rect {
        let c = self.channel_button;
        Rect::new(c.x - 60, c.y - 15, 130, 35)
    }

    /// Brightness rect that is lit up when the channel popup is open.
    pub fn channel_modal_region(&self) -> Rect {
        let c = self.channel_target_button;
        Rect::new(c.x - 60, c.y - 40, 120, 80)
    }

    /// Brightness rect around the panel close control; bright when the
    /// panel header is visible.
    pub fn panel_close_region(&self) -> Rect {
        let c = self.panel_close;
        Rect::new(c.x - 40, c.y - 15, 80, 30)
    }

    /// OCR rect over the resurrect button label.
    pub fn resurrect_region(&self) -> Rect {
        let r = self.resurrect_button;
        Rect::new(r.x - 60, r.y - 15, 120, 30)
    }

    /// Minimap content area, below the channel button in the top-right.
    /// Bright when the minimap overlay is open.
    pub fn minimap_region(&self) -> Rect {
        let c = self.channel_button;
        Rect::new(c.x - 120, c.y + 40, 150, 150)
    }

    /// The minimap toggle button.
    pub fn minimap_button(&self) -> Point {
        let c = self.channel_button;
        Point::new(c.x, c.y + 50)
    }

    /// The OCR rect for a visible row (0-based) of the boss list.
    pub fn row_region(&self, row: u32) -> Rect {
        let s = self.scroll_region;
        Rect::new(s.x, s.y + row as i32 * self.row_height, s.w, self.row_height)
    }

    /// A point on the middle of a visible row's card, safe to start a drag
    /// from. Dragging between rows can miss the draggable element.
    pub fn row_drag_point(&self, row: u32) -> Point {
        let card_cx = (self.first_row.x + self.go_button.x) / 2;
        let card_cy = self.first_row.y + row as i32 * self.row_height + self.row_height / 2;
        Point::new(card_cx, card_cy)
    }
}

/// Loads the calibration layout from `path`. `Ok(None)` when not calibrated.
pub fn load_layout(path: &Path) -> Result<Option<BossLayout>> {
    if !path.exists() {
        return Ok(None);
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
    let layout = serde_json::from_str(&contents)
        .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))?;
    Ok(Some(layout))
}

/// Saves the calibration layout to `path`.
pub fn save_layout(path: &Path, layout: &BossLayout) -> Result<()> {
    let contents = serde_json::to_string_pretty(layout)?;
    fs::write(path, contents)
        .map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
pub fn test_layout() -> BossLayout {
    BossLayout {
        panel_button: [400, 20],
        major_tab: [300, 120],
        minor_tab: [420, 120],
        first_row: [250, 180],
        last_visible_row: [250, 483],
        go_button: [700, 200],
        panel_close: [860, 120],
        auto_attack_toggle: [80, 600],
        monster_list_first: [150, 450],
        resurrect_button: [500, 400],
        channel_button: [900, 30],
        channel_target_button: [450, 300],
        row_height: 101,
        visible_rows: 4,
        scroll_distance: 405,
        panel_scroll_region: Some([250, 180, 600, 404]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_offsets_follow_window() {
        let layout = test_layout();
        let a = layout.resolve(&GameWindow { x: 10, y: 20, w: 1280, h: 720 });
        assert_eq!(a.panel_button, Point::new(410, 40));
        assert_eq!(a.channel_button, Point::new(910, 50));
        assert_eq!(a.scroll_region, Rect::new(260, 200, 600, 404));

        // Moving the window moves every derived position by the same delta.
        let b = layout.resolve(&GameWindow { x: 110, y: 20, w: 1280, h: 720 });
        assert_eq!(b.panel_button.x - a.panel_button.x, 100);
        assert_eq!(b.scroll_region.x - a.scroll_region.x, 100);
    }

    #[test]
    fn test_scroll_region_fallback() {
        let mut layout = test_layout();
        layout.panel_scroll_region = None;
        let a = layout.resolve(&GameWindow { x: 0, y: 0, w: 1280, h: 720 });
        assert_eq!(a.scroll_region, Rect::new(250, 180, 831, 405));
    }

    #[test]
    fn test_derived_regions() {
        let layout = test_layout();
        let a = layout.resolve(&GameWindow { x: 0, y: 0, w: 1280, h: 720 });
        assert_eq!(a.channel_ocr_region(), Rect::new(840, 15, 130, 35));
        assert_eq!(a.channel_modal_region(), Rect::new(390, 260, 120, 80));
        assert_eq!(a.panel_close_region(), Rect::new(820, 105, 80, 30));
        assert_eq!(a.resurrect_region(), Rect::new(440, 385, 120, 30));
        assert_eq!(a.minimap_region(), Rect::new(780, 70, 150, 150));
        assert_eq!(a.minimap_button(), Point::new(900, 80));
    }

    #[test]
    fn test_row_region_and_drag_point() {
        let layout = test_layout();
        let a = layout.resolve(&GameWindow { x: 0, y: 0, w: 1280, h: 720 });
        assert_eq!(a.row_region(0), Rect::new(250, 180, 600, 101));
        assert_eq!(a.row_region(2), Rect::new(250, 382, 600, 101));
        // Drag point sits on the card, halfway between list edge and Go.
        assert_eq!(a.row_drag_point(1), Point::new(475, 331));
    }

    #[test]
    fn test_layout_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("layout.json");
        assert!(load_layout(&path).unwrap().is_none());

        let layout = test_layout();
        save_layout(&path, &layout).unwrap();
        let loaded = load_layout(&path).unwrap().unwrap();
        assert_eq!(loaded.panel_button, layout.panel_button);
        assert_eq!(loaded.row_height, 101);
        assert_eq!(loaded.panel_scroll_region, layout.panel_scroll_region);
    }

    #[test]
    fn test_layout_scalar_defaults() {
        // A minimal calibration without derived scalars still loads.
        let json = r#"{
            "panel_button": [1, 2], "major_tab": [3, 4], "minor_tab": [5, 6],
            "first_row": [7, 8], "last_visible_row": [9, 10],
            "go_button": [11, 12], "panel_close": [13, 14],
            "auto_attack_toggle": [15, 16], "monster_list_first": [17, 18],
            "resurrect_button": [19, 20], "channel_button": [21, 22],
            "channel_target_button": [23, 24]
        }"#;
        let layout: BossLayout = serde_json::from_str(json).unwrap();
        assert_eq!(layout.row_height, 101);
        assert_eq!(layout.visible_rows, 4);
        assert_eq!(layout.scroll_distance, 405);
        assert!(layout.panel_scroll_region.is_none());
    }
}
