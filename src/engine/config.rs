//! Hunt engine tuning.
//!
//! Every visual threshold and timing window here is an empirically tuned
//! constant carried over from field use. They are named and overridable via
//! config.json, but the defaults are load-bearing; change them in the file,
//! not in code.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

fn default_target_channel() -> String {
    "1".to_string()
}

/// Complete hunt engine configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct HuntConfig {
    /// Channel where bosses spawn; the engine keeps verifying it is here.
    pub target_channel: String,
    /// Seconds to wait between panel checks while idle.
    pub idle_interval_secs: u64,
    /// Attempts for click-and-verify operations (channel modal, panel open).
    pub max_open_retries: u32,

    /// Brightness above this means the channel popup is open.
    pub channel_modal_brightness: f32,
    /// Brightness above this means the boss panel is open.
    pub panel_brightness: f32,
    /// Brightness above this means the minimap overlay is open.
    pub minimap_brightness: f32,
    /// Center brightness below this means a loading screen is covering the
    /// window.
    pub loading_brightness: f32,
    /// Center brightness below this contributes to the death signal.
    pub death_brightness: f32,

    /// Maximum seconds to wait for a loading screen to finish.
    pub loading_wait_secs: u64,
    /// Seconds to watch for a loading screen to start after clicking Go.
    pub loading_start_window_secs: u64,

    /// Continuous stability required to declare arrival, in milliseconds.
    pub arrival_stable_ms: u64,
    /// Ceiling on the whole arrival watch, in seconds.
    pub arrival_max_wait_secs: u64,
    /// Minimap polling interval, in milliseconds.
    pub arrival_poll_ms: u64,
    /// Frame-diff percentage above which the character is still moving.
    pub arrival_diff_threshold_pct: f32,
    /// Per-pixel intensity delta that counts as a changed pixel.
    pub pixel_diff_level: u8,

    /// Give up on a fight after this many seconds with no death signal.
    pub fighting_timeout_secs: u64,
    /// Death-signal polling interval while fighting, in milliseconds.
    pub fighting_poll_ms: u64,

    /// Monster dropdown entry height in pixels.
    pub monster_entry_height: i32,
    /// Monster dropdown entries to scan.
    pub monster_max_entries: u32,
    /// Monster dropdown name-area width in pixels.
    pub monster_entry_width: i32,

    /// Settle after opening a modal or clicking Go, in milliseconds.
    pub modal_settle_ms: u64,
    /// Settle after a panel/tab click, in milliseconds.
    pub panel_settle_ms: u64,
    /// Settle between retries and small UI reactions, in milliseconds.
    pub short_settle_ms: u64,
    /// Pause on the death screen before resurrecting, in milliseconds.
    pub dead_delay_ms: u64,
    /// Settle after clicking resurrect, in milliseconds.
    pub resurrect_settle_ms: u64,
    /// Backoff after a failed window resolution, in seconds.
    pub window_retry_secs: u64,
}

impl Default for HuntConfig {
    fn default() -> Self {
        Self {
            target_channel: default_target_channel(),
            idle_interval_secs: 30,
            max_open_retries: 3,
            channel_modal_brightness: 150.0,
            panel_brightness: 160.0,
            minimap_brightness: 140.0,
            loading_brightness: 40.0,
            death_brightness: 80.0,
            loading_wait_secs: 30,
            loading_start_window_secs: 10,
            arrival_stable_ms: 5000,
            arrival_max_wait_secs: 120,
            arrival_poll_ms: 1500,
            arrival_diff_threshold_pct: 2.0,
            pixel_diff_level: 10,
            fighting_timeout_secs: 90,
            fighting_poll_ms: 2000,
            monster_entry_height: 38,
            monster_max_entries: 6,
            monster_entry_width: 200,
            modal_settle_ms: 2000,
            panel_settle_ms: 1200,
            short_settle_ms: 500,
            dead_delay_ms: 2000,
            resurrect_settle_ms: 3000,
            window_retry_secs: 5,
        }
    }
}

impl HuntConfig {
    /// Consecutive stable minimap samples required to declare arrival.
    pub fn arrival_required_samples(&self) -> u32 {
        let poll = self.arrival_poll_ms.max(1);
        (self.arrival_stable_ms.div_ceil(poll)).max(1) as u32
    }
}

/// Loads configuration from `path`, falling back to defaults when the file
/// is missing or unreadable. Never fails: a broken config file should not
/// keep the hunt from starting.
pub fn load_config(path: &Path) -> HuntConfig {
    if !path.exists() {
        return HuntConfig::default();
    }
    match fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents).unwrap_or_default(),
        Err(_) => HuntConfig::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_preserved() {
        let c = HuntConfig::default();
        assert_eq!(c.target_channel, "1");
        assert_eq!(c.idle_interval_secs, 30);
        assert_eq!(c.channel_modal_brightness, 150.0);
        assert_eq!(c.panel_brightness, 160.0);
        assert_eq!(c.minimap_brightness, 140.0);
        assert_eq!(c.loading_brightness, 40.0);
        assert_eq!(c.death_brightness, 80.0);
        assert_eq!(c.arrival_diff_threshold_pct, 2.0);
        assert_eq!(c.pixel_diff_level, 10);
        assert_eq!(c.fighting_timeout_secs, 90);
        assert_eq!(c.arrival_max_wait_secs, 120);
    }

    #[test]
    fn test_arrival_required_samples() {
        let c = HuntConfig::default();
        // 5000ms stability at 1500ms polling = 4 consecutive samples.
        assert_eq!(c.arrival_required_samples(), 4);

        let c = HuntConfig { arrival_stable_ms: 3000, arrival_poll_ms: 1000, ..c };
        assert_eq!(c.arrival_required_samples(), 3);
    }

    #[test]
    fn test_load_missing_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let c = load_config(&dir.path().join("config.json"));
        assert_eq!(c.fighting_timeout_secs, 90);
    }

    #[test]
    fn test_load_partial_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"target_channel": "3", "fighting_timeout_secs": 60}"#).unwrap();
        let c = load_config(&path);
        assert_eq!(c.target_channel, "3");
        assert_eq!(c.fighting_timeout_secs, 60);
        // Untouched fields keep their defaults.
        assert_eq!(c.idle_interval_secs, 30);
    }

    #[test]
    fn test_load_garbage_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "not json").unwrap();
        let c = load_config(&path);
        assert_eq!(c.target_channel, "1");
    }
}
