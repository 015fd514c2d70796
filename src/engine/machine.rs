//! The hunt state machine.
//!
//! One `tick()` per loop iteration: re-resolve the game window, recompute
//! anchor positions, check the loading-screen interrupt, then run the
//! handler for the current state. Handlers click, wait, and perceive
//! synchronously; the whole machine is cooperative and single-threaded.
//!
//! Every visual conclusion here is drawn from noisy evidence, so handlers
//! verify what their clicks were supposed to cause (panel opened, modal
//! opened, minimap closed) and retry a bounded number of times before
//! proceeding degraded.

use anyhow::Result;
use image::GrayImage;
use rand::Rng;
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::catalog;
use crate::geometry::{GameWindow, Point, Rect};
use crate::layout::{BossLayout, HuntAnchors};
use crate::perception::{diff_percent, Screen, StabilityTracker};

use super::channel::parse_channel;
use super::config::HuntConfig;
use super::events::HuntEvent;
use super::scan::{self, RowReading};
use super::state::{HuntState, SharedStatus};

pub struct HuntMachine {
    screen: Box<dyn Screen>,
    config: HuntConfig,
    layout: BossLayout,
    shared: Arc<SharedStatus>,
    events: Sender<HuntEvent>,

    state: HuntState,
    /// At most one target at a time; cleared on every return to IDLE.
    target_boss: Option<String>,
    /// Derived from the catalog when a target is found, never set directly.
    target_is_major: bool,
    /// Visible row (0-based) the target was found on.
    found_row: u32,
    /// Which panel tab the row scan is reading.
    checking_major_tab: bool,
    fighting_start: Option<Instant>,
    current_channel: String,
}

impl HuntMachine {
    pub fn new(
        screen: Box<dyn Screen>,
        config: HuntConfig,
        layout: BossLayout,
        shared: Arc<SharedStatus>,
        events: Sender<HuntEvent>,
    ) -> Self {
        Self {
            screen,
            config,
            layout,
            shared,
            events,
            state: HuntState::Idle,
            target_boss: None,
            target_is_major: false,
            found_row: 0,
            checking_major_tab: true,
            fighting_start: None,
            current_channel: "?".to_string(),
        }
    }

    pub fn state(&self) -> HuntState {
        self.state
    }

    pub fn target_boss(&self) -> Option<&str> {
        self.target_boss.as_deref()
    }

    /// Advances the machine by one tick.
    ///
    /// Errors propagate to the outer loop, which logs, backs off, and leaves
    /// the state unchanged so the same handler retries next tick.
    pub fn tick(&mut self) -> Result<()> {
        // Window first: everything below depends on fresh absolute positions.
        let Some(win) = self.screen.resolve_window() else {
            self.log("Game window not found, retrying...");
            self.sleep(Duration::from_secs(self.config.window_retry_secs));
            return Ok(());
        };
        let anchors = self.layout.resolve(&win);

        // Global interrupt: a loading screen means a map/channel change is
        // in progress, which invalidates any channel assumption.
        if self.loading_screen_visible(&win)? {
            self.wait_for_loading_end(&win)?;
            self.set_state(HuntState::SwitchChannel);
            return Ok(());
        }

        match self.state {
            HuntState::Idle => self.handle_idle(),
            HuntState::SwitchChannel => self.handle_switch_channel(&anchors, &win),
            HuntState::OpenPanel => self.handle_open_panel(&anchors),
            HuntState::CheckStatus => self.handle_check_status(&anchors),
            HuntState::ClickGo => self.handle_click_go(&anchors, &win),
            HuntState::StartAttack => self.handle_start_attack(&anchors),
            HuntState::Fighting => self.handle_fighting(&anchors, &win),
            HuntState::Dead => self.handle_dead(),
            HuntState::Resurrect => self.handle_resurrect(&anchors, &win),
            HuntState::ReNavigate => self.handle_re_navigate(),
        }
    }

    // ─── State handlers ───

    /// Wait out the idle interval, then go verify the channel.
    fn handle_idle(&mut self) -> Result<()> {
        self.log("Waiting for boss spawn...");
        if !self.sleep(Duration::from_secs(self.config.idle_interval_secs)) {
            return Ok(());
        }
        self.set_state(HuntState::SwitchChannel);
        Ok(())
    }

    fn handle_switch_channel(&mut self, a: &HuntAnchors, win: &GameWindow) -> Result<()> {
        self.ensure_target_channel(a, win)?;
        self.set_state(HuntState::OpenPanel);
        Ok(())
    }

    /// Open the boss panel, pick a tab (majors first), normalize the scroll.
    fn handle_open_panel(&mut self, a: &HuntAnchors) -> Result<()> {
        let selection = self.shared.selection();

        let mut opened = false;
        for attempt in 1..=self.config.max_open_retries {
            self.screen.click(a.panel_button, 3);
            self.settle(self.config.panel_settle_ms);
            if self.region_brighter(a.panel_close_region(), self.config.panel_brightness)? {
                opened = true;
                break;
            }
            self.log(format!(
                "Panel didn't open (attempt {}/{}), retrying...",
                attempt, self.config.max_open_retries
            ));
            self.settle(self.config.short_settle_ms);
        }
        if !opened {
            self.log("Failed to open boss panel after retries. Back to IDLE.");
            self.enter_idle();
            return Ok(());
        }

        if !selection.majors.is_empty() {
            self.screen.click(a.major_tab, 3);
            self.checking_major_tab = true;
        } else if !selection.minors.is_empty() {
            self.screen.click(a.minor_tab, 3);
            self.checking_major_tab = false;
        } else {
            self.close_panel(a);
            self.enter_idle();
            return Ok(());
        }
        self.settle(self.config.panel_settle_ms);

        self.scroll_to_top(a);
        self.set_state(HuntState::CheckStatus);
        Ok(())
    }

    /// Scan up to 2 pages x 4 rows, one OCR call per row so a boss name
    /// can't be paired with a neighboring row's status.
    fn handle_check_status(&mut self, a: &HuntAnchors) -> Result<()> {
        let selection = self.shared.selection();
        let targets = if self.checking_major_tab {
            selection.majors.clone()
        } else {
            selection.minors.clone()
        };

        let mut found: Option<(String, u32, u32)> = None;
        'pages: for page in 0..2u32 {
            for row in 0..a.visible_rows {
                let text = self.screen.recognize_text(a.row_region(row))?;
                match scan::classify_row(&text, &targets)? {
                    RowReading::Spawned { boss } => {
                        found = Some((boss, row, page));
                        break 'pages;
                    }
                    RowReading::Timer { boss, timer } => {
                        self.shared.set_timer(&boss, &timer);
                    }
                    RowReading::Nothing => {}
                }
            }
            if page == 0 {
                self.scroll_down(a);
                self.settle(self.config.short_settle_ms);
            }
        }

        if let Some((boss, row, page)) = found {
            self.found_row = row;
            self.target_is_major = catalog::is_major(&boss);
            self.shared.set_target(Some(&boss));
            let category = if self.target_is_major { "major" } else { "minor" };
            self.log(format!(
                "{} appeared! ({} boss, row {}, page {})",
                boss,
                category,
                row + 1,
                page + 1
            ));
            self.target_boss = Some(boss);
            self.set_state(HuntState::ClickGo);
            return Ok(());
        }

        // Normalize before switching tabs or closing.
        self.scroll_to_top(a);
        self.settle(self.config.short_settle_ms);

        if self.checking_major_tab && !selection.minors.is_empty() {
            self.screen.click(a.minor_tab, 3);
            self.checking_major_tab = false;
            self.settle(self.config.panel_settle_ms);
            self.scroll_to_top(a);
            // Re-enters CHECK_STATUS on the next tick for the minor tab.
            return Ok(());
        }

        self.close_panel(a);
        self.log("No bosses spawned. Checking again later.");
        self.enter_idle();
        Ok(())
    }

    /// Click Go on the found row, ride out the loading screen, re-verify the
    /// channel, and watch the minimap until the character stops moving.
    fn handle_click_go(&mut self, a: &HuntAnchors, win: &GameWindow) -> Result<()> {
        let Some(target) = self.target_boss.clone() else {
            self.enter_idle();
            return Ok(());
        };

        // The Go button was calibrated on one particular row; shift it to
        // the row the target was found on.
        let row_h = a.row_height.max(1);
        let calib_row = ((a.go_button.y - a.first_row.y) as f32 / row_h as f32).round() as i32;
        let go_y = a.go_button.y + (self.found_row as i32 - calib_row) * row_h;

        self.log(format!("Clicking Go for {} (row {})...", target, self.found_row + 1));
        self.screen.click(Point::new(a.go_button.x, go_y), 2);
        self.settle(self.config.modal_settle_ms);

        // Go closes the panel on success. If the scroll jumped and the click
        // missed, the panel is still open and must be closed by hand.
        if self.region_brighter(a.panel_close_region(), self.config.panel_brightness)? {
            self.log("Panel still open after Go click, closing manually...");
            self.close_panel(a);
            self.settle(self.config.short_settle_ms);
        }

        self.log("Waiting for loading screen...");
        self.sleep(Duration::from_millis(self.config.modal_settle_ms));

        let mut loading_detected = false;
        let watch = Duration::from_secs(self.config.loading_start_window_secs);
        let start = Instant::now();
        while !self.stopped() && start.elapsed() < watch {
            if self.loading_screen_visible(win)? {
                loading_detected = true;
                break;
            }
            if !self.sleep(Duration::from_secs(1)) {
                break;
            }
        }
        if loading_detected {
            self.wait_for_loading_end(win)?;
        } else {
            self.log("No loading screen detected, may be same map.");
            self.sleep(Duration::from_secs(3));
        }
        if self.stopped() {
            return Ok(());
        }

        // A map change may have landed us on a different channel.
        self.ensure_target_channel(a, win)?;
        if self.stopped() {
            return Ok(());
        }

        self.wait_for_arrival(a)?;
        if self.stopped() {
            return Ok(());
        }

        self.fighting_start = Some(Instant::now());
        self.set_state(HuntState::StartAttack);
        Ok(())
    }

    /// Engage auto-attack and pick the target from the monster dropdown.
    fn handle_start_attack(&mut self, a: &HuntAnchors) -> Result<()> {
        // The minimap blocks the auto-attack toggle when open.
        self.close_minimap_if_open(a)?;

        self.log("Enabling auto-attack...");
        self.screen.click(a.auto_attack_toggle, 3);
        self.settle(self.config.panel_settle_ms);

        self.select_monster_from_list(a)?;

        if let Some(target) = &self.target_boss {
            self.log(format!("Attacking {}!", target));
        }
        self.fighting_start = Some(Instant::now());
        self.set_state(HuntState::Fighting);
        Ok(())
    }

    /// Poll for a death signal; give up after the fighting timeout on the
    /// assumption the boss is already dead or gone.
    fn handle_fighting(&mut self, a: &HuntAnchors, win: &GameWindow) -> Result<()> {
        if self.detect_death(a, win)? {
            let deaths = self.shared.add_death();
            self.log(format!("Died! (death #{})", deaths));
            self.set_state(HuntState::Dead);
            return Ok(());
        }

        let elapsed = self.fighting_start.map(|t| t.elapsed()).unwrap_or_default();
        if elapsed > Duration::from_secs(self.config.fighting_timeout_secs) {
            self.log(format!(
                "Fighting timeout ({}s). Boss may be dead. Re-checking panel...",
                self.config.fighting_timeout_secs
            ));
            self.enter_idle();
            return Ok(());
        }

        self.sleep(Duration::from_millis(self.config.fighting_poll_ms));
        Ok(())
    }

    /// Let the respawn UI settle before clicking anything.
    fn handle_dead(&mut self) -> Result<()> {
        self.settle(self.config.dead_delay_ms);
        self.set_state(HuntState::Resurrect);
        Ok(())
    }

    fn handle_resurrect(&mut self, a: &HuntAnchors, win: &GameWindow) -> Result<()> {
        self.log("Clicking resurrect...");
        self.screen.click(a.resurrect_button, 4);
        self.settle(self.config.resurrect_settle_ms);

        if self.detect_death(a, win)? {
            self.log("Resurrect failed, retrying...");
            self.screen.click(a.resurrect_button, 4);
            self.settle(self.config.resurrect_settle_ms);
        }

        self.log("Resurrected! Re-navigating to boss...");
        self.set_state(HuntState::ReNavigate);
        Ok(())
    }

    fn handle_re_navigate(&mut self) -> Result<()> {
        if self.target_boss.is_none() {
            self.enter_idle();
        } else {
            // Re-open the panel and Go to the same target.
            self.set_state(HuntState::OpenPanel);
        }
        Ok(())
    }

    // ─── Channel helpers ───

    /// Verifies the current channel and switches when needed. Idempotent:
    /// already on the target channel means zero clicks.
    fn ensure_target_channel(&mut self, a: &HuntAnchors, win: &GameWindow) -> Result<()> {
        let raw = self.screen.recognize_text(a.channel_ocr_region())?;
        self.log(format!("Channel OCR: '{}'", raw.trim()));
        let detected = parse_channel(&raw)?;
        let target = self.config.target_channel.clone();

        if detected.as_deref() == Some(target.as_str()) {
            self.set_current_channel(&target);
            self.log(format!("Already on {}.", self.current_channel));
            return Ok(());
        }

        self.log(format!(
            "On CH {}, switching to CH {}...",
            detected.as_deref().unwrap_or("?"),
            target
        ));

        if !self.open_channel_modal(a)? {
            self.log("Failed to open channel selector. Continuing anyway.");
            return Ok(());
        }

        self.log(format!("Selecting CH {}...", target));
        self.screen.click(a.channel_target_button, 2);
        self.settle(self.config.modal_settle_ms);

        // Switching channels can trigger its own loading screen.
        if self.loading_screen_visible(win)? {
            self.wait_for_loading_end(win)?;
        }

        self.set_current_channel(&target);
        self.log(format!("Switched to {}.", self.current_channel));
        Ok(())
    }

    /// Clicks the channel button until the popup verifiably opens.
    /// Sometimes the click just doesn't register.
    fn open_channel_modal(&mut self, a: &HuntAnchors) -> Result<bool> {
        for attempt in 1..=self.config.max_open_retries {
            self.log(format!("Opening channel selector (attempt {})...", attempt));
            self.screen.click(a.channel_button, 0);
            self.settle(self.config.modal_settle_ms);

            if self.region_brighter(a.channel_modal_region(), self.config.channel_modal_brightness)? {
                return Ok(true);
            }
            self.log("Channel selector didn't open, retrying...");
            self.settle(self.config.short_settle_ms);
        }
        Ok(false)
    }

    fn set_current_channel(&mut self, number: &str) {
        self.current_channel = format!("CH {}", number);
        self.shared.set_channel(&self.current_channel);
    }

    // ─── Loading screen ───

    /// Loading screens are near-black and cover the whole client.
    fn loading_screen_visible(&self, win: &GameWindow) -> Result<bool> {
        Ok(!self.region_brighter(win.center_region(), self.config.loading_brightness)?)
    }

    /// Blocks until brightness returns, bounded; proceeds regardless after
    /// the ceiling so a stuck detection can't stall the hunt forever.
    fn wait_for_loading_end(&mut self, win: &GameWindow) -> Result<()> {
        self.log("Loading screen detected. Waiting...");
        let limit = Duration::from_secs(self.config.loading_wait_secs);
        let start = Instant::now();
        while !self.stopped() && start.elapsed() < limit {
            if !self.sleep(Duration::from_secs(1)) {
                return Ok(());
            }
            if !self.loading_screen_visible(win)? {
                // Screen is back; give the UI a moment to settle.
                self.settle(self.config.modal_settle_ms);
                self.log("Loading complete. Re-checking channel...");
                return Ok(());
            }
        }
        if !self.stopped() {
            self.log(format!(
                "Loading screen timeout ({}s). Proceeding...",
                self.config.loading_wait_secs
            ));
        }
        Ok(())
    }

    // ─── Navigation ───

    /// Watches the minimap until the view stops changing: the character has
    /// arrived once enough consecutive snapshots differ by less than the
    /// threshold. Bounded; a timeout proceeds anyway.
    fn wait_for_arrival(&mut self, a: &HuntAnchors) -> Result<()> {
        let target = self.target_boss.clone().unwrap_or_default();
        let region = a.minimap_region();

        self.log("Opening minimap to track movement...");
        if !self.region_brighter(region, self.config.minimap_brightness)? {
            self.screen.click(a.minimap_button(), 1);
            self.settle(self.config.panel_settle_ms);
        }

        let mut tracker = StabilityTracker::new(
            self.config.arrival_diff_threshold_pct,
            self.config.arrival_required_samples(),
        );
        let mut last: Option<GrayImage> = None;
        let start = Instant::now();
        let max_wait = Duration::from_secs(self.config.arrival_max_wait_secs);
        let mut arrived = false;

        self.log(format!("Walking to {}... watching minimap", target));
        while !self.stopped() && start.elapsed() < max_wait {
            let frame = self.screen.capture_region(region)?;
            if let Some(prev) = &last {
                let pct = diff_percent(prev, &frame, self.config.pixel_diff_level);
                if tracker.observe(pct) {
                    self.log(format!("Arrived at {}! (minimap stable)", target));
                    arrived = true;
                    break;
                }
                if pct > self.config.arrival_diff_threshold_pct {
                    self.log(format!(
                        "Moving... ({:.0}s, diff={:.1}%)",
                        start.elapsed().as_secs_f32(),
                        pct
                    ));
                }
            }
            last = Some(frame);
            if !self.sleep(Duration::from_millis(self.config.arrival_poll_ms)) {
                break;
            }
        }
        if !arrived && !self.stopped() {
            self.log(format!(
                "Navigation timeout ({}s). Proceeding anyway...",
                self.config.arrival_max_wait_secs
            ));
        }

        self.log("Closing minimap...");
        self.screen.click(a.minimap_button(), 1);
        self.settle(self.config.short_settle_ms);
        if self.region_brighter(region, self.config.minimap_brightness)? {
            self.screen.click(a.minimap_button(), 0);
            self.settle(self.config.short_settle_ms);
        }
        Ok(())
    }

    /// Closes the minimap only when brightness says it is open; toggling
    /// blindly would open it instead.
    fn close_minimap_if_open(&mut self, a: &HuntAnchors) -> Result<()> {
        if !self.region_brighter(a.minimap_region(), self.config.minimap_brightness)? {
            return Ok(());
        }
        self.log("Minimap open, closing it...");
        self.screen.click(a.minimap_button(), 1);
        self.settle(self.config.short_settle_ms);

        if self.region_brighter(a.minimap_region(), self.config.minimap_brightness)? {
            self.log("Minimap still open, trying again...");
            self.screen.click(a.minimap_button(), 0);
            self.settle(self.config.short_settle_ms);
        }
        Ok(())
    }

    // ─── Monster list ───

    /// Scans the auto-attack dropdown row by row for the target boss and
    /// clicks its entry. "Select all" entries are never clicked; no match
    /// means no click at all: attacking the wrong thing is worse than not
    /// attacking.
    fn select_monster_from_list(&mut self, a: &HuntAnchors) -> Result<()> {
        let Some(target) = self.target_boss.clone() else {
            return Ok(());
        };
        let first = a.monster_list_first;
        let entry_h = self.config.monster_entry_height;

        for row in 0..self.config.monster_max_entries {
            let rect = Rect::new(
                first.x - 100,
                first.y + row as i32 * entry_h - 5,
                self.config.monster_entry_width,
                entry_h,
            );
            let text = self.screen.recognize_text(rect)?;
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            if scan::is_blacklisted_entry(trimmed) {
                self.log(format!("Skipping '{}' (row {})", trimmed, row + 1));
                continue;
            }
            if scan::matches_monster_row(trimmed, &target) {
                self.log(format!("Found {} at monster list row {}", target, row + 1));
                let click_y = first.y + row as i32 * entry_h + entry_h / 2;
                self.screen.click(Point::new(first.x, click_y), 3);
                self.settle(self.config.short_settle_ms);
                return Ok(());
            }
        }

        self.log(format!("'{}' not found in monster list. Not attacking.", target));
        self.settle(self.config.short_settle_ms);
        Ok(())
    }

    // ─── Death detection ───

    /// Death shows a resurrect button over a darkened screen; either signal
    /// counts.
    fn detect_death(&self, a: &HuntAnchors, win: &GameWindow) -> Result<bool> {
        let text = self.screen.recognize_text(a.resurrect_region())?;
        let lower = text.to_lowercase();
        if lower.contains("resurrect") || lower.contains("revive") {
            return Ok(true);
        }
        if !self.region_brighter(win.center_region(), self.config.death_brightness)? {
            return Ok(true);
        }
        Ok(false)
    }

    // ─── Scrolling ───

    /// Drag down generously twice, anchored on a visible card, so the list
    /// is guaranteed back at its top end-stop.
    fn scroll_to_top(&self, a: &HuntAnchors) {
        let from = a.row_drag_point(1);
        self.screen.drag_vertical(from, a.scroll_distance);
        self.settle(self.config.short_settle_ms);
        self.screen.drag_vertical(from, a.scroll_distance);
        self.settle(self.config.short_settle_ms);
    }

    /// Drag up on a card to reveal the next page of rows.
    fn scroll_down(&self, a: &HuntAnchors) {
        let from = a.row_drag_point(2);
        self.screen.drag_vertical(from, -a.scroll_distance);
    }

    fn close_panel(&self, a: &HuntAnchors) {
        self.screen.click(a.panel_close, 3);
        self.settle(self.config.short_settle_ms);
    }

    // ─── Plumbing ───

    fn region_brighter(&self, region: Rect, threshold: f32) -> Result<bool> {
        Ok(self.screen.average_brightness(region)? > threshold)
    }

    fn set_state(&mut self, state: HuntState) {
        if self.state != state {
            self.state = state;
            self.shared.set_state(state);
            let _ = self.events.send(HuntEvent::state_changed(state));
        }
    }

    /// Returning to IDLE always drops the target.
    fn enter_idle(&mut self) {
        self.target_boss = None;
        self.target_is_major = false;
        self.shared.set_target(None);
        self.set_state(HuntState::Idle);
    }

    fn stopped(&self) -> bool {
        self.shared.stop_requested()
    }

    /// Sleeps in increments of at most one second, checking the stop flag
    /// between increments so shutdown latency stays bounded. Returns false
    /// when interrupted by a stop request.
    fn sleep(&self, total: Duration) -> bool {
        let mut remaining = total;
        while remaining > Duration::ZERO {
            if self.stopped() {
                return false;
            }
            let chunk = remaining.min(Duration::from_secs(1));
            std::thread::sleep(chunk);
            remaining = remaining.saturating_sub(chunk);
        }
        !self.stopped()
    }

    /// Settle delay with randomized jitter so action pacing never looks
    /// fully deterministic.
    fn settle(&self, ms: u64) {
        if ms == 0 {
            return;
        }
        let jitter = rand::thread_rng().gen_range(0..=ms / 4);
        self.sleep(Duration::from_millis(ms + jitter));
    }

    fn log(&self, message: impl Into<String>) {
        let _ = self.events.send(HuntEvent::log(message));
    }
}
