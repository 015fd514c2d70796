//! Hunt states and the observable status surface.
//!
//! The state machine is the only writer; observers (a status display, the
//! main thread) read stale-tolerant snapshots without coordinating with the
//! worker.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use crate::selection::BossSelection;

/// Hunt state machine states. There is no terminal state; the machine runs
/// until stopped externally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HuntState {
    /// Waiting out the idle interval before the next panel check.
    Idle,
    /// Verifying / switching to the target channel.
    SwitchChannel,
    /// Opening the boss panel and selecting a tab.
    OpenPanel,
    /// Scanning panel rows for a spawned boss.
    CheckStatus,
    /// Clicking Go on the found row and travelling there.
    ClickGo,
    /// Engaging auto-attack on the target.
    StartAttack,
    /// Fighting; polling for a death signal.
    Fighting,
    /// Death detected; waiting for the respawn UI.
    Dead,
    /// Clicking resurrect.
    Resurrect,
    /// Back from death; heading to the panel again.
    ReNavigate,
}

impl std::fmt::Display for HuntState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            HuntState::Idle => "IDLE",
            HuntState::SwitchChannel => "SWITCH_CHANNEL",
            HuntState::OpenPanel => "OPEN_PANEL",
            HuntState::CheckStatus => "CHECK_STATUS",
            HuntState::ClickGo => "CLICK_GO",
            HuntState::StartAttack => "START_ATTACK",
            HuntState::Fighting => "FIGHTING",
            HuntState::Dead => "DEAD",
            HuntState::Resurrect => "RESURRECT",
            HuntState::ReNavigate => "RE_NAVIGATE",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Default)]
struct StatusInner {
    state_label: String,
    target_boss: Option<String>,
    channel: String,
    timers: HashMap<String, String>,
}

/// Shared status between the worker thread and observers.
///
/// All fields are written by the worker only; observers take snapshots. The
/// selection is the one exception: it is replaced wholesale through the
/// explicit update entry point and read by the worker each panel pass.
pub struct SharedStatus {
    running: AtomicBool,
    stop_requested: AtomicBool,
    deaths: AtomicU32,
    kills: AtomicU32,
    inner: Mutex<StatusInner>,
    selection: Mutex<BossSelection>,
}

impl SharedStatus {
    pub fn new(selection: BossSelection) -> Self {
        Self {
            running: AtomicBool::new(false),
            stop_requested: AtomicBool::new(false),
            deaths: AtomicU32::new(0),
            kills: AtomicU32::new(0),
            inner: Mutex::new(StatusInner {
                state_label: HuntState::Idle.to_string(),
                channel: "?".to_string(),
                timers: selection.timers.clone(),
                ..Default::default()
            }),
            selection: Mutex::new(selection),
        }
    }

    // ─── Worker lifecycle ───

    pub fn set_running(&self, running: bool) {
        self.running.store(running, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::SeqCst);
    }

    pub fn clear_stop(&self) {
        self.stop_requested.store(false, Ordering::SeqCst);
    }

    pub fn stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    // ─── Worker-side writes ───

    pub fn set_state(&self, state: HuntState) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.state_label = state.to_string();
        }
    }

    pub fn set_target(&self, target: Option<&str>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.target_boss = target.map(str::to_string);
        }
    }

    pub fn set_channel(&self, channel: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.channel = channel.to_string();
        }
    }

    pub fn set_timer(&self, boss: &str, timer: &str) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.timers.insert(boss.to_string(), timer.to_string());
        }
    }

    pub fn add_death(&self) -> u32 {
        self.deaths.fetch_add(1, Ordering::SeqCst) + 1
    }

    // ─── Selection ───

    pub fn selection(&self) -> BossSelection {
        self.selection
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    /// Installs a freshly loaded selection, seeding the timer table with the
    /// timers persisted alongside it.
    pub fn install_selection(&self, selection: BossSelection) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.timers.extend(
                selection.timers.iter().map(|(k, v)| (k.clone(), v.clone())),
            );
        }
        if let Ok(mut s) = self.selection.lock() {
            *s = selection;
        }
    }

    /// Wholesale replacement; current timers are folded into the new value
    /// so a selection change never loses observed spawn timers.
    pub fn replace_selection(&self, majors: Vec<String>, minors: Vec<String>) -> BossSelection {
        let timers = self
            .inner
            .lock()
            .map(|i| i.timers.clone())
            .unwrap_or_default();
        let replacement = BossSelection { majors, minors, timers };
        if let Ok(mut s) = self.selection.lock() {
            *s = replacement.clone();
        }
        replacement
    }

    // ─── Observer side ───

    pub fn snapshot(&self) -> HuntSnapshot {
        let (state_label, target_boss, channel, timers) = self
            .inner
            .lock()
            .map(|i| {
                (
                    i.state_label.clone(),
                    i.target_boss.clone(),
                    i.channel.clone(),
                    i.timers.clone(),
                )
            })
            .unwrap_or_default();
        HuntSnapshot {
            running: self.is_running(),
            state_label,
            target_boss,
            channel,
            deaths: self.deaths.load(Ordering::SeqCst),
            kills: self.kills.load(Ordering::SeqCst),
            timers,
        }
    }
}

/// Point-in-time view of the hunt for display purposes.
#[derive(Clone, Debug)]
pub struct HuntSnapshot {
    pub running: bool,
    pub state_label: String,
    pub target_boss: Option<String>,
    pub channel: String,
    pub deaths: u32,
    pub kills: u32,
    pub timers: HashMap<String, String>,
}

impl HuntSnapshot {
    /// One-line status summary for logs or a tray tooltip.
    pub fn summary(&self) -> String {
        format!(
            "{} | target: {} | {} | deaths: {} | kills: {}",
            self.state_label,
            self.target_boss.as_deref().unwrap_or("none"),
            self.channel,
            self.deaths,
            self.kills,
        )
    }
}
