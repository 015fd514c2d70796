//! Hunt lifecycle: owns the worker thread running the state machine.
//!
//! `HuntBot` validates preconditions (selection, calibration, a visible game
//! window), spawns the worker, and exposes stop/snapshot/update entry points
//! to the owning thread. Errors inside a tick are reported as events and
//! retried after a backoff with the state preserved; they never kill the
//! worker.

use anyhow::{anyhow, Result};
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crate::layout;
use crate::paths;
use crate::perception::Screen;
use crate::selection::{self, BossSelection};

use super::config::HuntConfig;
use super::events::{event_channel, HuntEvent};
use super::machine::HuntMachine;
use super::state::{HuntSnapshot, SharedStatus};

/// Pause after a tick error before retrying the same state.
const ERROR_BACKOFF_SECS: u64 = 3;

pub struct HuntBot {
    config: HuntConfig,
    shared: Arc<SharedStatus>,
    events: Sender<HuntEvent>,
    worker: Option<JoinHandle<()>>,
    layout_path: PathBuf,
    selection_path: PathBuf,
}

impl HuntBot {
    /// Creates a bot using the standard file locations next to the
    /// executable. Returns the receiving end of the event stream.
    pub fn new(config: HuntConfig) -> (Self, Receiver<HuntEvent>) {
        Self::with_paths(config, paths::get_layout_path(), paths::get_selection_path())
    }

    pub fn with_paths(
        config: HuntConfig,
        layout_path: PathBuf,
        selection_path: PathBuf,
    ) -> (Self, Receiver<HuntEvent>) {
        let (tx, rx) = event_channel();
        let bot = Self {
            config,
            shared: Arc::new(SharedStatus::new(BossSelection::default())),
            events: tx,
            worker: None,
            layout_path,
            selection_path,
        };
        (bot, rx)
    }

    /// Starts the hunt worker. Refuses to start without a boss selection,
    /// without calibration, or when the game window cannot be found.
    pub fn start(&mut self, screen: Box<dyn Screen>) -> Result<()> {
        if self.shared.is_running() {
            return Err(anyhow!("Hunt is already running"));
        }

        let selection = selection::load_selection(&self.selection_path)?;
        if selection.is_empty() {
            return Err(anyhow!(
                "No bosses selected. Add bosses to {} first.",
                self.selection_path.display()
            ));
        }
        let layout = layout::load_layout(&self.layout_path)?.ok_or_else(|| {
            anyhow!(
                "Calibration not found at {}. Capture the layout first.",
                self.layout_path.display()
            )
        })?;
        if screen.resolve_window().is_none() {
            return Err(anyhow!("Game window not found. Is the client running?"));
        }

        self.shared.install_selection(selection);
        self.shared.clear_stop();
        self.shared.set_running(true);

        let shared = self.shared.clone();
        let events = self.events.clone();
        let config = self.config.clone();
        let worker = std::thread::spawn(move || {
            let mut machine =
                HuntMachine::new(screen, config, layout, shared.clone(), events.clone());
            let _ = events.send(HuntEvent::log("Hunt started"));

            while !shared.stop_requested() {
                if let Err(e) = machine.tick() {
                    // State is preserved; the same handler retries after the
                    // backoff.
                    let _ = events.send(HuntEvent::log(format!(
                        "Error in {}: {}. Retrying...",
                        machine.state(),
                        e
                    )));
                    std::thread::sleep(Duration::from_secs(ERROR_BACKOFF_SECS));
                }
            }

            shared.set_running(false);
            let _ = events.send(HuntEvent::log("Hunt stopped"));
        });
        self.worker = Some(worker);
        Ok(())
    }

    /// Requests a stop and waits for the worker to finish its current
    /// operation. Bounded latency: all engine waits poll the stop flag.
    pub fn stop(&mut self) {
        self.shared.request_stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
        self.shared.set_running(false);
    }

    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    pub fn snapshot(&self) -> HuntSnapshot {
        self.shared.snapshot()
    }

    /// Replaces the boss selection wholesale and persists it. Observed
    /// timers survive the swap. Takes effect at the next panel pass.
    pub fn update_selection(&self, majors: Vec<String>, minors: Vec<String>) -> Result<()> {
        let replaced = self.shared.replace_selection(majors, minors);
        selection::save_selection(&self.selection_path, &replaced)
    }
}

impl Drop for HuntBot {
    fn drop(&mut self) {
        self.stop();
    }
}
