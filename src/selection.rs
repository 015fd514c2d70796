//! Operator boss selection, persisted alongside last-seen spawn timers.
//!
//! Loaded at start and replaced wholesale through the explicit update entry
//! point; the engine never edits the file incrementally.

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// The subset of the boss catalog the operator wants pursued.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct BossSelection {
    /// Selected major bosses.
    #[serde(default)]
    pub majors: Vec<String>,
    /// Selected minor bosses.
    #[serde(default)]
    pub minors: Vec<String>,
    /// Last-seen countdown timer text per boss, carried across sessions.
    #[serde(default)]
    pub timers: HashMap<String, String>,
}

impl BossSelection {
    /// True when neither category has a selection; the engine refuses to
    /// start in that case.
    pub fn is_empty(&self) -> bool {
        self.majors.is_empty() && self.minors.is_empty()
    }
}

/// Loads the selection from `path`, defaulting to empty when absent.
pub fn load_selection(path: &Path) -> Result<BossSelection> {
    if !path.exists() {
        return Ok(BossSelection::default());
    }
    let contents = fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read {}: {}", path.display(), e))?;
    serde_json::from_str(&contents)
        .map_err(|e| anyhow!("Failed to parse {}: {}", path.display(), e))
}

/// Saves the selection to `path`.
pub fn save_selection(path: &Path, selection: &BossSelection) -> Result<()> {
    let contents = serde_json::to_string_pretty(selection)?;
    fs::write(path, contents)
        .map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))?;
    Ok(())
}
