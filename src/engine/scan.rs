//! Panel row and monster-list text classification.
//!
//! Rows are recognized individually (never the whole list at once) so a boss
//! name can't be attributed to a neighboring row's status text; this module
//! only interprets the text of one row at a time.

use anyhow::Result;
use regex::Regex;

/// Status markers that mean a boss row shows an active spawn. OCR sometimes
/// merges "in the battle" into one token, hence the third form.
const SPAWN_MARKERS: [&str; 3] = ["appeared", "battle", "inthebattle"];

/// Monster dropdown entries that must never be clicked.
const MONSTER_BLACKLIST: [&str; 3] = ["all monsters", "all monster", "tüm canavarlar"];

/// What a single panel row tells us.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowReading {
    /// A selected boss with an active-spawn marker on the same row.
    Spawned { boss: String },
    /// A selected boss with a respawn countdown on the row.
    Timer { boss: String, timer: String },
    /// Nothing usable for our selection.
    Nothing,
}

/// Classifies one row of the boss panel against the selected boss names.
///
/// The spawn marker must co-occur with the name in this row's own text. A
/// row naming a selected boss without a marker contributes its countdown
/// timer when one parses; a row with neither is `Nothing`, never an empty
/// timer; failed parses must not blank previously recorded timers.
pub fn classify_row(row_text: &str, targets: &[String]) -> Result<RowReading> {
    let row_lower = row_text.to_lowercase();

    for boss in targets {
        if !row_lower.contains(&boss.to_lowercase()) {
            continue;
        }
        if SPAWN_MARKERS.iter().any(|m| row_lower.contains(m)) {
            return Ok(RowReading::Spawned { boss: boss.clone() });
        }
        if let Some(timer) = find_timer(row_text)? {
            return Ok(RowReading::Timer { boss: boss.clone(), timer });
        }
    }

    Ok(RowReading::Nothing)
}

/// Extracts an `H:MM:SS` countdown from row text, if present.
pub fn find_timer(text: &str) -> Result<Option<String>> {
    let re = Regex::new(r"(\d{1,2}:\d{2}:\d{2})")?;
    Ok(re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string()))
}

/// True for "select all" style dropdown entries that are never clicked.
pub fn is_blacklisted_entry(row_text: &str) -> bool {
    let row_lower = row_text.to_lowercase();
    MONSTER_BLACKLIST.iter().any(|skip| row_lower.contains(skip))
}

/// True when a monster dropdown row names the target boss: either the whole
/// name appears as a substring, or every word of the name appears somewhere
/// in the row (recognition likes to reorder/respace multi-word names).
pub fn matches_monster_row(row_text: &str, boss: &str) -> bool {
    let row_lower = row_text.to_lowercase();
    let boss_lower = boss.to_lowercase();
    if boss_lower.is_empty() {
        return false;
    }
    if row_lower.contains(&boss_lower) {
        return true;
    }
    let mut words = boss_lower.split_whitespace().peekable();
    words.peek().is_some() && boss_lower.split_whitespace().all(|w| row_lower.contains(w))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn targets(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify_spawned() {
        let t = targets(&["Eddga"]);
        assert_eq!(
            classify_row("Eddga Appeared", &t).unwrap(),
            RowReading::Spawned { boss: "Eddga".to_string() }
        );
        assert_eq!(
            classify_row("eddga InTheBattle", &t).unwrap(),
            RowReading::Spawned { boss: "Eddga".to_string() }
        );
    }

    #[test]
    fn test_classify_marker_without_name_is_nothing() {
        // The marker must co-occur with a selected name on the same row.
        let t = targets(&["Eddga"]);
        assert_eq!(classify_row("Phreeoni Appeared", &t).unwrap(), RowReading::Nothing);
    }

    #[test]
    fn test_classify_timer() {
        let t = targets(&["Maya"]);
        assert_eq!(
            classify_row("Maya 1:23:45", &t).unwrap(),
            RowReading::Timer { boss: "Maya".to_string(), timer: "1:23:45".to_string() }
        );
    }

    #[test]
    fn test_classify_name_without_timer_or_marker() {
        // Garbled status: the name matched but nothing parsed. Must be
        // Nothing, not a blank timer.
        let t = targets(&["Maya"]);
        assert_eq!(classify_row("Maya xx;yy;zz", &t).unwrap(), RowReading::Nothing);
    }

    #[test]
    fn test_classify_unselected_boss_ignored() {
        let t = targets(&["Eddga"]);
        assert_eq!(classify_row("Maya 1:23:45", &t).unwrap(), RowReading::Nothing);
        assert_eq!(classify_row("", &t).unwrap(), RowReading::Nothing);
    }

    #[test]
    fn test_find_timer() {
        assert_eq!(find_timer("respawn in 0:05:30").unwrap().as_deref(), Some("0:05:30"));
        assert_eq!(find_timer("12:34:56").unwrap().as_deref(), Some("12:34:56"));
        assert_eq!(find_timer("no timer here").unwrap(), None);
        assert_eq!(find_timer("12:34").unwrap(), None);
    }

    #[test]
    fn test_blacklist() {
        assert!(is_blacklisted_entry("All Monsters"));
        assert!(is_blacklisted_entry("  all monster  "));
        assert!(is_blacklisted_entry("Tüm Canavarlar"));
        assert!(!is_blacklisted_entry("Eddga"));
    }

    #[test]
    fn test_matches_monster_row() {
        assert!(matches_monster_row("Eddga", "Eddga"));
        assert!(matches_monster_row("eddga lv99", "Eddga"));
        // Token-subset match for multi-word names.
        assert!(matches_monster_row("Dragon fly (rare)", "Dragon Fly"));
        assert!(!matches_monster_row("Dragon", "Dragon Fly"));
        assert!(!matches_monster_row("", "Eddga"));
        assert!(!matches_monster_row("Eddga", ""));
    }
}
