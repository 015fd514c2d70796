//! Boss Hunt Bot
//!
//! Watches the game window, finds spawned bosses on the boss panel, travels
//! to them, fights, and recovers from death, in a loop, forever. All game
//! truth is inferred from pixels: text recognition, brightness sampling, and
//! frame differencing. Runs headless; control it from the console.

mod catalog;
mod engine;
mod geometry;
mod layout;
mod paths;
mod perception;
mod platform;
mod selection;

use anyhow::Result;
use chrono::Local;
use std::fs::OpenOptions;
use std::io::{BufRead, Write};

use engine::{HuntBot, HuntEvent};

/// Logs a message to both console and log file with timestamp.
pub fn log(msg: &str) {
    let timestamp = Local::now().format("%H:%M:%S%.3f");
    let line = format!("[{}] {}\n", timestamp, msg);
    print!("{}", line);
    let log_path = paths::get_logs_dir().join("rox_hunter.log");
    if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path) {
        let _ = file.write_all(line.as_bytes());
    }
}

fn main() -> Result<()> {
    paths::ensure_directories()?;

    let config = engine::load_config(&paths::get_config_path());
    log(&format!("Target channel: CH {}", config.target_channel));

    let (mut bot, events) = HuntBot::new(config);

    // --major / --minor replace the persisted selection before starting.
    if let Some((majors, minors)) = parse_selection_args(&std::env::args().collect::<Vec<_>>()) {
        for name in majors.iter().chain(minors.iter()) {
            if !catalog::is_known_boss(name) {
                log(&format!("Warning: '{}' is not in the boss catalog", name));
            }
        }
        bot.update_selection(majors, minors)?;
        log("Boss selection updated.");
    }

    let screen = platform::native_screen()?;
    bot.start(screen)?;
    log("Hunt running. Commands: 'status', 'q' to quit.");

    let drain = std::thread::spawn(move || {
        for event in events {
            match event {
                HuntEvent::Log { message, .. } => log(&message),
                HuntEvent::StateChanged { state, .. } => log(&format!("State -> {}", state)),
            }
        }
    });

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line.unwrap_or_default();
        match line.trim() {
            "q" | "quit" | "exit" => break,
            "status" | "s" => log(&bot.snapshot().summary()),
            "" => {}
            other => log(&format!("Unknown command: '{}'", other)),
        }
    }

    log("Stopping hunt...");
    bot.stop();
    drop(bot); // Closes the event stream so the drain thread exits.
    let _ = drain.join();
    log("Done.");
    Ok(())
}

/// Parses `--major a,b --minor c` into selection lists. `None` when neither
/// flag is present (keep the persisted selection).
fn parse_selection_args(args: &[String]) -> Option<(Vec<String>, Vec<String>)> {
    fn list_after(args: &[String], flag: &str) -> Option<Vec<String>> {
        let idx = args.iter().position(|a| a == flag)?;
        let value = args.get(idx + 1)?;
        Some(
            value
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    let majors = list_after(args, "--major");
    let minors = list_after(args, "--minor");
    if majors.is_none() && minors.is_none() {
        return None;
    }
    Some((majors.unwrap_or_default(), minors.unwrap_or_default()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_selection_args() {
        assert_eq!(parse_selection_args(&args(&["bot"])), None);

        let (majors, minors) =
            parse_selection_args(&args(&["bot", "--major", "Eddga,Maya"])).unwrap();
        assert_eq!(majors, vec!["Eddga", "Maya"]);
        assert!(minors.is_empty());

        let (majors, minors) =
            parse_selection_args(&args(&["bot", "--major", "Eddga", "--minor", "Toad, Angeling"]))
                .unwrap();
        assert_eq!(majors, vec!["Eddga"]);
        assert_eq!(minors, vec!["Toad", "Angeling"]);
    }

    #[test]
    fn test_parse_selection_args_dangling_flag() {
        assert_eq!(parse_selection_args(&args(&["bot", "--major"])), None);
    }
}
