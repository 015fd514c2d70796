//! Channel indicator parsing.
//!
//! The channel button reads like "CH 2", but text recognition reliably
//! misreads the arrow glyph next to the number as a trailing digit `1`:
//! "CH 2" → "CH 21", "CH 10" → "CH 101". The corrected number is the digit
//! run with that trailing `1` stripped.

use anyhow::Result;
use regex::Regex;

/// Extracts the channel number from raw OCR text of the channel indicator.
/// Returns `None` when no "ch <digits>" pattern is present.
pub fn parse_channel(raw: &str) -> Result<Option<String>> {
    let re = Regex::new(r"(?i)ch\s*(\d+)")?;
    Ok(re
        .captures(raw)
        .and_then(|c| c.get(1))
        .map(|m| normalize_digits(m.as_str())))
}

/// Applies the arrow-misread correction: a digit run longer than one that
/// ends in `1` loses the trailing `1`. A lone "1" is a real channel 1.
pub fn normalize_digits(digits: &str) -> String {
    if digits.len() > 1 && digits.ends_with('1') {
        digits[..digits.len() - 1].to_string()
    } else {
        digits.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_strips_arrow_misread() {
        assert_eq!(normalize_digits("21"), "2");
        assert_eq!(normalize_digits("101"), "10");
        assert_eq!(normalize_digits("1"), "1");
        assert_eq!(normalize_digits("11"), "1");
        assert_eq!(normalize_digits("2"), "2");
        assert_eq!(normalize_digits("20"), "20");
    }

    #[test]
    fn test_normalize_all_channels_with_misread() {
        // Any channel 1-20 whose reading picked up the arrow as a trailing
        // "1" must normalize back to the true channel.
        for ch in 1..=20 {
            let misread = format!("{}1", ch);
            assert_eq!(normalize_digits(&misread), ch.to_string(), "channel {}", ch);
        }
    }

    #[test]
    fn test_parse_channel_variants() {
        assert_eq!(parse_channel("CH 21").unwrap().as_deref(), Some("2"));
        assert_eq!(parse_channel("ch101").unwrap().as_deref(), Some("10"));
        assert_eq!(parse_channel("Ch 1").unwrap().as_deref(), Some("1"));
        assert_eq!(parse_channel("  CH  5  ").unwrap().as_deref(), Some("5"));
        assert_eq!(parse_channel("some noise CH 31 more").unwrap().as_deref(), Some("3"));
    }

    #[test]
    fn test_parse_channel_garbage() {
        assert_eq!(parse_channel("").unwrap(), None);
        assert_eq!(parse_channel("channel").unwrap(), None);
        assert_eq!(parse_channel("12:34").unwrap(), None);
    }
}
