//! Progress extraction from downloader output.
//!
//! Kept behind [`ProgressParser`] so a structured progress format can replace
//! the text scraping without touching the process or state machine code.

use once_cell::sync::Lazy;
use regex_lite::Regex;

static PERCENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+)%").expect("percent pattern is valid"));
static SPEED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)at\s+(\S+)").expect("speed pattern is valid"));
static ETA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)ETA\s+(\S+)").expect("eta pattern is valid"));

/// A progress reading taken from one output line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// 0-100.
    pub progress: f32,
    pub speed: Option<String>,
    pub eta: Option<String>,
}

/// Turns one line of stdout into a progress reading, if it carries one.
pub trait ProgressParser: Send + Sync {
    fn parse(&self, line: &str) -> Option<ProgressUpdate>;
}

/// Scans for `<digits>.<digits>%`, plus `at <speed>` and `ETA <eta>` when present.
#[derive(Debug, Default, Clone, Copy)]
pub struct PercentProgressParser;

impl ProgressParser for PercentProgressParser {
    fn parse(&self, line: &str) -> Option<ProgressUpdate> {
        let percent: f32 = PERCENT_RE.captures(line)?.get(1)?.as_str().parse().ok()?;

        let capture = |re: &Regex| {
            re.captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
        };

        Some(ProgressUpdate {
            progress: percent.clamp(0.0, 100.0),
            speed: capture(&SPEED_RE),
            eta: capture(&ETA_RE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_full_progress_line() {
        let line = "[download]  42.3% of  120.45MiB at    2.31MiB/s ETA 00:47";
        let update = PercentProgressParser.parse(line).unwrap();
        assert_eq!(update.progress, 42.3);
        assert_eq!(update.speed.as_deref(), Some("2.31MiB/s"));
        assert_eq!(update.eta.as_deref(), Some("00:47"));
    }

    #[test]
    fn test_percent_only() {
        let update = PercentProgressParser.parse("progress 7.0%").unwrap();
        assert_eq!(update.progress, 7.0);
        assert!(update.speed.is_none());
        assert!(update.eta.is_none());
    }

    #[test]
    fn test_integer_percent_is_ignored() {
        assert!(PercentProgressParser
            .parse("[download] 100% of 10.00MiB in 00:00:05")
            .is_none());
    }

    #[test]
    fn test_non_progress_lines() {
        assert!(PercentProgressParser
            .parse("[youtube] dQw4w9WgXcQ: Downloading webpage")
            .is_none());
        assert!(PercentProgressParser.parse("").is_none());
    }

    #[test]
    fn test_word_containing_at_is_not_speed() {
        let update = PercentProgressParser
            .parse("[download] 10.0% of 5MiB format 22")
            .unwrap();
        assert!(update.speed.is_none());
    }

    #[test]
    fn test_clamps_out_of_range() {
        let update = PercentProgressParser.parse("123.4%").unwrap();
        assert_eq!(update.progress, 100.0);
    }
}
