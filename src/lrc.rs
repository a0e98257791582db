//! Parser for LRC-format lyric files.
//!
//! An LRC file pairs playback offsets with lyric text:
//!
//! ```text
//! [ar: Some Artist]
//! [00:12.50]First line
//! [00:15][00:47.1]Repeated line
//! ```
//!
//! Header tags (`ar`, `ti`, `al`, `by`, `offset`) are discarded, every
//! timestamp tag on a line yields one event sharing the line's text, and
//! the result is ordered by offset.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    /// Matches one `[minutes:seconds]` tag anywhere in a line. Seconds may
    /// carry a fractional part of arbitrary precision.
    static ref TIMESTAMP: Regex = Regex::new(r"\[(\d+):(\d+(?:\.\d+)?)\]").expect("compile timestamp pattern");

    /// Matches a metadata header line such as `[ar: Artist]`.
    static ref METADATA: Regex = Regex::new(r"(?i)^\[(?:ar|ti|al|by|offset):").expect("compile metadata pattern");
}

/// One timed lyric event. Also the shape of the derived record attached
/// to a song.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct LyricLine {
    /// Offset from the start of the song, in seconds, with millisecond
    /// precision.
    pub timestamp: f64,

    /// The lyric text shown at that offset.
    pub text: String,
}

impl LyricLine {
    pub fn new(timestamp: f64, text: impl Into<String>) -> Self {
        Self {
            timestamp,
            text: text.into(),
        }
    }
}

/// Parses LRC text into lyric events ordered by timestamp.
///
/// Lines without a timestamp tag, metadata header lines, and lines whose
/// text is empty once the tags are stripped produce nothing. Malformed
/// input never fails; it is skipped.
pub fn parse(text: &str) -> Vec<LyricLine> {
    let mut events = vec![];

    for raw_line in text.lines() {
        let line = raw_line.trim();

        if METADATA.is_match(line) {
            continue;
        }

        let mut timestamps = vec![];

        for captures in TIMESTAMP.captures_iter(line) {
            let minutes: f64 = match captures[1].parse() {
                Ok(minutes) => minutes,
                Err(_) => continue,
            };
            let seconds: f64 = match captures[2].parse() {
                Ok(seconds) => seconds,
                Err(_) => continue,
            };

            timestamps.push(round_to_millis(minutes * 60.0 + seconds));
        }

        if timestamps.is_empty() {
            continue;
        }

        let text = TIMESTAMP.replace_all(line, "");
        let text = text.trim();

        if text.is_empty() {
            continue;
        }

        for timestamp in timestamps {
            events.push(LyricLine::new(timestamp, text));
        }
    }

    // stable, so events sharing an offset keep their scan order
    events.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    events
}

fn round_to_millis(seconds: f64) -> f64 {
    (seconds * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::{parse, LyricLine};

    #[test]
    fn parses_timed_lines() {
        let events = parse("[00:12.50]Hello\n[01:05]World");

        assert_eq!(
            events,
            vec![
                LyricLine::new(12.5, "Hello"),
                LyricLine::new(65.0, "World"),
            ]
        );
    }

    #[test]
    fn skips_metadata_lines() {
        let events = parse("[ar: Artist Name]\n[00:01]Hi");

        assert_eq!(events, vec![LyricLine::new(1.0, "Hi")]);
    }

    #[test]
    fn skips_metadata_even_with_timestamps() {
        // the header tag wins over any timestamp-shaped token on the line
        let events = parse("[TI: Some Title [00:01]]\n[00:02]Real line");

        assert_eq!(events, vec![LyricLine::new(2.0, "Real line")]);
    }

    #[test]
    fn expands_multiple_timestamps() {
        let events = parse("[00:01][00:02]Same line");

        assert_eq!(
            events,
            vec![
                LyricLine::new(1.0, "Same line"),
                LyricLine::new(2.0, "Same line"),
            ]
        );
    }

    #[test]
    fn drops_lines_without_text() {
        assert!(parse("[00:01]\n[00:02]   ").is_empty());
    }

    #[test]
    fn drops_untimed_lines() {
        assert!(parse("just a comment\n\nanother").is_empty());
    }

    #[test]
    fn orders_events_across_lines() {
        let events = parse("[01:00]Later\n[00:30]Earlier");

        assert_eq!(
            events,
            vec![
                LyricLine::new(30.0, "Earlier"),
                LyricLine::new(60.0, "Later"),
            ]
        );
    }

    #[test]
    fn keeps_millisecond_precision() {
        let events = parse("[00:12.3456]Precision");

        assert_eq!(events, vec![LyricLine::new(12.346, "Precision")]);
    }

    #[test]
    fn accepts_long_minutes() {
        let events = parse("[120:00]Two hours in");

        assert_eq!(events, vec![LyricLine::new(7200.0, "Two hours in")]);
    }

    #[test]
    fn strips_timestamps_embedded_in_text() {
        let events = parse("Hello [00:05] world");

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].timestamp, 5.0);
        assert_eq!(events[0].text, "Hello  world");
    }

    #[test]
    fn duplicate_timestamps_are_kept() {
        let events = parse("[00:01]One\n[00:01]Two");

        assert_eq!(events.len(), 2);
        assert_eq!(events[0].text, "One");
        assert_eq!(events[1].text, "Two");
    }

    proptest! {
        #[test]
        fn output_is_ordered_and_non_empty(text in "\\PC*") {
            let events = parse(&text);

            for pair in events.windows(2) {
                prop_assert!(pair[0].timestamp <= pair[1].timestamp);
            }

            for event in &events {
                prop_assert!(!event.text.is_empty());
                prop_assert!(event.timestamp >= 0.0);
            }
        }

        #[test]
        fn parsing_is_deterministic(text in "\\PC*") {
            prop_assert_eq!(parse(&text), parse(&text));
        }
    }
}
