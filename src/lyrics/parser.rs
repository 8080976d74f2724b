//! LRC format parser
//!
//! Parses synchronized lyrics in LRC format:
//! [mm:ss.xx] Lyrics line here
//!
//! Example:
//! [00:12.34] Hello world
//! [00:15.00][01:15.00] Repeated chorus
//!
//! Lines without a time tag, metadata headers such as `[ti:Title]`, and
//! captions that are blank once the tags are stripped never make it into the
//! timeline.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::ops::Deref;

/// `[mm:ss]`, `[mm:ss.ff]` or `[mm:ss.fff]` (`:` also accepted before the fraction)
static TIME_TAG: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[([0-9]{2}):([0-9]{2})(?:[.:]([0-9]{2,3}))?\]").expect("time tag pattern is valid")
});

/// A single line of lyrics with timestamp
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LyricLine {
    /// Seconds from track start
    pub time: f64,
    /// The lyrics text, never empty
    pub text: String,
}

impl LyricLine {
    pub fn new(time: f64, text: impl Into<String>) -> Self {
        Self {
            time,
            text: text.into(),
        }
    }
}

/// Lyrics of one track, sorted by time.
///
/// Built once when a track loads and never mutated afterwards; the next
/// track replaces it wholesale.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Timeline {
    lines: Vec<LyricLine>,
}

impl Timeline {
    /// An empty timeline, i.e. "no lyrics available".
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse LRC formatted lyrics. Never fails: anything that does not look
    /// like a time tag is skipped.
    pub fn parse(content: &str) -> Self {
        let mut lines = Vec::new();

        for raw in content.split('\n') {
            let raw = raw.trim_end_matches('\r');

            let times: Vec<f64> = TIME_TAG
                .captures_iter(raw)
                .filter_map(|caps| {
                    let min: u32 = caps[1].parse().ok()?;
                    let sec: u32 = caps[2].parse().ok()?;
                    let millis = caps.get(3).map_or(Some(0), |m| parse_fraction(m.as_str()))?;
                    Some(f64::from(min) * 60.0 + f64::from(sec) + f64::from(millis) / 1000.0)
                })
                .collect();

            if times.is_empty() {
                continue;
            }

            let text = TIME_TAG.replace_all(raw, "");
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            lines.extend(times.into_iter().map(|t| LyricLine::new(t, text)));
        }

        // Stable: equal timestamps keep file order.
        lines.sort_by(|a, b| a.time.total_cmp(&b.time));

        Self { lines }
    }

    pub fn lines(&self) -> &[LyricLine] {
        &self.lines
    }
}

impl Deref for Timeline {
    type Target = [LyricLine];

    fn deref(&self) -> &Self::Target {
        &self.lines
    }
}

impl FromIterator<LyricLine> for Timeline {
    /// Collects and sorts, so hand-built timelines keep the ordering invariant.
    fn from_iter<I: IntoIterator<Item = LyricLine>>(iter: I) -> Self {
        let mut lines: Vec<LyricLine> = iter
            .into_iter()
            .filter(|l| l.time.is_finite() && l.time >= 0.0 && !l.text.trim().is_empty())
            .collect();
        lines.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { lines }
    }
}

/// Convenience wrapper mirroring `Timeline::parse`.
pub fn parse(content: &str) -> Timeline {
    Timeline::parse(content)
}

/// "5" is not accepted by the tag pattern; "50" means 500ms, "505" means 505ms.
fn parse_fraction(s: &str) -> Option<u32> {
    let padded = format!("{s:0<3}");
    padded.get(..3)?.parse().ok()
}
