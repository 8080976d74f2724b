//! Lyrics module for parsing and synchronizing timed lyrics
//!
//! This module provides:
//! - LRC format parser producing a sorted timeline
//! - Sync engine computing the active line and scrolling layout per tick

pub mod parser;
pub mod sync;

pub use parser::Timeline;
pub use sync::{LayoutInstruction, LineMetrics, SyncConfig, SyncEngine};

use anyhow::Context;
use std::path::Path;

/// Read and parse a local `.lrc` file.
///
/// Only I/O problems are errors; unparseable content is an empty timeline.
pub fn load_file(path: &Path) -> anyhow::Result<Timeline> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    let raw = String::from_utf8_lossy(&bytes);
    let timeline = parser::parse(&raw);
    tracing::debug!(path = %path.display(), lines = timeline.len(), "parsed lyrics file");
    Ok(timeline)
}
