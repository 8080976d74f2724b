//! Scrolling lyrics view
//!
//! Holds the per-line animation state. The sync engine decides where each
//! line should go; this view waits out each line's delay, eases it towards
//! its target and reports line heights back to the engine in terminal rows.

use crate::lyrics::{LayoutInstruction, LineMetrics, Timeline};
use crate::tui::theme::get_theme;
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use std::time::{Duration, Instant};
use unicode_width::UnicodeWidthChar;

#[derive(Debug, Clone)]
struct LineState {
    rows: Vec<String>,
    text: String,
    from: f32,
    target: f32,
    /// Start of the current move, `None` once the line has settled
    moving_since: Option<Instant>,
    /// Target waiting for its transition delay
    pending: Option<(Instant, f32)>,
    blur: f32,
    emphasize: bool,
}

impl LineState {
    fn new(text: &str, width: u16) -> Self {
        Self {
            rows: wrap_rows(text, width),
            text: text.to_string(),
            from: 0.0,
            target: 0.0,
            moving_since: None,
            pending: None,
            blur: 0.0,
            emphasize: false,
        }
    }

    fn offset_at(&self, now: Instant, transition: Duration) -> f32 {
        match self.moving_since {
            Some(start) if !transition.is_zero() => {
                let t = now.saturating_duration_since(start).as_secs_f32()
                    / transition.as_secs_f32();
                self.from + (self.target - self.from) * ease_out_cubic(t.min(1.0))
            }
            _ => self.target,
        }
    }

    fn start_move(&mut self, at: Instant, target: f32, transition: Duration) {
        let current = self.offset_at(at, transition);
        self.from = current;
        self.target = target;
        self.moving_since = ((target - current).abs() > f32::EPSILON).then_some(at);
    }
}

#[derive(Debug, Clone)]
pub struct LyricsView {
    lines: Vec<LineState>,
    width: u16,
    transition: Duration,
}

impl LyricsView {
    pub fn new(transition: Duration) -> Self {
        Self {
            lines: Vec::new(),
            width: 0,
            transition,
        }
    }

    /// Replace the displayed lines. Every line starts settled at offset 0.
    pub fn set_timeline(&mut self, timeline: &Timeline) {
        self.lines = timeline
            .iter()
            .map(|line| LineState::new(&line.text, self.width))
            .collect();
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Re-wrap every line for a new content width. Returns whether the width
    /// actually changed, in which case line heights need a fresh layout.
    pub fn set_width(&mut self, width: u16) -> bool {
        if width == self.width {
            return false;
        }
        self.width = width;
        for line in &mut self.lines {
            line.rows = wrap_rows(&line.text, width);
        }
        true
    }

    /// Queue a layout from the sync engine.
    ///
    /// Blur and emphasis take effect immediately, offsets after each line's
    /// delay. A newer instruction for a line replaces one still waiting.
    pub fn apply(&mut self, layout: &[LayoutInstruction], now: Instant) {
        for ins in layout {
            let Some(line) = self.lines.get_mut(ins.index) else {
                continue;
            };
            line.blur = ins.blur_radius;
            line.emphasize = ins.emphasize;
            if ins.transition_delay_ms == 0 {
                line.pending = None;
                line.start_move(now, ins.vertical_offset, self.transition);
            } else {
                let due = now + Duration::from_millis(u64::from(ins.transition_delay_ms));
                line.pending = Some((due, ins.vertical_offset));
            }
        }
    }

    /// Place every line at its target without animating.
    pub fn snap(&mut self, layout: &[LayoutInstruction]) {
        for ins in layout {
            if let Some(line) = self.lines.get_mut(ins.index) {
                line.from = ins.vertical_offset;
                line.target = ins.vertical_offset;
                line.moving_since = None;
                line.pending = None;
                line.blur = ins.blur_radius;
                line.emphasize = ins.emphasize;
            }
        }
    }

    /// Start moves whose delay has elapsed and settle finished ones.
    pub fn advance(&mut self, now: Instant) {
        let transition = self.transition;
        for line in &mut self.lines {
            if let Some((due, target)) = line.pending
                && due <= now
            {
                line.pending = None;
                line.start_move(due, target, transition);
            }
            if let Some(start) = line.moving_since
                && now.saturating_duration_since(start) >= transition
            {
                line.from = line.target;
                line.moving_since = None;
            }
        }
    }

    /// Whether any line is still waiting or moving.
    pub fn is_animating(&self) -> bool {
        self.lines
            .iter()
            .any(|l| l.pending.is_some() || l.moving_since.is_some())
    }

    #[cfg(test)]
    pub fn offset_of(&self, index: usize, now: Instant) -> Option<f32> {
        self.lines
            .get(index)
            .map(|l| l.offset_at(now, self.transition))
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, now: Instant, loading: bool) {
        let theme = get_theme();

        if self.is_empty() {
            let msg = if loading { "Loading lyrics..." } else { "No lyrics" };
            let placeholder = Paragraph::new(Line::from(Span::styled(
                msg,
                Style::default().fg(theme.palette.fg_secondary),
            )))
            .alignment(Alignment::Center);
            let y = area.y + area.height / 2;
            if area.height > 0 {
                frame.render_widget(placeholder, Rect::new(area.x, y, area.width, 1));
            }
            return;
        }

        let top = i32::from(area.y);
        let bottom = i32::from(area.bottom());
        for line in &self.lines {
            let line_top = top + line.offset_at(now, self.transition).round() as i32;
            let style = if line.emphasize {
                Style::default()
                    .fg(theme.palette.fg_primary)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(blur_color(line.blur))
            };

            for (r, row) in line.rows.iter().enumerate() {
                let y = line_top + r as i32;
                if y < top || y >= bottom {
                    continue;
                }
                let Ok(y) = u16::try_from(y) else {
                    continue;
                };
                let p = Paragraph::new(Line::from(Span::styled(row.as_str(), style)))
                    .alignment(Alignment::Center);
                frame.render_widget(p, Rect::new(area.x, y, area.width, 1));
            }
        }
    }
}

impl LineMetrics for LyricsView {
    fn height_of(&self, index: usize) -> f32 {
        self.lines.get(index).map_or(0.0, |l| l.rows.len() as f32)
    }
}

/// Terminals can't blur, so distance from the active line fades to grey.
pub fn blur_color(blur: f32) -> Color {
    let blur = if blur.is_finite() { blur.max(0.0) } else { 0.0 };
    let level = (150.0 - blur * 18.0).max(58.0) as u8;
    Color::Rgb(level, level, level)
}

fn ease_out_cubic(t: f32) -> f32 {
    1.0 - (1.0 - t).powi(3)
}

/// Greedy wrap by display width; wide glyphs count as two columns.
pub fn wrap_rows(text: &str, width: u16) -> Vec<String> {
    let width = usize::from(width);
    if width == 0 {
        return vec![text.to_string()];
    }

    let mut rows = Vec::new();
    let mut row = String::new();
    let mut used = 0;
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if used + w > width && !row.is_empty() {
            rows.push(std::mem::take(&mut row).trim_end().to_string());
            used = 0;
            if c == ' ' {
                continue;
            }
        }
        row.push(c);
        used += w;
    }
    if !row.is_empty() || rows.is_empty() {
        rows.push(row);
    }
    rows
}
