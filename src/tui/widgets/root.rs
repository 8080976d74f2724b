//! Root layout
//!
//! ```text
//! ┌──────────────┬──────────────────────────────┐
//! │ Now Playing  │           Lyrics             │
//! │ title        │                              │
//! │ artist       │      previous line           │
//! │ ━━━━●─────── │      ACTIVE LINE             │
//! │ 01:02/03:40  │      next line               │
//! │ cover        │      ...                     │
//! └──────────────┴──────────────────────────────┘
//! ```
//!
//! Narrow terminals stack the panes instead.

use crate::app::state::AppState;
use crate::tui::theme::get_theme;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    Frame,
};
use std::time::Instant;

use super::now_playing;

const NARROW_COLS: u16 = 80;
const PLAYER_COLS: u16 = 36;
const PLAYER_ROWS: u16 = 10;

pub fn render(frame: &mut Frame, state: &AppState, now: Instant) {
    let (player, lyrics) = split(frame.area());
    now_playing::render(frame, state, player);

    let theme = get_theme();
    let block = theme.panel(theme.icons.lyrics, "Lyrics");
    frame.render_widget(block, lyrics);
    state
        .lyrics
        .render(frame, lyrics_content(lyrics), now, state.lyrics_loading);
}

/// Area the lyric lines are drawn into for a terminal of size `area`.
///
/// The app sizes the sync engine from this, so it must match `render`.
pub fn lyrics_viewport(area: Rect) -> Rect {
    lyrics_content(split(area).1)
}

fn split(area: Rect) -> (Rect, Rect) {
    let (direction, player) = if area.width < NARROW_COLS {
        (Direction::Vertical, Constraint::Length(PLAYER_ROWS))
    } else {
        (Direction::Horizontal, Constraint::Length(PLAYER_COLS))
    };
    let panes = Layout::default()
        .direction(direction)
        .constraints([player, Constraint::Min(1)])
        .split(area);
    (panes[0], panes[1])
}

/// Inside the border, one column of padding on each side.
fn lyrics_content(pane: Rect) -> Rect {
    let inner = get_theme().panel("", "").inner(pane);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner)[1]
}
