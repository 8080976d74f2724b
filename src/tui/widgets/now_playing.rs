//! Now Playing panel - track info, progress, cover and notifications

use crate::api::Cover;
use crate::app::state::{AppState, ToastKind};
use crate::tui::theme::{get_theme, Icons};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Paragraph, Wrap},
    Frame,
};

pub fn render(frame: &mut Frame, state: &AppState, area: Rect) {
    let theme = get_theme();
    let icons = &theme.icons;
    let palette = &theme.palette;

    let block = theme.panel(icons.music, "Now Playing");
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let padded = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
        ])
        .split(inner)[1];

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Title + favorite mark
            Constraint::Length(1), // Artist
            Constraint::Length(1), // Album
            Constraint::Length(1), // Progress bar
            Constraint::Length(1), // Time + play state + volume
            Constraint::Length(1), // Cover
            Constraint::Min(0),    // Status / toast
        ])
        .split(padded);

    let width = padded.width as usize;

    let (title, artist, album) = match &state.track {
        Some(t) => (
            t.title.as_str(),
            t.artist.as_str(),
            t.album.as_deref().unwrap_or(""),
        ),
        None => ("Not playing", "", ""),
    };
    let fav = if state.favorited {
        icons.favorite
    } else {
        icons.favorite_empty
    };
    let title_line = Line::from(vec![
        Span::styled(
            truncate_str(title, width.saturating_sub(2)),
            Style::default()
                .fg(palette.fg_primary)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(fav, Style::default().fg(palette.accent)),
    ]);
    frame.render_widget(Paragraph::new(title_line), rows[0]);

    let secondary = Style::default().fg(palette.fg_secondary);
    frame.render_widget(
        Paragraph::new(Span::styled(truncate_str(artist, width), secondary)),
        rows[1],
    );
    frame.render_widget(
        Paragraph::new(Span::styled(truncate_str(album, width), secondary)),
        rows[2],
    );

    let ratio = if state.duration_secs > 0.0 {
        (state.position_secs / state.duration_secs).clamp(0.0, 1.0)
    } else {
        0.0
    };
    frame.render_widget(
        Paragraph::new(Span::styled(
            render_progress_bar(rows[3].width as usize, ratio, icons),
            Style::default().fg(palette.accent),
        )),
        rows[3],
    );

    let play_icon = if state.paused { icons.play } else { icons.pause };
    let vol_icon = match state.volume {
        0 => icons.volume_mute,
        1..50 => icons.volume_low,
        _ => icons.volume_high,
    };
    let controls = Line::from(vec![
        Span::styled(
            format!(
                "{}/{}",
                format_time(state.position_secs),
                format_time(state.duration_secs)
            ),
            secondary,
        ),
        Span::raw(" "),
        Span::styled(play_icon, Style::default().fg(palette.playing)),
        Span::raw("  "),
        Span::styled(vol_icon, secondary),
        Span::raw(" "),
        Span::styled(format!("{}%", state.volume), secondary),
    ]);
    frame.render_widget(Paragraph::new(controls), rows[4]);

    let cover = match &state.cover {
        Some(Cover::Remote(url)) => url.as_str(),
        Some(Cover::Default) => "default cover",
        None => "",
    };
    if !cover.is_empty() {
        let cover_line = Line::from(vec![
            Span::styled(format!("{} ", icons.image), secondary),
            Span::styled(truncate_str(cover, width.saturating_sub(2)), secondary),
        ]);
        frame.render_widget(Paragraph::new(cover_line), rows[5]);
    }

    let footer = match &state.toast {
        Some(toast) if !toast.is_expired() => {
            let prefix = match toast.kind {
                ToastKind::Success => icons.success,
                ToastKind::Error => icons.error,
            };
            let color = match toast.kind {
                ToastKind::Success => palette.playing,
                ToastKind::Error => palette.error,
            };
            Line::from(vec![
                Span::styled(format!("{prefix} "), Style::default().fg(color)),
                Span::styled(toast.message.clone(), Style::default().fg(color)),
            ])
        }
        _ => Line::from(Span::styled(state.status.clone(), secondary)),
    };
    frame.render_widget(
        Paragraph::new(footer).wrap(Wrap { trim: true }),
        rows[6],
    );
}

fn render_progress_bar(width: usize, ratio: f64, icons: &Icons) -> String {
    if width < 3 {
        return String::new();
    }

    let filled = ((width - 1) as f64 * ratio).round() as usize;
    let empty = width.saturating_sub(filled + 1);

    let mut bar = String::with_capacity(width * 3);
    bar.push_str(&icons.progress_full.repeat(filled));
    bar.push_str(icons.progress_head);
    bar.push_str(&icons.progress_empty.repeat(empty));
    bar
}

/// `mm:ss`; anything not finite or negative shows as `00:00`.
fn format_time(secs: f64) -> String {
    let secs = if secs.is_finite() { secs.max(0.0) as u64 } else { 0 };
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

fn truncate_str(s: &str, max_len: usize) -> String {
    if max_len == 0 {
        return String::new();
    }

    let char_count = s.chars().count();
    if char_count <= max_len {
        s.to_string()
    } else if max_len > 3 {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{truncated}...")
    } else {
        s.chars().take(max_len).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_time() {
        assert_eq!(format_time(0.0), "00:00");
        assert_eq!(format_time(65.9), "01:05");
        assert_eq!(format_time(-3.0), "00:00");
        assert_eq!(format_time(f64::NAN), "00:00");
    }

    #[test]
    fn test_progress_bar() {
        let icons = Icons::nerd();
        assert_eq!(render_progress_bar(5, 0.0, &icons), "●────");
        assert_eq!(render_progress_bar(5, 1.0, &icons), "━━━━●");
        assert_eq!(render_progress_bar(2, 0.5, &icons), "");
    }

    #[test]
    fn test_truncate_str() {
        assert_eq!(truncate_str("hello", 10), "hello");
        assert_eq!(truncate_str("hello world", 8), "hello...");
        assert_eq!(truncate_str("hello", 0), "");
    }
}
