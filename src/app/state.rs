use crate::api::{Cover, Track};
use crate::tui::widgets::lyrics::LyricsView;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub created_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
}

impl Toast {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Success,
            created_at: Instant::now(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ToastKind::Error,
            created_at: Instant::now(),
        }
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() > Duration::from_secs(3)
    }
}

pub struct AppState {
    pub should_quit: bool,

    // Playback
    pub track: Option<Track>,
    pub paused: bool,
    pub position_secs: f64,
    pub duration_secs: f64,
    pub volume: u8,
    pub favorited: bool,
    pub cover: Option<Cover>,

    // Lyrics
    pub lyrics: LyricsView,
    pub lyrics_loading: bool,

    pub toast: Option<Toast>,
    pub status: String,
}

impl AppState {
    pub fn new(volume: u8, transition: Duration) -> Self {
        Self {
            should_quit: false,
            track: None,
            paused: false,
            position_secs: 0.0,
            duration_secs: 0.0,
            volume: volume.min(100),
            favorited: false,
            cover: None,
            lyrics: LyricsView::new(transition),
            lyrics_loading: false,
            toast: None,
            status: String::new(),
        }
    }

    /// Forget everything about the previous track.
    pub fn reset_track(&mut self, track: Track) {
        self.track = Some(track);
        self.position_secs = 0.0;
        self.duration_secs = 0.0;
        self.cover = None;
        self.lyrics.clear();
        self.lyrics_loading = true;
        self.status = "Resolving stream...".into();
    }

    /// Whether a network result for `track_id` still belongs to the current track.
    pub fn is_current(&self, track_id: &str) -> bool {
        self.track.as_ref().is_some_and(|t| t.id == track_id)
    }

    pub fn volume_up(&mut self) -> u8 {
        self.volume = self.volume.saturating_add(5).min(100);
        self.volume
    }

    pub fn volume_down(&mut self) -> u8 {
        self.volume = self.volume.saturating_sub(5);
        self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn track(id: &str) -> Track {
        Track {
            id: id.into(),
            title: "Title".into(),
            artist: "Artist".into(),
            album: None,
            pic_id: None,
            lyric_id: None,
            source: "joox".into(),
        }
    }

    #[test]
    fn test_volume_bounds() {
        let mut s = AppState::new(98, Duration::from_millis(700));
        assert_eq!(s.volume_up(), 100);
        assert_eq!(s.volume_up(), 100);

        let mut s = AppState::new(3, Duration::from_millis(700));
        assert_eq!(s.volume_down(), 0);
        assert_eq!(AppState::new(250, Duration::ZERO).volume, 100);
    }

    #[test]
    fn test_reset_track() {
        let mut s = AppState::new(80, Duration::from_millis(700));
        s.position_secs = 42.0;
        s.cover = Some(Cover::Default);
        s.reset_track(track("a"));

        assert!(s.is_current("a"));
        assert!(!s.is_current("b"));
        assert_eq!(s.position_secs, 0.0);
        assert!(s.cover.is_none());
        assert!(s.lyrics_loading);
    }
}
