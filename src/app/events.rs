use crate::api::{Cover, Track};
use crate::lyrics::Timeline;

#[derive(Debug, Clone)]
pub enum Event {
    Input(InputEvent),
    Player(PlayerEvent),
    Network(NetworkEvent),
    /// Animation frame while lyric lines are moving.
    Frame,
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Key(crossterm::event::KeyEvent),
    Resize,
}

#[derive(Debug, Clone)]
pub enum PlayerEvent {
    Started,
    Paused,
    Position { seconds: f64 },
    Duration { seconds: f64 },
    Ended,
    Error(String),
}

#[derive(Debug, Clone)]
pub enum NetworkEvent {
    ResolvedStream { track: Track, url: String },
    StreamUnavailable { track: Track },
    LyricsLoaded { track_id: String, timeline: Timeline },
    CoverResolved { track_id: String, cover: Cover },
}
