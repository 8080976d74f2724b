#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Quit,
    TogglePause,
    /// Relative seek in seconds, negative goes back
    Seek(f64),
    Restart,
    VolumeUp,
    VolumeDown,
    ToggleFavorite,
    Resize,
}
