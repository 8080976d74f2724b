//! Color palette - monochrome grayscale

use ratatui::style::Color;

#[derive(Debug, Clone, Copy)]
pub struct Palette {
    pub fg_primary: Color,
    pub fg_secondary: Color,
    pub accent: Color,
    pub border: Color,
    pub playing: Color,
    pub error: Color,
}

impl Palette {
    /// Black, white and grays; the active lyric line is the only pure white text
    pub const MONO: Self = Self {
        fg_primary: Color::Rgb(255, 255, 255),   // #ffffff
        fg_secondary: Color::Rgb(136, 136, 136), // #888888
        accent: Color::Rgb(200, 200, 200),       // #c8c8c8
        border: Color::Rgb(64, 64, 64),          // #404040
        playing: Color::Rgb(255, 255, 255),      // #ffffff
        error: Color::Rgb(255, 255, 255),        // errors stand out by icon
    };
}

impl Default for Palette {
    fn default() -> Self {
        Self::MONO
    }
}
