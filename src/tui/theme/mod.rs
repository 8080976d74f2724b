//! Theme configuration - monochrome grayscale

pub mod icons;
pub mod palette;

pub use icons::Icons;
pub use palette::Palette;

#[derive(Debug, Clone)]
pub struct Theme {
    pub palette: Palette,
    pub icons: Icons,
}

impl Theme {
    pub fn new() -> Self {
        Self {
            palette: Palette::MONO,
            icons: Icons::nerd(),
        }
    }

    /// Rounded corners everywhere.
    pub fn border_set(&self) -> ratatui::symbols::border::Set<'static> {
        ratatui::symbols::border::ROUNDED
    }

    /// Bordered panel with an icon title, as used by every pane.
    pub fn panel(&self, icon: &str, title: &str) -> ratatui::widgets::Block<'static> {
        use ratatui::{style::Style, widgets::{Block, Borders}};
        Block::default()
            .borders(Borders::ALL)
            .border_set(self.border_set())
            .border_style(Style::default().fg(self.palette.border))
            .title(format!(" {icon} {title} "))
            .title_style(Style::default().fg(self.palette.accent))
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::new()
    }
}

pub fn get_theme() -> Theme {
    Theme::new()
}
