//! Nerd Font icons

#[derive(Debug, Clone, Copy)]
pub struct Icons {
    pub play: &'static str,
    pub pause: &'static str,

    pub volume_mute: &'static str,
    pub volume_low: &'static str,
    pub volume_high: &'static str,

    pub music: &'static str,
    pub lyrics: &'static str,
    pub favorite: &'static str,
    pub favorite_empty: &'static str,
    pub image: &'static str,

    pub success: &'static str,
    pub error: &'static str,

    pub progress_full: &'static str,
    pub progress_empty: &'static str,
    pub progress_head: &'static str,
}

impl Icons {
    pub const fn nerd() -> Self {
        Self {
            play: "\u{f04b}",           // nf-fa-play
            pause: "\u{f04c}",          // nf-fa-pause

            volume_mute: "\u{f026}",    // nf-fa-volume_off
            volume_low: "\u{f027}",     // nf-fa-volume_down
            volume_high: "\u{f028}",    // nf-fa-volume_up

            music: "\u{f001}",          // nf-fa-music
            lyrics: "\u{f15c}",         // nf-fa-file_text_o
            favorite: "\u{f004}",       // nf-fa-heart
            favorite_empty: "\u{f08a}", // nf-fa-heart_o
            image: "\u{f03e}",          // nf-fa-image

            success: "\u{f00c}",        // nf-fa-check
            error: "\u{f00d}",          // nf-fa-times

            progress_full: "━",
            progress_empty: "─",
            progress_head: "●",
        }
    }
}

impl Default for Icons {
    fn default() -> Self {
        Self::nerd()
    }
}
