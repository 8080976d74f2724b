use super::{ApiConfig, Config, CoverConfig, LyricsConfig, PathsConfig, PlayerConfig};

/// Config written to disk on first run.
pub fn defaults() -> Config {
    Config {
        paths: PathsConfig::default(),
        api: ApiConfig::default(),
        player: PlayerConfig::default(),
        lyrics: LyricsConfig::default(),
        cover: CoverConfig::default(),
    }
}
