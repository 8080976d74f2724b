use anyhow::Context;
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod defaults;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub paths: PathsConfig,
    pub api: ApiConfig,
    pub player: PlayerConfig,
    pub lyrics: LyricsConfig,
    pub cover: CoverConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: PathBuf,
    /// Where `download` saves tracks when no output path is given
    pub download_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Aggregator endpoint used for search, audio URLs and lyrics.
    pub aggregator_base: String,
    /// QQ music compatible endpoint used for song info, lyrics and covers.
    pub qq_base: String,
    /// Chart listing endpoint.
    pub rank_url: String,
    /// Aggregator source used when none is given (e.g. "joox", "kuwo", "netease").
    pub default_source: String,
    pub search_count: u32,
    /// Requested bitrate in kbps.
    pub bitrate: u32,
    /// Optional proxy prefix; the audio URL is appended as `?url=<encoded>`.
    pub audio_proxy: Option<String>,
    pub timeout_secs: u64,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub max_calls: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// mpv audio device name (see `mpv --audio-device=help`)
    pub audio_device: Option<String>,
    /// Volume level (0-100)
    pub volume: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LyricsConfig {
    /// Blank rows between lyric lines
    pub line_spacing: f32,
    /// The active line sits at viewport height / anchor_divisor
    pub anchor_divisor: f32,
    pub stagger_step_ms: u32,
    pub stagger_cap: usize,
    /// Duration of a line's move once its delay has elapsed
    pub transition_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoverConfig {
    pub size: u32,
    pub thumb_size: u32,
}

impl Default for Config {
    fn default() -> Self {
        defaults::defaults()
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let proj = ProjectDirs::from("dev", "pulsic", "pulsic");
        let data_dir = proj
            .as_ref()
            .map(|p| p.data_dir().to_path_buf())
            .unwrap_or_else(|| std::env::temp_dir().join("pulsic"));
        let download_dir = UserDirs::new()
            .and_then(|u| u.audio_dir().map(Path::to_path_buf))
            .unwrap_or_else(|| data_dir.join("downloads"));
        Self {
            data_dir,
            download_dir,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            aggregator_base: "https://music-api.gdstudio.xyz/api.php".to_string(),
            qq_base: "https://api.wuhy.de5.net".to_string(),
            rank_url: "https://60s.viki.moe/v2/ncm-rank/list".to_string(),
            default_source: "joox".to_string(),
            search_count: 20,
            bitrate: 320,
            audio_proxy: None,
            timeout_secs: 10,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_calls: 45,
            window_secs: 5 * 60,
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            audio_device: None,
            volume: 80,
        }
    }
}

impl Default for LyricsConfig {
    fn default() -> Self {
        Self {
            line_spacing: 1.0,
            anchor_divisor: 3.5,
            stagger_step_ms: 60,
            stagger_cap: 10,
            transition_ms: 700,
        }
    }
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            size: 300,
            thumb_size: 150,
        }
    }
}

impl LyricsConfig {
    /// Engine settings for a lyrics viewport `viewport_rows` tall.
    pub fn sync_config(&self, viewport_rows: u16) -> crate::lyrics::SyncConfig {
        crate::lyrics::SyncConfig {
            line_spacing: self.line_spacing,
            anchor_offset: 0.0,
            stagger_step_ms: self.stagger_step_ms,
            stagger_cap: self.stagger_cap,
        }
        .anchored(f32::from(viewport_rows), self.anchor_divisor)
    }
}

pub fn save(cfg: &Config, override_path: Option<&Path>) -> anyhow::Result<()> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };
    write_config(cfg, &path)
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let proj =
        ProjectDirs::from("dev", "pulsic", "pulsic").context("ProjectDirs unavailable")?;
    Ok(proj.config_dir().join("config.toml"))
}

pub fn load(override_path: Option<&Path>) -> anyhow::Result<Config> {
    let path = match override_path {
        Some(p) => p.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        let cfg = defaults::defaults();
        write_config(&cfg, &path).context("write default config")?;
        tracing::info!(path = %path.display(), "created default config");
        return Ok(cfg);
    }

    let raw = fs::read_to_string(&path).with_context(|| format!("read {}", path.display()))?;
    let cfg = toml::from_str::<Config>(&raw).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

fn write_config(cfg: &Config, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("create dir {}", parent.display()))?;
    }
    let raw = toml::to_string_pretty(cfg).context("serialize config")?;
    fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = fs::set_permissions(path, fs::Permissions::from_mode(0o600));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let cfg = load(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(cfg.api.rate_limit.max_calls, 45);
        assert_eq!(cfg.lyrics.stagger_cap, 10);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[player]\nvolume = 55\n\n[lyrics]\nstagger_step_ms = 40\n").unwrap();

        let cfg = load(Some(&path)).unwrap();
        assert_eq!(cfg.player.volume, 55);
        assert_eq!(cfg.lyrics.stagger_step_ms, 40);
        assert_eq!(cfg.lyrics.transition_ms, 700);
        assert_eq!(cfg.api.default_source, "joox");
        assert!(cfg.api.rank_url.starts_with("https://"));
        assert!(!cfg.paths.download_dir.as_os_str().is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut cfg = Config::default();
        cfg.player.audio_device = Some("pulse/sink".into());
        cfg.api.audio_proxy = Some("https://proxy.example/".into());
        save(&cfg, Some(&path)).unwrap();

        let back = load(Some(&path)).unwrap();
        assert_eq!(back.player.audio_device.as_deref(), Some("pulse/sink"));
        assert_eq!(back.api.audio_proxy.as_deref(), Some("https://proxy.example/"));
    }

    #[test]
    fn test_sync_config_anchor() {
        let sync = LyricsConfig::default().sync_config(35);
        assert_eq!(sync.anchor_offset, 10.0);
        assert_eq!(sync.stagger_cap, 10);
    }
}
