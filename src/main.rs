mod api;
mod app;
mod config;
mod input;
mod lyrics;
mod player;
mod storage;
mod tui;

use anyhow::Context;
use clap::{CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "pulsic",
    version,
    about = "Terminal music player with synced, scrolling lyrics",
    args_conflicts_with_subcommands = true
)]
struct Cli {
    /// Override config file path.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Search and play the first hit (same as `play`).
    query: Vec<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Search and play the first hit in the interactive player.
    Play {
        title: String,
        #[arg(long)]
        artist: Option<String>,
        /// Aggregator source (joox, kuwo, netease, ...).
        #[arg(long)]
        source: Option<String>,
    },
    /// Search tracks and print them (headless).
    Search {
        query: String,
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value_t = 1)]
        page: u32,
    },
    /// Parse a local LRC file and print its timeline.
    Lyrics { file: PathBuf },
    /// Print the sync engine's layout for a playback position as JSON.
    Layout {
        file: PathBuf,
        /// Playback position in seconds.
        #[arg(long)]
        at: f64,
        /// Position of a preceding tick, enables staggered delays.
        #[arg(long)]
        from: Option<f64>,
        /// Viewport height in rows.
        #[arg(long, default_value_t = 24)]
        rows: u16,
        /// Viewport width in columns, used to wrap long lines.
        #[arg(long, default_value_t = 60)]
        width: u16,
    },
    /// Resolve cover art for a track and print its URL.
    Cover {
        title: String,
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        size: Option<u32>,
        /// Use the configured thumbnail size.
        #[arg(long, conflicts_with = "size")]
        thumb: bool,
    },
    /// Save the first hit for a search to disk.
    Download {
        title: String,
        #[arg(long)]
        artist: Option<String>,
        #[arg(long)]
        source: Option<String>,
        /// Target file or directory (defaults to the configured download dir).
        #[arg(long, short)]
        output: Option<PathBuf>,
        /// Only print the resolved audio URL.
        #[arg(long)]
        print_url: bool,
    },
    /// List the music charts.
    Rankings {
        #[arg(long, default_value_t = 12)]
        limit: usize,
    },
    /// Manage favorite tracks.
    Fav {
        #[command(subcommand)]
        cmd: FavCommand,
    },
    /// Audio output device management (mpv).
    Audio {
        #[command(subcommand)]
        cmd: AudioCommand,
    },
}

#[derive(Debug, Subcommand)]
enum FavCommand {
    /// List favorites, numbered for `fav play`.
    List,
    /// Play favorite number N from `fav list`.
    Play { number: usize },
    Add {
        id: String,
        #[arg(long)]
        source: Option<String>,
        #[arg(long, default_value = "")]
        title: String,
        #[arg(long, default_value = "")]
        artist: String,
    },
    Remove {
        id: String,
        #[arg(long)]
        source: Option<String>,
    },
    /// Write favorites to a JSON file.
    Export { path: PathBuf },
    /// Replace favorites with the contents of a JSON file.
    Import { path: PathBuf },
    Clear,
}

#[derive(Debug, Subcommand)]
enum AudioCommand {
    /// List mpv audio devices.
    List,
    /// Set mpv audio device (name as shown in list).
    Set { device: String },
    /// Clear mpv audio device override.
    Clear,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref()).context("load config")?;
    let cfg_path = match cli.config.clone() {
        Some(p) => p,
        None => config::default_config_path().context("default config path")?,
    };

    let command = match cli.command {
        Some(c) => c,
        None if !cli.query.is_empty() => Command::Play {
            title: cli.query.join(" "),
            artist: None,
            source: None,
        },
        None => {
            Cli::command().print_help().context("print help")?;
            return Ok(());
        }
    };

    // The TUI owns the terminal, so its logs go to a file.
    let interactive = matches!(
        command,
        Command::Play { .. } | Command::Fav { cmd: FavCommand::Play { .. } }
    );
    let log_file = interactive.then(|| cfg.paths.data_dir.join("pulsic.log"));
    init_logging(log_file.as_deref())?;

    match command {
        Command::Play {
            title,
            artist,
            source,
        } => {
            let resolver = api::Resolver::new(&cfg.api)?;
            let source = source.unwrap_or_else(|| cfg.api.default_source.clone());
            let track = first_hit(&resolver, &title, artist.as_deref(), &source).await?;
            run_player(cfg, cfg_path, resolver, track).await?;
        }
        Command::Search {
            query,
            source,
            page,
        } => {
            let resolver = api::Resolver::new(&cfg.api)?;
            let source = source.unwrap_or_else(|| cfg.api.default_source.clone());
            let tracks = resolver.aggregator().search(&query, &source, page).await?;
            print_tracks(&tracks);
        }
        Command::Lyrics { file } => {
            let timeline = lyrics::load_file(&file)?;
            for line in timeline.lines() {
                println!("[{}] {}", format_timestamp(line.time), line.text);
            }
        }
        Command::Layout {
            file,
            at,
            from,
            rows,
            width,
        } => {
            let timeline = lyrics::load_file(&file)?;
            let heights: Vec<f32> = timeline
                .iter()
                .map(|l| tui::widgets::lyrics::wrap_rows(&l.text, width).len() as f32)
                .collect();
            let metrics = |i: usize| heights.get(i).copied().unwrap_or(0.0);

            let mut engine = lyrics::SyncEngine::new(cfg.lyrics.sync_config(rows));
            engine.load_track(timeline, &metrics);
            if let Some(from) = from {
                engine.on_tick(from, &metrics);
            }
            let outcome = engine.on_tick(at, &metrics);
            println!(
                "{}",
                serde_json::to_string_pretty(&outcome).context("encode layout")?
            );
        }
        Command::Cover {
            title,
            artist,
            size,
            thumb,
        } => {
            let size = match size {
                Some(n) => n,
                None if thumb => cfg.cover.thumb_size,
                None => cfg.cover.size,
            };
            let resolver = api::Resolver::new(&cfg.api)?;
            let cover = resolver
                .cover(
                    &title,
                    artist.as_deref().unwrap_or(""),
                    None,
                    size,
                )
                .await;
            println!("{}", cover.url().unwrap_or("default"));
        }
        Command::Download {
            title,
            artist,
            source,
            output,
            print_url,
        } => {
            let resolver = api::Resolver::new(&cfg.api)?;
            let source = source.unwrap_or_else(|| cfg.api.default_source.clone());
            let track = first_hit(&resolver, &title, artist.as_deref(), &source).await?;
            let url = resolver
                .audio_url(&track)
                .await
                .with_context(|| format!("no audio url for {} [{}:{}]", track.title, track.source, track.id))?;
            if print_url {
                println!("{url}");
                return Ok(());
            }
            let dest = match output {
                Some(p) if !p.is_dir() => p,
                Some(dir) => dir.join(api::download::file_name(&track, &url)),
                None => cfg
                    .paths
                    .download_dir
                    .join(api::download::file_name(&track, &url)),
            };
            let bytes = api::download::Downloader::new(&cfg.api)?
                .save(&url, &dest)
                .await?;
            println!("Saved {} ({} KiB)", dest.display(), bytes / 1024);
        }
        Command::Rankings { limit } => {
            let rankings = api::rankings::RankingClient::new(&cfg.api)?.list().await?;
            if rankings.is_empty() {
                println!("No charts available.");
            }
            for (i, r) in rankings.iter().take(limit).enumerate() {
                println!("{:>2}. {} ({})", i + 1, r.name, r.update_frequency);
                if !r.description.is_empty() {
                    println!("    {}", r.description);
                }
                if let Some(cover) = &r.cover {
                    println!("    {cover}");
                }
            }
        }
        Command::Fav { cmd } => {
            let mut favorites = storage::Storage::open(&favorites_path(&cfg))?;
            match cmd {
                FavCommand::List => {
                    for (i, f) in favorites.list()?.iter().enumerate() {
                        println!("{:>3}. {} - {} [{}:{}]", i + 1, f.title, f.artist, f.source, f.id);
                    }
                }
                FavCommand::Play { number } => {
                    let fav = favorites
                        .list()?
                        .into_iter()
                        .nth(number.saturating_sub(1))
                        .with_context(|| format!("no favorite number {number}"))?;
                    drop(favorites);
                    let resolver = api::Resolver::new(&cfg.api)?;
                    run_player(cfg, cfg_path, resolver, fav.into()).await?;
                }
                FavCommand::Add {
                    id,
                    source,
                    title,
                    artist,
                } => {
                    let source = source.unwrap_or_else(|| cfg.api.default_source.clone());
                    favorites.add(&storage::Favorite {
                        id,
                        title,
                        artist,
                        source,
                    })?;
                    println!("Added favorite.");
                }
                FavCommand::Remove { id, source } => {
                    let source = source.unwrap_or_else(|| cfg.api.default_source.clone());
                    if favorites.remove(&id, &source)? {
                        println!("Removed favorite.");
                    } else {
                        println!("Not a favorite: {source}:{id}");
                    }
                }
                FavCommand::Export { path } => {
                    let n = favorites.export_json(&path)?;
                    println!("Exported {n} favorites to {}", path.display());
                }
                FavCommand::Import { path } => {
                    let n = favorites.import_json(&path)?;
                    println!("Imported {n} favorites.");
                }
                FavCommand::Clear => {
                    favorites.clear()?;
                    println!("Cleared favorites.");
                }
            }
        }
        Command::Audio { cmd } => match cmd {
            AudioCommand::List => {
                print!("{}", player::mpv::audio_device_help().await?);
            }
            AudioCommand::Set { device } => {
                let mut cfg = cfg;
                cfg.player.audio_device = Some(device);
                config::save(&cfg, Some(&cfg_path)).context("save config")?;
                println!("Updated audio device in config.");
            }
            AudioCommand::Clear => {
                let mut cfg = cfg;
                cfg.player.audio_device = None;
                config::save(&cfg, Some(&cfg_path)).context("save config")?;
                println!("Cleared audio device override.");
            }
        },
    }

    Ok(())
}

async fn run_player(
    cfg: config::Config,
    cfg_path: PathBuf,
    resolver: api::Resolver,
    track: api::Track,
) -> anyhow::Result<()> {
    let favorites = storage::Storage::open(&favorites_path(&cfg))?;
    let mut terminal = tui::TerminalGuard::enter().context("init terminal")?;
    let mut app = app::App::new(cfg, cfg_path, resolver, favorites);
    app.run(terminal.terminal_mut(), track).await
}

/// First search result for `title` (plus `artist` when given) on `source`.
async fn first_hit(
    resolver: &api::Resolver,
    title: &str,
    artist: Option<&str>,
    source: &str,
) -> anyhow::Result<api::Track> {
    let keyword = match artist {
        Some(a) => format!("{title} {a}"),
        None => title.to_string(),
    };
    resolver
        .aggregator()
        .search(&keyword, source, 1)
        .await?
        .into_iter()
        .next()
        .with_context(|| format!("no results for {keyword:?} on {source}"))
}

fn favorites_path(cfg: &config::Config) -> PathBuf {
    cfg.paths.data_dir.join("favorites.sqlite3")
}

fn init_logging(log_file: Option<&Path>) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("create dir {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("open {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(std::sync::Mutex::new(file))
                .init();
        }
        None => builder.with_writer(std::io::stderr).init(),
    }
    Ok(())
}

fn print_tracks(tracks: &[api::Track]) {
    for (i, t) in tracks.iter().enumerate() {
        if t.artist.is_empty() {
            println!("{:>2}. {} [{}:{}]", i + 1, t.title, t.source, t.id);
        } else {
            println!("{:>2}. {} - {} [{}:{}]", i + 1, t.title, t.artist, t.source, t.id);
        }
    }
}

/// `mm:ss.xx`
fn format_timestamp(secs: f64) -> String {
    let centis = (secs.max(0.0) * 100.0).round() as u64;
    format!("{:02}:{:02}.{:02}", centis / 6000, (centis / 100) % 60, centis % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_bare_query_plays() {
        let cli = Cli::try_parse_from(["pulsic", "some", "song"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.query.join(" "), "some song");

        let cli = Cli::try_parse_from(["pulsic", "layout", "a.lrc", "--at", "12.5"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Layout { at, rows: 24, width: 60, from: None, .. }) if at == 12.5
        ));
    }

    #[test]
    fn test_download_and_rankings_args() {
        let cli = Cli::try_parse_from(["pulsic", "download", "Song", "-o", "/tmp/x.mp3"]).unwrap();
        assert!(matches!(
            cli.command,
            Some(Command::Download { ref title, print_url: false, output: Some(_), .. }) if title == "Song"
        ));

        let cli = Cli::try_parse_from(["pulsic", "rankings"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Rankings { limit: 12 })));
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0.0), "00:00.00");
        assert_eq!(format_timestamp(83.45), "01:23.45");
        assert_eq!(format_timestamp(599.999), "10:00.00");
    }
}
