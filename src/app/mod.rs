pub mod actions;
pub mod events;
pub mod state;

use crate::api::{Resolver, Track};
use crate::config::Config;
use crate::input;
use crate::lyrics::{SyncEngine, Timeline};
use crate::player::MpvHandle;
use crate::storage::{Favorite, Storage};
use crate::tui::{self, widgets::root, TuiTerminal};
use actions::Action;
use anyhow::Context;
use events::{Event, NetworkEvent, PlayerEvent};
use ratatui::layout::Rect;
use state::{AppState, Toast};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Redraw interval while lyric lines are moving.
const FRAME_INTERVAL: Duration = Duration::from_millis(33);

pub struct App {
    cfg: Config,
    config_path: PathBuf,
    state: AppState,
    resolver: Resolver,
    storage: Storage,
    engine: SyncEngine,
    mpv: Option<MpvHandle>,
    viewport: Rect,
    frame_pending: bool,
}

impl App {
    pub fn new(cfg: Config, config_path: PathBuf, resolver: Resolver, storage: Storage) -> Self {
        let state = AppState::new(
            cfg.player.volume,
            Duration::from_millis(cfg.lyrics.transition_ms),
        );
        let engine = SyncEngine::new(cfg.lyrics.sync_config(0));
        Self {
            cfg,
            config_path,
            state,
            resolver,
            storage,
            engine,
            mpv: None,
            viewport: Rect::default(),
            frame_pending: false,
        }
    }

    pub async fn run(&mut self, terminal: &mut TuiTerminal, track: Track) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<Event>(256);

        input::spawn_input_task(tx.clone());
        // No constant ticker: redraws follow input, player and network
        // events, plus animation frames while lines are moving.

        let mpv_log = self.cfg.paths.data_dir.join("mpv.log");
        match MpvHandle::spawn(
            tx.clone(),
            self.cfg.player.audio_device.as_deref(),
            Some(&mpv_log),
        )
        .await
        {
            Ok(h) => self.mpv = Some(h),
            Err(e) => {
                tracing::warn!("mpv unavailable: {e:#}");
                self.state.toast = Some(Toast::error(format!("mpv disabled: {e:#}")));
            }
        }

        self.play(track, &tx);
        self.draw(terminal, &tx)?;

        while let Some(ev) = rx.recv().await {
            match ev {
                Event::Input(ie) => {
                    if let Some(action) = input::map_input_to_action(ie) {
                        self.handle_action(action).await;
                    }
                }
                Event::Player(pe) => self.handle_player(pe),
                Event::Network(ne) => self.handle_network(ne).await,
                Event::Frame => self.frame_pending = false,
            }

            if self.state.should_quit {
                break;
            }

            self.draw(terminal, &tx)?;
        }

        self.save_state_on_quit();
        Ok(())
    }

    fn draw(&mut self, terminal: &mut TuiTerminal, tx: &mpsc::Sender<Event>) -> anyhow::Result<()> {
        self.sync_viewport(terminal)?;

        let now = Instant::now();
        self.state.lyrics.advance(now);
        tui::draw(terminal, &mut self.state, now)?;

        if self.state.lyrics.is_animating() && !self.frame_pending {
            self.frame_pending = true;
            let tx = tx.clone();
            tokio::spawn(async move {
                tokio::time::sleep(FRAME_INTERVAL).await;
                let _ = tx.send(Event::Frame).await;
            });
        }
        Ok(())
    }

    /// Re-wrap and re-anchor the lyrics when the terminal size changed.
    fn sync_viewport(&mut self, terminal: &TuiTerminal) -> anyhow::Result<()> {
        let size = terminal.size().context("terminal size")?;
        let viewport = root::lyrics_viewport(Rect::new(0, 0, size.width, size.height));
        if viewport == self.viewport {
            return Ok(());
        }
        tracing::debug!(width = viewport.width, height = viewport.height, "lyrics viewport");
        self.viewport = viewport;
        self.state.lyrics.set_width(viewport.width);
        let layout = self.engine.relayout(
            self.cfg.lyrics.sync_config(viewport.height),
            &self.state.lyrics,
        );
        self.state.lyrics.snap(&layout);
        Ok(())
    }

    fn save_state_on_quit(&mut self) {
        self.cfg.player.volume = self.state.volume;
        if let Err(e) = crate::config::save(&self.cfg, Some(&self.config_path)) {
            tracing::warn!("save config: {e:#}");
        }
    }

    /// Start resolving audio, lyrics and cover for `track`.
    fn play(&mut self, track: Track, tx: &mpsc::Sender<Event>) {
        tracing::info!(id = %track.id, source = %track.source, title = %track.title, "play");
        self.state.favorited = self
            .storage
            .is_favorited(&track.id, &track.source)
            .unwrap_or_else(|e| {
                tracing::warn!("favorite lookup: {e:#}");
                false
            });
        self.state.reset_track(track.clone());
        self.engine.load_track(Timeline::empty(), &self.state.lyrics);

        let resolver = self.resolver.clone();
        let tx2 = tx.clone();
        let t = track.clone();
        tokio::spawn(async move {
            let ev = match resolver.audio_url(&t).await {
                Some(url) => NetworkEvent::ResolvedStream { track: t, url },
                None => NetworkEvent::StreamUnavailable { track: t },
            };
            let _ = tx2.send(Event::Network(ev)).await;
        });

        let resolver = self.resolver.clone();
        let tx2 = tx.clone();
        let t = track.clone();
        tokio::spawn(async move {
            let timeline = resolver.lyrics(&t).await;
            let _ = tx2
                .send(Event::Network(NetworkEvent::LyricsLoaded {
                    track_id: t.id,
                    timeline,
                }))
                .await;
        });

        let resolver = self.resolver.clone();
        let tx2 = tx.clone();
        let size = self.cfg.cover.size;
        tokio::spawn(async move {
            let cover = resolver
                .cover(&track.title, &track.artist, track.pic_id.as_deref(), size)
                .await;
            let _ = tx2
                .send(Event::Network(NetworkEvent::CoverResolved {
                    track_id: track.id,
                    cover,
                }))
                .await;
        });
    }

    /// Feed a playback position to the sync engine.
    fn tick(&mut self, position: f64) {
        let outcome = self.engine.on_tick(position, &self.state.lyrics);
        if !outcome.layout.is_empty() {
            tracing::trace!(active = ?outcome.active_index, position, "lyrics advanced");
            self.state.lyrics.apply(&outcome.layout, Instant::now());
        }
    }

    async fn handle_action(&mut self, action: Action) {
        match action {
            Action::Quit => self.state.should_quit = true,
            Action::Resize => {}
            Action::TogglePause => {
                if let Some(mpv) = &self.mpv {
                    let r = mpv.toggle_pause().await;
                    self.report(r, "pause");
                }
            }
            Action::Seek(delta) => {
                if let Some(mpv) = &self.mpv {
                    let r = mpv.seek_relative(delta).await;
                    self.report(r, "seek");
                }
            }
            Action::Restart => {
                if let Some(mpv) = &self.mpv {
                    let r = mpv.seek_absolute(0.0).await;
                    self.report(r, "seek");
                }
            }
            Action::VolumeUp | Action::VolumeDown => {
                let volume = if action == Action::VolumeUp {
                    self.state.volume_up()
                } else {
                    self.state.volume_down()
                };
                if let Some(mpv) = &self.mpv {
                    let r = mpv.set_volume(volume).await;
                    self.report(r, "volume");
                }
            }
            Action::ToggleFavorite => self.toggle_favorite(),
        }
    }

    fn toggle_favorite(&mut self) {
        let Some(track) = &self.state.track else {
            return;
        };
        match self.storage.toggle(&Favorite::from(track)) {
            Ok(true) => {
                self.state.favorited = true;
                self.state.toast = Some(Toast::success("Added to favorites"));
            }
            Ok(false) => {
                self.state.favorited = false;
                self.state.toast = Some(Toast::success("Removed from favorites"));
            }
            Err(e) => {
                tracing::warn!("toggle favorite: {e:#}");
                self.state.toast = Some(Toast::error("Could not update favorites"));
            }
        }
    }

    fn report(&mut self, result: anyhow::Result<()>, what: &str) {
        if let Err(e) = result {
            tracing::warn!("mpv {what}: {e:#}");
            self.state.toast = Some(Toast::error(format!("{what} failed")));
        }
    }

    fn handle_player(&mut self, pe: PlayerEvent) {
        match pe {
            PlayerEvent::Started => self.state.paused = false,
            PlayerEvent::Paused => self.state.paused = true,
            PlayerEvent::Position { seconds } => {
                self.state.position_secs = seconds;
                self.tick(seconds);
            }
            PlayerEvent::Duration { seconds } => self.state.duration_secs = seconds,
            PlayerEvent::Ended => {
                self.state.paused = true;
                self.state.status = "Playback ended".into();
            }
            PlayerEvent::Error(e) => {
                tracing::warn!("{e}");
                self.state.status = format!("Player error: {e}");
            }
        }
    }

    async fn handle_network(&mut self, ne: NetworkEvent) {
        match ne {
            NetworkEvent::ResolvedStream { track, url } => {
                if !self.state.is_current(&track.id) {
                    return;
                }
                let Some(mpv) = &self.mpv else {
                    self.state.status = "mpv not available".into();
                    return;
                };
                let volume = mpv.set_volume(self.state.volume).await;
                let loaded = mpv.load_url(&url).await;
                self.report(volume, "volume");
                match loaded {
                    Ok(()) => {
                        tracing::debug!(%url, "stream loaded");
                        self.state.status = "Playing".into();
                    }
                    Err(e) => self.state.status = format!("mpv load failed: {e:#}"),
                }
            }
            NetworkEvent::StreamUnavailable { track } => {
                if self.state.is_current(&track.id) {
                    self.state.status = "No playable source for this track".into();
                    self.state.toast = Some(Toast::error("Stream unavailable"));
                }
            }
            NetworkEvent::LyricsLoaded { track_id, timeline } => {
                if !self.state.is_current(&track_id) {
                    return;
                }
                tracing::debug!(lines = timeline.len(), "lyrics loaded");
                self.state.lyrics_loading = false;
                self.state.lyrics.set_timeline(&timeline);
                let resting = self.engine.load_track(timeline, &self.state.lyrics);
                self.state.lyrics.snap(&resting);
                self.tick(self.state.position_secs);
            }
            NetworkEvent::CoverResolved { track_id, cover } => {
                if self.state.is_current(&track_id) {
                    self.state.cover = Some(cover);
                }
            }
        }
    }
}
