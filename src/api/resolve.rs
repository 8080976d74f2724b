//! Track, cover and lyrics resolution
//!
//! Everything here degrades instead of failing: a network error, a missing
//! field or an exhausted rate limit turns into "no audio URL", the default
//! cover, or an empty lyrics timeline, with a warning in the log.

use super::aggregator::AggregatorClient;
use super::models::{Cover, Track};
use super::qqmusic::QqMusicClient;
use crate::config::ApiConfig;
use crate::lyrics::Timeline;

#[derive(Debug, Clone)]
pub struct Resolver {
    aggregator: AggregatorClient,
    qq: QqMusicClient,
    audio_proxy: Option<String>,
    bitrate: u32,
}

impl Resolver {
    pub fn new(cfg: &ApiConfig) -> anyhow::Result<Self> {
        Ok(Self {
            aggregator: AggregatorClient::new(cfg)?,
            qq: QqMusicClient::new(cfg)?,
            audio_proxy: cfg.audio_proxy.clone().filter(|p| !p.trim().is_empty()),
            bitrate: cfg.bitrate,
        })
    }

    pub fn aggregator(&self) -> &AggregatorClient {
        &self.aggregator
    }

    /// Playable URL, routed through the audio proxy when one is configured.
    pub async fn audio_url(&self, track: &Track) -> Option<String> {
        match self
            .aggregator
            .audio_url(&track.id, &track.source, self.bitrate)
            .await
        {
            Ok(Some(url)) => Some(match &self.audio_proxy {
                Some(proxy) => proxied_url(proxy, &url),
                None => url,
            }),
            Ok(None) => {
                tracing::warn!(id = %track.id, source = %track.source, "no audio url");
                None
            }
            Err(e) => {
                tracing::warn!(id = %track.id, "audio url lookup failed: {e:#}");
                None
            }
        }
    }

    /// Lyrics timeline: aggregator first, then the QQ music lookup.
    pub async fn lyrics(&self, track: &Track) -> Timeline {
        let lyric_id = track.lyric_id.as_deref().unwrap_or(&track.id);
        match self.aggregator.lyric(lyric_id, &track.source).await {
            Ok(text) => {
                if let Some(timeline) = non_empty_timeline(text.as_deref()) {
                    return timeline;
                }
            }
            Err(e) => tracing::warn!(id = %lyric_id, "aggregator lyric lookup failed: {e:#}"),
        }

        match self.qq_lyric(track).await {
            Ok(text) => non_empty_timeline(text.as_deref()).unwrap_or_default(),
            Err(e) => {
                tracing::warn!(title = %track.title, "qq lyric lookup failed: {e:#}");
                Timeline::empty()
            }
        }
    }

    /// Cover art for `title`/`artist`; a `pic_id` that is already a URL wins.
    pub async fn cover(&self, title: &str, artist: &str, pic_id: Option<&str>, size: u32) -> Cover {
        if let Some(url) = pic_id.filter(|p| p.starts_with("http://") || p.starts_with("https://")) {
            return Cover::Remote(url.to_string());
        }

        match self.qq_cover(title, artist, size).await {
            Ok(Some(url)) => Cover::Remote(url),
            Ok(None) => Cover::Default,
            Err(e) => {
                tracing::warn!(title, artist, "cover lookup failed: {e:#}");
                Cover::Default
            }
        }
    }

    async fn qq_lyric(&self, track: &Track) -> anyhow::Result<Option<String>> {
        let Some(info) = self.qq.search_song(&track.title, &track.artist).await? else {
            return Ok(None);
        };
        self.qq.lyric(&info.songmid).await
    }

    async fn qq_cover(&self, title: &str, artist: &str, size: u32) -> anyhow::Result<Option<String>> {
        let albummid = self
            .qq
            .search_song(title, artist)
            .await?
            .and_then(|info| info.albummid);
        match albummid {
            Some(mid) => self.qq.cover_url(&mid, size).await,
            None => Ok(None),
        }
    }
}

/// `proxy?url=<encoded>`, or `proxy&url=` when the proxy already has a query.
pub fn proxied_url(proxy: &str, url: &str) -> String {
    let sep = if proxy.contains('?') { '&' } else { '?' };
    format!("{proxy}{sep}url={}", urlencoding::encode(url))
}

fn non_empty_timeline(text: Option<&str>) -> Option<Timeline> {
    let text = text?.trim();
    if text.is_empty() {
        return None;
    }
    let timeline = Timeline::parse(text);
    (!timeline.is_empty()).then_some(timeline)
}
