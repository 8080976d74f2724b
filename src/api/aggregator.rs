//! Music aggregator API client
//!
//! One endpoint, dispatched by the `types` query parameter:
//! - `types=search` returns an array of tracks
//! - `types=url` returns `{ "url": ... }`
//! - `types=lyric` returns `{ "lyric": ..., "tlyric": ... }`

use super::models::Track;
use super::rate_limit::RateLimiter;
use crate::config::ApiConfig;
use anyhow::Context;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AggregatorClient {
    http: reqwest::Client,
    base_url: String,
    search_count: u32,
    limiter: RateLimiter,
}

impl AggregatorClient {
    pub fn new(cfg: &ApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pulsic/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            http,
            base_url: cfg.aggregator_base.clone(),
            search_count: cfg.search_count,
            limiter: RateLimiter::new(
                cfg.rate_limit.max_calls,
                Duration::from_secs(cfg.rate_limit.window_secs),
            ),
        })
    }

    /// Search tracks by keyword.
    pub async fn search(&self, keyword: &str, source: &str, page: u32) -> anyhow::Result<Vec<Track>> {
        let count = self.search_count.to_string();
        let page = page.max(1).to_string();
        let v = self
            .get(&[
                ("types", "search"),
                ("source", source),
                ("name", keyword),
                ("count", &count),
                ("pages", &page),
            ])
            .await?;
        let mut tracks = parse_search_results(&v);
        for t in tracks.iter_mut().filter(|t| t.source.is_empty()) {
            t.source = source.to_string();
        }
        tracing::debug!(keyword, source, results = tracks.len(), "aggregator search");
        Ok(tracks)
    }

    /// Playable audio URL for a track, if the source has one.
    pub async fn audio_url(&self, id: &str, source: &str, bitrate: u32) -> anyhow::Result<Option<String>> {
        let br = bitrate.to_string();
        let v = self
            .get(&[("types", "url"), ("source", source), ("id", id), ("br", &br)])
            .await?;
        Ok(non_empty_str(&v, "url"))
    }

    /// Raw LRC text for a track.
    pub async fn lyric(&self, id: &str, source: &str) -> anyhow::Result<Option<String>> {
        let v = self
            .get(&[("types", "lyric"), ("source", source), ("id", id)])
            .await?;
        Ok(non_empty_str(&v, "lyric"))
    }

    async fn get(&self, params: &[(&str, &str)]) -> anyhow::Result<Value> {
        self.limiter.acquire()?;

        let url = build_url(&self.base_url, params);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .context("send aggregator request")?;

        if !response.status().is_success() {
            anyhow::bail!("aggregator API error: {}", response.status());
        }
        response.json().await.context("parse aggregator json")
    }
}

/// `base?k=v&...` with every value url-encoded.
pub(crate) fn build_url(base: &str, params: &[(&str, &str)]) -> String {
    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{base}?{query}")
}

/// Tracks from a search response; anything that is not an array is "no results".
pub fn parse_search_results(v: &Value) -> Vec<Track> {
    let Some(items) = v.as_array() else {
        return Vec::new();
    };
    items.iter().filter_map(parse_track).collect()
}

fn parse_track(item: &Value) -> Option<Track> {
    let id = id_string(item.get("id")?)?;
    let title = item.get("name")?.as_str()?.to_string();
    let artist = match item.get("artist") {
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(|n| n.as_str())
            .collect::<Vec<_>>()
            .join(", "),
        Some(Value::String(s)) => s.clone(),
        _ => String::new(),
    };
    Some(Track {
        id,
        title,
        artist,
        album: item.get("album").and_then(|a| a.as_str()).map(str::to_string),
        pic_id: item.get("pic_id").and_then(id_string),
        lyric_id: item.get("lyric_id").and_then(id_string),
        source: item
            .get("source")
            .and_then(|s| s.as_str())
            .unwrap_or_default()
            .to_string(),
    })
}

/// Ids come back as strings from some sources and numbers from others.
fn id_string(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub(crate) fn non_empty_str(v: &Value, key: &str) -> Option<String> {
    v.get(key)
        .and_then(|s| s.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_search_results() {
        let v = json!([
            {
                "id": "12345",
                "name": "Sunny Day",
                "artist": ["Jay Chou", "Someone"],
                "album": "Ye Hui Mei",
                "pic_id": "abc",
                "lyric_id": 12345,
                "source": "joox"
            },
            { "name": "missing id" }
        ]);
        let tracks = parse_search_results(&v);
        assert_eq!(tracks.len(), 1);
        let t = &tracks[0];
        assert_eq!(t.id, "12345");
        assert_eq!(t.artist, "Jay Chou, Someone");
        assert_eq!(t.lyric_id.as_deref(), Some("12345"));
        assert_eq!(t.source, "joox");
    }

    #[test]
    fn test_non_array_is_empty() {
        assert!(parse_search_results(&json!({"error": "bad"})).is_empty());
        assert!(parse_search_results(&json!(null)).is_empty());
    }

    #[test]
    fn test_build_url_encodes() {
        let url = build_url("https://x/api.php", &[("types", "search"), ("name", "a b&c")]);
        assert_eq!(url, "https://x/api.php?types=search&name=a%20b%26c");
    }

    #[test]
    fn test_non_empty_str() {
        assert_eq!(non_empty_str(&json!({"url": " "}), "url"), None);
        assert_eq!(non_empty_str(&json!({"url": "http://a"}), "url").as_deref(), Some("http://a"));
        assert_eq!(non_empty_str(&json!({}), "url"), None);
    }
}
