//! QQ music compatible API client
//!
//! Used for what the aggregator does poorly: album art and a second lyrics
//! source. Every lookup starts from a `title artist` keyword search that
//! yields the song and album ids.

use super::aggregator::{build_url, non_empty_str};
use super::models::SongInfo;
use crate::config::ApiConfig;
use anyhow::Context;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::time::Duration;

static SIZE_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"T002R\d+x\d+").expect("size token pattern is valid"));

#[derive(Debug, Clone)]
pub struct QqMusicClient {
    http: reqwest::Client,
    base_url: String,
}

impl QqMusicClient {
    pub fn new(cfg: &ApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pulsic/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            http,
            base_url: cfg.qq_base.trim_end_matches('/').to_string(),
        })
    }

    /// First search hit for `title artist`.
    pub async fn search_song(&self, title: &str, artist: &str) -> anyhow::Result<Option<SongInfo>> {
        let keyword = format!("{title} {artist}");
        let v = self
            .get("/getSearchByKey", &[("key", keyword.trim()), ("limit", "1")])
            .await?;
        Ok(parse_song_info(&v))
    }

    pub async fn lyric(&self, songmid: &str) -> anyhow::Result<Option<String>> {
        let v = self.get("/getLyric", &[("songmid", songmid)]).await?;
        Ok(v.get("response").and_then(|r| non_empty_str(r, "lyric")))
    }

    /// Album art URL at `size`x`size`.
    pub async fn cover_url(&self, albummid: &str, size: u32) -> anyhow::Result<Option<String>> {
        let dims = format!("{size}x{size}");
        let v = self
            .get("/getImageUrl", &[("id", albummid), ("size", &dims)])
            .await?;
        Ok(parse_image_url(&v).map(|url| resize_cover_url(&url, size)))
    }

    async fn get(&self, endpoint: &str, params: &[(&str, &str)]) -> anyhow::Result<Value> {
        let url = build_url(&format!("{}{}", self.base_url, endpoint), params);
        let response = self
            .http
            .get(&url)
            .send()
            .await
            .with_context(|| format!("send {endpoint} request"))?;

        if !response.status().is_success() {
            anyhow::bail!("QQ music API error on {}: {}", endpoint, response.status());
        }
        response
            .json()
            .await
            .with_context(|| format!("parse {endpoint} json"))
    }
}

/// `response.data.song.list[0]`
pub fn parse_song_info(v: &Value) -> Option<SongInfo> {
    let first = v
        .pointer("/response/data/song/list")?
        .as_array()?
        .first()?;
    let songmid = non_empty_str(first, "songmid")?;
    Some(SongInfo {
        songmid,
        albummid: non_empty_str(first, "albummid"),
    })
}

/// `response.data.imageUrl`
pub fn parse_image_url(v: &Value) -> Option<String> {
    v.pointer("/response/data").and_then(|d| non_empty_str(d, "imageUrl"))
}

/// Rewrites the `T002R<w>x<h>` token so the CDN serves the requested size.
pub fn resize_cover_url(url: &str, size: u32) -> String {
    SIZE_TOKEN
        .replace(url, format!("T002R{size}x{size}").as_str())
        .into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_song_info() {
        let v = json!({
            "response": { "data": { "song": { "list": [
                { "songmid": "0039MnYb0qxYhV", "albummid": "000MkMni19ClKG" },
                { "songmid": "other" }
            ]}}}
        });
        let info = parse_song_info(&v).unwrap();
        assert_eq!(info.songmid, "0039MnYb0qxYhV");
        assert_eq!(info.albummid.as_deref(), Some("000MkMni19ClKG"));
    }

    #[test]
    fn test_parse_song_info_missing() {
        assert!(parse_song_info(&json!({"response": {"data": {"song": {"list": []}}}})).is_none());
        assert!(parse_song_info(&json!({"code": 500})).is_none());
        assert!(parse_song_info(&json!({"response": {"data": {"song": {"list": [{"songmid": ""}]}}}})).is_none());
    }

    #[test]
    fn test_parse_image_url() {
        let v = json!({"response": {"data": {"imageUrl": "https://y.gtimg.cn/music/photo_new/T002R300x300M000abc.jpg"}}});
        assert_eq!(
            parse_image_url(&v).as_deref(),
            Some("https://y.gtimg.cn/music/photo_new/T002R300x300M000abc.jpg")
        );
        assert!(parse_image_url(&json!({"response": {}})).is_none());
    }

    #[test]
    fn test_resize_cover_url() {
        assert_eq!(
            resize_cover_url("https://y.gtimg.cn/music/photo_new/T002R300x300M000abc.jpg", 150),
            "https://y.gtimg.cn/music/photo_new/T002R150x150M000abc.jpg"
        );
        assert_eq!(resize_cover_url("https://cdn/plain.jpg", 150), "https://cdn/plain.jpg");
    }
}
