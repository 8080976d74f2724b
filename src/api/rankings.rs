//! Chart listing client
//!
//! The endpoint answers `{ "code": 200, "data": [ ... ] }` where each entry
//! carries `name`, `description`, `cover` and `update_frequency`.

use super::models::Ranking;
use crate::config::ApiConfig;
use anyhow::Context;
use serde_json::Value;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct RankingClient {
    http: reqwest::Client,
    url: String,
}

impl RankingClient {
    pub fn new(cfg: &ApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pulsic/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build reqwest client")?;
        Ok(Self {
            http,
            url: cfg.rank_url.clone(),
        })
    }

    pub async fn list(&self) -> anyhow::Result<Vec<Ranking>> {
        let response = self
            .http
            .get(&self.url)
            .send()
            .await
            .context("send ranking request")?;
        if !response.status().is_success() {
            anyhow::bail!("ranking API error: {}", response.status());
        }
        let v: Value = response.json().await.context("parse ranking json")?;
        let rankings = parse_rankings(&v)?;
        tracing::debug!(count = rankings.len(), "fetched rankings");
        Ok(rankings)
    }
}

/// Entries of a chart response. A non-200 `code` is an error; a missing or
/// empty `data` array is simply "no charts".
pub fn parse_rankings(v: &Value) -> anyhow::Result<Vec<Ranking>> {
    let code = v.get("code").and_then(Value::as_i64);
    if code != Some(200) {
        anyhow::bail!("ranking API returned code {code:?}");
    }
    let Some(items) = v.get("data").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    Ok(items.iter().filter_map(parse_ranking).collect())
}

fn parse_ranking(item: &Value) -> Option<Ranking> {
    let text = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .unwrap_or_default()
            .to_string()
    };
    let name = text("name");
    if name.is_empty() {
        return None;
    }
    let cover = text("cover");
    Some(Ranking {
        name,
        description: text("description"),
        cover: (!cover.is_empty()).then_some(cover),
        update_frequency: text("update_frequency"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rankings() {
        let v = json!({
            "code": 200,
            "data": [
                {
                    "id": 19723756,
                    "name": "Soaring",
                    "description": "Fastest climbers this week",
                    "cover": "https://p1.music.126.net/a.jpg",
                    "update_frequency": "daily"
                },
                { "name": "No cover", "description": "", "cover": "" },
                { "description": "nameless entries are skipped" }
            ]
        });
        let rankings = parse_rankings(&v).unwrap();
        assert_eq!(rankings.len(), 2);
        assert_eq!(rankings[0].name, "Soaring");
        assert_eq!(rankings[0].cover.as_deref(), Some("https://p1.music.126.net/a.jpg"));
        assert_eq!(rankings[0].update_frequency, "daily");
        assert_eq!(rankings[1].cover, None);
        assert_eq!(rankings[1].update_frequency, "");
    }

    #[test]
    fn test_parse_rankings_error_code() {
        assert!(parse_rankings(&json!({"code": 500, "message": "busy"})).is_err());
        assert!(parse_rankings(&json!([])).is_err());
    }

    #[test]
    fn test_parse_rankings_without_data() {
        assert!(parse_rankings(&json!({"code": 200})).unwrap().is_empty());
        assert!(parse_rankings(&json!({"code": 200, "data": []})).unwrap().is_empty());
    }
}
