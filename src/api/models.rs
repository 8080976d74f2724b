use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: String,
    pub title: String,
    /// Artist names joined with ", "
    pub artist: String,
    pub album: Option<String>,
    pub pic_id: Option<String>,
    pub lyric_id: Option<String>,
    pub source: String,
}

/// Identifiers from the QQ music lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SongInfo {
    pub songmid: String,
    pub albummid: Option<String>,
}

/// Artwork for a track; `Default` means "show the bundled placeholder".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cover {
    Remote(String),
    Default,
}

impl Cover {
    pub fn url(&self) -> Option<&str> {
        match self {
            Cover::Remote(url) => Some(url),
            Cover::Default => None,
        }
    }
}

/// One entry of the chart listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ranking {
    pub name: String,
    pub description: String,
    pub cover: Option<String>,
    /// Human readable schedule, e.g. "updated every Thursday"
    pub update_frequency: String,
}
