//! Saving resolved audio streams to disk

use super::models::Track;
use crate::config::ApiConfig;
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Extensions kept from the stream URL; anything else is saved as mp3.
const AUDIO_EXTENSIONS: [&str; 6] = ["mp3", "flac", "m4a", "aac", "ogg", "wav"];

#[derive(Debug, Clone)]
pub struct Downloader {
    http: reqwest::Client,
}

impl Downloader {
    pub fn new(cfg: &ApiConfig) -> anyhow::Result<Self> {
        // No overall timeout: a lossless track can take a while.
        let http = reqwest::Client::builder()
            .user_agent(concat!("pulsic/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .context("build reqwest client")?;
        Ok(Self { http })
    }

    /// Stream `url` into `dest`, returning the number of bytes written.
    ///
    /// Data goes to `<dest>.part` first so an interrupted download never
    /// leaves a truncated file under the final name.
    pub async fn save(&self, url: &str, dest: &Path) -> anyhow::Result<u64> {
        if let Some(parent) = dest.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("create dir {}", parent.display()))?;
        }

        let mut response = self
            .http
            .get(url)
            .send()
            .await
            .context("send download request")?;
        if !response.status().is_success() {
            anyhow::bail!("download failed: {}", response.status());
        }

        let part = part_path(dest);
        let mut file = tokio::fs::File::create(&part)
            .await
            .with_context(|| format!("create {}", part.display()))?;
        let mut written = 0u64;
        while let Some(chunk) = response.chunk().await.context("read download body")? {
            file.write_all(&chunk)
                .await
                .with_context(|| format!("write {}", part.display()))?;
            written += chunk.len() as u64;
        }
        file.flush().await.context("flush download")?;
        drop(file);

        tokio::fs::rename(&part, dest)
            .await
            .with_context(|| format!("move download to {}", dest.display()))?;
        tracing::info!(bytes = written, path = %dest.display(), "download finished");
        Ok(written)
    }
}

/// `Artist - Title.ext`, with characters that are unsafe in file names replaced.
pub fn file_name(track: &Track, url: &str) -> String {
    let stem = if track.artist.is_empty() {
        track.title.clone()
    } else {
        format!("{} - {}", track.artist, track.title)
    };
    let stem = sanitize(&stem);
    let stem = if stem.is_empty() { sanitize(&track.id) } else { stem };
    format!("{stem}.{}", extension(url))
}

fn sanitize(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect::<String>()
        .trim()
        .trim_matches('.')
        .to_string()
}

fn extension(url: &str) -> &'static str {
    let path = url.split(['?', '#']).next().unwrap_or_default();
    let ext = path
        .rsplit('/')
        .next()
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase());
    ext.and_then(|ext| AUDIO_EXTENSIONS.into_iter().find(|known| *known == ext))
        .unwrap_or("mp3")
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn track(title: &str, artist: &str) -> Track {
        Track {
            id: "42".into(),
            title: title.into(),
            artist: artist.into(),
            album: None,
            pic_id: None,
            lyric_id: None,
            source: "joox".into(),
        }
    }

    #[test]
    fn test_file_name() {
        let t = track("Song: Live?", "A/B");
        assert_eq!(file_name(&t, "https://cdn.x/a/b.FLAC?vkey=1"), "A_B - Song_ Live_.flac");
        assert_eq!(file_name(&track("Solo", ""), "https://cdn.x/stream"), "Solo.mp3");
        assert_eq!(file_name(&track("...", ""), "https://cdn.x/a.m4a#t=1"), "42.m4a");
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("http://a/b.ogg"), "ogg");
        assert_eq!(extension("http://a.com/play?file=x.flac"), "mp3");
        assert_eq!(extension("http://a/b.exe"), "mp3");
    }

    #[tokio::test]
    async fn test_save_streams_body_to_file() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 11\r\nConnection: close\r\n\r\nhello audio")
                .await
                .unwrap();
        });

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("song.mp3");
        let downloader = Downloader {
            http: reqwest::Client::builder().no_proxy().build().unwrap(),
        };
        let written = downloader
            .save(&format!("http://{addr}/song.mp3"), &dest)
            .await
            .unwrap();

        assert_eq!(written, 11);
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello audio");
        assert!(!part_path(&dest).exists());
    }
}
