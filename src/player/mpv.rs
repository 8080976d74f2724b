//! mpv as the audio host
//!
//! mpv runs idle with a JSON IPC socket. Commands go out as JSON lines and
//! property changes come back as events, mapped onto [`PlayerEvent`]. The
//! `time-pos` observation is what drives the lyrics sync engine.

use crate::app::events::{Event, PlayerEvent};
use anyhow::Context;
use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf},
    net::UnixStream,
    process::{Child, Command},
    sync::{mpsc, Mutex},
};

/// Properties observed on startup, keyed by their observer id.
const OBSERVED: [(u64, &str); 4] = [
    (1, "time-pos"),
    (2, "duration"),
    (3, "pause"),
    (4, "eof-reached"),
];

#[derive(Debug)]
pub struct MpvHandle {
    child: Child,
    socket_path: PathBuf,
    writer: Mutex<WriteHalf<UnixStream>>,
    request_id: AtomicU64,
}

impl MpvHandle {
    pub async fn spawn(
        event_tx: mpsc::Sender<Event>,
        audio_device: Option<&str>,
        log_file: Option<&Path>,
    ) -> anyhow::Result<Self> {
        let socket_path =
            std::env::temp_dir().join(format!("pulsic-mpv-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&socket_path);

        let mut cmd = Command::new("mpv");
        cmd.args(["--no-video", "--idle=yes", "--input-terminal=no", "--really-quiet"]);
        if let Some(dev) = audio_device {
            cmd.arg(format!("--audio-device={dev}"));
        }
        if let Some(p) = log_file {
            cmd.arg(format!("--log-file={}", p.display()));
        }
        let child = cmd
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .context("spawn mpv")?;
        tracing::debug!(socket = %socket_path.display(), "spawned mpv");

        let stream = connect_with_retry(&socket_path, Duration::from_secs(5)).await?;
        let (reader, writer) = tokio::io::split(stream);
        tokio::spawn(read_events_loop(reader, event_tx));

        let this = Self {
            child,
            socket_path,
            writer: Mutex::new(writer),
            request_id: AtomicU64::new(1),
        };

        // warn-level log messages surface load failures (bad URL, codec)
        this.command(json!({"command":["request_log_messages", "warn"]}))
            .await?;
        for (id, name) in OBSERVED {
            this.command(json!({"command":["observe_property", id, name]}))
                .await?;
        }

        Ok(this)
    }

    pub async fn load_url(&self, url: &str) -> anyhow::Result<()> {
        tracing::info!("loading stream");
        self.command(json!({"command":["loadfile", url, "replace"]})).await
    }

    pub async fn toggle_pause(&self) -> anyhow::Result<()> {
        self.command(json!({"command":["cycle", "pause"]})).await
    }

    pub async fn seek_relative(&self, seconds: f64) -> anyhow::Result<()> {
        self.command(json!({"command":["seek", seconds, "relative"]}))
            .await
    }

    pub async fn seek_absolute(&self, seconds: f64) -> anyhow::Result<()> {
        self.command(json!({"command":["seek", seconds.max(0.0), "absolute"]}))
            .await
    }

    pub async fn set_volume(&self, volume_0_100: u8) -> anyhow::Result<()> {
        self.command(json!({"command":["set_property", "volume", volume_0_100.min(100)]}))
            .await
    }

    async fn command(&self, mut v: Value) -> anyhow::Result<()> {
        if let Value::Object(ref mut o) = v {
            let id = self.request_id.fetch_add(1, Ordering::Relaxed);
            o.entry("request_id").or_insert(Value::from(id));
        }
        let mut line = serde_json::to_vec(&v).context("encode mpv json")?;
        line.push(b'\n');

        let mut w = self.writer.lock().await;
        w.write_all(&line).await.context("write mpv ipc")?;
        w.flush().await.context("flush mpv ipc")?;
        Ok(())
    }
}

impl Drop for MpvHandle {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
        let _ = std::fs::remove_file(&self.socket_path);
    }
}

/// Output of `mpv --audio-device=help`.
pub async fn audio_device_help() -> anyhow::Result<String> {
    let out = Command::new("mpv")
        .args(["--audio-device=help", "--no-video", "--idle=no"])
        .output()
        .await
        .context("run mpv --audio-device=help")?;
    let mut text = String::from_utf8_lossy(&out.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&out.stderr));
    Ok(text)
}

async fn connect_with_retry(path: &Path, timeout: Duration) -> anyhow::Result<UnixStream> {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        match UnixStream::connect(path).await {
            Ok(s) => return Ok(s),
            Err(e) if tokio::time::Instant::now() > deadline => {
                return Err(e).with_context(|| format!("connect to mpv ipc {}", path.display()));
            }
            Err(_) => tokio::time::sleep(Duration::from_millis(50)).await,
        }
    }
}

async fn read_events_loop(reader: ReadHalf<UnixStream>, event_tx: mpsc::Sender<Event>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(v) = serde_json::from_str::<Value>(&line) else {
            continue;
        };
        if let Some(pe) = map_mpv_message(&v)
            && event_tx.send(Event::Player(pe)).await.is_err()
        {
            break;
        }
    }
    tracing::debug!("mpv event stream closed");
}

/// Translate one IPC message into a player event, if it is one we care about.
fn map_mpv_message(v: &Value) -> Option<PlayerEvent> {
    // command replies: {"request_id":..., "error":"..."}
    if v.get("request_id").is_some() {
        return match v.get("error")?.as_str()? {
            "success" => None,
            err => Some(PlayerEvent::Error(format!("mpv ipc error: {err}"))),
        };
    }

    match v.get("event")?.as_str()? {
        "property-change" => {
            let data = v.get("data");
            match v.get("name")?.as_str()? {
                // null while idle or between files
                "time-pos" => Some(PlayerEvent::Position {
                    seconds: data?.as_f64()?,
                }),
                "duration" => Some(PlayerEvent::Duration {
                    seconds: data?.as_f64()?,
                }),
                "pause" => Some(if data?.as_bool()? {
                    PlayerEvent::Paused
                } else {
                    PlayerEvent::Started
                }),
                "eof-reached" => data?.as_bool()?.then_some(PlayerEvent::Ended),
                _ => None,
            }
        }
        "end-file" => match v.get("reason").and_then(Value::as_str) {
            Some("error") => {
                let err = v.get("file_error").or_else(|| v.get("error"));
                let err = err.and_then(Value::as_str).unwrap_or("unknown");
                Some(PlayerEvent::Error(format!("mpv end-file error: {err}")))
            }
            Some("eof") => Some(PlayerEvent::Ended),
            _ => None,
        },
        "log-message" => {
            let level = v.get("level")?.as_str()?;
            let text = v.get("text")?.as_str()?.trim();
            (matches!(level, "warn" | "error" | "fatal") && !text.is_empty())
                .then(|| PlayerEvent::Error(format!("mpv {level}: {text}")))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(v: Value) -> Option<f64> {
        match map_mpv_message(&v) {
            Some(PlayerEvent::Position { seconds }) => Some(seconds),
            _ => None,
        }
    }

    #[test]
    fn test_time_pos() {
        assert_eq!(
            position(json!({"event":"property-change","id":1,"name":"time-pos","data":12.5})),
            Some(12.5)
        );
        // idle mpv reports null
        assert!(map_mpv_message(&json!({"event":"property-change","name":"time-pos","data":null})).is_none());
    }

    #[test]
    fn test_pause_and_eof() {
        assert!(matches!(
            map_mpv_message(&json!({"event":"property-change","name":"pause","data":true})),
            Some(PlayerEvent::Paused)
        ));
        assert!(matches!(
            map_mpv_message(&json!({"event":"property-change","name":"pause","data":false})),
            Some(PlayerEvent::Started)
        ));
        assert!(matches!(
            map_mpv_message(&json!({"event":"property-change","name":"eof-reached","data":true})),
            Some(PlayerEvent::Ended)
        ));
        assert!(map_mpv_message(&json!({"event":"property-change","name":"eof-reached","data":false})).is_none());
    }

    #[test]
    fn test_command_replies() {
        assert!(map_mpv_message(&json!({"request_id":3,"error":"success","data":null})).is_none());
        assert!(matches!(
            map_mpv_message(&json!({"request_id":4,"error":"property unavailable"})),
            Some(PlayerEvent::Error(_))
        ));
    }

    #[test]
    fn test_end_file() {
        assert!(matches!(
            map_mpv_message(&json!({"event":"end-file","reason":"error","file_error":"loading failed"})),
            Some(PlayerEvent::Error(e)) if e.contains("loading failed")
        ));
        assert!(matches!(
            map_mpv_message(&json!({"event":"end-file","reason":"eof"})),
            Some(PlayerEvent::Ended)
        ));
        // replaced by the next loadfile
        assert!(map_mpv_message(&json!({"event":"end-file","reason":"stop"})).is_none());
    }

    #[test]
    fn test_log_messages() {
        assert!(map_mpv_message(&json!({"event":"log-message","level":"info","text":"hi"})).is_none());
        assert!(matches!(
            map_mpv_message(&json!({"event":"log-message","level":"error","text":"no audio\n"})),
            Some(PlayerEvent::Error(e)) if e == "mpv error: no audio"
        ));
    }
}
