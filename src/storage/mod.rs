use anyhow::Context;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A favorited track, identified by `(id, source)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    pub source: String,
}

impl From<&crate::api::Track> for Favorite {
    fn from(t: &crate::api::Track) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            artist: t.artist.clone(),
            source: t.source.clone(),
        }
    }
}

impl From<Favorite> for crate::api::Track {
    /// Favorites only keep what identifies a track; pictures and lyrics are
    /// looked up again by id.
    fn from(f: Favorite) -> Self {
        Self {
            id: f.id,
            title: f.title,
            artist: f.artist,
            album: None,
            pic_id: None,
            lyric_id: None,
            source: f.source,
        }
    }
}

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("create dir {}", parent.display()))?;
        }

        let conn = Connection::open(path).with_context(|| format!("open {}", path.display()))?;
        let s = Self { conn };
        s.init_schema()?;
        Ok(s)
    }

    #[cfg(test)]
    pub fn open_in_memory() -> anyhow::Result<Self> {
        let s = Self {
            conn: Connection::open_in_memory().context("open in-memory db")?,
        };
        s.init_schema()?;
        Ok(s)
    }

    fn init_schema(&self) -> anyhow::Result<()> {
        self.conn
            .execute_batch(
                r#"
CREATE TABLE IF NOT EXISTS favorites (
  id TEXT NOT NULL,
  source TEXT NOT NULL,
  title TEXT NOT NULL,
  artist TEXT NOT NULL,
  sort_order INTEGER NOT NULL,
  PRIMARY KEY (id, source)
);
"#,
            )
            .context("init schema")?;
        Ok(())
    }

    /// Add the track if absent, remove it if present. Returns whether it is
    /// favorited afterwards.
    pub fn toggle(&self, fav: &Favorite) -> anyhow::Result<bool> {
        if self.is_favorited(&fav.id, &fav.source)? {
            self.remove(&fav.id, &fav.source)?;
            tracing::debug!(id = %fav.id, source = %fav.source, "favorite removed");
            Ok(false)
        } else {
            self.add(fav)?;
            tracing::debug!(id = %fav.id, source = %fav.source, "favorite added");
            Ok(true)
        }
    }

    pub fn add(&self, fav: &Favorite) -> anyhow::Result<()> {
        self.conn
            .execute(
                r#"
INSERT INTO favorites(id, source, title, artist, sort_order)
VALUES(?1, ?2, ?3, ?4, ?5)
ON CONFLICT(id, source) DO UPDATE SET
  title=excluded.title,
  artist=excluded.artist
"#,
                params![fav.id, fav.source, fav.title, fav.artist, self.next_order()?],
            )
            .context("add favorite")?;
        Ok(())
    }

    pub fn remove(&self, id: &str, source: &str) -> anyhow::Result<bool> {
        let n = self
            .conn
            .execute(
                "DELETE FROM favorites WHERE id=?1 AND source=?2",
                params![id, source],
            )
            .context("remove favorite")?;
        Ok(n > 0)
    }

    pub fn is_favorited(&self, id: &str, source: &str) -> anyhow::Result<bool> {
        let mut stmt = self
            .conn
            .prepare("SELECT 1 FROM favorites WHERE id=?1 AND source=?2")
            .context("prepare favorite lookup")?;
        let mut rows = stmt.query(params![id, source]).context("query favorite")?;
        Ok(rows.next().context("read favorite row")?.is_some())
    }

    /// Favorites in the order they were added.
    pub fn list(&self) -> anyhow::Result<Vec<Favorite>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, title, artist, source FROM favorites ORDER BY sort_order ASC")
            .context("prepare favorites list")?;

        let favorites = stmt
            .query_map([], |row| {
                Ok(Favorite {
                    id: row.get(0)?,
                    title: row.get(1)?,
                    artist: row.get(2)?,
                    source: row.get(3)?,
                })
            })
            .context("query favorites")?
            .collect::<Result<Vec<_>, _>>()
            .context("read favorites")?;

        Ok(favorites)
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        self.conn
            .execute("DELETE FROM favorites", [])
            .context("clear favorites")?;
        Ok(())
    }

    /// Write all favorites as a pretty JSON array.
    pub fn export_json(&self, path: &Path) -> anyhow::Result<usize> {
        let favorites = self.list()?;
        let raw = serde_json::to_string_pretty(&favorites).context("serialize favorites")?;
        std::fs::write(path, raw).with_context(|| format!("write {}", path.display()))?;
        Ok(favorites.len())
    }

    /// Replace all favorites with the JSON array in `path`.
    ///
    /// Anything other than an array of favorites is rejected and leaves the
    /// stored list untouched.
    pub fn import_json(&mut self, path: &Path) -> anyhow::Result<usize> {
        let raw = std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
        let favorites: Vec<Favorite> =
            serde_json::from_str(&raw).with_context(|| format!("parse {}", path.display()))?;

        let tx = self.conn.transaction().context("begin import")?;
        tx.execute("DELETE FROM favorites", [])
            .context("clear favorites")?;
        let mut inserted = 0;
        for (order, fav) in favorites.iter().enumerate() {
            inserted += tx.execute(
                r#"
INSERT INTO favorites(id, source, title, artist, sort_order)
VALUES(?1, ?2, ?3, ?4, ?5)
ON CONFLICT(id, source) DO NOTHING
"#,
                params![fav.id, fav.source, fav.title, fav.artist, order as i64],
            )
            .context("insert imported favorite")?;
        }
        tx.commit().context("commit import")?;

        tracing::info!(count = inserted, path = %path.display(), "imported favorites");
        Ok(inserted)
    }

    fn next_order(&self) -> anyhow::Result<i64> {
        self.conn
            .query_row(
                "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM favorites",
                [],
                |row| row.get(0),
            )
            .context("next favorite order")
    }
}
