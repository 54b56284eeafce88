//! SQLite-backed catalog store.

use crate::error::{CatalogError, Result};
use crate::model::{FileMetadata, Fragment, Status};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS file_metadata (
    fingerprint     TEXT PRIMARY KEY,
    name            TEXT NOT NULL,
    file_path       TEXT NOT NULL,
    publisher       TEXT NOT NULL,
    size            INTEGER NOT NULL,
    fragment_count  INTEGER NOT NULL,
    status          INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS fragment (
    fingerprint TEXT NOT NULL REFERENCES file_metadata(fingerprint) ON DELETE CASCADE,
    id          INTEGER NOT NULL,
    PRIMARY KEY (fingerprint, id)
);
";

/// A durable, locally persistent store mapping file fingerprints to metadata
/// and the set of fragments currently held.
///
/// Every connection enables `PRAGMA foreign_keys = ON` at open, since SQLite
/// does not default it on; the `fragment` table's cascade only fires with it
/// enabled.
///
/// Cheap to clone: every clone shares the same underlying connection, so a
/// seeder and whatever opened the catalog can hold independent handles to
/// the same store.
#[derive(Clone)]
pub struct Catalog {
    conn: Arc<Mutex<Connection>>,
}

impl Catalog {
    /// Open (creating if absent) the store at `path`, migrating its schema.
    pub async fn open(path: impl AsRef<Path>, verbose: bool) -> Result<Self> {
        let path = path.as_ref().to_owned();
        info!(path = %path.display(), "opening catalog");
        let conn = Connection::open(&path).map_err(|e| CatalogError::Unavailable(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        if verbose {
            debug!("catalog opened in verbose mode");
        }
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory store. Used by tests.
    pub async fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// All locally known files, each with its held-fragment set populated.
    pub async fn list_local(&self) -> Result<Vec<FileMetadata>> {
        let conn = self.conn.lock().await;
        list_all(&conn)
    }

    /// Look up one file by fingerprint.
    pub async fn find_by_fingerprint(&self, fingerprint: &str) -> Result<Option<FileMetadata>> {
        let conn = self.conn.lock().await;
        find_by_fingerprint(&conn, fingerprint)
    }

    /// Look up one file by its display name. Used by `unpublish`/`delete`, which
    /// operate on names the way the CLI addresses files.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<FileMetadata>> {
        let conn = self.conn.lock().await;
        let fingerprint: Option<String> = conn
            .query_row(
                "SELECT fingerprint FROM file_metadata WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        match fingerprint {
            Some(fp) => find_by_fingerprint(&conn, &fp),
            None => Ok(None),
        }
    }

    /// Insert or update metadata for a fresh download resolved from a peer's
    /// listing. `held_fragments` starts empty.
    pub async fn insert_remote(&self, meta: &FileMetadata) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO file_metadata (fingerprint, name, file_path, publisher, size, fragment_count, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(fingerprint) DO UPDATE SET status = excluded.status",
            params![
                meta.fingerprint,
                meta.name,
                meta.file_path,
                meta.publisher,
                meta.size as i64,
                meta.fragment_count,
                meta.status.as_i64(),
            ],
        )?;
        Ok(())
    }

    /// Publish a local file: if its path is already known, only bump status
    /// (unless paused/downloading); otherwise fingerprint it, populate every
    /// fragment row, and insert as `Seeding`.
    pub async fn publish(&self, file_path: &str, publisher: &str) -> Result<()> {
        if !tokio::fs::try_exists(file_path).await.unwrap_or(false) {
            return Err(CatalogError::NotFound(file_path.to_string()));
        }

        let mut conn = self.conn.lock().await;
        let existing: Option<(String, i64)> = conn
            .query_row(
                "SELECT fingerprint, status FROM file_metadata WHERE file_path = ?1",
                params![file_path],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        if let Some((fingerprint, status)) = existing {
            let status = Status::from_i64(status).unwrap_or(Status::New);
            if matches!(status, Status::Paused | Status::Downloading) {
                debug!(%fingerprint, "publish no-op: file is paused or downloading");
                return Ok(());
            }
            conn.execute(
                "UPDATE file_metadata SET status = ?1 WHERE fingerprint = ?2",
                params![Status::Seeding.as_i64(), fingerprint],
            )?;
            info!(%fingerprint, "re-published existing file");
            return Ok(());
        }

        debug!(file_path, "no existing metadata, fingerprinting file");
        let size = tokio::fs::metadata(file_path).await?.len();
        let fingerprint = fileshare_files::fingerprint_file(file_path).await?;
        let fragment_count = fileshare_files::fragment_count(size);
        let name = Path::new(file_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_path.to_string());

        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO file_metadata (fingerprint, name, file_path, publisher, size, fragment_count, status)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                fingerprint,
                name,
                file_path,
                publisher,
                size as i64,
                fragment_count,
                Status::Seeding.as_i64(),
            ],
        )?;
        for id in 0..fragment_count {
            tx.execute(
                "INSERT INTO fragment (fingerprint, id) VALUES (?1, ?2)",
                params![fingerprint, id],
            )?;
        }
        tx.commit()?;
        info!(%fingerprint, fragment_count, "published file");
        Ok(())
    }

    /// Demote a seeding file to `Finished`. Refuses a paused file, matching the
    /// original's "can't mark an incomplete file as finished" rule.
    pub async fn unpublish(&self, name: &str) -> Result<()> {
        let conn = self.conn.lock().await;
        let row: Option<(String, i64)> = conn
            .query_row(
                "SELECT fingerprint, status FROM file_metadata WHERE name = ?1",
                params![name],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        let Some((fingerprint, status)) = row else {
            debug!(name, "unpublish no-op: file not in catalog");
            return Ok(());
        };
        let status = Status::from_i64(status).unwrap_or(Status::New);
        if status == Status::Paused {
            warn!(name, "refusing to unpublish: file is paused, not complete");
            return Err(CatalogError::InvalidTransition(format!(
                "{name} is paused, not finished"
            )));
        }
        conn.execute(
            "UPDATE file_metadata SET status = ?1 WHERE fingerprint = ?2",
            params![Status::Finished.as_i64(), fingerprint],
        )?;
        info!(name, "unpublished file");
        Ok(())
    }

    /// Remove a file's metadata and all its fragment rows, atomically.
    pub async fn delete(&self, name: &str) -> Result<()> {
        let mut conn = self.conn.lock().await;
        let fingerprint: Option<String> = conn
            .query_row(
                "SELECT fingerprint FROM file_metadata WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        let Some(fingerprint) = fingerprint else {
            debug!(name, "delete no-op: file not in catalog");
            return Ok(());
        };

        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM fragment WHERE fingerprint = ?1",
            params![fingerprint],
        )?;
        tx.execute(
            "DELETE FROM file_metadata WHERE fingerprint = ?1",
            params![fingerprint],
        )?;
        tx.commit()?;
        info!(name, %fingerprint, "deleted file");
        Ok(())
    }

    /// Idempotently record that fragment `id` of `fingerprint` is now held.
    pub async fn record_fragment(&self, fingerprint: &str, id: u32) -> Result<()> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT OR IGNORE INTO fragment (fingerprint, id) VALUES (?1, ?2)",
            params![fingerprint, id],
        )?;
        Ok(())
    }

    /// Persist a status transition.
    pub async fn save_status(&self, fingerprint: &str, status: Status) -> Result<()> {
        let conn = self.conn.lock().await;
        let changed = conn.execute(
            "UPDATE file_metadata SET status = ?1 WHERE fingerprint = ?2",
            params![status.as_i64(), fingerprint],
        )?;
        if changed == 0 {
            return Err(CatalogError::NotFound(fingerprint.to_string()));
        }
        Ok(())
    }
}

fn find_by_fingerprint(conn: &Connection, fingerprint: &str) -> Result<Option<FileMetadata>> {
    let row: Option<(String, String, String, u64, u32, i64)> = conn
        .query_row(
            "SELECT name, file_path, publisher, size, fragment_count, status
             FROM file_metadata WHERE fingerprint = ?1",
            params![fingerprint],
            |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get::<_, i64>(3)? as u64,
                    row.get(4)?,
                    row.get(5)?,
                ))
            },
        )
        .optional()?;
    let Some((name, file_path, publisher, size, fragment_count, status)) = row else {
        return Ok(None);
    };
    let held_fragments = held_fragments(conn, fingerprint)?;
    Ok(Some(FileMetadata {
        name,
        file_path,
        publisher,
        fingerprint: fingerprint.to_string(),
        size,
        fragment_count,
        held_fragments,
        status: Status::from_i64(status).unwrap_or(Status::New),
    }))
}

fn held_fragments(conn: &Connection, fingerprint: &str) -> Result<Vec<u32>> {
    let mut stmt = conn.prepare("SELECT id FROM fragment WHERE fingerprint = ?1 ORDER BY id")?;
    let ids = stmt
        .query_map(params![fingerprint], |row| row.get(0))?
        .collect::<std::result::Result<Vec<u32>, _>>()?;
    Ok(ids)
}

fn list_all(conn: &Connection) -> Result<Vec<FileMetadata>> {
    let mut stmt = conn.prepare("SELECT fingerprint FROM file_metadata")?;
    let fingerprints = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<std::result::Result<Vec<String>, _>>()?;
    let mut out = Vec::with_capacity(fingerprints.len());
    for fp in fingerprints {
        if let Some(m) = find_by_fingerprint(conn, &fp)? {
            out.push(m);
        }
    }
    debug!(count = out.len(), "listed local catalog");
    Ok(out)
}

/// A single fragment row, exposed for callers that want it without the whole
/// metadata record (e.g. the seeder's fragment-availability handler).
pub fn to_fragment(fingerprint: &str, id: u32) -> Fragment {
    Fragment {
        id,
        fingerprint: fingerprint.to_string(),
    }
}
