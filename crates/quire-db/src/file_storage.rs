//! Note attachments: file metadata rows and the filesystem object store.
//!
//! ## Example
//!
//! ```rust,ignore
//! use quire_db::file_storage::{FilesystemStore, PgFileRepository};
//!
//! let store = FilesystemStore::new("/var/lib/quire/storage");
//! store.put("notes", "3f1c.pdf", &bytes).await?;
//!
//! let files = PgFileRepository::new(pool);
//! let attached = files.get_by_note_id(note_id).await?;
//! ```

use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

use quire_core::{Error, FileRepository, NoteFile, ObjectStore, Result};

// =============================================================================
// FILE METADATA
// =============================================================================

const FILE_COLUMNS: &str =
    "id, file_name, original_name, bucket, content_type, note_id, created_at, updated_at";

fn row_to_file(row: &PgRow) -> NoteFile {
    NoteFile {
        id: row.get("id"),
        file_name: row.get("file_name"),
        original_name: row.get("original_name"),
        bucket: row.get("bucket"),
        content_type: row.get("content_type"),
        note_id: row.get("note_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

/// PostgreSQL implementation of FileRepository.
pub struct PgFileRepository {
    pool: Pool<Postgres>,
}

impl PgFileRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Soft-delete the note's active file row, if any.
    pub async fn retire_for_note_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE file SET is_deleted = true, deleted_at = now()
             WHERE note_id = $1 AND is_deleted = false",
        )
        .bind(note_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    /// Insert a file row.
    pub async fn insert_tx(&self, tx: &mut Transaction<'_, Postgres>, file: &NoteFile) -> Result<()> {
        sqlx::query(
            "INSERT INTO file
                (id, file_name, original_name, bucket, content_type, note_id, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(file.id)
        .bind(&file.file_name)
        .bind(&file.original_name)
        .bind(&file.bucket)
        .bind(&file.content_type)
        .bind(file.note_id)
        .bind(file.created_at)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn get_by_note_id(&self, note_id: Uuid) -> Result<Option<NoteFile>> {
        let row = sqlx::query(&format!(
            "SELECT {FILE_COLUMNS} FROM file WHERE note_id = $1 AND is_deleted = false"
        ))
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.as_ref().map(row_to_file))
    }

    async fn replace_for_note(&self, file: &NoteFile) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.retire_for_note_tx(&mut tx, file.note_id).await?;
        self.insert_tx(&mut tx, file).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}

// =============================================================================
// FILESYSTEM OBJECT STORE
// =============================================================================

/// Object store keeping each bucket as a directory under a base path.
///
/// Path format: `{base_path}/{bucket}/{key}`
pub struct FilesystemStore {
    base_path: PathBuf,
}

impl FilesystemStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Resolve `bucket/key`, rejecting anything that could leave the base path.
    fn object_path(&self, bucket: &str, key: &str) -> Result<PathBuf> {
        for part in [bucket, key] {
            let path = Path::new(part);
            let plain = !part.is_empty()
                && path
                    .components()
                    .all(|c| matches!(c, Component::Normal(_)));
            if !plain {
                return Err(Error::InvalidInput(format!("invalid object path: {:?}", part)));
            }
        }
        Ok(self.base_path.join(bucket).join(key))
    }
}

#[async_trait]
impl ObjectStore for FilesystemStore {
    async fn put(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()> {
        let full_path = self.object_path(bucket, key)?;
        debug!(bucket, key, full_path = %full_path.display(), size = data.len(), "object_store: put");

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                warn!(parent = %parent.display(), error = %e, "object_store: create_dir_all failed");
                e
            })?;
        }

        // Write to a sibling temp file, then rename over the target.
        let temp_path = full_path.with_extension("partial");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(data).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &full_path).await.map_err(|e| {
            warn!(from = %temp_path.display(), to = %full_path.display(), error = %e, "object_store: rename failed");
            e
        })?;
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let full_path = self.object_path(bucket, key)?;
        match fs::read(&full_path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("object {}/{}", bucket, key)))
            }
            Err(e) => Err(Error::Storage(format!("read {}/{}: {}", bucket, key, e))),
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        let full_path = self.object_path(bucket, key)?;
        if fs::try_exists(&full_path).await? {
            fs::remove_file(full_path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_put_then_download() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());

        store.put("notes", "a.pdf", b"%PDF-1.7 body").await.unwrap();
        let data = store.download("notes", "a.pdf").await.unwrap();
        assert_eq!(data, b"%PDF-1.7 body");
    }

    #[tokio::test]
    async fn test_put_replaces_existing_object() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());

        store.put("notes", "a.pdf", b"first").await.unwrap();
        store.put("notes", "a.pdf", b"second").await.unwrap();
        assert_eq!(store.download("notes", "a.pdf").await.unwrap(), b"second");
        assert!(!dir.path().join("notes/a.partial").exists());
    }

    #[tokio::test]
    async fn test_download_missing_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());

        let err = store.download("notes", "missing.pdf").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());

        store.put("notes", "a.pdf", b"x").await.unwrap();
        store.delete("notes", "a.pdf").await.unwrap();
        store.delete("notes", "a.pdf").await.unwrap();
        assert!(store.download("notes", "a.pdf").await.is_err());
    }

    #[tokio::test]
    async fn test_rejects_path_traversal() {
        let dir = TempDir::new().unwrap();
        let store = FilesystemStore::new(dir.path());

        for (bucket, key) in [("notes", "../escape"), ("..", "a"), ("notes", "/etc/passwd"), ("", "a")] {
            let err = store.put(bucket, key, b"x").await.unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)), "{bucket}/{key}");
        }
    }
}
