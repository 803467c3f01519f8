//! Note and notebook repositories.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};
use tracing::info;
use uuid::Uuid;

use quire_core::{
    CreateNoteRequest, CreateNotebookRequest, Error, Note, NoteRepository, Notebook,
    NotebookRepository, Result, UpdateNoteRequest,
};

use crate::chunks::PgChunkRepository;
use crate::file_storage::PgFileRepository;

const NOTE_COLUMNS: &str = "id, title, content, notebook_id, created_at, updated_at";
const NOTEBOOK_COLUMNS: &str = "id, name, parent_id, created_at, updated_at";

fn row_to_note(row: &PgRow) -> Note {
    Note {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        notebook_id: row.get("notebook_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_notebook(row: &PgRow) -> Notebook {
    Notebook {
        id: row.get("id"),
        name: row.get("name"),
        parent_id: row.get("parent_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

// =============================================================================
// NOTES
// =============================================================================

/// PostgreSQL implementation of NoteRepository.
pub struct PgNoteRepository {
    pool: Pool<Postgres>,
    chunks: PgChunkRepository,
    files: PgFileRepository,
}

impl PgNoteRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            chunks: PgChunkRepository::new(pool.clone()),
            files: PgFileRepository::new(pool.clone()),
            pool,
        }
    }

    /// Fetch and row-lock a live note on the caller's transaction.
    pub async fn fetch_tx(&self, tx: &mut Transaction<'_, Postgres>, id: Uuid) -> Result<Note> {
        let row = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM note WHERE id = $1 AND is_deleted = false FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(row_to_note).ok_or(Error::NoteNotFound(id))
    }

    /// Soft-delete every live note of a notebook.
    pub async fn delete_for_notebook_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        notebook_id: Uuid,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE note SET is_deleted = true, deleted_at = now()
             WHERE notebook_id = $1 AND is_deleted = false",
        )
        .bind(notebook_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, req: CreateNoteRequest) -> Result<Note> {
        let row = sqlx::query(&format!(
            "INSERT INTO note (id, title, content, notebook_id, created_at)
             SELECT $1, $2, $3, nb.id, now()
             FROM notebook nb
             WHERE nb.id = $4 AND nb.is_deleted = false
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(&req.title)
        .bind(&req.content)
        .bind(req.notebook_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref()
            .map(row_to_note)
            .ok_or_else(|| Error::NotFound(format!("notebook {}", req.notebook_id)))
    }

    async fn fetch(&self, id: Uuid) -> Result<Note> {
        let row = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM note WHERE id = $1 AND is_deleted = false"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(row_to_note).ok_or(Error::NoteNotFound(id))
    }

    async fn fetch_many(&self, ids: &[Uuid]) -> Result<Vec<Note>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM note WHERE id = ANY($1) AND is_deleted = false"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_note).collect())
    }

    async fn update_content(&self, id: Uuid, req: UpdateNoteRequest) -> Result<Note> {
        let row = sqlx::query(&format!(
            "UPDATE note SET title = $2, content = $3, updated_at = now()
             WHERE id = $1 AND is_deleted = false
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(id)
        .bind(&req.title)
        .bind(&req.content)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(row_to_note).ok_or(Error::NoteNotFound(id))
    }

    async fn move_to(&self, id: Uuid, notebook_id: Uuid) -> Result<Note> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.fetch_tx(&mut tx, id).await?;

        let target: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM notebook WHERE id = $1 AND is_deleted = false")
                .bind(notebook_id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(Error::Database)?;
        if target.is_none() {
            return Err(Error::NotFound(format!("notebook {}", notebook_id)));
        }

        let row = sqlx::query(&format!(
            "UPDATE note SET notebook_id = $2, updated_at = now()
             WHERE id = $1
             RETURNING {NOTE_COLUMNS}"
        ))
        .bind(id)
        .bind(notebook_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(Error::Database)?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(row_to_note(&row))
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.fetch_tx(&mut tx, id).await?;

        sqlx::query("UPDATE note SET is_deleted = true, deleted_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        let chunks = self.chunks.retire_for_note_tx(&mut tx, id).await?;
        self.files.retire_for_note_tx(&mut tx, id).await?;

        tx.commit().await.map_err(Error::Database)?;
        info!(subsystem = "db", component = "notes", op = "delete", note_id = %id, chunks, "Note deleted");
        Ok(())
    }
}

// =============================================================================
// NOTEBOOKS
// =============================================================================

/// PostgreSQL implementation of NotebookRepository.
pub struct PgNotebookRepository {
    pool: Pool<Postgres>,
    notes: PgNoteRepository,
    chunks: PgChunkRepository,
}

impl PgNotebookRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self {
            notes: PgNoteRepository::new(pool.clone()),
            chunks: PgChunkRepository::new(pool.clone()),
            pool,
        }
    }
}

#[async_trait]
impl NotebookRepository for PgNotebookRepository {
    async fn insert(&self, req: CreateNotebookRequest) -> Result<Notebook> {
        if req.name.trim().is_empty() {
            return Err(Error::InvalidInput("notebook name is empty".to_string()));
        }
        if let Some(parent_id) = req.parent_id {
            self.fetch(parent_id).await?;
        }

        let row = sqlx::query(&format!(
            "INSERT INTO notebook (id, name, parent_id, created_at)
             VALUES ($1, $2, $3, now())
             RETURNING {NOTEBOOK_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(req.name.trim())
        .bind(req.parent_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row_to_notebook(&row))
    }

    async fn fetch(&self, id: Uuid) -> Result<Notebook> {
        let row = sqlx::query(&format!(
            "SELECT {NOTEBOOK_COLUMNS} FROM notebook WHERE id = $1 AND is_deleted = false"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref()
            .map(row_to_notebook)
            .ok_or_else(|| Error::NotFound(format!("notebook {}", id)))
    }

    async fn list(&self) -> Result<Vec<Notebook>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTEBOOK_COLUMNS} FROM notebook WHERE is_deleted = false ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_notebook).collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let deleted = sqlx::query(
            "UPDATE notebook SET is_deleted = true, deleted_at = now()
             WHERE id = $1 AND is_deleted = false",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;
        if deleted.rows_affected() == 0 {
            return Err(Error::NotFound(format!("notebook {}", id)));
        }

        sqlx::query(
            "UPDATE notebook SET parent_id = NULL, updated_at = now()
             WHERE parent_id = $1 AND is_deleted = false",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(Error::Database)?;
        // Notes first: their row locks wait out any in-flight chunk replacement.
        let notes = self.notes.delete_for_notebook_tx(&mut tx, id).await?;
        let chunks = self.chunks.retire_for_notebook_tx(&mut tx, id).await?;

        tx.commit().await.map_err(Error::Database)?;
        info!(
            subsystem = "db",
            component = "notebooks",
            op = "delete",
            notebook_id = %id,
            notes,
            chunks,
            "Notebook deleted"
        );
        Ok(())
    }
}
