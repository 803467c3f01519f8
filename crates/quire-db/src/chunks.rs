//! Vector store: persisted note chunks and similarity ranking.
//!
//! Re-indexing retires a note's previous chunk generation and inserts the new
//! one inside a single transaction. Retired rows are soft-deleted and every
//! read filters on `is_deleted = false`, so readers see one complete
//! generation at a time.

use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use pgvector::Vector;
use sqlx::{Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use quire_core::{ChunkMatch, ChunkRepository, Error, NewChunk, Result};

/// PostgreSQL implementation of ChunkRepository.
pub struct PgChunkRepository {
    pool: Pool<Postgres>,
}

impl PgChunkRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Soft-delete every live chunk of a note. Returns the number retired.
    pub async fn retire_for_note_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE note_embedding
             SET is_deleted = true, deleted_at = now()
             WHERE note_id = $1 AND is_deleted = false",
        )
        .bind(note_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    /// Soft-delete every live chunk of every note in a notebook.
    pub async fn retire_for_notebook_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        notebook_id: Uuid,
    ) -> Result<u64> {
        let result = sqlx::query(
            "UPDATE note_embedding
             SET is_deleted = true, deleted_at = now()
             WHERE is_deleted = false
               AND note_id IN (SELECT id FROM note WHERE notebook_id = $1)",
        )
        .bind(notebook_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }

    /// Insert one chunk.
    pub async fn insert_tx(&self, tx: &mut Transaction<'_, Postgres>, chunk: &NewChunk) -> Result<()> {
        sqlx::query(
            "INSERT INTO note_embedding
                (id, note_id, file_id, chunk_content, embedding_value,
                 page_number, chunk_index, overlap_range, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(chunk.id)
        .bind(chunk.note_id)
        .bind(chunk.file_id)
        .bind(&chunk.content)
        .bind(&chunk.vector)
        .bind(chunk.page_number)
        .bind(chunk.chunk_index)
        .bind(&chunk.overlap_range)
        .bind(chunk.created_at)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    /// Row-lock a live note until the caller's transaction ends.
    ///
    /// Note and notebook deletion take the same lock, so a generation is never
    /// written for a note that was deleted while it was being indexed.
    pub async fn lock_live_note_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
    ) -> Result<()> {
        let live: Option<Uuid> = sqlx::query_scalar(
            "SELECT id FROM note WHERE id = $1 AND is_deleted = false FOR UPDATE",
        )
        .bind(note_id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;
        live.map(|_| ()).ok_or(Error::NoteNotFound(note_id))
    }

    /// Retire the previous generation and insert `chunks` on the caller's transaction.
    ///
    /// Fails with `NoteNotFound` when the note is no longer live.
    pub async fn replace_for_note_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        note_id: Uuid,
        chunks: &[NewChunk],
    ) -> Result<usize> {
        if let Some(foreign) = chunks.iter().find(|c| c.note_id != note_id) {
            return Err(Error::InvalidInput(format!(
                "chunk {} belongs to note {}, not {}",
                foreign.id, foreign.note_id, note_id
            )));
        }

        self.lock_live_note_tx(tx, note_id).await?;
        let retired = self.retire_for_note_tx(tx, note_id).await?;
        for chunk in chunks {
            self.insert_tx(tx, chunk).await?;
        }

        debug!(
            subsystem = "db",
            component = "chunks",
            op = "replace_for_note",
            %note_id,
            retired,
            chunk_count = chunks.len(),
            "Replaced chunk generation"
        );
        Ok(chunks.len())
    }

    /// Live chunks of a note in chunk-index order.
    pub async fn list_for_note(&self, note_id: Uuid) -> Result<Vec<ChunkMatch>> {
        let rows = sqlx::query(
            "SELECT id, note_id, chunk_content, page_number, chunk_index, 1.0::float8 AS score
             FROM note_embedding
             WHERE note_id = $1 AND is_deleted = false
             ORDER BY chunk_index",
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_match).collect())
    }
}

fn row_to_match(row: &sqlx::postgres::PgRow) -> ChunkMatch {
    ChunkMatch {
        id: row.get("id"),
        note_id: row.get("note_id"),
        content: row.get("chunk_content"),
        page_number: row.get("page_number"),
        chunk_index: row.get("chunk_index"),
        score: row.get("score"),
    }
}

#[async_trait]
impl ChunkRepository for PgChunkRepository {
    async fn replace_for_note(&self, note_id: Uuid, chunks: Vec<NewChunk>) -> Result<usize> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let count = self.replace_for_note_tx(&mut tx, note_id, &chunks).await?;
        tx.commit().await.map_err(Error::Database)?;
        Ok(count)
    }

    async fn find_similar(&self, vector: &Vector, limit: i64) -> Result<Vec<ChunkMatch>> {
        let start = Instant::now();
        let rows = sqlx::query(
            "SELECT id, note_id, chunk_content, page_number, chunk_index,
                    1 - (embedding_value <-> $1) AS score
             FROM note_embedding
             WHERE is_deleted = false
             ORDER BY score DESC
             LIMIT $2",
        )
        .bind(vector)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let matches: Vec<ChunkMatch> = rows.iter().map(row_to_match).collect();
        debug!(
            subsystem = "db",
            component = "chunks",
            op = "find_similar",
            result_count = matches.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Similarity query complete"
        );
        Ok(matches)
    }

    async fn count_for_note(&self, note_id: Uuid) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM note_embedding WHERE note_id = $1 AND is_deleted = false",
        )
        .bind(note_id)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)
    }
}

/// Build a chunk row stamped with the current time.
pub fn new_chunk(
    note_id: Uuid,
    file_id: Option<Uuid>,
    content: String,
    vector: Vector,
    page_number: i32,
    chunk_index: i32,
) -> NewChunk {
    NewChunk {
        id: Uuid::new_v4(),
        note_id,
        file_id,
        content,
        vector,
        page_number,
        chunk_index,
        overlap_range: quire_core::defaults::OVERLAP_NONE.to_string(),
        created_at: Utc::now(),
    }
}
