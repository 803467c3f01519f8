//! Chat sessions and their clean and raw message tracks.

use async_trait::async_trait;
use sqlx::{postgres::PgRow, Pool, Postgres, Row, Transaction};
use tracing::debug;
use uuid::Uuid;

use quire_core::{
    ChatMessage, ChatRepository, ChatRole, ChatSession, ChatTrack, Error, Result, TurnRecord,
};

fn row_to_session(row: &PgRow) -> ChatSession {
    ChatSession {
        id: row.get("id"),
        title: row.get("title"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn row_to_message(row: &PgRow) -> Result<ChatMessage> {
    let role: String = row.get("role");
    Ok(ChatMessage {
        id: row.get("id"),
        session_id: row.get("session_id"),
        role: role.parse::<ChatRole>()?,
        chat: row.get("chat"),
        created_at: row.get("created_at"),
    })
}

/// PostgreSQL implementation of ChatRepository.
pub struct PgChatRepository {
    pool: Pool<Postgres>,
}

impl PgChatRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    /// Lock and fetch a live session for the rest of the transaction.
    pub async fn fetch_session_for_update_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<ChatSession> {
        let row = sqlx::query(
            "SELECT id, title, created_at, updated_at
             FROM chat_session
             WHERE id = $1 AND is_deleted = false
             FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(&mut **tx)
        .await
        .map_err(Error::Database)?;

        row.as_ref()
            .map(row_to_session)
            .ok_or(Error::SessionNotFound(id))
    }

    pub async fn insert_session_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        session: &ChatSession,
    ) -> Result<()> {
        sqlx::query("INSERT INTO chat_session (id, title, created_at) VALUES ($1, $2, $3)")
            .bind(session.id)
            .bind(&session.title)
            .bind(session.created_at)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Append a message to one track.
    pub async fn insert_message_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        track: ChatTrack,
        msg: &ChatMessage,
    ) -> Result<()> {
        sqlx::query(&format!(
            "INSERT INTO {} (id, role, chat, session_id, created_at) VALUES ($1, $2, $3, $4, $5)",
            track.table()
        ))
        .bind(msg.id)
        .bind(msg.role.as_str())
        .bind(&msg.chat)
        .bind(msg.session_id)
        .bind(msg.created_at)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(())
    }

    pub async fn update_title_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        title: &str,
        at: chrono::DateTime<chrono::Utc>,
    ) -> Result<()> {
        sqlx::query("UPDATE chat_session SET title = $2, updated_at = $3 WHERE id = $1")
            .bind(id)
            .bind(title)
            .bind(at)
            .execute(&mut **tx)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    /// Soft-delete every live message of a session on one track.
    pub async fn delete_messages_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        track: ChatTrack,
        session_id: Uuid,
    ) -> Result<u64> {
        let result = sqlx::query(&format!(
            "UPDATE {} SET is_deleted = true, deleted_at = now()
             WHERE session_id = $1 AND is_deleted = false",
            track.table()
        ))
        .bind(session_id)
        .execute(&mut **tx)
        .await
        .map_err(Error::Database)?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl ChatRepository for PgChatRepository {
    async fn create_session(
        &self,
        session: &ChatSession,
        clean_seed: &[ChatMessage],
        raw_seed: &[ChatMessage],
    ) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.insert_session_tx(&mut tx, session).await?;
        for msg in clean_seed {
            self.insert_message_tx(&mut tx, ChatTrack::Clean, msg).await?;
        }
        for msg in raw_seed {
            self.insert_message_tx(&mut tx, ChatTrack::Raw, msg).await?;
        }
        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }

    async fn fetch_session(&self, id: Uuid) -> Result<ChatSession> {
        let row = sqlx::query(
            "SELECT id, title, created_at, updated_at
             FROM chat_session
             WHERE id = $1 AND is_deleted = false",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref()
            .map(row_to_session)
            .ok_or(Error::SessionNotFound(id))
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        let rows = sqlx::query(
            "SELECT id, title, created_at, updated_at
             FROM chat_session
             WHERE is_deleted = false
             ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(row_to_session).collect())
    }

    async fn messages(&self, session_id: Uuid, track: ChatTrack) -> Result<Vec<ChatMessage>> {
        // The seed pair shares one timestamp; user sorts before model.
        let rows = sqlx::query(&format!(
            "SELECT id, role, chat, session_id, created_at
             FROM {}
             WHERE session_id = $1 AND is_deleted = false
             ORDER BY created_at ASC, CASE role WHEN 'user' THEN 0 ELSE 1 END",
            track.table()
        ))
        .bind(session_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        rows.iter().map(row_to_message).collect()
    }

    async fn record_turn(&self, turn: &TurnRecord) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.fetch_session_for_update_tx(&mut tx, turn.session_id).await?;

        self.insert_message_tx(&mut tx, ChatTrack::Clean, &turn.clean_user).await?;
        self.insert_message_tx(&mut tx, ChatTrack::Clean, &turn.clean_model).await?;
        self.insert_message_tx(&mut tx, ChatTrack::Raw, &turn.raw_user).await?;
        self.insert_message_tx(&mut tx, ChatTrack::Raw, &turn.raw_model).await?;
        if let Some(title) = &turn.new_title {
            self.update_title_tx(&mut tx, turn.session_id, title, turn.at).await?;
        }

        tx.commit().await.map_err(Error::Database)?;
        debug!(
            subsystem = "db",
            component = "chat",
            op = "record_turn",
            session_id = %turn.session_id,
            title_updated = turn.new_title.is_some(),
            "Chat turn persisted"
        );
        Ok(())
    }

    async fn delete_session(&self, id: Uuid) -> Result<()> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        self.fetch_session_for_update_tx(&mut tx, id).await?;

        sqlx::query("UPDATE chat_session SET is_deleted = true, deleted_at = now() WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
        self.delete_messages_tx(&mut tx, ChatTrack::Raw, id).await?;
        self.delete_messages_tx(&mut tx, ChatTrack::Clean, id).await?;

        tx.commit().await.map_err(Error::Database)?;
        Ok(())
    }
}
