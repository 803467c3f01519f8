//! Core data models for quire.
//!
//! These types are shared across all quire crates and represent the
//! notebook, indexing and chat domain entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::{Error, Result};

// =============================================================================
// NOTEBOOK TYPES
// =============================================================================

/// A notebook groups notes and may be nested under a parent notebook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notebook {
    pub id: Uuid,
    pub name: String,
    pub parent_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request to create a notebook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNotebookRequest {
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<Uuid>,
}

// =============================================================================
// NOTE TYPES
// =============================================================================

/// A free-text note owned by a notebook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub notebook_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Request to create a note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    pub notebook_id: Uuid,
}

/// Request to replace a note's title and content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: String,
    pub content: String,
}

// =============================================================================
// FILE TYPES
// =============================================================================

/// Metadata of a file attached to a note. At most one is active per note.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoteFile {
    pub id: Uuid,
    /// Object key inside the bucket.
    pub file_name: String,
    /// Name supplied by the uploader.
    pub original_name: String,
    pub bucket: String,
    pub content_type: String,
    pub note_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

// =============================================================================
// CHUNK TYPES
// =============================================================================

/// A page of text fed to the chunker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfPage {
    /// Page number; 0 is the synthetic note page, PDF pages start at 1.
    pub page_number: i32,
    pub content: String,
}

/// A chunk ready to be written to the vector store.
#[derive(Debug, Clone)]
pub struct NewChunk {
    pub id: Uuid,
    pub note_id: Uuid,
    pub file_id: Option<Uuid>,
    pub content: String,
    pub vector: pgvector::Vector,
    pub page_number: i32,
    /// 1-based ordinal within the note.
    pub chunk_index: i32,
    pub overlap_range: String,
    pub created_at: DateTime<Utc>,
}

/// A persisted chunk returned by a similarity query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkMatch {
    pub id: Uuid,
    pub note_id: Uuid,
    pub content: String,
    pub page_number: i32,
    pub chunk_index: i32,
    /// `1 - distance` between the chunk and the query vector.
    pub score: f64,
}

/// Embedding task mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmbeddingTask {
    /// Text being indexed.
    RetrievalDocument,
    /// Text being searched for.
    RetrievalQuery,
}

impl EmbeddingTask {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingTask::RetrievalDocument => "RETRIEVAL_DOCUMENT",
            EmbeddingTask::RetrievalQuery => "RETRIEVAL_QUERY",
        }
    }
}

impl fmt::Display for EmbeddingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// INDEX JOB TYPES
// =============================================================================

/// Queue payload asking the indexer to rebuild a note's chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexJob {
    pub note_id: Uuid,
}

impl IndexJob {
    pub fn new(note_id: Uuid) -> Self {
        Self { note_id }
    }

    /// Parse a raw queue payload.
    pub fn from_payload(payload: &[u8]) -> Result<Self> {
        serde_json::from_slice(payload)
            .map_err(|e| Error::InvalidInput(format!("malformed index job payload: {}", e)))
    }

    pub fn to_payload(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

// =============================================================================
// CHAT TYPES
// =============================================================================

/// Author of a chat message, as understood by the generation service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Model => "model",
        }
    }
}

impl fmt::Display for ChatRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatRole {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(ChatRole::User),
            "model" => Ok(ChatRole::Model),
            other => Err(Error::InvalidInput(format!("unknown chat role: {}", other))),
        }
    }
}

/// Which transcript a chat message belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatTrack {
    /// What the user sees.
    Clean,
    /// Exactly what is sent to the generation service.
    Raw,
}

impl ChatTrack {
    /// Backing table for the track.
    pub fn table(&self) -> &'static str {
        match self {
            ChatTrack::Clean => "chat_message",
            ChatTrack::Raw => "chat_message_raw",
        }
    }
}

/// A chat session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: Uuid,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A message on either chat track.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub session_id: Uuid,
    pub role: ChatRole,
    pub chat: String,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(session_id: Uuid, role: ChatRole, chat: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_id,
            role,
            chat: chat.into(),
            created_at: at,
        }
    }
}

/// One entry of a conversation sent to the generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    pub text: String,
}

impl ChatTurn {
    pub fn new(role: ChatRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(ChatRole::User, text)
    }

    pub fn model(text: impl Into<String>) -> Self {
        Self::new(ChatRole::Model, text)
    }
}

impl From<&ChatMessage> for ChatTurn {
    fn from(msg: &ChatMessage) -> Self {
        Self::new(msg.role, msg.chat.clone())
    }
}
