//! Core traits for quire abstractions.
//!
//! Repositories, remote services and the object store sit behind these
//! traits so the indexer and the chat orchestrator can run against
//! PostgreSQL in production and in-memory fakes in tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// NOTEBOOK / NOTE / FILE REPOSITORY TRAITS
// =============================================================================

/// Repository for notebooks.
#[async_trait]
pub trait NotebookRepository: Send + Sync {
    /// Insert a new notebook.
    async fn insert(&self, req: CreateNotebookRequest) -> Result<Notebook>;

    /// Fetch a live notebook. Fails with NotFound when absent or soft-deleted.
    async fn fetch(&self, id: Uuid) -> Result<Notebook>;

    /// List live notebooks, oldest first.
    async fn list(&self) -> Result<Vec<Notebook>>;

    /// Soft-delete a notebook together with its notes and their chunks,
    /// and detach child notebooks, in one transaction.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Repository for notes.
#[async_trait]
pub trait NoteRepository: Send + Sync {
    /// Insert a new note.
    async fn insert(&self, req: CreateNoteRequest) -> Result<Note>;

    /// Fetch a live note. Fails with NoteNotFound when absent or soft-deleted.
    async fn fetch(&self, id: Uuid) -> Result<Note>;

    /// Fetch every live note among `ids`, in no particular order.
    async fn fetch_many(&self, ids: &[Uuid]) -> Result<Vec<Note>>;

    /// Replace title and content.
    async fn update_content(&self, id: Uuid, req: UpdateNoteRequest) -> Result<Note>;

    /// Move a note to another notebook.
    async fn move_to(&self, id: Uuid, notebook_id: Uuid) -> Result<Note>;

    /// Soft-delete a note, its chunks and its file in one transaction.
    async fn delete(&self, id: Uuid) -> Result<()>;
}

/// Repository for note attachments.
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// The active file attached to a note, if any.
    async fn get_by_note_id(&self, note_id: Uuid) -> Result<Option<NoteFile>>;

    /// Make `file` the note's only active attachment.
    async fn replace_for_note(&self, file: &NoteFile) -> Result<()>;
}

// =============================================================================
// VECTOR STORE TRAITS
// =============================================================================

/// Repository for persisted chunks and their embeddings.
#[async_trait]
pub trait ChunkRepository: Send + Sync {
    /// Atomically retire every live chunk of `note_id` and insert `chunks`.
    ///
    /// Readers see either the previous complete set or the new one.
    async fn replace_for_note(&self, note_id: Uuid, chunks: Vec<NewChunk>) -> Result<usize>;

    /// Chunks ranked by `1 - distance` to `vector`, best first.
    async fn find_similar(&self, vector: &crate::Vector, limit: i64) -> Result<Vec<ChunkMatch>>;

    /// Number of live chunks for a note.
    async fn count_for_note(&self, note_id: Uuid) -> Result<i64>;
}

// =============================================================================
// CHAT REPOSITORY TRAITS
// =============================================================================

/// Everything one chat turn writes. Persisted all-or-nothing.
#[derive(Debug, Clone)]
pub struct TurnRecord {
    pub session_id: Uuid,
    pub clean_user: ChatMessage,
    pub clean_model: ChatMessage,
    pub raw_user: ChatMessage,
    pub raw_model: ChatMessage,
    /// Set only on the session's first real turn.
    pub new_title: Option<String>,
    pub at: DateTime<Utc>,
}

/// Repository for chat sessions and both message tracks.
#[async_trait]
pub trait ChatRepository: Send + Sync {
    /// Insert a session with its seed messages in one transaction.
    async fn create_session(
        &self,
        session: &ChatSession,
        clean_seed: &[ChatMessage],
        raw_seed: &[ChatMessage],
    ) -> Result<()>;

    /// Fetch a live session. Fails with SessionNotFound when absent or soft-deleted.
    async fn fetch_session(&self, id: Uuid) -> Result<ChatSession>;

    /// Live sessions, newest first.
    async fn list_sessions(&self) -> Result<Vec<ChatSession>>;

    /// Live messages of one track, oldest first.
    async fn messages(&self, session_id: Uuid, track: ChatTrack) -> Result<Vec<ChatMessage>>;

    /// Persist a full turn in one transaction.
    async fn record_turn(&self, turn: &TurnRecord) -> Result<()>;

    /// Soft-delete the session and both tracks in one transaction.
    async fn delete_session(&self, id: Uuid) -> Result<()>;
}

// =============================================================================
// INFERENCE TRAITS
// =============================================================================

/// Backend for generating text embeddings.
#[async_trait]
pub trait EmbeddingBackend: Send + Sync {
    /// Embed one text for the given task mode.
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<crate::Vector>;
}

/// Backend for text generation (LLM).
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Free-form reply to a conversation.
    async fn generate(&self, history: &[ChatTurn]) -> Result<String>;

    /// Constrained reply: whether the model can answer the last turn
    /// without new references.
    async fn answer_directly(&self, history: &[ChatTurn]) -> Result<bool>;
}

// =============================================================================
// COLLABORATOR TRAITS
// =============================================================================

/// Object storage for attachments.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write bytes under `bucket/key`, replacing any previous object.
    async fn put(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()>;

    /// Read the object at `bucket/key`.
    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Remove the object if present.
    async fn delete(&self, bucket: &str, key: &str) -> Result<()>;
}

/// Per-page text extraction from PDF bytes.
#[async_trait]
pub trait PdfExtractor: Send + Sync {
    /// Pages in document order, numbered from 1.
    async fn extract_pages(&self, data: &[u8]) -> Result<Vec<PdfPage>>;
}

/// Producer side of the index queue.
#[async_trait]
pub trait JobPublisher: Send + Sync {
    /// Ask for `note_id` to be re-indexed.
    async fn publish(&self, job: IndexJob) -> Result<()>;
}

/// Publisher that drops every job, for callers that do not index.
pub struct NoOpPublisher;

#[async_trait]
impl JobPublisher for NoOpPublisher {
    async fn publish(&self, _job: IndexJob) -> Result<()> {
        Ok(())
    }
}
