//! # quire-db
//!
//! PostgreSQL + pgvector persistence layer for quire.
//!
//! This crate provides:
//! - Connection pool management
//! - The paragraph chunker used by the indexer
//! - Repositories for notebooks, notes, attachments and chat transcripts
//! - The chunk vector store with transactional generation replacement
//! - A filesystem object store for attachments
//!
//! ## Example
//!
//! ```rust,ignore
//! use quire_db::{Database, NoteRepository, CreateNoteRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::connect("postgres://localhost/quire").await?;
//!     db.migrate().await?;
//!
//!     let note = db.notes.insert(CreateNoteRequest {
//!         title: "Refunds".to_string(),
//!         content: "Refunds are issued within 14 days.".to_string(),
//!         notebook_id,
//!     }).await?;
//!
//!     println!("Created note: {}", note.id);
//!     Ok(())
//! }
//! ```
pub mod chat;
pub mod chunking;
pub mod chunks;
pub mod file_storage;
pub mod notes;
pub mod pool;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) can use DEFAULT_TEST_DATABASE_URL
pub mod test_fixtures;

// Re-export core types
pub use quire_core::*;

pub use chat::PgChatRepository;
pub use chunking::{Chunker, ChunkerConfig, PageChunk, ParagraphChunker};
pub use chunks::{new_chunk, PgChunkRepository};
pub use file_storage::{FilesystemStore, PgFileRepository};
pub use notes::{PgNoteRepository, PgNotebookRepository};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};

/// Combined database context with all repositories.
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Postgres>,
    pub notebooks: PgNotebookRepository,
    pub notes: PgNoteRepository,
    pub files: PgFileRepository,
    /// Vector store of note chunks.
    pub chunks: PgChunkRepository,
    pub chat: PgChatRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    pub fn new(pool: sqlx::Pool<sqlx::Postgres>) -> Self {
        Self {
            notebooks: PgNotebookRepository::new(pool.clone()),
            notes: PgNoteRepository::new(pool.clone()),
            files: PgFileRepository::new(pool.clone()),
            chunks: PgChunkRepository::new(pool.clone()),
            chat: PgChatRepository::new(pool.clone()),
            pool,
        }
    }

    /// Connect with the default pool configuration.
    pub async fn connect(url: &str) -> Result<Self> {
        let pool = create_pool(url).await?;
        Ok(Self::new(pool))
    }

    /// Connect with a custom pool configuration.
    pub async fn connect_with_config(url: &str, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(url, config).await?;
        Ok(Self::new(pool))
    }

    /// Run pending migrations.
    #[cfg(feature = "migrations")]
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("../../migrations")
            .run(&self.pool)
            .await
            .map_err(|e| Error::Database(sqlx::Error::Migrate(Box::new(e))))?;
        Ok(())
    }

    /// Get the underlying connection pool.
    pub fn pool(&self) -> &sqlx::Pool<sqlx::Postgres> {
        &self.pool
    }
}
