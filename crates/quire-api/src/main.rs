//! quire API server.

use std::sync::Arc;

use tracing::{info, warn};

use quire_api::services::{ChatService, NoteService, SearchService};
use quire_api::{router, telemetry, AppConfig, AppState};
use quire_db::{
    Database, FilesystemStore, ParagraphChunker, PgChatRepository, PgChunkRepository,
    PgFileRepository, PgNoteRepository, PgNotebookRepository,
};
use quire_inference::GeminiBackend;
use quire_jobs::{
    DocumentIndexer, IndexQueue, IndexWorker, IndexerDeps, PdfTextAdapter, WorkerConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();
    let _log_guard = telemetry::init_tracing();

    let config = AppConfig::from_env()?;

    // Connect to database
    info!(subsystem = "api", "Connecting to database...");
    let db = Database::connect_with_config(&config.database_url, config.pool_config()).await?;
    db.migrate().await?;
    info!(subsystem = "api", "Database connected and migrated");
    let pool = db.pool().clone();
    quire_db::log_pool_metrics(&pool);

    // Remote services and collaborators
    let gemini = Arc::new(GeminiBackend::new(config.gemini_config())?);
    let store = Arc::new(FilesystemStore::new(config.storage_path.clone()));
    let extractor = PdfTextAdapter::new(config.pdftotext_timeout());
    if !extractor.health_check().await {
        warn!(
            subsystem = "api",
            component = "pdf_text",
            "pdftotext is not available; notes with attachments will fail to index"
        );
    }

    let notes = Arc::new(PgNoteRepository::new(pool.clone()));
    let notebooks = Arc::new(PgNotebookRepository::new(pool.clone()));
    let files = Arc::new(PgFileRepository::new(pool.clone()));
    let chunks = Arc::new(PgChunkRepository::new(pool.clone()));
    let chat = Arc::new(PgChatRepository::new(pool));

    // Index queue and its single worker
    let (publisher, receiver) = IndexQueue::bounded(config.index_queue_capacity);
    let indexer = DocumentIndexer::new(
        IndexerDeps {
            notes: notes.clone(),
            notebooks: notebooks.clone(),
            files: files.clone(),
            chunks: chunks.clone(),
            store: store.clone(),
            extractor: Arc::new(extractor),
            embedder: gemini.clone(),
        },
        Arc::new(ParagraphChunker::new(config.chunker_config())),
    );
    let worker = IndexWorker::new(receiver, Arc::new(indexer), WorkerConfig::default()).start();

    let state = AppState::new(
        ChatService::new(chat, chunks.clone(), gemini.clone(), gemini.clone()),
        NoteService::new(notebooks, notes.clone(), files, store, Arc::new(publisher)),
        SearchService::new(notes, chunks, gemini),
    );
    let app = router(state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.bind_addr()).await?;
    info!(subsystem = "api", addr = %config.bind_addr(), "Starting server");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!(subsystem = "api", "Server stopped, draining index queue");
    worker.shutdown().await?;
    info!(subsystem = "api", "Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(subsystem = "api", error = %e, "Failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
