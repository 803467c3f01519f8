//! Chat turns against PostgreSQL with an indexed note.
//!
//! **IMPORTANT**: These tests require PostgreSQL with the pgvector extension.
//! Run with: `DATABASE_URL=... cargo test -p quire-api -- --ignored`

use std::sync::Arc;

use quire_api::services::chat_service::{GREETING, SESSION_PLACEHOLDER_TITLE};
use quire_api::services::ChatService;
use quire_core::{defaults, ChatRepository, ChatRole, ChatTrack};
use quire_db::test_fixtures::{create_note, create_notebook, test_database};
use quire_db::{
    ChunkerConfig, FilesystemStore, ParagraphChunker, PgChatRepository, PgChunkRepository,
    PgFileRepository, PgNoteRepository, PgNotebookRepository,
};
use quire_inference::mock::MockBackend;
use quire_jobs::{DocumentIndexer, IndexerDeps, PdfTextAdapter};

#[tokio::test]
#[ignore] // Requires database connection with migrations applied
async fn test_first_turn_with_retrieval_is_recorded_atomically() {
    let db = test_database().await;
    let pool = db.pool.clone();
    let backend = MockBackend::new()
        .with_dimension(defaults::EMBED_DIMENSION)
        .with_answer_directly(false)
        .with_reply("Refunds are issued within 14 days.");

    let notebook = create_notebook(&db).await;
    let note = create_note(&db, &notebook, "Refunds", "Refunds are issued within 14 days.").await;
    let storage = std::env::temp_dir().join(format!("quire-test-{}", note.id));
    let indexer = DocumentIndexer::new(
        IndexerDeps {
            notes: Arc::new(PgNoteRepository::new(pool.clone())),
            notebooks: Arc::new(PgNotebookRepository::new(pool.clone())),
            files: Arc::new(PgFileRepository::new(pool.clone())),
            chunks: Arc::new(PgChunkRepository::new(pool.clone())),
            store: Arc::new(FilesystemStore::new(storage)),
            extractor: Arc::new(PdfTextAdapter::default()),
            embedder: Arc::new(backend.clone()),
        },
        Arc::new(ParagraphChunker::new(ChunkerConfig::default())),
    );
    indexer.index_note(note.id).await.unwrap();

    let chat_repo = Arc::new(PgChatRepository::new(pool.clone()));
    let service = ChatService::new(
        chat_repo.clone(),
        Arc::new(PgChunkRepository::new(pool)),
        Arc::new(backend.clone()),
        Arc::new(backend),
    );

    let session = service.create_session().await.unwrap();
    assert_eq!(session.title, SESSION_PLACEHOLDER_TITLE);

    let resp = service
        .send_chat(session.id, "What is the refund policy?")
        .await
        .unwrap();
    assert_eq!(resp.title, "What is the refund policy?");

    let clean = service.get_chat_history(session.id).await.unwrap();
    let texts: Vec<&str> = clean.iter().map(|m| m.chat.as_str()).collect();
    assert_eq!(
        texts,
        vec![
            GREETING,
            "What is the refund policy?",
            "Refunds are issued within 14 days."
        ]
    );

    let raw = chat_repo.messages(session.id, ChatTrack::Raw).await.unwrap();
    assert_eq!(raw.len(), 4);
    assert_eq!(raw[2].role, ChatRole::User);
    assert!(raw[2].chat.starts_with("Reference 1\n"));
    assert!(raw[2]
        .chat
        .ends_with("User Next Question: What is the refund policy?\n\nYour Answer"));

    service.delete_session(session.id).await.unwrap();
    assert!(service
        .get_chat_history(session.id)
        .await
        .unwrap_err()
        .is_not_found());
}
