//! Semantic note search outside of chat.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use quire_core::{
    defaults, ChunkRepository, EmbeddingBackend, EmbeddingTask, Error, Note, NoteRepository,
    Result,
};

/// A note reached through one of its chunks.
#[derive(Debug, Clone, Serialize)]
pub struct NoteSearchHit {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub notebook_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Similarity of the matching chunk.
    pub score: f64,
    /// Page the matching chunk came from; 0 is the note itself.
    pub page_number: i32,
}

impl NoteSearchHit {
    fn new(note: &Note, score: f64, page_number: i32) -> Self {
        Self {
            id: note.id,
            title: note.title.clone(),
            content: note.content.clone(),
            notebook_id: note.notebook_id,
            created_at: note.created_at,
            updated_at: note.updated_at,
            score,
            page_number,
        }
    }
}

pub struct SearchService {
    notes: Arc<dyn NoteRepository>,
    chunks: Arc<dyn ChunkRepository>,
    embedder: Arc<dyn EmbeddingBackend>,
}

impl SearchService {
    pub fn new(
        notes: Arc<dyn NoteRepository>,
        chunks: Arc<dyn ChunkRepository>,
        embedder: Arc<dyn EmbeddingBackend>,
    ) -> Self {
        Self {
            notes,
            chunks,
            embedder,
        }
    }

    /// Notes owning the best matching chunks, in chunk rank order.
    ///
    /// A note matched by several chunks appears once per chunk.
    pub async fn search(&self, query: &str) -> Result<Vec<NoteSearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::InvalidInput("query must not be empty".to_string()));
        }

        let start = Instant::now();
        let vector = self
            .embedder
            .embed(query, EmbeddingTask::RetrievalQuery)
            .await?;
        let matches = self
            .chunks
            .find_similar(&vector, defaults::SIMILARITY_LIMIT)
            .await?;

        let ids: Vec<Uuid> = matches.iter().map(|m| m.note_id).collect();
        let notes: HashMap<Uuid, Note> = self
            .notes
            .fetch_many(&ids)
            .await?
            .into_iter()
            .map(|n| (n.id, n))
            .collect();

        let hits: Vec<NoteSearchHit> = matches
            .iter()
            .filter_map(|m| {
                notes
                    .get(&m.note_id)
                    .map(|note| NoteSearchHit::new(note, m.score, m.page_number))
            })
            .collect();

        info!(
            subsystem = "api",
            component = "search",
            op = "semantic_search",
            result_count = hits.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Semantic search completed"
        );
        Ok(hits)
    }
}
