//! Document indexer: rebuilds a note's chunk generation from its content
//! and attachment.
//!
//! Per job: parse the payload, resolve the note and its notebook, assemble
//! the synthetic note page plus one page per PDF page, chunk every page,
//! embed each non-blank chunk as a document, then replace the note's
//! chunks in one transaction. Embedding happens before the transaction
//! opens, so a failed run never touches the previous generation.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use quire_core::{
    defaults, ChunkRepository, EmbeddingBackend, EmbeddingTask, Error, FileRepository, NewChunk,
    Note, NoteFile, NoteRepository, Notebook, NotebookRepository, ObjectStore, PdfExtractor,
    PdfPage, Result,
};
use quire_db::{new_chunk, Chunker};

use crate::handler::{JobContext, JobHandler, JobResult};

/// Render the synthetic page 0 for a note.
///
/// `file` contributes its original name; a note without one renders an
/// empty reference line.
pub fn note_page(note: &Note, notebook: &Notebook, file: Option<&NoteFile>) -> PdfPage {
    let original_name = file.map(|f| f.original_name.as_str()).unwrap_or("");
    let updated_at = note
        .updated_at
        .map(rfc3339)
        .unwrap_or_else(|| "-".to_string());

    let content = format!(
        "\nNote Title      : {}\nNotebook Title  : {}\nFile Referensi  : {}\n\n{}\n\nCreated At      : {}\nUpdated At      : {}\n",
        note.title,
        notebook.name,
        original_name,
        note.content,
        rfc3339(note.created_at),
        updated_at,
    );

    PdfPage {
        page_number: defaults::NOTE_PAGE_NUMBER,
        content,
    }
}

fn rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Collaborators the indexer reads from and writes to.
#[derive(Clone)]
pub struct IndexerDeps {
    pub notes: Arc<dyn NoteRepository>,
    pub notebooks: Arc<dyn NotebookRepository>,
    pub files: Arc<dyn FileRepository>,
    pub chunks: Arc<dyn ChunkRepository>,
    pub store: Arc<dyn ObjectStore>,
    pub extractor: Arc<dyn PdfExtractor>,
    pub embedder: Arc<dyn EmbeddingBackend>,
}

/// Handler that re-indexes one note per job.
pub struct DocumentIndexer {
    deps: IndexerDeps,
    chunker: Arc<dyn Chunker>,
}

impl DocumentIndexer {
    pub fn new(deps: IndexerDeps, chunker: Arc<dyn Chunker>) -> Self {
        Self { deps, chunker }
    }

    /// Build every page of a note: page 0, then the attachment's pages.
    async fn assemble_pages(&self, note: &Note, file: Option<&NoteFile>) -> Result<Vec<PdfPage>> {
        let notebook = self.deps.notebooks.fetch(note.notebook_id).await?;
        let mut pages = vec![note_page(note, &notebook, file)];

        if let Some(file) = file {
            let data = self.deps.store.download(&file.bucket, &file.file_name).await?;
            let file_pages = self.deps.extractor.extract_pages(&data).await?;
            debug!(
                subsystem = "jobs",
                component = "indexer",
                note_id = %note.id,
                file_id = %file.id,
                page_count = file_pages.len(),
                "Attachment extracted"
            );
            if file_pages.iter().all(|page| page.content.trim().is_empty()) {
                return Err(Error::InvalidInput(format!(
                    "attachment {} has no extractable text",
                    file.original_name
                )));
            }
            pages.extend(file_pages);
        }
        Ok(pages)
    }

    /// Rebuild the chunk generation of one note. Returns the number of chunks stored.
    pub async fn index_note(&self, note_id: Uuid) -> Result<usize> {
        let start = Instant::now();
        let note = self.deps.notes.fetch(note_id).await?;
        let file = self.deps.files.get_by_note_id(note_id).await?;
        let file_id = file.as_ref().map(|f| f.id);

        let pages = self.assemble_pages(&note, file.as_ref()).await?;
        let chunks = self.chunker.chunk_pages(&pages);
        let total = chunks.len();

        let mut rows: Vec<NewChunk> = Vec::with_capacity(total);
        for (i, chunk) in chunks.into_iter().enumerate() {
            let chunk_index = (i + 1) as i32;
            let text = chunk.text.trim();
            if text.is_empty() {
                warn!(
                    subsystem = "jobs",
                    component = "indexer",
                    note_id = %note_id,
                    chunk_index,
                    "Skipping blank chunk"
                );
                continue;
            }

            let vector = self
                .deps
                .embedder
                .embed(text, EmbeddingTask::RetrievalDocument)
                .await?;
            debug!(
                subsystem = "jobs",
                component = "indexer",
                note_id = %note_id,
                chunk_index,
                page_number = chunk.page_number,
                chars = chunk.char_len(),
                "Chunk embedded"
            );
            rows.push(new_chunk(
                note_id,
                file_id,
                chunk.text,
                vector,
                chunk.page_number,
                chunk_index,
            ));
        }

        let stored = self.deps.chunks.replace_for_note(note_id, rows).await?;
        info!(
            subsystem = "jobs",
            component = "indexer",
            op = "index_note",
            note_id = %note_id,
            page_count = pages.len(),
            chunk_count = stored,
            skipped = total - stored,
            duration_ms = start.elapsed().as_millis() as u64,
            "Note indexed"
        );
        Ok(stored)
    }
}

#[async_trait]
impl JobHandler for DocumentIndexer {
    fn name(&self) -> &'static str {
        "document_indexer"
    }

    async fn execute(&self, ctx: &JobContext) -> JobResult {
        let job = match ctx.index_job() {
            Ok(job) => job,
            Err(e) => return JobResult::Nack(e),
        };
        self.index_note(job.note_id).await.into()
    }
}
