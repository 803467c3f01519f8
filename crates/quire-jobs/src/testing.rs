//! In-memory collaborators for indexer tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use quire_core::*;
use quire_db::{ChunkerConfig, ParagraphChunker};
use quire_inference::mock::MockBackend;

use crate::indexer::{DocumentIndexer, IndexerDeps};

#[derive(Default)]
pub struct MemoryState {
    notebooks: Mutex<HashMap<Uuid, Notebook>>,
    notes: Mutex<HashMap<Uuid, Note>>,
    files: Mutex<HashMap<Uuid, NoteFile>>,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    chunks: Mutex<Vec<NewChunk>>,
    replace_calls: AtomicUsize,
}

impl MemoryState {
    pub fn add_note(&self, title: &str, content: &str) -> Uuid {
        let notebook = Notebook {
            id: Uuid::new_v4(),
            name: "Notebook".to_string(),
            parent_id: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        let note = Note {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            notebook_id: notebook.id,
            created_at: Utc::now(),
            updated_at: None,
        };
        let id = note.id;
        self.notebooks.lock().unwrap().insert(notebook.id, notebook);
        self.notes.lock().unwrap().insert(id, note);
        id
    }

    /// Attach a "PDF" whose pages are separated by form feeds.
    pub fn attach(&self, note_id: Uuid, original_name: &str, pages: &str) -> Uuid {
        let file = NoteFile {
            id: Uuid::new_v4(),
            file_name: format!("{}.pdf", Uuid::new_v4()),
            original_name: original_name.to_string(),
            bucket: "notes".to_string(),
            content_type: "application/pdf".to_string(),
            note_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        let id = file.id;
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{}/{}", file.bucket, file.file_name), pages.as_bytes().to_vec());
        self.files.lock().unwrap().insert(note_id, file);
        id
    }

    /// Live chunks of a note, by chunk index.
    pub fn chunks_for(&self, note_id: Uuid) -> Vec<NewChunk> {
        let mut chunks: Vec<NewChunk> = self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|c| c.note_id == note_id)
            .cloned()
            .collect();
        chunks.sort_by_key(|c| c.chunk_index);
        chunks
    }

    pub fn replace_calls(&self) -> usize {
        self.replace_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NotebookRepository for MemoryState {
    async fn insert(&self, req: CreateNotebookRequest) -> Result<Notebook> {
        let notebook = Notebook {
            id: Uuid::new_v4(),
            name: req.name,
            parent_id: req.parent_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.notebooks.lock().unwrap().insert(notebook.id, notebook.clone());
        Ok(notebook)
    }

    async fn fetch(&self, id: Uuid) -> Result<Notebook> {
        self.notebooks
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("notebook {}", id)))
    }

    async fn list(&self) -> Result<Vec<Notebook>> {
        Ok(self.notebooks.lock().unwrap().values().cloned().collect())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.notebooks.lock().unwrap().remove(&id);
        Ok(())
    }
}

#[async_trait]
impl NoteRepository for MemoryState {
    async fn insert(&self, req: CreateNoteRequest) -> Result<Note> {
        let note = Note {
            id: Uuid::new_v4(),
            title: req.title,
            content: req.content,
            notebook_id: req.notebook_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.notes.lock().unwrap().insert(note.id, note.clone());
        Ok(note)
    }

    async fn fetch(&self, id: Uuid) -> Result<Note> {
        self.notes
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(Error::NoteNotFound(id))
    }

    async fn fetch_many(&self, ids: &[Uuid]) -> Result<Vec<Note>> {
        let notes = self.notes.lock().unwrap();
        Ok(ids.iter().filter_map(|id| notes.get(id).cloned()).collect())
    }

    async fn update_content(&self, id: Uuid, req: UpdateNoteRequest) -> Result<Note> {
        let mut notes = self.notes.lock().unwrap();
        let note = notes.get_mut(&id).ok_or(Error::NoteNotFound(id))?;
        note.title = req.title;
        note.content = req.content;
        note.updated_at = Some(Utc::now());
        Ok(note.clone())
    }

    async fn move_to(&self, id: Uuid, notebook_id: Uuid) -> Result<Note> {
        let mut notes = self.notes.lock().unwrap();
        let note = notes.get_mut(&id).ok_or(Error::NoteNotFound(id))?;
        note.notebook_id = notebook_id;
        Ok(note.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.notes.lock().unwrap().remove(&id);
        self.chunks.lock().unwrap().retain(|c| c.note_id != id);
        Ok(())
    }
}

#[async_trait]
impl FileRepository for MemoryState {
    async fn get_by_note_id(&self, note_id: Uuid) -> Result<Option<NoteFile>> {
        Ok(self.files.lock().unwrap().get(&note_id).cloned())
    }

    async fn replace_for_note(&self, file: &NoteFile) -> Result<()> {
        self.files.lock().unwrap().insert(file.note_id, file.clone());
        Ok(())
    }
}

#[async_trait]
impl ChunkRepository for MemoryState {
    async fn replace_for_note(&self, note_id: Uuid, chunks: Vec<NewChunk>) -> Result<usize> {
        self.replace_calls.fetch_add(1, Ordering::SeqCst);
        if !self.notes.lock().unwrap().contains_key(&note_id) {
            return Err(Error::NoteNotFound(note_id));
        }
        let count = chunks.len();
        let mut stored = self.chunks.lock().unwrap();
        stored.retain(|c| c.note_id != note_id);
        stored.extend(chunks);
        Ok(count)
    }

    async fn find_similar(&self, _vector: &Vector, _limit: i64) -> Result<Vec<ChunkMatch>> {
        Ok(Vec::new())
    }

    async fn count_for_note(&self, note_id: Uuid) -> Result<i64> {
        Ok(self.chunks_for(note_id).len() as i64)
    }
}

#[async_trait]
impl ObjectStore for MemoryState {
    async fn put(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{}/{}", bucket, key), data.to_vec());
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{}/{}", bucket, key))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("object {}/{}", bucket, key)))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(&format!("{}/{}", bucket, key));
        Ok(())
    }
}

/// Treats bytes as UTF-8 text with form-feed page breaks.
pub struct FormFeedExtractor;

#[async_trait]
impl PdfExtractor for FormFeedExtractor {
    async fn extract_pages(&self, data: &[u8]) -> Result<Vec<PdfPage>> {
        Ok(String::from_utf8_lossy(data)
            .split('\u{c}')
            .enumerate()
            .map(|(i, content)| PdfPage {
                page_number: (i + 1) as i32,
                content: content.to_string(),
            })
            .collect())
    }
}

pub struct Fixture {
    pub indexer: DocumentIndexer,
    pub state: Arc<MemoryState>,
    pub embedder: MockBackend,
}

impl Fixture {
    /// Same state, different embedding backend.
    pub fn with_embedder(self, embedder: MockBackend) -> Fixture {
        build(self.state, embedder)
    }
}

fn build(state: Arc<MemoryState>, embedder: MockBackend) -> Fixture {
    let deps = IndexerDeps {
        notes: state.clone(),
        notebooks: state.clone(),
        files: state.clone(),
        chunks: state.clone(),
        store: state.clone(),
        extractor: Arc::new(FormFeedExtractor),
        embedder: Arc::new(embedder.clone()),
    };
    let chunker = Arc::new(ParagraphChunker::new(ChunkerConfig::default()));
    Fixture {
        indexer: DocumentIndexer::new(deps, chunker),
        state,
        embedder,
    }
}

pub fn fixture() -> Fixture {
    build(Arc::new(MemoryState::default()), MockBackend::new().with_dimension(8))
}
