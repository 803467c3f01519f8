//! In-memory repositories for service and router tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use quire_core::*;
use quire_inference::mock::MockBackend;

use crate::handlers::AppState;
use crate::services::{ChatService, NoteService, SearchService};

#[derive(Default)]
pub struct MemoryStore {
    notebooks: Mutex<HashMap<Uuid, Notebook>>,
    notes: Mutex<HashMap<Uuid, Note>>,
    files: Mutex<HashMap<Uuid, NoteFile>>,
    objects: Mutex<HashMap<String, Vec<u8>>>,
    matches: Mutex<Vec<ChunkMatch>>,
    sessions: Mutex<HashMap<Uuid, ChatSession>>,
    clean: Mutex<Vec<ChatMessage>>,
    raw: Mutex<Vec<ChatMessage>>,
    published: Mutex<Vec<IndexJob>>,
    fail_record: AtomicBool,
}

impl MemoryStore {
    pub fn add_notebook(&self, name: &str) -> Notebook {
        let notebook = Notebook {
            id: Uuid::new_v4(),
            name: name.to_string(),
            parent_id: None,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.notebooks
            .lock()
            .unwrap()
            .insert(notebook.id, notebook.clone());
        notebook
    }

    pub fn add_note(&self, notebook_id: Uuid, title: &str, content: &str) -> Note {
        let note = Note {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: content.to_string(),
            notebook_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.notes.lock().unwrap().insert(note.id, note.clone());
        note
    }

    /// Chunks returned by every similarity query, already ranked.
    pub fn set_matches(&self, matches: Vec<ChunkMatch>) {
        *self.matches.lock().unwrap() = matches;
    }

    pub fn published(&self) -> Vec<IndexJob> {
        self.published.lock().unwrap().clone()
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(&format!("{}/{}", bucket, key))
            .cloned()
    }

    pub fn active_file(&self, note_id: Uuid) -> Option<NoteFile> {
        self.files.lock().unwrap().get(&note_id).cloned()
    }

    pub fn track(&self, session_id: Uuid, track: ChatTrack) -> Vec<ChatMessage> {
        let messages = match track {
            ChatTrack::Clean => self.clean.lock().unwrap(),
            ChatTrack::Raw => self.raw.lock().unwrap(),
        };
        messages
            .iter()
            .filter(|m| m.session_id == session_id)
            .cloned()
            .collect()
    }

    pub fn fail_record_turn(&self) {
        self.fail_record.store(true, Ordering::SeqCst);
    }
}

pub fn chunk_match(note_id: Uuid, content: &str, score: f64) -> ChunkMatch {
    ChunkMatch {
        id: Uuid::new_v4(),
        note_id,
        content: content.to_string(),
        page_number: 0,
        chunk_index: 1,
        score,
    }
}

#[async_trait]
impl NotebookRepository for MemoryStore {
    async fn insert(&self, req: CreateNotebookRequest) -> Result<Notebook> {
        if let Some(parent_id) = req.parent_id {
            NotebookRepository::fetch(self, parent_id).await?;
        }
        let notebook = Notebook {
            id: Uuid::new_v4(),
            name: req.name,
            parent_id: req.parent_id,
            created_at: Utc::now(),
            updated_at: None,
        };
        self.notebooks
            .lock()
            .unwrap()
            .insert(notebook.id, notebook.clone());
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
        let mut notebooks: Vec<Notebook> =
            self.notebooks.lock().unwrap().values().cloned().collect();
        notebooks.sort_by_key(|n| n.created_at);
        Ok(notebooks)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        if self.notebooks.lock().unwrap().remove(&id).is_none() {
            return Err(Error::NotFound(format!("notebook {}", id)));
        }
        self.notes.lock().unwrap().retain(|_, n| n.notebook_id != id);
        Ok(())
    }
}

#[async_trait]
impl NoteRepository for MemoryStore {
    async fn insert(&self, req: CreateNoteRequest) -> Result<Note> {
        NotebookRepository::fetch(self, req.notebook_id).await?;
        Ok(self.add_note(req.notebook_id, &req.title, &req.content))
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
        NoteRepository::fetch(self, id).await?;
        NotebookRepository::fetch(self, notebook_id).await?;
        let mut notes = self.notes.lock().unwrap();
        let note = notes.get_mut(&id).ok_or(Error::NoteNotFound(id))?;
        note.notebook_id = notebook_id;
        note.updated_at = Some(Utc::now());
        Ok(note.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        if self.notes.lock().unwrap().remove(&id).is_none() {
            return Err(Error::NoteNotFound(id));
        }
        self.files.lock().unwrap().remove(&id);
        Ok(())
    }
}

#[async_trait]
impl FileRepository for MemoryStore {
    async fn get_by_note_id(&self, note_id: Uuid) -> Result<Option<NoteFile>> {
        Ok(self.active_file(note_id))
    }

    async fn replace_for_note(&self, file: &NoteFile) -> Result<()> {
        self.files
            .lock()
            .unwrap()
            .insert(file.note_id, file.clone());
        Ok(())
    }
}

#[async_trait]
impl ChunkRepository for MemoryStore {
    async fn replace_for_note(&self, _note_id: Uuid, chunks: Vec<NewChunk>) -> Result<usize> {
        Ok(chunks.len())
    }

    async fn find_similar(&self, _vector: &Vector, limit: i64) -> Result<Vec<ChunkMatch>> {
        let matches = self.matches.lock().unwrap();
        Ok(matches.iter().take(limit as usize).cloned().collect())
    }

    async fn count_for_note(&self, note_id: Uuid) -> Result<i64> {
        let matches = self.matches.lock().unwrap();
        Ok(matches.iter().filter(|m| m.note_id == note_id).count() as i64)
    }
}

#[async_trait]
impl ChatRepository for MemoryStore {
    async fn create_session(
        &self,
        session: &ChatSession,
        clean_seed: &[ChatMessage],
        raw_seed: &[ChatMessage],
    ) -> Result<()> {
        self.sessions
            .lock()
            .unwrap()
            .insert(session.id, session.clone());
        self.clean.lock().unwrap().extend_from_slice(clean_seed);
        self.raw.lock().unwrap().extend_from_slice(raw_seed);
        Ok(())
    }

    async fn fetch_session(&self, id: Uuid) -> Result<ChatSession> {
        self.sessions
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(Error::SessionNotFound(id))
    }

    async fn list_sessions(&self) -> Result<Vec<ChatSession>> {
        let mut sessions: Vec<ChatSession> =
            self.sessions.lock().unwrap().values().cloned().collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(sessions)
    }

    async fn messages(&self, session_id: Uuid, track: ChatTrack) -> Result<Vec<ChatMessage>> {
        Ok(self.track(session_id, track))
    }

    async fn record_turn(&self, turn: &TurnRecord) -> Result<()> {
        if self.fail_record.load(Ordering::SeqCst) {
            return Err(Error::Internal("commit failed".to_string()));
        }
        let mut sessions = self.sessions.lock().unwrap();
        let session = sessions
            .get_mut(&turn.session_id)
            .ok_or(Error::SessionNotFound(turn.session_id))?;
        if let Some(title) = &turn.new_title {
            session.title = title.clone();
            session.updated_at = Some(turn.at);
        }
        self.clean
            .lock()
            .unwrap()
            .extend([turn.clean_user.clone(), turn.clean_model.clone()]);
        self.raw
            .lock()
            .unwrap()
            .extend([turn.raw_user.clone(), turn.raw_model.clone()]);
        Ok(())
    }

    async fn delete_session(&self, id: Uuid) -> Result<()> {
        self.sessions.lock().unwrap().remove(&id);
        self.clean.lock().unwrap().retain(|m| m.session_id != id);
        self.raw.lock().unwrap().retain(|m| m.session_id != id);
        Ok(())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put(&self, bucket: &str, key: &str, data: &[u8]) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .insert(format!("{}/{}", bucket, key), data.to_vec());
        Ok(())
    }

    async fn download(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.object(bucket, key)
            .ok_or_else(|| Error::NotFound(format!("object {}/{}", bucket, key)))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<()> {
        self.objects
            .lock()
            .unwrap()
            .remove(&format!("{}/{}", bucket, key));
        Ok(())
    }
}

#[async_trait]
impl JobPublisher for MemoryStore {
    async fn publish(&self, job: IndexJob) -> Result<()> {
        self.published.lock().unwrap().push(job);
        Ok(())
    }
}

pub fn chat_service(store: &Arc<MemoryStore>, backend: &MockBackend) -> ChatService {
    ChatService::new(
        store.clone(),
        store.clone(),
        Arc::new(backend.clone()),
        Arc::new(backend.clone()),
    )
}

pub fn note_service(store: &Arc<MemoryStore>) -> NoteService {
    NoteService::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
    )
}

pub fn search_service(store: &Arc<MemoryStore>, backend: &MockBackend) -> SearchService {
    SearchService::new(store.clone(), store.clone(), Arc::new(backend.clone()))
}

pub fn app_state(store: &Arc<MemoryStore>, backend: &MockBackend) -> AppState {
    AppState::new(
        chat_service(store, backend),
        note_service(store),
        search_service(store, backend),
    )
}
