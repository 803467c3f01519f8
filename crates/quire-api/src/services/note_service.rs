//! Note, notebook and attachment mutations.
//!
//! Every change that alters what a note's chunks are built from (content,
//! title, notebook, attachment) publishes an index job once it is stored.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use quire_core::{
    defaults, CreateNoteRequest, CreateNotebookRequest, Error, FileRepository, IndexJob,
    JobPublisher, Note, NoteFile, NoteRepository, Notebook, NotebookRepository, ObjectStore,
    Result, UpdateNoteRequest,
};

/// An upload to attach to a note.
#[derive(Debug, Clone)]
pub struct Attachment {
    pub original_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

pub struct NoteService {
    notebooks: Arc<dyn NotebookRepository>,
    notes: Arc<dyn NoteRepository>,
    files: Arc<dyn FileRepository>,
    store: Arc<dyn ObjectStore>,
    publisher: Arc<dyn JobPublisher>,
}

fn require(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidInput(format!("{} must not be empty", field)));
    }
    Ok(())
}

/// Object key for a new upload: a fresh id plus the upload's extension.
fn object_key(original_name: &str) -> String {
    let ext = Path::new(original_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_else(|| "pdf".to_string());
    format!("{}.{}", Uuid::new_v4(), ext)
}

impl NoteService {
    pub fn new(
        notebooks: Arc<dyn NotebookRepository>,
        notes: Arc<dyn NoteRepository>,
        files: Arc<dyn FileRepository>,
        store: Arc<dyn ObjectStore>,
        publisher: Arc<dyn JobPublisher>,
    ) -> Self {
        Self {
            notebooks,
            notes,
            files,
            store,
            publisher,
        }
    }

    async fn reindex(&self, note_id: Uuid) -> Result<()> {
        self.publisher.publish(IndexJob::new(note_id)).await
    }

    // =========================================================================
    // NOTES
    // =========================================================================

    pub async fn create_note(&self, req: CreateNoteRequest) -> Result<Note> {
        require(&req.title, "title")?;
        let note = self.notes.insert(req).await?;
        self.reindex(note.id).await?;
        info!(subsystem = "api", component = "notes", op = "create", note_id = %note.id, "Note created");
        Ok(note)
    }

    pub async fn get_note(&self, id: Uuid) -> Result<Note> {
        self.notes.fetch(id).await
    }

    pub async fn update_note(&self, id: Uuid, req: UpdateNoteRequest) -> Result<Note> {
        require(&req.title, "title")?;
        let note = self.notes.update_content(id, req).await?;
        self.reindex(note.id).await?;
        info!(subsystem = "api", component = "notes", op = "update", note_id = %id, "Note updated");
        Ok(note)
    }

    /// Move a note to another live notebook.
    pub async fn move_note(&self, id: Uuid, notebook_id: Uuid) -> Result<Note> {
        let note = self.notes.move_to(id, notebook_id).await?;
        self.reindex(note.id).await?;
        info!(
            subsystem = "api",
            component = "notes",
            op = "move",
            note_id = %id,
            notebook_id = %notebook_id,
            "Note moved"
        );
        Ok(note)
    }

    /// Soft-delete a note with its chunks and attachment row.
    pub async fn delete_note(&self, id: Uuid) -> Result<()> {
        self.notes.delete(id).await
    }

    /// Store `attachment` as the note's only active file and re-index the note.
    pub async fn attach_file(&self, note_id: Uuid, attachment: Attachment) -> Result<NoteFile> {
        require(&attachment.original_name, "file name")?;
        if !attachment.data.starts_with(b"%PDF") {
            return Err(Error::InvalidInput(
                "only PDF attachments are supported".to_string(),
            ));
        }
        self.notes.fetch(note_id).await?;

        let now = Utc::now();
        let file = NoteFile {
            id: Uuid::new_v4(),
            file_name: object_key(&attachment.original_name),
            original_name: attachment.original_name,
            bucket: defaults::ATTACHMENT_BUCKET.to_string(),
            content_type: attachment.content_type,
            note_id,
            created_at: now,
            updated_at: None,
        };

        self.store
            .put(&file.bucket, &file.file_name, &attachment.data)
            .await?;
        if let Err(e) = self.files.replace_for_note(&file).await {
            if let Err(cleanup) = self.store.delete(&file.bucket, &file.file_name).await {
                warn!(
                    subsystem = "api",
                    component = "notes",
                    note_id = %note_id,
                    key = %file.file_name,
                    error = %cleanup,
                    "Failed to remove orphaned upload"
                );
            }
            return Err(e);
        }
        self.reindex(note_id).await?;

        info!(
            subsystem = "api",
            component = "notes",
            op = "attach_file",
            note_id = %note_id,
            file_id = %file.id,
            bytes = attachment.data.len(),
            "Attachment stored"
        );
        Ok(file)
    }

    // =========================================================================
    // NOTEBOOKS
    // =========================================================================

    pub async fn create_notebook(&self, req: CreateNotebookRequest) -> Result<Notebook> {
        require(&req.name, "name")?;
        self.notebooks.insert(req).await
    }

    pub async fn get_notebook(&self, id: Uuid) -> Result<Notebook> {
        self.notebooks.fetch(id).await
    }

    pub async fn list_notebooks(&self) -> Result<Vec<Notebook>> {
        self.notebooks.list().await
    }

    /// Soft-delete a notebook, its notes and their chunks; children are detached.
    pub async fn delete_notebook(&self, id: Uuid) -> Result<()> {
        self.notebooks.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{note_service, MemoryStore};

    const PDF: &[u8] = b"%PDF-1.7\n...";

    fn setup() -> (NoteService, Arc<MemoryStore>, Notebook) {
        let store = Arc::new(MemoryStore::default());
        let notebook = store.add_notebook("Policies");
        (note_service(&store), store, notebook)
    }

    fn pdf(name: &str) -> Attachment {
        Attachment {
            original_name: name.to_string(),
            content_type: "application/pdf".to_string(),
            data: PDF.to_vec(),
        }
    }

    #[test]
    fn test_object_key_keeps_extension() {
        assert!(object_key("Handbook.PDF").ends_with(".pdf"));
        assert!(object_key("no-extension").ends_with(".pdf"));
        assert!(object_key("../../etc/passwd").ends_with(".pdf"));
        assert_ne!(object_key("a.pdf"), object_key("a.pdf"));
    }

    #[tokio::test]
    async fn test_create_note_publishes_index_job() {
        let (service, store, notebook) = setup();
        let note = service
            .create_note(CreateNoteRequest {
                title: "Refunds".to_string(),
                content: "Refunds take 14 days.".to_string(),
                notebook_id: notebook.id,
            })
            .await
            .unwrap();

        assert_eq!(store.published(), vec![IndexJob::new(note.id)]);
        assert_eq!(service.get_note(note.id).await.unwrap().title, "Refunds");
    }

    #[tokio::test]
    async fn test_create_note_requires_title_and_notebook() {
        let (service, store, notebook) = setup();
        let err = service
            .create_note(CreateNoteRequest {
                title: " ".to_string(),
                content: String::new(),
                notebook_id: notebook.id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = service
            .create_note(CreateNoteRequest {
                title: "Orphan".to_string(),
                content: String::new(),
                notebook_id: Uuid::new_v4(),
            })
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.published().is_empty());
    }

    #[tokio::test]
    async fn test_update_and_move_publish() {
        let (service, store, notebook) = setup();
        let target = store.add_notebook("Archive");
        let note = store.add_note(notebook.id, "Old", "old");

        let updated = service
            .update_note(
                note.id,
                UpdateNoteRequest {
                    title: "New".to_string(),
                    content: "new".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "New");

        let moved = service.move_note(note.id, target.id).await.unwrap();
        assert_eq!(moved.notebook_id, target.id);
        assert_eq!(store.published().len(), 2);
    }

    #[tokio::test]
    async fn test_move_to_missing_notebook_is_not_found() {
        let (service, store, notebook) = setup();
        let note = store.add_note(notebook.id, "Note", "");

        let err = service.move_note(note.id, Uuid::new_v4()).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.published().is_empty());
    }

    #[tokio::test]
    async fn test_attach_file_stores_and_reindexes() {
        let (service, store, notebook) = setup();
        let note = store.add_note(notebook.id, "Guide", "");

        let first = service.attach_file(note.id, pdf("guide-v1.pdf")).await.unwrap();
        let second = service.attach_file(note.id, pdf("guide-v2.pdf")).await.unwrap();

        assert_eq!(first.bucket, defaults::ATTACHMENT_BUCKET);
        assert_eq!(
            store.object(&second.bucket, &second.file_name).as_deref(),
            Some(PDF)
        );
        let active = store.active_file(note.id).unwrap();
        assert_eq!(active.id, second.id);
        assert_eq!(active.original_name, "guide-v2.pdf");
        assert_eq!(store.published(), vec![IndexJob::new(note.id); 2]);
    }

    #[tokio::test]
    async fn test_attach_rejects_non_pdf_and_missing_note() {
        let (service, store, notebook) = setup();
        let note = store.add_note(notebook.id, "Guide", "");

        let mut zip = pdf("archive.zip");
        zip.data = b"PK\x03\x04".to_vec();
        let err = service.attach_file(note.id, zip).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));

        let err = service
            .attach_file(Uuid::new_v4(), pdf("x.pdf"))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
        assert!(store.published().is_empty());
    }

    #[tokio::test]
    async fn test_notebook_lifecycle() {
        let (service, _, parent) = setup();
        let child = service
            .create_notebook(CreateNotebookRequest {
                name: "Child".to_string(),
                parent_id: Some(parent.id),
            })
            .await
            .unwrap();
        assert_eq!(child.parent_id, Some(parent.id));
        assert_eq!(service.list_notebooks().await.unwrap().len(), 2);

        service.delete_notebook(child.id).await.unwrap();
        assert!(service.get_notebook(child.id).await.unwrap_err().is_not_found());
        assert!(service.delete_notebook(child.id).await.unwrap_err().is_not_found());

        let err = service
            .create_notebook(CreateNotebookRequest {
                name: String::new(),
                parent_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_delete_note_then_fetch_is_not_found() {
        let (service, store, notebook) = setup();
        let note = store.add_note(notebook.id, "Gone", "");

        service.delete_note(note.id).await.unwrap();
        assert!(service.get_note(note.id).await.unwrap_err().is_not_found());
        assert!(service.delete_note(note.id).await.unwrap_err().is_not_found());
    }
}
