//! Service layer for business logic.

pub mod chat_service;
pub mod note_service;
pub mod search_service;

pub use chat_service::{ChatService, SendChatResponse};
pub use note_service::{Attachment, NoteService};
pub use search_service::{NoteSearchHit, SearchService};
