//! Gemini backend: `embedContent` and `generateContent` over HTTPS.

mod backend;
pub mod error;
pub mod types;

pub use backend::{GeminiBackend, GeminiConfig};
pub use error::GeminiErrorCode;
