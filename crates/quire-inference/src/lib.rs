//! # quire-inference
//!
//! Embedding and generation clients for quire.
//!
//! This crate provides:
//! - Gemini implementation of `EmbeddingBackend` and `GenerationBackend`
//! - Bounded retry with exponential backoff for remote calls
//! - Deterministic mock backend (feature `mock`)
//!
//! # Example
//!
//! ```rust,no_run
//! use quire_core::{EmbeddingBackend, EmbeddingTask};
//! use quire_inference::{GeminiBackend, GeminiConfig};
//!
//! # async fn run() -> quire_core::Result<()> {
//! let backend = GeminiBackend::new(GeminiConfig::with_api_key("key"))?;
//! let vector = backend.embed("hello", EmbeddingTask::RetrievalQuery).await?;
//! # Ok(())
//! # }
//! ```

pub mod gemini;
pub mod retry;

// Mock inference backend for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use gemini::{GeminiBackend, GeminiConfig, GeminiErrorCode};
pub use retry::{AttemptFailure, RetryPolicy};
