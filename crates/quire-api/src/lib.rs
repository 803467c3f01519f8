//! # quire-api
//!
//! HTTP API and service layer for quire: configuration, the RAG chat
//! orchestrator, semantic search and the note mutations that feed the
//! index queue.

pub mod config;
pub mod handlers;
pub mod services;
pub mod telemetry;

#[cfg(test)]
mod testing;

pub use config::AppConfig;
pub use handlers::{router, ApiError, AppState};
