//! # quire-core
//!
//! Core types, traits, and abstractions for quire.
//!
//! This crate provides the domain models, the shared error type and the
//! trait seams that the db, inference, jobs and api crates plug into.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;

// Re-export pgvector types
pub use pgvector::Vector;
