//! # quire-jobs
//!
//! Background indexing for quire.
//!
//! This crate provides:
//! - A bounded in-process index queue with cloneable publishers
//! - A single-consumer worker with redelivery and shutdown draining
//! - The document indexer that rebuilds a note's chunk generation
//! - The `pdftotext` page extraction adapter
//!
//! ## Example
//!
//! ```ignore
//! use quire_jobs::{DocumentIndexer, IndexQueue, IndexWorker, WorkerConfig};
//!
//! let (publisher, receiver) = IndexQueue::bounded(256);
//! let indexer = Arc::new(DocumentIndexer::new(deps, chunker));
//!
//! let handle = IndexWorker::new(receiver, indexer, WorkerConfig::default()).start();
//! publisher.publish(IndexJob::new(note_id)).await?;
//!
//! // Finish queued jobs, then stop
//! handle.shutdown().await?;
//! ```

pub mod adapters;
pub mod handler;
pub mod indexer;
pub mod queue;
pub mod worker;

#[cfg(test)]
mod testing;

pub use adapters::PdfTextAdapter;
pub use handler::{JobContext, JobHandler, JobResult};
pub use indexer::{note_page, DocumentIndexer, IndexerDeps};
pub use queue::{Delivery, IndexPublisher, IndexQueue, IndexReceiver};
pub use worker::{IndexWorker, WorkerConfig, WorkerEvent, WorkerHandle};
