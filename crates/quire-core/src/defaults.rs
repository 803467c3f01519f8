//! Centralized default constants for quire.
//!
//! Every crate reads its defaults from here instead of defining its own
//! magic numbers. Runtime overrides go through the application config.

// =============================================================================
// CHUNKING
// =============================================================================

/// Maximum characters per chunk produced by the paragraph chunker.
pub const MAX_CHUNK_SIZE: usize = 800;

/// Overlap descriptor stored with every chunk. The chunker never overlaps.
pub const OVERLAP_NONE: &str = "none";

/// Page number assigned to the synthetic note page.
pub const NOTE_PAGE_NUMBER: i32 = 0;

// =============================================================================
// RETRIEVAL
// =============================================================================

/// Number of chunks returned by similarity queries.
pub const SIMILARITY_LIMIT: i64 = 5;

// =============================================================================
// INDEX QUEUE
// =============================================================================

/// Capacity of the bounded index queue.
pub const INDEX_QUEUE_CAPACITY: usize = 256;

/// Deliveries attempted for one index job before it is dropped.
pub const INDEX_MAX_DELIVERIES: u32 = 3;

/// Delay before a nacked index job is delivered again.
pub const INDEX_REDELIVERY_DELAY_MS: u64 = 1000;

/// Upper bound on one index job, including every remote call it makes.
pub const INDEX_JOB_TIMEOUT_SECS: u64 = 600;

/// Capacity of the worker event broadcast channel.
pub const WORKER_EVENT_CAPACITY: usize = 64;

// =============================================================================
// REMOTE SERVICES
// =============================================================================

/// Default Gemini API base URL.
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Model addressed in the embedding endpoint path.
pub const GEMINI_EMBED_MODEL: &str = "gemini-embedding-001";

/// Model named in the embedding request body.
pub const GEMINI_EMBED_REQUEST_MODEL: &str = "models/gemini-embedding-exp-03-07";

/// Model addressed in the generation endpoint path.
pub const GEMINI_GEN_MODEL: &str = "gemini-2.5-flash";

/// Embedding vector dimension for the Gemini embedding models.
pub const EMBED_DIMENSION: usize = 3072;

/// Per-request timeout for remote calls.
pub const REMOTE_TIMEOUT_SECS: u64 = 60;

/// Attempts per remote call, including the first.
pub const REMOTE_MAX_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between remote attempts.
pub const REMOTE_RETRY_BASE_MS: u64 = 500;

// =============================================================================
// EXTRACTION
// =============================================================================

/// Timeout for one `pdftotext` invocation.
pub const PDF_EXTRACT_TIMEOUT_SECS: u64 = 60;

// =============================================================================
// STORAGE
// =============================================================================

/// Bucket used for note attachments.
pub const ATTACHMENT_BUCKET: &str = "notes";

/// Root directory for the filesystem object store.
pub const STORAGE_PATH: &str = "./data/storage";

// =============================================================================
// SERVER
// =============================================================================

/// Default bind host.
pub const SERVER_HOST: &str = "0.0.0.0";

/// Default bind port.
pub const SERVER_PORT: u16 = 3000;

/// Largest request body accepted, sized for PDF uploads.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;
