//! Structured logging field names shared by every quire crate.
//!
//! Use these constants as `tracing` field keys so that log queries work the
//! same way for the indexer, the chat orchestrator and the HTTP layer.
//!
//! ## Log Level Contract
//!
//! | Level | Usage |
//! |-------|-------|
//! | ERROR | A job or chat turn failed and nothing was written |
//! | WARN  | Remote call retried, job nacked, optional collaborator missing |
//! | INFO  | Lifecycle events (startup, shutdown), completed jobs and turns |
//! | DEBUG | Per-request and per-chunk detail, decision points |

// ─── Identity fields ───────────────────────────────────────────────────────

/// Subsystem originating the log event.
/// Values: "api", "db", "inference", "jobs", "chat"
pub const SUBSYSTEM: &str = "subsystem";

/// Component within a subsystem.
/// Examples: "pool", "worker", "indexer", "gemini", "orchestrator"
pub const COMPONENT: &str = "component";

/// Logical operation name.
/// Examples: "embed", "generate", "decide_rag", "replace_chunks"
pub const OPERATION: &str = "op";

// ─── Entity fields ─────────────────────────────────────────────────────────

/// Note UUID being operated on.
pub const NOTE_ID: &str = "note_id";

/// Chat session UUID being operated on.
pub const SESSION_ID: &str = "session_id";

/// Index job UUID (one per delivery chain).
pub const JOB_ID: &str = "job_id";

/// Delivery attempt of a job or remote call.
pub const ATTEMPT: &str = "attempt";

// ─── Measurement fields ────────────────────────────────────────────────────

/// Wall-clock duration in milliseconds.
pub const DURATION_MS: &str = "duration_ms";

/// Number of results returned by a search or query.
pub const RESULT_COUNT: &str = "result_count";

/// Number of chunks produced or persisted.
pub const CHUNK_COUNT: &str = "chunk_count";

/// Number of extracted pages.
pub const PAGE_COUNT: &str = "page_count";

/// Byte length of a prompt.
pub const PROMPT_LEN: &str = "prompt_len";

/// Byte length of a model response.
pub const RESPONSE_LEN: &str = "response_len";

// ─── Inference fields ──────────────────────────────────────────────────────

/// Model name used for inference.
pub const MODEL: &str = "model";

/// Embedding task mode ("RETRIEVAL_DOCUMENT" or "RETRIEVAL_QUERY").
pub const TASK_TYPE: &str = "task_type";

/// Whether a chat turn used retrieval.
pub const USE_RAG: &str = "use_rag";

// ─── Outcome fields ────────────────────────────────────────────────────────

/// Error message when an operation fails.
pub const ERROR_MSG: &str = "error";
