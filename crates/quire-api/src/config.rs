//! Application configuration, read once at startup.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `DATABASE_URL` | (required) | PostgreSQL connection string |
//! | `HOST` | `0.0.0.0` | Bind address |
//! | `PORT` | `3000` | Bind port |
//! | `GOOGLE_GEMINI_API_KEY` | (required) | Gemini API key |
//! | `GEMINI_BASE_URL` | `https://generativelanguage.googleapis.com/v1beta` | API base URL |
//! | `GEMINI_EMBED_MODEL` | `gemini-embedding-001` | Embedding endpoint model |
//! | `GEMINI_EMBED_REQUEST_MODEL` | `models/gemini-embedding-exp-03-07` | Model named in embedding bodies |
//! | `GEMINI_GEN_MODEL` | `gemini-2.5-flash` | Generation model |
//! | `GEMINI_TIMEOUT_SECS` | `60` | Per-request timeout |
//! | `GEMINI_MAX_ATTEMPTS` | `3` | Attempts per remote call |
//! | `GEMINI_RETRY_BASE_MS` | `500` | First backoff delay |
//! | `INDEX_QUEUE_CAPACITY` | `256` | Index queue bound |
//! | `INDEX_MAX_CHUNK_SIZE` | `800` | Chunker limit in characters |
//! | `STORAGE_PATH` | `./data/storage` | Attachment root directory |
//! | `PDFTOTEXT_TIMEOUT_SECS` | `60` | Timeout per `pdftotext` run |
//! | `DB_MAX_CONNECTIONS` | `10` | Pool ceiling |
//! | `DB_MIN_CONNECTIONS` | `1` | Idle connections kept open |
//! | `DB_ACQUIRE_TIMEOUT_SECS` | `30` | Wait for a pooled connection |

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use quire_core::{defaults, Error, Result};
use quire_db::{pool, ChunkerConfig, PoolConfig};
use quire_inference::{GeminiConfig, RetryPolicy};

/// Gemini client settings.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: String,
    pub base_url: String,
    pub embed_model: String,
    pub embed_request_model: String,
    pub gen_model: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub retry_base_ms: u64,
}

/// Process-wide configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub gemini: GeminiSettings,
    pub index_queue_capacity: usize,
    pub max_chunk_size: usize,
    pub storage_path: PathBuf,
    pub pdftotext_timeout_secs: u64,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read configuration through `lookup`, which returns a variable's value if set.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(&lookup);
        Ok(Self {
            database_url: env.required("DATABASE_URL")?,
            host: env.string("HOST", defaults::SERVER_HOST),
            port: env.parse("PORT", defaults::SERVER_PORT)?,
            gemini: GeminiSettings {
                api_key: env.required("GOOGLE_GEMINI_API_KEY")?,
                base_url: env.string("GEMINI_BASE_URL", defaults::GEMINI_BASE_URL),
                embed_model: env.string("GEMINI_EMBED_MODEL", defaults::GEMINI_EMBED_MODEL),
                embed_request_model: env
                    .string("GEMINI_EMBED_REQUEST_MODEL", defaults::GEMINI_EMBED_REQUEST_MODEL),
                gen_model: env.string("GEMINI_GEN_MODEL", defaults::GEMINI_GEN_MODEL),
                timeout_secs: env.parse("GEMINI_TIMEOUT_SECS", defaults::REMOTE_TIMEOUT_SECS)?,
                max_attempts: env.parse("GEMINI_MAX_ATTEMPTS", defaults::REMOTE_MAX_ATTEMPTS)?,
                retry_base_ms: env.parse("GEMINI_RETRY_BASE_MS", defaults::REMOTE_RETRY_BASE_MS)?,
            },
            index_queue_capacity: env
                .parse("INDEX_QUEUE_CAPACITY", defaults::INDEX_QUEUE_CAPACITY)?,
            max_chunk_size: env.parse("INDEX_MAX_CHUNK_SIZE", defaults::MAX_CHUNK_SIZE)?,
            storage_path: PathBuf::from(env.string("STORAGE_PATH", defaults::STORAGE_PATH)),
            pdftotext_timeout_secs: env
                .parse("PDFTOTEXT_TIMEOUT_SECS", defaults::PDF_EXTRACT_TIMEOUT_SECS)?,
            db_max_connections: env.parse("DB_MAX_CONNECTIONS", pool::DEFAULT_MAX_CONNECTIONS)?,
            db_min_connections: env.parse("DB_MIN_CONNECTIONS", pool::DEFAULT_MIN_CONNECTIONS)?,
            db_acquire_timeout_secs: env
                .parse("DB_ACQUIRE_TIMEOUT_SECS", pool::DEFAULT_ACQUIRE_TIMEOUT_SECS)?,
        })
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn gemini_config(&self) -> GeminiConfig {
        GeminiConfig {
            base_url: self.gemini.base_url.clone(),
            api_key: self.gemini.api_key.clone(),
            embed_model: self.gemini.embed_model.clone(),
            embed_request_model: self.gemini.embed_request_model.clone(),
            gen_model: self.gemini.gen_model.clone(),
            embed_dimension: Some(defaults::EMBED_DIMENSION),
            timeout: Duration::from_secs(self.gemini.timeout_secs),
            retry: RetryPolicy::default()
                .with_max_attempts(self.gemini.max_attempts)
                .with_base_delay(Duration::from_millis(self.gemini.retry_base_ms)),
        }
    }

    pub fn pool_config(&self) -> PoolConfig {
        PoolConfig::new()
            .max_connections(self.db_max_connections)
            .min_connections(self.db_min_connections)
            .acquire_timeout(Duration::from_secs(self.db_acquire_timeout_secs))
    }

    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig {
            max_chunk_size: self.max_chunk_size,
        }
    }

    pub fn pdftotext_timeout(&self) -> Duration {
        Duration::from_secs(self.pdftotext_timeout_secs)
    }
}

struct Env<'a, F: Fn(&str) -> Option<String>>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    fn get(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn required(&self, key: &str) -> Result<String> {
        self.get(key)
            .ok_or_else(|| Error::Config(format!("{} must be set", key)))
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.get(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T: FromStr>(&self, key: &str, default: T) -> Result<T> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{} has an invalid value: {:?}", key, raw))),
        }
    }
}
