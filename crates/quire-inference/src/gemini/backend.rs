//! Gemini embedding and generation backend.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use quire_core::{
    defaults, ChatTurn, EmbeddingBackend, EmbeddingTask, Error, GenerationBackend, Result, Vector,
};

use super::error::{to_quire_error, CallKind, GeminiErrorCode};
use super::types::*;
use crate::retry::{AttemptFailure, RetryPolicy};

/// Configuration for the Gemini backend.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// Base URL up to and including the API version.
    pub base_url: String,
    /// Sent as `x-goog-api-key`.
    pub api_key: String,
    /// Model addressed in the embedding endpoint path.
    pub embed_model: String,
    /// Model named in the embedding request body.
    pub embed_request_model: String,
    /// Model addressed in the generation endpoint path.
    pub gen_model: String,
    /// Expected embedding length; `None` accepts any non-empty vector.
    pub embed_dimension: Option<usize>,
    /// Per-attempt request timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::GEMINI_BASE_URL.to_string(),
            api_key: String::new(),
            embed_model: defaults::GEMINI_EMBED_MODEL.to_string(),
            embed_request_model: defaults::GEMINI_EMBED_REQUEST_MODEL.to_string(),
            gen_model: defaults::GEMINI_GEN_MODEL.to_string(),
            embed_dimension: Some(defaults::EMBED_DIMENSION),
            timeout: Duration::from_secs(defaults::REMOTE_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
        }
    }
}

impl GeminiConfig {
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }
}

/// Gemini inference backend.
pub struct GeminiBackend {
    client: Client,
    config: GeminiConfig,
}

impl GeminiBackend {
    /// Create a new backend with the given configuration.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Error::Config("Gemini API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Inference(format!("Failed to create HTTP client: {}", e)))?;

        info!(
            subsystem = "inference",
            component = "gemini",
            base_url = %config.base_url,
            embed_model = %config.embed_model,
            gen_model = %config.gen_model,
            timeout_secs = config.timeout.as_secs(),
            max_attempts = config.retry.max_attempts,
            "Initializing Gemini backend"
        );

        Ok(Self { client, config })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/models/{}:{}",
            self.config.base_url.trim_end_matches('/'),
            model,
            method
        )
    }

    /// POST `body` to `url` once, classifying failures for the retry policy.
    async fn post_once<B, R>(&self, url: &str, body: &B, kind: CallKind) -> std::result::Result<R, AttemptFailure>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| {
                let retryable = e.is_timeout() || e.is_connect() || e.is_request();
                let failure = kind.error(format!("Request failed: {}", e));
                AttemptFailure { error: failure, retryable }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(self.failure_from_response(status, response, kind).await);
        }

        response
            .json::<R>()
            .await
            .map_err(|e| AttemptFailure::fatal(kind.error(format!("Invalid response body: {}", e))))
    }

    async fn failure_from_response(
        &self,
        status: StatusCode,
        response: reqwest::Response,
        kind: CallKind,
    ) -> AttemptFailure {
        let text = response.text().await.unwrap_or_default();
        let (message, api_status) = match serde_json::from_str::<ApiErrorResponse>(&text) {
            Ok(body) => (body.error.message, body.error.status),
            Err(_) => (text, String::new()),
        };
        let code = GeminiErrorCode::from_response(status.as_u16(), &api_status);
        let error = to_quire_error(code, kind, &format!("Gemini returned {}: {}", status, message));
        AttemptFailure {
            error,
            retryable: code.is_retryable(),
        }
    }

    async fn generate_content(&self, request: &GenerateContentRequest, op: &str) -> Result<String> {
        let url = self.endpoint(&self.config.gen_model, "generateContent");
        let start = Instant::now();

        let response: GenerateContentResponse = self
            .config
            .retry
            .run(op, |_| self.post_once(&url, request, CallKind::Generate))
            .await?;

        let text = response
            .first_text()
            .ok_or_else(|| Error::Inference("Gemini returned no candidates".to_string()))?
            .to_string();

        debug!(
            subsystem = "inference",
            component = "gemini",
            op,
            model = %self.config.gen_model,
            turns = request.contents.len(),
            response_len = text.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Generation complete"
        );
        Ok(text)
    }
}

#[async_trait]
impl EmbeddingBackend for GeminiBackend {
    async fn embed(&self, text: &str, task: EmbeddingTask) -> Result<Vector> {
        if text.trim().is_empty() {
            return Err(Error::InvalidInput("cannot embed empty text".to_string()));
        }

        let url = self.endpoint(&self.config.embed_model, "embedContent");
        let request = EmbedContentRequest {
            model: self.config.embed_request_model.clone(),
            content: Content::text(text),
            task_type: task,
        };
        let start = Instant::now();

        let response: EmbedContentResponse = self
            .config
            .retry
            .run("embed", |_| self.post_once(&url, &request, CallKind::Embed))
            .await?;

        let values = response.embedding.values;
        if values.is_empty() {
            return Err(Error::Embedding("Gemini returned an empty embedding".to_string()));
        }
        if let Some(expected) = self.config.embed_dimension {
            if values.len() != expected {
                return Err(Error::Embedding(format!(
                    "Gemini returned {} dimensions, expected {}",
                    values.len(),
                    expected
                )));
            }
        }

        debug!(
            subsystem = "inference",
            component = "gemini",
            op = "embed",
            model = %self.config.embed_model,
            task_type = %task,
            dimension = values.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Embedding complete"
        );
        Ok(Vector::from(values))
    }
}

#[async_trait]
impl GenerationBackend for GeminiBackend {
    async fn generate(&self, history: &[ChatTurn]) -> Result<String> {
        if history.is_empty() {
            return Err(Error::InvalidInput("empty conversation".to_string()));
        }
        let request = GenerateContentRequest {
            contents: history.iter().map(Content::from).collect(),
            generation_config: None,
        };
        self.generate_content(&request, "generate").await
    }

    async fn answer_directly(&self, history: &[ChatTurn]) -> Result<bool> {
        if history.is_empty() {
            return Err(Error::InvalidInput("empty conversation".to_string()));
        }
        let request = GenerateContentRequest {
            contents: history.iter().map(Content::from).collect(),
            generation_config: Some(GenerationConfig::answer_directly_schema()),
        };
        let text = self.generate_content(&request, "decide_rag").await?;

        let reply: AnswerDirectlyReply = serde_json::from_str(text.trim()).map_err(|e| {
            Error::Inference(format!("Unparseable retrieval decision {:?}: {}", text, e))
        })?;
        Ok(reply.answer_directly)
    }
}
