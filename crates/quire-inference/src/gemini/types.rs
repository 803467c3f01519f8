//! Gemini API request and response types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value as JsonValue};

use quire_core::{ChatTurn, EmbeddingTask};

// =============================================================================
// SHARED TYPES
// =============================================================================

/// A text part of a content block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

/// A content block; `role` is omitted for embedding requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Content {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            parts: vec![Part { text: text.into() }],
            role: None,
        }
    }
}

impl From<&ChatTurn> for Content {
    fn from(turn: &ChatTurn) -> Self {
        Self {
            parts: vec![Part {
                text: turn.text.clone(),
            }],
            role: Some(turn.role.as_str().to_string()),
        }
    }
}

// =============================================================================
// EMBEDDING TYPES
// =============================================================================

/// Request body for `models/{model}:embedContent`.
#[derive(Debug, Serialize)]
pub struct EmbedContentRequest {
    pub model: String,
    pub content: Content,
    pub task_type: EmbeddingTask,
}

/// Response from `embedContent`.
#[derive(Debug, Deserialize)]
pub struct EmbedContentResponse {
    pub embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
pub struct ContentEmbedding {
    pub values: Vec<f32>,
}

// =============================================================================
// GENERATION TYPES
// =============================================================================

/// Request body for `models/{model}:generateContent`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generation_config: Option<GenerationConfig>,
}

/// Output constraints for a generation request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub response_mime_type: String,
    pub response_schema: JsonValue,
}

impl GenerationConfig {
    /// JSON object with a single required boolean `answer_directly`.
    pub fn answer_directly_schema() -> Self {
        Self {
            response_mime_type: "application/json".to_string(),
            response_schema: json!({
                "type": "OBJECT",
                "properties": {
                    "answer_directly": { "type": "BOOLEAN" }
                },
                "required": ["answer_directly"]
            }),
        }
    }
}

/// Response from `generateContent`.
#[derive(Debug, Deserialize)]
pub struct GenerateContentResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate.
    pub fn first_text(&self) -> Option<&str> {
        self.candidates
            .first()?
            .content
            .as_ref()?
            .parts
            .first()
            .map(|p| p.text.as_str())
    }
}

/// Structured reply of the retrieval classifier.
#[derive(Debug, Deserialize, PartialEq, Eq)]
pub struct AnswerDirectlyReply {
    pub answer_directly: bool,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Error envelope returned by the API on non-2xx responses.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiError,
}

#[derive(Debug, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embed_request_shape() {
        let req = EmbedContentRequest {
            model: "models/embed".to_string(),
            content: Content::text("hello"),
            task_type: EmbeddingTask::RetrievalDocument,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({
                "model": "models/embed",
                "content": { "parts": [{ "text": "hello" }] },
                "task_type": "RETRIEVAL_DOCUMENT"
            })
        );
    }

    #[test]
    fn test_generate_request_omits_missing_config() {
        let req = GenerateContentRequest {
            contents: vec![Content::from(&ChatTurn::user("hi"))],
            generation_config: None,
        };
        assert_eq!(
            serde_json::to_value(&req).unwrap(),
            json!({ "contents": [{ "parts": [{ "text": "hi" }], "role": "user" }] })
        );
    }

    #[test]
    fn test_decision_config_shape() {
        let value = serde_json::to_value(GenerationConfig::answer_directly_schema()).unwrap();
        assert_eq!(value["responseMimeType"], "application/json");
        assert_eq!(value["responseSchema"]["required"], json!(["answer_directly"]));
        assert_eq!(
            value["responseSchema"]["properties"]["answer_directly"]["type"],
            "BOOLEAN"
        );
    }

    #[test]
    fn test_first_text_handles_empty_candidates() {
        let empty: GenerateContentResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.first_text(), None);

        let full: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{ "content": { "parts": [{ "text": "answer" }], "role": "model" } }]
        }))
        .unwrap();
        assert_eq!(full.first_text(), Some("answer"));
    }
}
