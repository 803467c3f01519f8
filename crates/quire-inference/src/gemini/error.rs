//! Gemini-specific error handling.

use quire_core::Error;

/// Error classes reported by the Gemini API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeminiErrorCode {
    /// Missing or invalid API key.
    PermissionDenied,
    /// Quota or rate limit exceeded.
    ResourceExhausted,
    /// Model or endpoint not found.
    NotFound,
    /// Malformed request or unsupported argument.
    InvalidArgument,
    /// Server-side failure or overload.
    Unavailable,
    /// Anything else.
    Unknown,
}

impl GeminiErrorCode {
    /// Classify a failed response by HTTP status and the API's `status` string.
    pub fn from_response(status: u16, api_status: &str) -> Self {
        match (status, api_status) {
            (401 | 403, _) | (_, "PERMISSION_DENIED" | "UNAUTHENTICATED") => Self::PermissionDenied,
            (429, _) | (_, "RESOURCE_EXHAUSTED") => Self::ResourceExhausted,
            (404, _) | (_, "NOT_FOUND") => Self::NotFound,
            (400, _) | (_, "INVALID_ARGUMENT" | "FAILED_PRECONDITION") => Self::InvalidArgument,
            (500..=599, _) => Self::Unavailable,
            _ => Self::Unknown,
        }
    }

    /// Whether the same request may succeed later.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ResourceExhausted | Self::Unavailable)
    }
}

/// Convert a Gemini failure to a quire Error for the given call kind.
pub fn to_quire_error(code: GeminiErrorCode, kind: CallKind, message: &str) -> Error {
    match code {
        GeminiErrorCode::PermissionDenied => {
            Error::Config(format!("Gemini rejected the API key: {}", message))
        }
        GeminiErrorCode::NotFound => Error::Config(format!("Gemini model not found: {}", message)),
        _ => kind.error(message.to_string()),
    }
}

/// Which remote operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallKind {
    Embed,
    Generate,
}

impl CallKind {
    pub fn error(&self, message: String) -> Error {
        match self {
            CallKind::Embed => Error::Embedding(message),
            CallKind::Generate => Error::Inference(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifies_auth_failures() {
        assert_eq!(
            GeminiErrorCode::from_response(403, "PERMISSION_DENIED"),
            GeminiErrorCode::PermissionDenied
        );
        assert_eq!(
            GeminiErrorCode::from_response(400, "UNAUTHENTICATED"),
            GeminiErrorCode::PermissionDenied
        );
    }

    #[test]
    fn test_classifies_rate_limit_as_retryable() {
        let code = GeminiErrorCode::from_response(429, "RESOURCE_EXHAUSTED");
        assert_eq!(code, GeminiErrorCode::ResourceExhausted);
        assert!(code.is_retryable());
    }

    #[test]
    fn test_server_errors_are_retryable() {
        for status in [500, 502, 503, 504] {
            assert!(GeminiErrorCode::from_response(status, "").is_retryable());
        }
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        assert!(!GeminiErrorCode::from_response(400, "INVALID_ARGUMENT").is_retryable());
        assert!(!GeminiErrorCode::from_response(404, "").is_retryable());
        assert!(!GeminiErrorCode::from_response(418, "").is_retryable());
    }

    #[test]
    fn test_conversion_depends_on_call_kind() {
        let err = to_quire_error(GeminiErrorCode::Unavailable, CallKind::Embed, "overloaded");
        assert!(matches!(err, Error::Embedding(_)));

        let err = to_quire_error(GeminiErrorCode::Unavailable, CallKind::Generate, "overloaded");
        assert!(matches!(err, Error::Inference(_)));

        let err = to_quire_error(GeminiErrorCode::PermissionDenied, CallKind::Generate, "bad key");
        assert!(matches!(err, Error::Config(_)));
    }
}
