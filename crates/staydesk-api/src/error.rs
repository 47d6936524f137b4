use serde::Deserialize;
use thiserror::Error;

/// Everything that can go wrong talking to the backend
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// HTTP status behind this error, if the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::NotFound(_) => Some(404),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Network(e) => e.status().map(|s| s.as_u16()),
            ApiError::Decode(_) | ApiError::InvalidRequest(_) => None,
        }
    }

    /// The message a toast should show for this error
    ///
    /// For server errors this is the `message` field the backend sent,
    /// not the formatted `Display` output.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::NotFound(m) | ApiError::Unauthorized(m) => m.clone(),
            ApiError::Status { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Build an error from a non-2xx response body
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = extract_message(body).unwrap_or_else(|| {
            if body.trim().is_empty() {
                reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Request failed")
                    .to_string()
            } else {
                body.trim().to_string()
            }
        });

        match status {
            401 => ApiError::Unauthorized(message),
            404 => ApiError::NotFound(message),
            _ => ApiError::Status { status, message },
        }
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error: Option<String>,
}

/// Pull the `{message}` field out of an error body
fn extract_message(body: &str) -> Option<String> {
    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    parsed.message.or(parsed.error).filter(|m| !m.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_body_is_used() {
        let err = ApiError::from_response(400, r#"{"message":"Title is required"}"#);
        assert_eq!(err.user_message(), "Title is required");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_not_found_mapping() {
        let err = ApiError::from_response(404, r#"{"message":"Booking not found"}"#);
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "Booking not found"));
    }

    #[test]
    fn test_unauthorized_mapping() {
        let err = ApiError::from_response(401, "");
        assert!(matches!(err, ApiError::Unauthorized(ref m) if m == "Unauthorized"));
    }

    #[test]
    fn test_plain_text_body_falls_back_to_body() {
        let err = ApiError::from_response(502, "upstream down\n");
        assert_eq!(err.user_message(), "upstream down");
    }

    #[test]
    fn test_error_field_is_accepted() {
        let err = ApiError::from_response(500, r#"{"error":"boom"}"#);
        assert_eq!(err.user_message(), "boom");
    }
}
