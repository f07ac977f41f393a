use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProxmoxError {
    /// Ticket acquisition did not yield a session.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Non-2xx response, an `errors` body, or a transport failure.
    /// `status` is `None` when no response was received.
    #[error("{message}")]
    Api {
        status: Option<StatusCode>,
        message: String,
    },

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Operation timed out: {0}")]
    Timeout(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ProxmoxError {
    pub fn api(status: Option<StatusCode>, message: impl Into<String>) -> Self {
        ProxmoxError::Api {
            status,
            message: message.into(),
        }
    }

    pub fn invalid_params(msg: impl Into<String>) -> Self {
        ProxmoxError::InvalidParams(msg.into())
    }

    /// HTTP status of a remote failure, if one was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ProxmoxError::Api { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ProxmoxError {
    fn from(err: reqwest::Error) -> Self {
        ProxmoxError::Api {
            status: err.status(),
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ProxmoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_displays_bare_message() {
        let err = ProxmoxError::api(Some(StatusCode::BAD_REQUEST), "vmid: already exists");
        assert_eq!(err.to_string(), "vmid: already exists");
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
    }

    #[test]
    fn test_auth_error_display() {
        let err = ProxmoxError::Authentication("no ticket in response".to_string());
        assert_eq!(err.to_string(), "Authentication failed: no ticket in response");
        assert_eq!(err.status(), None);
    }
}
