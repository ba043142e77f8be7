use thiserror::Error;

use crate::domain::errors::DomainError;

const GENERIC_MESSAGE: &str = "An unexpected error occurred.";

#[derive(Debug, Error)]
pub enum AppError {
    /// Rejected on the client before any network call.
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error("Network error: {0}")]
    Network(String),

    /// HTTP 400 carrying a message meant for the user.
    #[error("Rejected by server: {0}")]
    ServerValidation(String),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Session store error: {0}")]
    Session(String),
}

impl AppError {
    /// Text to show the user for this failure.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Validation(e) => e.to_string(),
            AppError::ServerValidation(msg) => msg.clone(),
            AppError::Unauthorized | AppError::NotAuthenticated => {
                "Please sign in again.".to_string()
            }
            AppError::Network(_)
            | AppError::MalformedResponse(_)
            | AppError::Config(_)
            | AppError::Session(_) => GENERIC_MESSAGE.to_string(),
        }
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, AppError::Validation(_))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            AppError::MalformedResponse(e.to_string())
        } else {
            AppError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::MalformedResponse(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_message_is_shown_verbatim() {
        let err: AppError = DomainError::EmptyBatch.into();
        assert!(err.is_validation());
        assert_eq!(err.user_message(), "The request list is empty");
    }

    #[test]
    fn server_validation_message_is_surfaced_verbatim() {
        let err = AppError::ServerValidation("Only 3 left on shelf".to_string());
        assert_eq!(err.user_message(), "Only 3 left on shelf");
        assert_eq!(err.to_string(), "Rejected by server: Only 3 left on shelf");
    }

    #[test]
    fn network_error_shows_generic_message() {
        let err = AppError::Network("connection refused".to_string());
        assert_eq!(err.user_message(), "An unexpected error occurred.");
        assert_eq!(err.to_string(), "Network error: connection refused");
    }

    #[test]
    fn malformed_response_shows_generic_message() {
        let err: AppError = serde_json::from_str::<u32>("\"x\"").unwrap_err().into();
        assert!(matches!(err, AppError::MalformedResponse(_)));
        assert_eq!(err.user_message(), "An unexpected error occurred.");
    }

    #[test]
    fn unauthorized_asks_to_sign_in() {
        assert_eq!(AppError::Unauthorized.user_message(), "Please sign in again.");
        assert_eq!(AppError::NotAuthenticated.to_string(), "Not signed in");
    }
}
