//! Error types for backend calls and document export.

use officine_core::{EnvelopeError, ValidationError};
use thiserror::Error;

use crate::session::SessionError;

/// Message shown for failures the user can only retry.
pub const GENERIC_MESSAGE: &str = "Une erreur est survenue";

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Network or protocol failure before a response arrived.
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The backend rejected the submitted data.
    #[error("Validation error ({status}): {message}")]
    Validation {
        status: u16,
        message: String,
        fields: Vec<ValidationError>,
    },

    /// 401: the session has already been cleared.
    #[error("Unauthorized: session expired")]
    Unauthorized,

    /// 404 on the given path.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Any other non-success response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// The response body did not have the expected shape.
    #[error("Parse error: {0}")]
    Decode(String),

    /// The call needs a token and there is none.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The signed-in user's role does not allow the operation.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The session could not be persisted.
    #[error("Session storage error: {0}")]
    Session(#[from] SessionError),
}

impl From<EnvelopeError> for ApiError {
    fn from(err: EnvelopeError) -> Self {
        Self::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}

impl ApiError {
    /// Text to show the user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation { message, .. } => message.clone(),
            Self::Unauthorized => "Session expirée, veuillez vous reconnecter".to_owned(),
            Self::NotFound(_) => "Élément introuvable".to_owned(),
            Self::NotAuthenticated => "Veuillez vous connecter".to_owned(),
            Self::Forbidden(_) => "Accès non autorisé".to_owned(),
            Self::Transport(_) | Self::Api { .. } | Self::Decode(_) | Self::Session(_) => {
                GENERIC_MESSAGE.to_owned()
            }
        }
    }

    /// Whether a detail view should show its "not found" state.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// HTTP status carried by the error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Validation { status, .. } | Self::Api { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            Self::NotFound(_) => Some(404),
            Self::Transport(err) => err.status().map(|s| s.as_u16()),
            Self::Decode(_) | Self::NotAuthenticated | Self::Forbidden(_) | Self::Session(_) => {
                None
            }
        }
    }
}

/// Errors that can occur when rendering a document.
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF rendering failed: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_messages() {
        assert_eq!(
            ApiError::Unauthorized.user_message(),
            "Session expirée, veuillez vous reconnecter"
        );
        assert_eq!(
            ApiError::NotFound("/api/invoices/9/".to_owned()).user_message(),
            "Élément introuvable"
        );
        assert_eq!(ApiError::Decode("x".to_owned()).user_message(), GENERIC_MESSAGE);
        assert_eq!(
            ApiError::Api {
                status: 500,
                message: String::new()
            }
            .user_message(),
            GENERIC_MESSAGE
        );
    }

    #[test]
    fn test_validation_message_is_shown() {
        let err = ApiError::Validation {
            status: 400,
            message: "Ce numéro existe déjà.".to_owned(),
            fields: Vec::new(),
        };
        assert_eq!(err.user_message(), "Ce numéro existe déjà.");
        assert_eq!(err.status(), Some(400));
    }

    #[test]
    fn test_is_not_found() {
        assert!(ApiError::NotFound(String::new()).is_not_found());
        assert!(!ApiError::Unauthorized.is_not_found());
        assert_eq!(ApiError::NotAuthenticated.status(), None);
    }
}
