use thiserror::Error;

use crate::settings::Service;

/// Failure raised by the transport before any response existed
/// (DNS, TLS, connection refused, CORS rejection, timeout).
#[derive(Debug, Clone, Error)]
#[error("{0}")]
pub struct TransportError(pub String);

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        TransportError(e.to_string())
    }
}

/// Coarse classification used by callers that only care where a failure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Detected locally, before any network call.
    Precondition,
    /// No response object exists.
    Transport,
    /// The server answered with a failing status or an unusable body.
    Protocol,
}

/// Client-level error type.
/// The `Display` text is the status message shown to the operator.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Please log in first")]
    NotAuthenticated,

    #[error("Pick a PDF first: {0}")]
    MissingFile(String),

    #[error("Upload form is invalid: expected 1 \"key\" field, found {found}")]
    InvalidUploadPlan { found: usize },

    #[error("Invalid {service} base URL '{base}': {reason}")]
    InvalidEndpoint {
        service: Service,
        base: String,
        reason: String,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("{message}")]
    Protocol { status: u16, message: String },

    #[error("Login response did not include an access token")]
    TokenMissing,
}

impl ClientError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ClientError::NotAuthenticated
            | ClientError::MissingFile(_)
            | ClientError::InvalidUploadPlan { .. }
            | ClientError::InvalidEndpoint { .. } => ErrorKind::Precondition,
            ClientError::Transport(_) => ErrorKind::Transport,
            ClientError::Protocol { .. } | ClientError::TokenMissing => ErrorKind::Protocol,
        }
    }

    /// HTTP status of the failing response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub(crate) fn protocol(status: u16, message: impl Into<String>) -> Self {
        ClientError::Protocol {
            status,
            message: message.into(),
        }
    }
}
