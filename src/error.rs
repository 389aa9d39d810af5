use thiserror::Error;

use crate::protocol::{ErrorCode, OperationKind, RemoteFailure};
use crate::transport::TransportError;

/// Error taxonomy surfaced by every public client operation.
#[derive(Error, Debug)]
pub enum JetError {
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Not found ({code}): {message}")]
    NotFound { code: ErrorCode, message: String },

    #[error("Remote error: {0}")]
    Remote(RemoteFailure),

    #[error(transparent)]
    Decoding(#[from] DecodeError),

    #[error("Failed to encode {operation} request: {reason}")]
    Encoding {
        operation: OperationKind,
        reason: String,
    },

    #[error("No members found in cluster")]
    NoCoordinatorAvailable,

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl JetError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, JetError::NotFound { .. })
    }
}

/// A response payload did not match the schema expected for its operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to decode {operation} response: {reason}")]
pub struct DecodeError {
    pub operation: OperationKind,
    pub reason: String,
}

impl DecodeError {
    pub fn new(operation: OperationKind, reason: impl Into<String>) -> Self {
        Self {
            operation,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JetError>;
