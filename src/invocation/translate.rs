use crate::error::{DecodeError, JetError};
use crate::protocol::{ErrorCode, RemoteFailure};
use crate::transport::TransportError;

/// A failure as it arrives at the dispatcher, before classification.
#[derive(Debug)]
pub enum RawFailure {
    Transport(TransportError),
    Remote(RemoteFailure),
    Decode(DecodeError),
}

/// Strip [`ErrorCode::Wrapped`] layers to recover the failure originally
/// raised on the member. A wrapper without a cause is returned as is.
pub fn peel(mut failure: RemoteFailure) -> RemoteFailure {
    while failure.code == ErrorCode::Wrapped {
        match failure.cause.take() {
            Some(cause) => failure = *cause,
            None => break,
        }
    }
    failure
}

/// Classify a raw failure into the client error taxonomy.
pub fn translate(raw: RawFailure) -> JetError {
    match raw {
        RawFailure::Transport(e) => JetError::Transport(e),
        RawFailure::Decode(e) => JetError::Decoding(e),
        RawFailure::Remote(failure) => {
            let failure = peel(failure);
            if failure.code.is_not_found() {
                JetError::NotFound {
                    code: failure.code,
                    message: failure.message,
                }
            } else {
                JetError::Remote(failure)
            }
        }
    }
}
