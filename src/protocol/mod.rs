//! Request/response envelopes exchanged with cluster members.
//!
//! Each logical operation is identified by an [`OperationKind`] and carries an
//! opaque JSON payload produced by its codec (see [`codec`]). Responses echo
//! the request's correlation id and either carry a payload or a
//! [`RemoteFailure`] raised on the member.

pub mod codec;
pub mod frame;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    SubmitJob,
    GetJobIds,
    GetJobIdsByName,
    GetJobSummaryList,
    GetJobStatus,
    GetJobSubmissionTime,
    CancelJob,
    JoinSubmittedJob,
    ExistsDistributedObject,
    ReadMetrics,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationKind::SubmitJob => "SubmitJob",
            OperationKind::GetJobIds => "GetJobIds",
            OperationKind::GetJobIdsByName => "GetJobIdsByName",
            OperationKind::GetJobSummaryList => "GetJobSummaryList",
            OperationKind::GetJobStatus => "GetJobStatus",
            OperationKind::GetJobSubmissionTime => "GetJobSubmissionTime",
            OperationKind::CancelJob => "CancelJob",
            OperationKind::JoinSubmittedJob => "JoinSubmittedJob",
            OperationKind::ExistsDistributedObject => "ExistsDistributedObject",
            OperationKind::ReadMetrics => "ReadMetrics",
        };
        f.write_str(name)
    }
}

/// Request envelope for one invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientMessage {
    pub correlation_id: u64,
    pub operation: OperationKind,
    pub payload: Value,
}

/// Response envelope matched to its request by `correlation_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseMessage {
    pub correlation_id: u64,
    pub body: ResponseBody,
}

impl ResponseMessage {
    pub fn ok(correlation_id: u64, payload: Value) -> Self {
        Self {
            correlation_id,
            body: ResponseBody::Ok(payload),
        }
    }

    pub fn err(correlation_id: u64, failure: RemoteFailure) -> Self {
        Self {
            correlation_id,
            body: ResponseBody::Err(failure),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResponseBody {
    Ok(Value),
    Err(RemoteFailure),
}

/// Classification attached by the member to a failure it raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    JobNotFound,
    ObjectNotFound,
    IllegalArgument,
    IllegalState,
    Cancelled,
    Internal,
    /// Wrapper added by an executor or forwarding member; the real failure
    /// is the cause.
    Wrapped,
    Other(String),
}

impl ErrorCode {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ErrorCode::JobNotFound | ErrorCode::ObjectNotFound)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::JobNotFound => write!(f, "JobNotFound"),
            ErrorCode::ObjectNotFound => write!(f, "ObjectNotFound"),
            ErrorCode::IllegalArgument => write!(f, "IllegalArgument"),
            ErrorCode::IllegalState => write!(f, "IllegalState"),
            ErrorCode::Cancelled => write!(f, "Cancelled"),
            ErrorCode::Internal => write!(f, "Internal"),
            ErrorCode::Wrapped => write!(f, "Wrapped"),
            ErrorCode::Other(name) => write!(f, "{}", name),
        }
    }
}

/// A failure raised on a cluster member, possibly wrapping its cause.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFailure {
    pub code: ErrorCode,
    pub message: String,
    pub cause: Option<Box<RemoteFailure>>,
}

impl RemoteFailure {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            cause: None,
        }
    }

    /// Wrap `self` as the cause of a [`ErrorCode::Wrapped`] failure.
    pub fn wrapped(self, message: impl Into<String>) -> Self {
        Self {
            code: ErrorCode::Wrapped,
            message: message.into(),
            cause: Some(Box::new(self)),
        }
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}
