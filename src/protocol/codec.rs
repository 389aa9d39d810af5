//! Per-operation codecs.
//!
//! Every operation gets its own zero-sized codec type naming the request and
//! response shapes. Call sites pick the decoder they need, which keeps
//! heterogeneous response types (id sets, summaries, journal slices,
//! booleans) out of any central registry.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::cluster::MemberId;
use crate::error::{DecodeError, JetError, Result};
use crate::job::{JobConfig, JobGraph, JobId, JobStatus, JobSummary};
use crate::metrics::MetricsJournalSlice;
use crate::protocol::OperationKind;

/// An encoded request ready to be wrapped in an envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedRequest {
    pub operation: OperationKind,
    pub payload: Value,
}

pub trait Codec {
    const OPERATION: OperationKind;
    type Request: Serialize + DeserializeOwned;
    type Response: Serialize + DeserializeOwned;

    fn encode_request(request: &Self::Request) -> Result<EncodedRequest> {
        let payload = serde_json::to_value(request).map_err(|e| JetError::Encoding {
            operation: Self::OPERATION,
            reason: e.to_string(),
        })?;
        Ok(EncodedRequest {
            operation: Self::OPERATION,
            payload,
        })
    }

    /// Decode a request on the serving side.
    fn decode_request(payload: Value) -> std::result::Result<Self::Request, DecodeError> {
        serde_json::from_value(payload).map_err(|e| DecodeError::new(Self::OPERATION, e.to_string()))
    }

    /// Pure: no side effects beyond deserialization.
    fn decode_response(payload: Value) -> std::result::Result<Self::Response, DecodeError> {
        serde_json::from_value(payload).map_err(|e| DecodeError::new(Self::OPERATION, e.to_string()))
    }

    /// Encode a response on the serving side.
    fn encode_response(response: &Self::Response) -> Result<Value> {
        serde_json::to_value(response).map_err(|e| JetError::Encoding {
            operation: Self::OPERATION,
            reason: e.to_string(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitJobRequest {
    pub graph: JobGraph,
    pub config: JobConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobIdRequest {
    pub job_id: JobId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobIdsByNameRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExistsDistributedObjectRequest {
    pub service_name: String,
    pub object_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadMetricsRequest {
    pub member_id: MemberId,
    pub start_sequence: u64,
}

pub struct SubmitJobCodec;

impl Codec for SubmitJobCodec {
    const OPERATION: OperationKind = OperationKind::SubmitJob;
    type Request = SubmitJobRequest;
    type Response = JobId;
}

pub struct GetJobIdsCodec;

impl Codec for GetJobIdsCodec {
    const OPERATION: OperationKind = OperationKind::GetJobIds;
    type Request = ();
    type Response = Vec<JobId>;
}

pub struct GetJobIdsByNameCodec;

impl Codec for GetJobIdsByNameCodec {
    const OPERATION: OperationKind = OperationKind::GetJobIdsByName;
    type Request = JobIdsByNameRequest;
    type Response = Vec<JobId>;
}

pub struct GetJobSummaryListCodec;

impl Codec for GetJobSummaryListCodec {
    const OPERATION: OperationKind = OperationKind::GetJobSummaryList;
    type Request = ();
    type Response = Vec<JobSummary>;
}

pub struct GetJobStatusCodec;

impl Codec for GetJobStatusCodec {
    const OPERATION: OperationKind = OperationKind::GetJobStatus;
    type Request = JobIdRequest;
    type Response = JobStatus;
}

pub struct GetJobSubmissionTimeCodec;

impl Codec for GetJobSubmissionTimeCodec {
    const OPERATION: OperationKind = OperationKind::GetJobSubmissionTime;
    type Request = JobIdRequest;
    /// Epoch milliseconds.
    type Response = i64;
}

pub struct CancelJobCodec;

impl Codec for CancelJobCodec {
    const OPERATION: OperationKind = OperationKind::CancelJob;
    type Request = JobIdRequest;
    type Response = ();
}

pub struct JoinSubmittedJobCodec;

impl Codec for JoinSubmittedJobCodec {
    const OPERATION: OperationKind = OperationKind::JoinSubmittedJob;
    type Request = JobIdRequest;
    type Response = ();
}

pub struct ExistsDistributedObjectCodec;

impl Codec for ExistsDistributedObjectCodec {
    const OPERATION: OperationKind = OperationKind::ExistsDistributedObject;
    type Request = ExistsDistributedObjectRequest;
    type Response = bool;
}

pub struct ReadMetricsCodec;

impl Codec for ReadMetricsCodec {
    const OPERATION: OperationKind = OperationKind::ReadMetrics;
    type Request = ReadMetricsRequest;
    type Response = MetricsJournalSlice;
}
