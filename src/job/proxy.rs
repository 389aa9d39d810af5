use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use crate::error::{DecodeError, JetError, Result};
use crate::invocation::Dispatcher;
use crate::job::{Job, JobConfig, JobGraph, JobId, JobStatus};
use crate::protocol::codec::{
    CancelJobCodec, GetJobStatusCodec, GetJobSubmissionTimeCodec, JobIdRequest,
    JoinSubmittedJobCodec, SubmitJobCodec, SubmitJobRequest,
};
use crate::protocol::OperationKind;

/// Graph and configuration a job was submitted with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub graph: JobGraph,
    pub config: JobConfig,
}

/// Client-side handle to a job running in the cluster.
///
/// The proxy holds no remote state: every query is a fresh round trip to the
/// coordinator, so any number of proxies for the same id stay consistent
/// with each other.
#[derive(Clone)]
pub struct ClientJobProxy {
    dispatcher: Dispatcher,
    id: JobId,
    /// Present only when the proxy was created by submission
    submission: Option<Arc<Submission>>,
}

impl ClientJobProxy {
    /// Handle to an existing job. Nothing is fetched.
    pub fn new(dispatcher: Dispatcher, id: JobId) -> Self {
        Self {
            dispatcher,
            id,
            submission: None,
        }
    }

    /// Submit `graph` with `config`; returns once the cluster has assigned
    /// the job id.
    pub async fn submit(dispatcher: &Dispatcher, graph: JobGraph, config: JobConfig) -> Result<Self> {
        let request = SubmitJobRequest { graph, config };
        let id = dispatcher
            .invoke_on_coordinator::<SubmitJobCodec>(&request)
            .await?;

        tracing::info!(
            job_id = %id,
            name = ?request.config.name,
            resources = request.config.resources.len(),
            "Job submitted"
        );

        Ok(Self {
            dispatcher: dispatcher.clone(),
            id,
            submission: Some(Arc::new(Submission {
                graph: request.graph,
                config: request.config,
            })),
        })
    }

    pub fn submission(&self) -> Option<&Submission> {
        self.submission.as_deref()
    }

    /// Job name from the submission config, if this proxy submitted the job.
    pub fn name(&self) -> Option<&str> {
        self.submission
            .as_ref()
            .and_then(|s| s.config.name.as_deref())
    }

    fn request(&self) -> JobIdRequest {
        JobIdRequest { job_id: self.id }
    }
}

#[async_trait]
impl Job for ClientJobProxy {
    fn id(&self) -> JobId {
        self.id
    }

    async fn status(&self) -> Result<JobStatus> {
        self.dispatcher
            .invoke_on_coordinator::<GetJobStatusCodec>(&self.request())
            .await
    }

    async fn submission_time(&self) -> Result<DateTime<Utc>> {
        let millis = self
            .dispatcher
            .invoke_on_coordinator::<GetJobSubmissionTimeCodec>(&self.request())
            .await?;
        Utc.timestamp_millis_opt(millis).single().ok_or_else(|| {
            JetError::Decoding(DecodeError::new(
                OperationKind::GetJobSubmissionTime,
                format!("timestamp {} out of range", millis),
            ))
        })
    }

    async fn cancel(&self) -> Result<()> {
        self.dispatcher
            .invoke_on_coordinator::<CancelJobCodec>(&self.request())
            .await?;
        tracing::info!(job_id = %self.id, "Job cancellation requested");
        Ok(())
    }

    async fn join(&self) -> Result<()> {
        self.dispatcher
            .invoke_on_coordinator::<JoinSubmittedJobCodec>(&self.request())
            .await
    }
}

impl fmt::Debug for ClientJobProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientJobProxy")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

impl fmt::Display for ClientJobProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "Job '{}' {}", name, self.id),
            None => write!(f, "Job {}", self.id),
        }
    }
}
