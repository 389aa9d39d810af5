//! Job identity, lifecycle and submission types.
//!
//! - [`JobId`]: cluster-assigned, never reused
//! - [`JobStatus`]: lifecycle state as reported by the coordinator
//! - [`JobSummary`]: read-only projection returned by summary listings
//! - [`JobConfig`] / [`JobGraph`]: what is uploaded at submission time
//! - [`Job`]: uniform lifecycle view implemented by [`ClientJobProxy`]

pub mod proxy;

use std::fmt;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{JetError, Result};

pub use proxy::ClientJobProxy;

/// Cluster-assigned job identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl JobId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for JobId {
    /// Formats as four dash-separated 16-bit hex groups, e.g. `0000-0000-0000-002a`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{:04x}-{:04x}-{:04x}-{:04x}",
            (v >> 48) & 0xffff,
            (v >> 32) & 0xffff,
            (v >> 16) & 0xffff,
            v & 0xffff
        )
    }
}

impl FromStr for JobId {
    type Err = JetError;

    /// Accepts the dashed hex form produced by `Display` or a plain decimal.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = || JetError::Config(format!("Invalid job ID: {}", s));

        if s.contains('-') {
            let groups: Vec<&str> = s.split('-').collect();
            if groups.len() != 4 || groups.iter().any(|g| g.is_empty() || g.len() > 4) {
                return Err(invalid());
            }
            let hex = groups.concat();
            return u64::from_str_radix(&hex, 16).map(JobId).map_err(|_| invalid());
        }

        s.parse::<u64>().map(JobId).map_err(|_| invalid())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JobStatus {
    NotRunning,
    Starting,
    Running,
    Completing,
    Failed,
    Completed,
}

impl JobStatus {
    /// Failed and Completed are final; no further transitions happen.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::Completed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::NotRunning => write!(f, "NOT_RUNNING"),
            JobStatus::Starting => write!(f, "STARTING"),
            JobStatus::Running => write!(f, "RUNNING"),
            JobStatus::Completing => write!(f, "COMPLETING"),
            JobStatus::Failed => write!(f, "FAILED"),
            JobStatus::Completed => write!(f, "COMPLETED"),
        }
    }
}

/// Read-only projection of a job produced by the cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobSummary {
    pub job_id: JobId,
    pub name: Option<String>,
    pub status: JobStatus,
    pub submission_time: DateTime<Utc>,
    pub completion_time: Option<DateTime<Utc>>,
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ProcessingGuarantee {
    #[default]
    None,
    AtLeastOnce,
    ExactlyOnce,
}

/// A packaged resource (class archive, data file) attached to a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub content: Vec<u8>,
}

/// Submission-time configuration of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobConfig {
    pub name: Option<String>,
    pub split_brain_protection: bool,
    pub auto_scaling: bool,
    pub processing_guarantee: ProcessingGuarantee,
    pub snapshot_interval_millis: u64,
    pub resources: Vec<Resource>,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            name: None,
            split_brain_protection: false,
            auto_scaling: true,
            processing_guarantee: ProcessingGuarantee::None,
            snapshot_interval_millis: 10_000,
            resources: Vec::new(),
        }
    }
}

impl JobConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_processing_guarantee(mut self, guarantee: ProcessingGuarantee) -> Self {
        self.processing_guarantee = guarantee;
        self
    }

    pub fn with_resource(mut self, id: impl Into<String>, content: Vec<u8>) -> Self {
        self.resources.push(Resource {
            id: id.into(),
            content,
        });
        self
    }
}

/// Serialized job graph. Construction of the graph happens elsewhere; the
/// client only ships its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobGraph {
    serialized: Vec<u8>,
}

impl JobGraph {
    pub fn from_serialized(serialized: Vec<u8>) -> Self {
        Self { serialized }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.serialized
    }
}

/// Lifecycle view of a job, independent of where it executes.
#[async_trait]
pub trait Job: Send + Sync {
    fn id(&self) -> JobId;

    /// Fresh status fetch; nothing is cached across calls.
    async fn status(&self) -> Result<JobStatus>;

    async fn submission_time(&self) -> Result<DateTime<Utc>>;

    async fn cancel(&self) -> Result<()>;

    /// Wait until the job terminates. Fails if the job failed.
    async fn join(&self) -> Result<()>;
}
