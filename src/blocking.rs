//! Synchronous adapter over [`JetClient`].
//!
//! Each call blocks the calling thread until the underlying async operation
//! completes and returns its error on the calling thread. There is no
//! timeout: a request the transport never completes blocks forever, so
//! callers that need a bound must impose it themselves.
//!
//! Must not be used from inside an async runtime; blocking a runtime worker
//! panics.

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::runtime::{Builder, Runtime};

use crate::client::JetClient;
use crate::cluster::{Member, MembershipSnapshot};
use crate::config::ClientConfig;
use crate::error::{JetError, Result};
use crate::job::{ClientJobProxy, Job, JobConfig, JobGraph, JobId, JobStatus, JobSummary};
use crate::metrics::ReadOutcome;
use crate::transport::Transport;

pub struct BlockingJetClient {
    runtime: Runtime,
    inner: JetClient,
}

impl BlockingJetClient {
    /// Connect over TCP using a dedicated runtime.
    pub fn connect(config: &ClientConfig) -> Result<Self> {
        let runtime = build_runtime()?;
        let inner = runtime.block_on(JetClient::connect(config))?;
        Ok(Self { runtime, inner })
    }

    /// Wrap an existing transport. The transport's background work runs on
    /// the adapter's runtime.
    pub fn with_transport(transport: Arc<dyn Transport>) -> Result<Self> {
        Ok(Self {
            runtime: build_runtime()?,
            inner: JetClient::new(transport),
        })
    }

    pub fn async_client(&self) -> &JetClient {
        &self.inner
    }

    /// Block on any future produced by the async client.
    pub fn wait<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn members(&self) -> MembershipSnapshot {
        self.inner.members()
    }

    pub fn new_job(&self, graph: JobGraph, config: JobConfig) -> Result<ClientJobProxy> {
        self.wait(self.inner.new_job(graph, config))
    }

    pub fn jobs(&self) -> Result<Vec<ClientJobProxy>> {
        self.wait(self.inner.jobs())
    }

    pub fn job(&self, id: JobId) -> Result<Option<ClientJobProxy>> {
        self.wait(self.inner.job(id))
    }

    pub fn jobs_by_name(&self, name: &str) -> Result<Vec<ClientJobProxy>> {
        self.wait(self.inner.jobs_by_name(name))
    }

    pub fn job_summaries(&self) -> Result<Vec<JobSummary>> {
        self.wait(self.inner.job_summaries())
    }

    pub fn exists_distributed_object(&self, service_name: &str, object_name: &str) -> Result<bool> {
        self.wait(
            self.inner
                .exists_distributed_object(service_name, object_name),
        )
    }

    pub fn read_metrics(&self, member: &Member, start_sequence: u64) -> Result<ReadOutcome> {
        self.wait(self.inner.read_metrics(member, start_sequence))
    }

    pub fn job_status(&self, job: &ClientJobProxy) -> Result<JobStatus> {
        self.wait(job.status())
    }

    pub fn job_submission_time(&self, job: &ClientJobProxy) -> Result<DateTime<Utc>> {
        self.wait(job.submission_time())
    }

    pub fn cancel_job(&self, job: &ClientJobProxy) -> Result<()> {
        self.wait(job.cancel())
    }

    pub fn join_job(&self, job: &ClientJobProxy) -> Result<()> {
        self.wait(job.join())
    }
}

fn build_runtime() -> Result<Runtime> {
    Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("jet-client-blocking")
        .enable_all()
        .build()
        .map_err(|e| JetError::Config(format!("Failed to start client runtime: {}", e)))
}
