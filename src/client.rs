use std::collections::BTreeSet;
use std::sync::Arc;

use crate::cluster::{Member, MembershipSnapshot};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::invocation::{Dispatcher, PendingResult, Target};
use crate::job::{ClientJobProxy, Job, JobConfig, JobGraph, JobId, JobSummary};
use crate::metrics::{MetricsJournalReader, ReadOutcome};
use crate::protocol::codec::{
    ExistsDistributedObjectCodec, ExistsDistributedObjectRequest, GetJobIdsByNameCodec,
    GetJobIdsCodec, GetJobSummaryListCodec, JobIdsByNameRequest,
};
use crate::transport::{TcpTransport, Transport};

/// Async entry point to a remote cluster.
///
/// Cluster-wide queries are routed to the coordinator resolved from the
/// current membership, member-scoped reads go to the member the caller
/// names, and object-existence checks go to any member.
#[derive(Clone, Debug)]
pub struct JetClient {
    dispatcher: Dispatcher,
}

impl JetClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            dispatcher: Dispatcher::new(transport),
        }
    }

    /// Connect over TCP to the configured members.
    pub async fn connect(config: &ClientConfig) -> Result<Self> {
        let transport = TcpTransport::connect(config).await?;
        tracing::info!(
            cluster = %config.cluster_name,
            members = config.members.len(),
            "Client connected"
        );
        Ok(Self::new(Arc::new(transport)))
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn members(&self) -> MembershipSnapshot {
        self.dispatcher.members()
    }

    pub async fn new_job(&self, graph: JobGraph, config: JobConfig) -> Result<ClientJobProxy> {
        ClientJobProxy::submit(&self.dispatcher, graph, config).await
    }

    /// Proxies for every job id known to the cluster. Only ids are fetched.
    pub async fn jobs(&self) -> Result<Vec<ClientJobProxy>> {
        let ids: BTreeSet<JobId> = self
            .dispatcher
            .invoke_on_coordinator::<GetJobIdsCodec>(&())
            .await?
            .into_iter()
            .collect();
        Ok(ids.into_iter().map(|id| self.proxy(id)).collect())
    }

    /// Look up a job by id. `None` if the cluster does not know it; any other
    /// failure propagates.
    pub async fn job(&self, id: JobId) -> Result<Option<ClientJobProxy>> {
        let proxy = self.proxy(id);
        match proxy.status().await {
            Ok(_) => Ok(Some(proxy)),
            Err(e) if e.is_not_found() => {
                tracing::debug!(job_id = %id, "Job not found");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Proxies for jobs named `name`, filtered by the coordinator, in the
    /// order it returns them.
    pub async fn jobs_by_name(&self, name: &str) -> Result<Vec<ClientJobProxy>> {
        let request = JobIdsByNameRequest {
            name: name.to_string(),
        };
        let ids = self
            .dispatcher
            .invoke_on_coordinator::<GetJobIdsByNameCodec>(&request)
            .await?;
        Ok(ids.into_iter().map(|id| self.proxy(id)).collect())
    }

    pub async fn job_summaries(&self) -> Result<Vec<JobSummary>> {
        self.dispatcher
            .invoke_on_coordinator::<GetJobSummaryListCodec>(&())
            .await
    }

    pub async fn exists_distributed_object(
        &self,
        service_name: &str,
        object_name: &str,
    ) -> Result<bool> {
        let request = ExistsDistributedObjectRequest {
            service_name: service_name.to_string(),
            object_name: object_name.to_string(),
        };
        self.dispatcher
            .invoke_codec::<ExistsDistributedObjectCodec>(&request, Target::Any)
            .await
    }

    pub fn metrics_reader(&self) -> MetricsJournalReader {
        MetricsJournalReader::new(self.dispatcher.clone())
    }

    /// Read `member`'s metrics journal from `start_sequence`.
    pub fn read_metrics(&self, member: &Member, start_sequence: u64) -> PendingResult<ReadOutcome> {
        self.metrics_reader().read(member, start_sequence)
    }

    fn proxy(&self, id: JobId) -> ClientJobProxy {
        ClientJobProxy::new(self.dispatcher.clone(), id)
    }
}
