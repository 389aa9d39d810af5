pub mod blocking;
pub mod client;
pub mod cluster;
pub mod config;
pub mod error;
pub mod invocation;
pub mod job;
pub mod metrics;
pub mod protocol;
pub mod shutdown;
pub mod transport;

pub use blocking::BlockingJetClient;
pub use client::JetClient;
pub use cluster::{Address, Member, MemberId, MembershipSnapshot};
pub use config::{ClientConfig, MemberConfig};
pub use error::{JetError, Result};
pub use job::{ClientJobProxy, Job, JobConfig, JobGraph, JobId, JobStatus, JobSummary};
pub use metrics::{JournalCursor, MetricsJournalReader, MetricsJournalSlice, ReadOutcome};
