//! Job submission, lookup and lifecycle through the client.


use std::time::Duration;

use chrono::Utc;
use jet_client::job::ProcessingGuarantee;
use jet_client::protocol::{ErrorCode, OperationKind, RemoteFailure};
use jet_client::{JetError, Job, JobConfig, JobGraph, JobId, JobStatus};
use test_harness::{assert_eventually, in_memory_client};

fn graph() -> JobGraph {
    JobGraph::from_serialized(b"source -> map -> sink".to_vec())
}

#[tokio::test]
async fn submitted_job_reports_status() {
    let fx = in_memory_client(3, 16);
    let config = JobConfig::new()
        .with_name("etl")
        .with_processing_guarantee(ProcessingGuarantee::ExactlyOnce)
        .with_resource("lib.jar", vec![1, 2, 3]);

    let before = Utc::now();
    let job = fx.client.new_job(graph(), config.clone()).await.unwrap();

    assert_eq!(job.name(), Some("etl"));
    assert_eq!(job.submission().unwrap().config, config);
    assert_eq!(job.status().await.unwrap(), JobStatus::Starting);

    let stored = fx.cluster.job(job.id()).expect("cluster tracks the job");
    assert_eq!(stored.config, config);

    let submitted_at = job.submission_time().await.unwrap();
    assert!(submitted_at.timestamp_millis() >= before.timestamp_millis());
}

#[tokio::test]
async fn submissions_get_distinct_ids() {
    let fx = in_memory_client(1, 16);
    let a = fx.client.new_job(graph(), JobConfig::new()).await.unwrap();
    let b = fx.client.new_job(graph(), JobConfig::new()).await.unwrap();
    assert_ne!(a.id(), b.id());
}

#[tokio::test]
async fn lookup_returns_none_only_for_not_found() {
    let fx = in_memory_client(2, 16);
    let id = fx.cluster.add_job(Some("etl"), JobStatus::Running);

    let found = fx.client.job(id).await.unwrap().expect("known job");
    assert_eq!(found.id(), id);
    assert!(found.submission().is_none());

    assert!(fx.client.job(JobId(9_999)).await.unwrap().is_none());

    fx.cluster.purge_job(id);
    assert!(fx.client.job(id).await.unwrap().is_none());

    // Anything other than "not found" propagates
    fx.cluster.fail_operation(
        OperationKind::GetJobStatus,
        RemoteFailure::new(ErrorCode::IllegalState, "not ready"),
    );
    let err = fx.client.job(id).await.unwrap_err();
    assert!(matches!(err, JetError::Remote(_)), "{:?}", err);

    fx.cluster.clear_injections();
    fx.transport.set_disconnected(true);
    let err = fx.client.job(id).await.unwrap_err();
    assert!(matches!(err, JetError::Transport(_)), "{:?}", err);
}

#[tokio::test]
async fn proxies_for_same_id_agree() {
    let fx = in_memory_client(2, 16);
    let submitted = fx.client.new_job(graph(), JobConfig::new()).await.unwrap();
    let looked_up = fx
        .client
        .job(submitted.id())
        .await
        .unwrap()
        .expect("known job");

    fx.cluster.set_job_status(submitted.id(), JobStatus::Running);
    assert_eq!(submitted.status().await.unwrap(), JobStatus::Running);
    assert_eq!(looked_up.status().await.unwrap(), JobStatus::Running);

    assert_eq!(
        submitted.submission_time().await.unwrap(),
        looked_up.submission_time().await.unwrap()
    );
}

#[tokio::test]
async fn listing_returns_every_job_once() {
    let fx = in_memory_client(2, 16);
    let x1 = fx.cluster.add_job(Some("x"), JobStatus::Running);
    let unnamed = fx.cluster.add_job(None, JobStatus::Completed);
    let y = fx.cluster.add_job(Some("y"), JobStatus::Running);
    let x2 = fx.cluster.add_job(Some("x"), JobStatus::Failed);

    let ids: Vec<JobId> = fx.client.jobs().await.unwrap().iter().map(|j| j.id()).collect();
    assert_eq!(ids, vec![x1, unnamed, y, x2]);

    let named_x: Vec<JobId> = fx
        .client
        .jobs_by_name("x")
        .await
        .unwrap()
        .iter()
        .map(|j| j.id())
        .collect();
    assert_eq!(named_x, vec![x1, x2]);

    // Order of the by-name listing follows the full listing
    let positions: Vec<usize> = named_x
        .iter()
        .map(|id| ids.iter().position(|i| i == id).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]));

    assert!(fx.client.jobs_by_name("z").await.unwrap().is_empty());
}

#[tokio::test]
async fn duplicate_ids_in_listing_are_collapsed() {
    let fx = in_memory_client(1, 16);
    fx.cluster
        .respond_with(OperationKind::GetJobIds, serde_json::json!([3, 1, 3, 2, 1]));

    let ids: Vec<JobId> = fx.client.jobs().await.unwrap().iter().map(|j| j.id()).collect();
    assert_eq!(ids, vec![JobId(1), JobId(2), JobId(3)]);
}

#[tokio::test]
async fn summaries_reflect_cluster_state() {
    let fx = in_memory_client(1, 16);
    let running = fx.cluster.add_job(Some("stream"), JobStatus::Running);
    let failed = fx.cluster.add_job(None, JobStatus::Running);
    fx.cluster.fail_job(failed, "out of memory");

    let summaries = fx.client.job_summaries().await.unwrap();
    assert_eq!(summaries.len(), 2);

    let s = summaries.iter().find(|s| s.job_id == running).unwrap();
    assert_eq!(s.name.as_deref(), Some("stream"));
    assert_eq!(s.status, JobStatus::Running);
    assert!(s.completion_time.is_none());

    let f = summaries.iter().find(|s| s.job_id == failed).unwrap();
    assert_eq!(f.status, JobStatus::Failed);
    assert_eq!(f.failure_reason.as_deref(), Some("out of memory"));
    assert!(f.completion_time.is_some());
}

#[tokio::test]
async fn object_existence_tracks_create_and_destroy() {
    let fx = in_memory_client(3, 16);
    assert!(!fx.client.exists_distributed_object("map", "orders").await.unwrap());

    fx.cluster.create_object("map", "orders");
    assert!(fx.client.exists_distributed_object("map", "orders").await.unwrap());
    assert!(!fx.client.exists_distributed_object("list", "orders").await.unwrap());

    fx.cluster.destroy_object("map", "orders");
    assert!(!fx.client.exists_distributed_object("map", "orders").await.unwrap());
}

#[tokio::test]
async fn cancel_moves_job_to_failed() {
    let fx = in_memory_client(1, 16);
    let job = fx.client.new_job(graph(), JobConfig::new()).await.unwrap();

    job.cancel().await.unwrap();
    assert_eq!(job.status().await.unwrap(), JobStatus::Failed);

    let err = job.cancel().await.unwrap_err();
    assert!(
        matches!(&err, JetError::Remote(f) if f.code == ErrorCode::IllegalState),
        "{:?}",
        err
    );

    let err = jet_client::ClientJobProxy::new(fx.client.dispatcher().clone(), JobId(404))
        .cancel()
        .await
        .unwrap_err();
    assert!(err.is_not_found(), "{:?}", err);
}

#[tokio::test]
async fn join_waits_for_completion() {
    let fx = in_memory_client(1, 16);
    let job = fx.client.new_job(graph(), JobConfig::new()).await.unwrap();

    let joiner = {
        let job = job.clone();
        tokio::spawn(async move { job.join().await })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!joiner.is_finished());

    fx.cluster.set_job_status(job.id(), JobStatus::Running);
    fx.cluster.set_job_status(job.id(), JobStatus::Completed);

    let joined = tokio::time::timeout(Duration::from_secs(5), joiner)
        .await
        .expect("join completes")
        .unwrap();
    assert!(joined.is_ok(), "{:?}", joined);
}

#[tokio::test]
async fn join_surfaces_job_failure() {
    let fx = in_memory_client(1, 16);
    let job = fx.client.new_job(graph(), JobConfig::new()).await.unwrap();
    fx.cluster.fail_job(job.id(), "division by zero");

    let err = job.join().await.unwrap_err();
    match err {
        JetError::Remote(failure) => assert_eq!(failure.message, "division by zero"),
        other => panic!("expected Remote, got {:?}", other),
    }
}

#[tokio::test]
async fn status_is_eventually_consistent_across_proxies() {
    let fx = in_memory_client(2, 16);
    let job = fx.client.new_job(graph(), JobConfig::new()).await.unwrap();
    let cluster = fx.cluster.clone();
    let id = job.id();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        cluster.set_job_status(id, JobStatus::Completed);
    });

    assert_eventually(
        || {
            let job = job.clone();
            async move { job.status().await.map(|s| s.is_terminal()).unwrap_or(false) }
        },
        Duration::from_secs(5),
        "job should reach a terminal status",
    )
    .await;
}

#[tokio::test]
async fn out_of_range_submission_time_is_a_decoding_error() {
    let fx = in_memory_client(1, 16);
    let id = fx.cluster.add_job(None, JobStatus::Running);
    let job = fx.client.job(id).await.unwrap().unwrap();

    fx.cluster.respond_with(
        OperationKind::GetJobSubmissionTime,
        serde_json::json!(i64::MAX),
    );
    let err = job.submission_time().await.unwrap_err();
    assert!(matches!(err, JetError::Decoding(_)), "{:?}", err);
}
