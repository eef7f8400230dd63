//! Integration tests for the checkpointed step runner.

mod support;

use std::sync::atomic::{AtomicU32, Ordering};

use assert_matches::assert_matches;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use reelforge_core::error::CoreError;
use reelforge_core::status::JobStatus;
use reelforge_db::repositories::{CheckpointRepo, JobPatch, JobRepo};
use reelforge_pipeline::step::StepRunner;

use support::create_funded_job;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct Payload {
    value: u32,
}

#[sqlx::test(migrations = "../db/migrations")]
async fn step_body_runs_once_and_result_is_cached(pool: PgPool) {
    let job = create_funded_job(&pool, "a fox", 10).await;
    let runner = StepRunner::new(pool.clone());
    let executions = AtomicU32::new(0);

    for _ in 0..3 {
        let result: Payload = runner
            .run(job.id, "sample_step", |_key| async {
                executions.fetch_add(1, Ordering::SeqCst);
                Ok((Payload { value: 7 }, JobPatch::default()))
            })
            .await
            .unwrap();
        assert_eq!(result, Payload { value: 7 });
    }

    assert_eq!(executions.load(Ordering::SeqCst), 1, "body must run exactly once");
    assert!(CheckpointRepo::find(&pool, job.id, "sample_step").await.unwrap().is_some());
}

#[sqlx::test(migrations = "../db/migrations")]
async fn idempotency_key_is_stable_across_reentry(pool: PgPool) {
    let job = create_funded_job(&pool, "a fox", 10).await;
    let runner = StepRunner::new(pool.clone());

    let first: String = runner
        .run(job.id, "keyed_step", |key| async move { Ok((key, JobPatch::default())) })
        .await
        .unwrap();

    // Cached result carries the same key a re-execution would have derived.
    let cached: String = runner
        .run(job.id, "keyed_step", |key| async move { Ok((key, JobPatch::default())) })
        .await
        .unwrap();

    assert_eq!(first, cached);
    assert_eq!(first, reelforge_core::steps::idempotency_key(job.id, "keyed_step"));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn failed_step_leaves_no_checkpoint(pool: PgPool) {
    let job = create_funded_job(&pool, "a fox", 10).await;
    let runner = StepRunner::new(pool.clone());

    let result: Result<Payload, _> = runner
        .run(job.id, "flaky_step", |_key| async {
            Err(CoreError::Provider("503 from upstream".into()))
        })
        .await;
    assert_matches!(result, Err(CoreError::Provider(_)));
    assert!(CheckpointRepo::find(&pool, job.id, "flaky_step").await.unwrap().is_none());

    // The next entry runs the body for real.
    let recovered: Payload = runner
        .run(job.id, "flaky_step", |_key| async {
            Ok((Payload { value: 1 }, JobPatch::default()))
        })
        .await
        .unwrap();
    assert_eq!(recovered.value, 1);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn step_persists_patch_atomically_with_checkpoint(pool: PgPool) {
    let job = create_funded_job(&pool, "a fox", 10).await;
    let runner = StepRunner::new(pool.clone());

    let _: Payload = runner
        .run(job.id, "advance", |_key| async {
            Ok((
                Payload { value: 2 },
                JobPatch {
                    transition: Some((JobStatus::Queued, JobStatus::GeneratingImage)),
                    ..Default::default()
                },
            ))
        })
        .await
        .unwrap();

    let fresh = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(fresh.status(), Some(JobStatus::GeneratingImage));
}

#[sqlx::test(migrations = "../db/migrations")]
async fn lost_transition_race_rolls_everything_back(pool: PgPool) {
    let job = create_funded_job(&pool, "a fox", 10).await;
    let runner = StepRunner::new(pool.clone());

    // Another actor moves the job first.
    assert!(JobRepo::transition(&pool, job.id, JobStatus::Queued, JobStatus::GeneratingImage)
        .await
        .unwrap());

    let result: Result<Payload, _> = runner
        .run(job.id, "raced_step", |_key| async {
            Ok((
                Payload { value: 3 },
                JobPatch {
                    transition: Some((JobStatus::Queued, JobStatus::GeneratingImage)),
                    ..Default::default()
                },
            ))
        })
        .await;

    // Conflict is transient: re-entry will observe the winner's state.
    let err = result.unwrap_err();
    assert_matches!(err, CoreError::Conflict(_));
    assert!(err.is_transient());
    assert!(
        CheckpointRepo::find(&pool, job.id, "raced_step").await.unwrap().is_none(),
        "no checkpoint may survive a rolled-back patch"
    );
}
