//! Integration tests for the bounded render poller.

mod support;

use std::time::Duration;

use assert_matches::assert_matches;
use sqlx::PgPool;

use reelforge_core::error::CoreError;
use reelforge_core::poll::PollOutcome;
use reelforge_core::provider::VideoProviderId;
use reelforge_core::status::JobStatus;
use reelforge_db::repositories::JobRepo;
use reelforge_pipeline::poller::{wait_for_render, PollConfig, WaitResult};

use support::{create_funded_job, ScriptedVideoProvider};

fn fast(max_attempts: u32) -> PollConfig {
    PollConfig { interval: Duration::ZERO, max_attempts }
}

/// Advance a fresh job into GENERATING_VIDEO.
async fn job_waiting_on_render(pool: &PgPool) -> i64 {
    let job = create_funded_job(pool, "a fox", 10).await;
    for (from, to) in [
        (JobStatus::Queued, JobStatus::GeneratingImage),
        (JobStatus::GeneratingImage, JobStatus::ImageReady),
        (JobStatus::ImageReady, JobStatus::GeneratingVideo),
    ] {
        assert!(JobRepo::transition(pool, job.id, from, to).await.unwrap());
    }
    job.id
}

#[sqlx::test(migrations = "../db/migrations")]
async fn completion_on_attempt_three_stops_polling(pool: PgPool) {
    let job_id = job_waiting_on_render(&pool).await;
    let provider = ScriptedVideoProvider::new(
        VideoProviderId::Nova,
        vec![
            PollOutcome::Pending,
            PollOutcome::Pending,
            PollOutcome::Completed { artifact_url: "https://cdn/x.mp4".into() },
        ],
    );

    let result = wait_for_render(&pool, provider.as_ref(), job_id, "h1", &fast(60))
        .await
        .unwrap();

    assert_eq!(result, WaitResult::Artifact { artifact_url: "https://cdn/x.mp4".into() });
    assert_eq!(provider.polls(), 3, "no further polls after completion");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn budget_exhaustion_raises_timeout(pool: PgPool) {
    let job_id = job_waiting_on_render(&pool).await;
    let provider = ScriptedVideoProvider::new(VideoProviderId::Nova, vec![PollOutcome::Pending]);

    let result = wait_for_render(&pool, provider.as_ref(), job_id, "h1", &fast(5)).await;

    assert_matches!(result, Err(CoreError::Timeout(_)));
    assert_eq!(provider.polls(), 5, "exactly the budget, no more");
}

#[sqlx::test(migrations = "../db/migrations")]
async fn provider_failure_propagates(pool: PgPool) {
    let job_id = job_waiting_on_render(&pool).await;
    let provider = ScriptedVideoProvider::new(
        VideoProviderId::Nova,
        vec![PollOutcome::Failed { message: "content policy".into() }],
    );

    let result = wait_for_render(&pool, provider.as_ref(), job_id, "h1", &fast(60)).await;

    match result {
        Err(CoreError::Provider(msg)) => assert_eq!(msg, "content policy"),
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[sqlx::test(migrations = "../db/migrations")]
async fn webhook_short_circuit_issues_no_polls(pool: PgPool) {
    let job_id = job_waiting_on_render(&pool).await;
    // A webhook already advanced the job.
    assert!(
        JobRepo::transition(&pool, job_id, JobStatus::GeneratingVideo, JobStatus::VideoReady)
            .await
            .unwrap()
    );

    let provider = ScriptedVideoProvider::new(VideoProviderId::Nova, vec![PollOutcome::Pending]);
    let result = wait_for_render(&pool, provider.as_ref(), job_id, "h1", &fast(60))
        .await
        .unwrap();

    assert_matches!(result, WaitResult::AlreadyApplied { .. });
    assert_eq!(provider.polls(), 0);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn externally_failed_job_aborts_the_wait(pool: PgPool) {
    let job_id = job_waiting_on_render(&pool).await;
    JobRepo::fail(&pool, job_id, "PROVIDER_ERROR", "rejected via webhook").await.unwrap();

    let provider = ScriptedVideoProvider::new(VideoProviderId::Nova, vec![PollOutcome::Pending]);
    let result = wait_for_render(&pool, provider.as_ref(), job_id, "h1", &fast(60)).await;

    assert_matches!(result, Err(CoreError::Provider(_)));
    assert_eq!(provider.polls(), 0);
}
