//! Integration tests for the credit ledger and refund compensation.

use reelforge_core::status::{error_codes, JobStatus};
use reelforge_db::models::job::CreateJob;
use reelforge_db::models::ledger::entry_types;
use reelforge_db::repositories::{JobRepo, LedgerRepo, ReservationOutcome};
use sqlx::PgPool;

const USER: i64 = 7;

async fn funded_job(pool: &PgPool, cost_cents: i32) -> reelforge_db::models::job::Job {
    LedgerRepo::append(pool, USER, 1_000, entry_types::PURCHASE, "Credit pack", None)
        .await
        .unwrap();
    let input = CreateJob {
        user_id: USER,
        project_id: 1,
        prompt: "city timelapse".to_string(),
        requested_duration_secs: 30,
        resolution: "1080p".to_string(),
        with_audio: false,
        motion: None,
        provider_id: "nova".to_string(),
        cost_cents,
        platforms: vec!["youtube".to_string()],
    };
    match JobRepo::create_with_reservation(pool, &input).await.unwrap() {
        ReservationOutcome::Created(job) => job,
        other => panic!("expected creation, got {other:?}"),
    }
}

#[sqlx::test]
async fn balance_is_sum_of_entries(pool: PgPool) {
    LedgerRepo::append(&pool, USER, 500, entry_types::PURCHASE, "Pack A", None).await.unwrap();
    LedgerRepo::append(&pool, USER, -120, entry_types::USAGE, "Job", None).await.unwrap();
    LedgerRepo::append(&pool, USER, 120, entry_types::REFUND, "Refund", None).await.unwrap();

    assert_eq!(LedgerRepo::balance(&pool, USER).await.unwrap(), 500);

    // Other users' entries don't leak in.
    LedgerRepo::append(&pool, USER + 1, 999, entry_types::PURCHASE, "Other", None).await.unwrap();
    assert_eq!(LedgerRepo::balance(&pool, USER).await.unwrap(), 500);
}

#[sqlx::test]
async fn refunded_job_nets_to_zero(pool: PgPool) {
    let job = funded_job(&pool, 230).await;
    JobRepo::mark_started(&pool, job.id).await.unwrap();

    let compensated =
        JobRepo::fail_with_refund(&pool, job.id, error_codes::TIMEOUT, "stuck for 1h")
            .await
            .unwrap();
    assert!(compensated);

    let entries = LedgerRepo::entries_for_job(&pool, job.id).await.unwrap();
    assert_eq!(entries.len(), 2);
    let net: i64 = entries.iter().map(|e| e.amount_cents as i64).sum();
    assert_eq!(net, 0, "charge and refund must cancel exactly");

    // Balance is back to the funded amount.
    assert_eq!(LedgerRepo::balance(&pool, USER).await.unwrap(), 1_000);

    let fresh = JobRepo::find_by_id(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(fresh.status(), Some(JobStatus::Failed));
    assert_eq!(fresh.error_code.as_deref(), Some(error_codes::TIMEOUT));
}

#[sqlx::test]
async fn double_sweep_yields_exactly_one_refund(pool: PgPool) {
    let job = funded_job(&pool, 230).await;
    JobRepo::mark_started(&pool, job.id).await.unwrap();

    let first = JobRepo::fail_with_refund(&pool, job.id, error_codes::TIMEOUT, "stuck").await.unwrap();
    let second = JobRepo::fail_with_refund(&pool, job.id, error_codes::TIMEOUT, "stuck").await.unwrap();
    assert!(first);
    assert!(!second, "already-terminal job must be a no-op");

    let refunds = LedgerRepo::entries_for_job(&pool, job.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.entry_type == entry_types::REFUND)
        .count();
    assert_eq!(refunds, 1);
}

#[sqlx::test]
async fn completed_job_is_never_refunded(pool: PgPool) {
    let job = funded_job(&pool, 230).await;
    JobRepo::mark_started(&pool, job.id).await.unwrap();
    for (from, to) in [
        (JobStatus::Queued, JobStatus::GeneratingImage),
        (JobStatus::GeneratingImage, JobStatus::ImageReady),
        (JobStatus::ImageReady, JobStatus::GeneratingVideo),
        (JobStatus::GeneratingVideo, JobStatus::VideoReady),
    ] {
        assert!(JobRepo::transition(&pool, job.id, from, to).await.unwrap());
    }
    assert!(JobRepo::complete(&pool, job.id).await.unwrap());

    let swept = JobRepo::fail_with_refund(&pool, job.id, error_codes::TIMEOUT, "late").await.unwrap();
    assert!(!swept);

    let entries = LedgerRepo::entries_for_job(&pool, job.id).await.unwrap();
    assert_eq!(entries.len(), 1, "only the original usage entry");
}

#[sqlx::test]
async fn recent_entries_are_newest_first(pool: PgPool) {
    LedgerRepo::append(&pool, USER, 100, entry_types::PURCHASE, "first", None).await.unwrap();
    LedgerRepo::append(&pool, USER, 200, entry_types::PURCHASE, "second", None).await.unwrap();

    let recent = LedgerRepo::recent_for_user(&pool, USER, Some(1)).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].description, "second");
}
