//! Integration tests for the stuck-job monitor and the cleanup sweeper.

mod support;

use std::sync::Arc;

use sqlx::PgPool;

use reelforge_core::status::{error_codes, JobStatus};
use reelforge_db::models::ledger::entry_types;
use reelforge_db::repositories::{JobRepo, LedgerRepo, WebhookEventRepo};
use reelforge_events::EventBus;
use reelforge_pipeline::cleanup::CleanupSweeper;
use reelforge_pipeline::monitor::StuckJobMonitor;

use support::{create_funded_job, USER};

/// Pretend the job started `hours` hours ago.
async fn backdate_started(pool: &PgPool, job_id: i64, hours: i64) {
    JobRepo::mark_started(pool, job_id).await.unwrap();
    sqlx::query("UPDATE jobs SET started_at = NOW() - make_interval(hours => $2) WHERE id = $1")
        .bind(job_id)
        .bind(hours as i32)
        .execute(pool)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../db/migrations")]
async fn monitor_compensates_stale_jobs_once(pool: PgPool) {
    let monitor = StuckJobMonitor::new(pool.clone(), Arc::new(EventBus::default()));

    let stale = create_funded_job(&pool, "a fox", 230).await;
    backdate_started(&pool, stale.id, 2).await;

    let fresh = create_funded_job(&pool, "a cat", 100).await;
    JobRepo::mark_started(&pool, fresh.id).await.unwrap();

    assert_eq!(monitor.sweep().await.unwrap(), 1);

    let swept = JobRepo::find_by_id(&pool, stale.id).await.unwrap().unwrap();
    assert_eq!(swept.status(), Some(JobStatus::Failed));
    assert_eq!(swept.error_code.as_deref(), Some(error_codes::TIMEOUT));

    let untouched = JobRepo::find_by_id(&pool, fresh.id).await.unwrap().unwrap();
    assert!(!untouched.is_terminal());

    // Charge + refund cancel for the swept job.
    let net: i64 = LedgerRepo::entries_for_job(&pool, stale.id)
        .await
        .unwrap()
        .iter()
        .map(|e| e.amount_cents as i64)
        .sum();
    assert_eq!(net, 0);

    // Second sweep finds nothing new and issues no second refund.
    assert_eq!(monitor.sweep().await.unwrap(), 0);
    let refunds = LedgerRepo::entries_for_job(&pool, stale.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|e| e.entry_type == entry_types::REFUND)
        .count();
    assert_eq!(refunds, 1);

    // Balance reflects exactly one compensation.
    assert_eq!(
        LedgerRepo::balance(&pool, USER).await.unwrap(),
        (230 + 500) + (100 + 500) - 100
    );
}

#[sqlx::test(migrations = "../db/migrations")]
async fn cleanup_purges_only_expired_terminal_rows(pool: PgPool) {
    let sweeper = CleanupSweeper::new(pool.clone());

    // Failed long ago: eligible.
    let old = create_funded_job(&pool, "a fox", 10).await;
    JobRepo::fail(&pool, old.id, error_codes::PROVIDER_ERROR, "boom").await.unwrap();
    sqlx::query("UPDATE jobs SET completed_at = NOW() - INTERVAL '8 days' WHERE id = $1")
        .bind(old.id)
        .execute(&pool)
        .await
        .unwrap();

    // Failed yesterday: kept for inspection.
    let recent = create_funded_job(&pool, "a cat", 10).await;
    JobRepo::fail(&pool, recent.id, error_codes::PROVIDER_ERROR, "boom").await.unwrap();

    // Orphaned webhook events: one expired, one recent.
    WebhookEventRepo::record(&pool, "nova", None, "h-old", &serde_json::json!({}), "orphaned")
        .await
        .unwrap();
    sqlx::query("UPDATE webhook_events SET received_at = NOW() - INTERVAL '31 days'")
        .execute(&pool)
        .await
        .unwrap();
    WebhookEventRepo::record(&pool, "nova", None, "h-new", &serde_json::json!({}), "orphaned")
        .await
        .unwrap();

    let (jobs, webhooks) = sweeper.sweep().await.unwrap();
    assert_eq!(jobs, 1);
    assert_eq!(webhooks, 1);

    assert!(JobRepo::find_by_id(&pool, old.id).await.unwrap().is_none());
    assert!(JobRepo::find_by_id(&pool, recent.id).await.unwrap().is_some());
}
