//! Staleness and retention windows for the monitor and the cleanup sweeper.

use std::time::Duration;

/// How often the stuck-job monitor sweeps.
pub const MONITOR_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// A job still in-flight this long after `started_at` is considered
/// abandoned and is failed + refunded by the monitor.
pub const STALE_AFTER: chrono::Duration = chrono::Duration::hours(1);

/// How often the cleanup sweeper runs.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Failed jobs are kept this long for inspection before deletion.
pub const FAILED_JOB_RETENTION: chrono::Duration = chrono::Duration::days(7);

/// Webhook events that never matched a job are kept this long.
pub const ORPHAN_WEBHOOK_RETENTION: chrono::Duration = chrono::Duration::days(30);
