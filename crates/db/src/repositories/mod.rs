//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument. Methods suffixed `_tx` take a
//! `&mut PgConnection` so they can be composed into a caller-owned
//! transaction.

pub mod asset_repo;
pub mod checkpoint_repo;
pub mod job_repo;
pub mod ledger_repo;
pub mod webhook_event_repo;

pub use asset_repo::AssetRepo;
pub use checkpoint_repo::CheckpointRepo;
pub use job_repo::{JobPatch, JobRepo, ReservationOutcome};
pub use ledger_repo::LedgerRepo;
pub use webhook_event_repo::WebhookEventRepo;
