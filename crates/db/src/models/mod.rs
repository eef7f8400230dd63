//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus `Deserialize` DTOs for inserts where the caller
//! supplies more than a couple of fields.

pub mod asset;
pub mod checkpoint;
pub mod job;
pub mod ledger;
pub mod webhook_event;
