//! Common response envelope.

use serde::Serialize;

/// Standard `{ "data": ... }` wrapper for successful responses.
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}
