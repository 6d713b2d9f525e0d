//! Shared response envelope types for API handlers.
//!
//! Journal responses use a `{ "data": ... }` envelope. The generation
//! endpoints keep their flat public wire format instead.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}
