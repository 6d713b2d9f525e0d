//! Domain types, validation and pure logic shared by every dreamer crate.
//!
//! This crate has zero internal dependencies so it can be used by the API
//! server, the persistence layer and the client-side composer alike.

pub mod error;
pub mod generation;
pub mod journal;
pub mod prompt;
pub mod rate_limit;
pub mod types;
