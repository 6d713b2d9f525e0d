//! Client-side generation orchestration for the dream composer.
//!
//! The pipeline is split the same way everywhere in this crate: a
//! synchronous state machine ([`machine::Composer`]) decides *what* should
//! happen for each event, and an async driver ([`session::ComposerSession`])
//! performs timers and network calls on tokio and feeds their outcomes
//! back as events.
//!
//! - [`debounce`] -- quiet-period debouncing of prompt edits.
//! - [`optimizer`] -- prompt-rewrite suggestions and accept/reject.
//! - [`gate`] -- the "may we call the image endpoint now" predicate.
//! - [`requests`] -- in-flight request map keyed by (prompt, mode).
//! - [`history`] -- generated images and the active selection.
//! - [`backend`] / [`journal`] -- HTTP transports to the proxy.

pub mod backend;
pub mod config;
pub mod debounce;
pub mod error;
pub mod gate;
pub mod history;
pub mod journal;
pub mod machine;
pub mod optimizer;
pub mod requests;
pub mod session;

pub use error::ComposerError;
pub use machine::{Composer, Phase};
pub use session::ComposerSession;
