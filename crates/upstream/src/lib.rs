//! HTTP clients for the two upstream services behind the proxy.
//!
//! - [`chat::ChatRewriter`] rewrites prompts through an OpenAI-compatible
//!   chat-completion endpoint.
//! - [`images::ImageClient`] requests images from the image-generation
//!   endpoint.
//!
//! Both implement the traits in [`provider`] so the API server can be
//! exercised against in-process fakes.

pub mod chat;
pub mod config;
pub mod error;
pub mod images;
pub mod provider;

pub use error::UpstreamError;
pub use provider::{ImageProvider, PromptRewriter};
