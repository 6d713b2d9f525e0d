//! Request extractors.
//!
//! - [`auth::AuthUser`] -- the authenticated user from a JWT Bearer token.
//! - [`client_ip::ClientIdentity`] -- the network identity used for rate
//!   limiting.

pub mod auth;
pub mod client_ip;
