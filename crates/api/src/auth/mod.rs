//! Access-token validation.
//!
//! Sign-up, sign-in and token issuance belong to the hosted auth provider;
//! this server only verifies the tokens it signs.

pub mod jwt;
