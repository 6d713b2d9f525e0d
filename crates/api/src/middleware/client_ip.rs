//! Client network identity for rate limiting.

use std::convert::Infallible;
use std::net::SocketAddr;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use dreamer_core::rate_limit::resolve_identity;

/// The identity a request is counted under: the first `X-Forwarded-For`
/// hop, then `X-Real-IP`, then the socket peer, then a fixed sentinel.
///
/// Never rejects. The peer address is only available when the server was
/// started with `into_make_service_with_connect_info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientIdentity(pub String);

impl<S> FromRequestParts<S> for ClientIdentity
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let header = |name: &str| parts.headers.get(name).and_then(|v| v.to_str().ok());
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(ClientIdentity(resolve_identity(
            header("x-forwarded-for"),
            header("x-real-ip"),
            peer,
        )))
    }
}
