use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{ConnectInfo, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{Instrument, Span, debug, info, info_span, warn};

use taskboard_auth::{Actor, AuthError, TokenIssuer};

use crate::app::errors::ApiError;
use crate::context::ActorContext;
use crate::rate_limit::RateLimiter;

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<TokenIssuer>,
}

/// Verify the bearer session token and attach the actor to the request.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer(req.headers())?;

    let claims = state
        .tokens
        .verify_session(token)
        .inspect_err(|e| debug!(error = %e, "session token rejected"))?;

    let actor = Actor::from(&claims);
    Span::current().record("actor", tracing::field::display(&actor));
    req.extensions_mut().insert(ActorContext::new(actor));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(AuthError::Unauthenticated)?;

    let header = header.to_str().map_err(|_| AuthError::Unauthenticated)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(AuthError::Unauthenticated)?
        .trim();
    if token.is_empty() {
        return Err(AuthError::Unauthenticated);
    }

    Ok(token)
}

/// Reject clients that exhausted their request window.
pub async fn rate_limit_middleware(
    State(limiter): State<Arc<RateLimiter>>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let client = client_key(&req, limiter.trusts_forwarded_for());
    if !limiter.check(&client) {
        warn!(%client, "rate limit exceeded");
        return Err(ApiError::RateLimited);
    }
    Ok(next.run(req).await)
}

/// First `X-Forwarded-For` hop when trusted, else the socket peer.
fn client_key<B>(req: &axum::http::Request<B>, trust_forwarded_for: bool) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .filter(|_| trust_forwarded_for)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty());
    if let Some(hop) = forwarded {
        return hop.to_string();
    }

    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// One span per request carrying method, path, actor and final status.
pub async fn trace_middleware(req: axum::http::Request<axum::body::Body>, next: Next) -> Response {
    let span = info_span!(
        "request",
        method = %req.method(),
        path = %req.uri().path(),
        actor = tracing::field::Empty,
        status = tracing::field::Empty,
    );

    async move {
        let res = next.run(req).await;
        let span = Span::current();
        span.record("status", res.status().as_u16());
        info!("request completed");
        res
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderValue, Request, header::AUTHORIZATION};

    #[test]
    fn bearer_is_required() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), Err(AuthError::Unauthenticated));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), Err(AuthError::Unauthenticated));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer(&headers), Err(AuthError::Unauthenticated));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(extract_bearer(&headers), Ok("abc.def"));
    }

    #[test]
    fn client_key_prefers_first_forwarded_hop() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(())
            .unwrap();
        assert_eq!(client_key(&req, true), "203.0.113.9");

        let mut req = Request::builder().body(()).unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 4000))));
        assert_eq!(client_key(&req, true), "192.0.2.7");
    }

    #[test]
    fn untrusted_forwarded_header_is_ignored() {
        let mut req = Request::builder()
            .header("x-forwarded-for", "203.0.113.9")
            .body(())
            .unwrap();
        req.extensions_mut()
            .insert(ConnectInfo(SocketAddr::from(([192, 0, 2, 7], 4000))));
        assert_eq!(client_key(&req, false), "192.0.2.7");
        assert_eq!(client_key(&req, true), "203.0.113.9");
    }
}
