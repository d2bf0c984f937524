use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{header::AUTHORIZATION, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::auth::verify_token;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Id of the user a verified token was issued to, stored as a request
/// extension by [`require_jwt`].
#[derive(Debug, Clone, Copy)]
pub struct AuthUser(pub i64);

/// Secret used to sign and verify session tokens.
#[derive(Clone)]
pub struct AuthState {
    secret: Arc<str>,
}

impl AuthState {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self {
            secret: Arc::from(secret),
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AuthState([redacted])")
    }
}

/// Per-client fixed-window counters, keyed by [`client_key`].
#[derive(Debug, Clone)]
pub struct RateLimitState {
    max_requests: usize,
    window: Duration,
    clients: Arc<Mutex<HashMap<String, (Instant, usize)>>>,
}

impl RateLimitState {
    #[must_use]
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clients: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request for `client`; `false` once its window is used up.
    async fn admit(&self, client: &str, now: Instant) -> bool {
        let mut clients = self.clients.lock().await;
        if clients.len() >= STALE_SWEEP_THRESHOLD {
            clients.retain(|_, (started, _)| now.duration_since(*started) < self.window);
        }

        let (started, count) = clients.entry(client.to_owned()).or_insert((now, 0));
        if now.duration_since(*started) >= self.window {
            *started = now;
            *count = 0;
        }
        if *count >= self.max_requests {
            return false;
        }
        *count += 1;
        true
    }
}

const STALE_SWEEP_THRESHOLD: usize = 1024;

#[derive(Debug, Serialize)]
struct MiddlewareErrorBody {
    error: MiddlewareError,
}

#[derive(Debug, Serialize)]
struct MiddlewareError {
    code: &'static str,
    message: &'static str,
}

fn middleware_error(status: StatusCode, code: &'static str, message: &'static str) -> Response {
    (
        status,
        Json(MiddlewareErrorBody {
            error: MiddlewareError { code, message },
        }),
    )
        .into_response()
}

/// Axum middleware that extracts or generates a request ID.
///
/// If the incoming request has an `x-request-id` header, that value is used.
/// Otherwise a new `UUIDv4` is generated. The ID is:
/// - Inserted into request extensions as [`RequestId`]
/// - Set on the response as the `x-request-id` header
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

/// Rejects requests without a valid session token with 403, which is what
/// the inventory page expects before it redirects to the login form.
pub async fn require_jwt(State(auth): State<AuthState>, mut req: Request, next: Next) -> Response {
    let Some(token) = extract_bearer_token(req.headers().get(AUTHORIZATION)) else {
        return middleware_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "unauthorized, please log in",
        );
    };

    match verify_token(token, auth.secret()) {
        Ok(claims) => {
            req.extensions_mut().insert(AuthUser(claims.sub));
            next.run(req).await
        }
        Err(e) => {
            tracing::debug!(error = %e, "rejected session token");
            middleware_error(
                StatusCode::FORBIDDEN,
                "forbidden",
                "invalid token, please log in again",
            )
        }
    }
}

/// Answers 429 once a client has used its window.
pub async fn enforce_rate_limit(
    State(rate_limit): State<RateLimitState>,
    req: Request,
    next: Next,
) -> Response {
    let client = client_key(&req);
    if !rate_limit.admit(&client, Instant::now()).await {
        tracing::debug!(client = %client, "rate limit exceeded");
        return middleware_error(
            StatusCode::TOO_MANY_REQUESTS,
            "rate_limited",
            "too many requests, please try again later",
        );
    }
    next.run(req).await
}

/// First `x-forwarded-for` hop, else the peer address, else `"unknown"`.
fn client_key(req: &Request) -> String {
    let forwarded = req
        .headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(ip) = forwarded {
        return ip.to_owned();
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map_or_else(|| "unknown".to_owned(), |ConnectInfo(addr)| addr.ip().to_string())
}

fn extract_bearer_token(value: Option<&HeaderValue>) -> Option<&str> {
    value
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_bearer_token_accepts_valid_header() {
        let header = HeaderValue::from_static("Bearer test-token");
        assert_eq!(extract_bearer_token(Some(&header)), Some("test-token"));
    }

    #[test]
    fn extract_bearer_token_rejects_non_bearer_header() {
        let header = HeaderValue::from_static("Basic abc123");
        assert_eq!(extract_bearer_token(Some(&header)), None);
    }

    #[test]
    fn extract_bearer_token_rejects_empty_token() {
        let header = HeaderValue::from_static("Bearer   ");
        assert_eq!(extract_bearer_token(Some(&header)), None);
        assert_eq!(extract_bearer_token(None), None);
    }

    #[tokio::test]
    async fn rate_limit_windows_are_per_client() {
        let limiter = RateLimitState::new(2, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.admit("10.0.0.1", now).await);
        assert!(limiter.admit("10.0.0.1", now).await);
        assert!(!limiter.admit("10.0.0.1", now).await);
        assert!(limiter.admit("10.0.0.2", now).await);
    }

    #[tokio::test]
    async fn rate_limit_window_resets_after_it_elapses() {
        let limiter = RateLimitState::new(1, Duration::from_secs(60));
        let now = Instant::now();

        assert!(limiter.admit("10.0.0.1", now).await);
        assert!(!limiter.admit("10.0.0.1", now).await);
        assert!(
            limiter
                .admit("10.0.0.1", now + Duration::from_secs(61))
                .await
        );
    }

    #[test]
    fn client_key_prefers_first_forwarded_hop() {
        let req = Request::builder()
            .header("x-forwarded-for", "203.0.113.7, 10.0.0.1")
            .body(axum::body::Body::empty())
            .expect("request");
        assert_eq!(client_key(&req), "203.0.113.7");

        let bare = Request::builder()
            .body(axum::body::Body::empty())
            .expect("request");
        assert_eq!(client_key(&bare), "unknown");
    }

    #[test]
    fn auth_state_debug_hides_secret() {
        let state = AuthState::new("s3cret");
        assert!(!format!("{state:?}").contains("s3cret"));
    }
}
