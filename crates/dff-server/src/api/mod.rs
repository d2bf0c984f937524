mod inventory;
mod users;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post, put},
    Extension, Json, Router,
};
use chrono::{DateTime, Utc};
use dff_core::{AppConfig, Environment};
use dff_localline::LocalLineClient;
use serde::Serialize;
use sqlx::PgPool;
use tower::ServiceBuilder;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::inventory_log::InventoryLog;
use crate::middleware::{
    enforce_rate_limit, request_id, require_jwt, AuthState, RateLimitState, RequestId,
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub localline: LocalLineClient,
    pub config: Arc<AppConfig>,
    pub inventory_log: Arc<InventoryLog>,
}

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ResponseMeta {
    pub request_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: ErrorBody,
    pub meta: ResponseMeta,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct HealthData {
    status: &'static str,
    database: &'static str,
}

impl ResponseMeta {
    pub(super) fn new(request_id: String) -> Self {
        Self {
            request_id,
            timestamp: Utc::now(),
        }
    }
}

impl<T: Serialize> ApiResponse<T> {
    pub(super) fn new(request_id: String, data: T) -> Self {
        Self {
            data,
            meta: ResponseMeta::new(request_id),
        }
    }
}

impl ApiError {
    pub fn new(
        request_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
            },
            meta: ResponseMeta::new(request_id.into()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status = match self.error.code.as_str() {
            "not_found" => StatusCode::NOT_FOUND,
            "unauthorized" => StatusCode::UNAUTHORIZED,
            "forbidden" => StatusCode::FORBIDDEN,
            "bad_request" | "validation_error" => StatusCode::BAD_REQUEST,
            "conflict" => StatusCode::CONFLICT,
            "rate_limited" => StatusCode::TOO_MANY_REQUESTS,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(self)).into_response()
    }
}

pub(super) fn map_db_error(request_id: String, error: &dff_db::DbError) -> ApiError {
    match error {
        dff_db::DbError::NotFound => ApiError::new(request_id, "not_found", "product not found"),
        dff_db::DbError::Conflict(message) => ApiError::new(request_id, "conflict", message),
        other => {
            tracing::error!(error = %other, "database query failed");
            ApiError::new(request_id, "internal_error", "database query failed")
        }
    }
}

/// Origins the CORS layer admits. Production only serves the inventory page
/// over TLS, so plain-http entries (local dev servers) are dropped there.
fn cors_origins(env: Environment, allowed_origins: &[String]) -> Vec<&str> {
    allowed_origins
        .iter()
        .map(String::as_str)
        .filter(|origin| {
            let keep = env != Environment::Production || origin.starts_with("https://");
            if !keep {
                tracing::warn!(origin = %origin, "dropping non-https CORS origin in production");
            }
            keep
        })
        .collect()
}

fn build_cors(env: Environment, allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors_origins(env, allowed_origins)
        .into_iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "ignoring malformed CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ])
}

fn protected_router(auth: AuthState) -> Router<AppState> {
    Router::new()
        .route("/dff/v1/data", get(inventory::list_inventory))
        .route("/dff/v1/update/{id}", put(inventory::update_inventory))
        .layer(axum::middleware::from_fn_with_state(auth, require_jwt))
}

pub fn build_app(state: AppState, auth: AuthState, rate_limit: RateLimitState) -> Router {
    let public_routes = Router::new()
        .route("/dff/v1/health", get(health))
        .route("/dff/v1/register", post(users::register))
        .route("/dff/v1/login", post(users::login))
        .layer(Extension(auth.clone()));

    let cors = build_cors(state.config.env, &state.config.allowed_origins);

    Router::new()
        .merge(public_routes)
        .merge(protected_router(auth))
        .layer(
            ServiceBuilder::new()
                .layer(cors)
                .layer(axum::middleware::from_fn(request_id))
                .layer(axum::middleware::from_fn_with_state(
                    rate_limit,
                    enforce_rate_limit,
                )),
        )
        .with_state(state)
}

async fn health(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> impl IntoResponse {
    let meta = ResponseMeta::new(req_id.0);

    match dff_db::health_check(&state.pool).await {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse {
                data: HealthData {
                    status: "ok",
                    database: "ok",
                },
                meta,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "health check: database unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ApiResponse {
                    data: HealthData {
                        status: "degraded",
                        database: "unavailable",
                    },
                    meta,
                }),
            )
        }
    }
}

/// 100 requests per 5 minutes.
pub fn default_rate_limit_state() -> RateLimitState {
    RateLimitState::new(100, Duration::from_secs(5 * 60))
}

#[cfg(test)]
#[path = "api_test.rs"]
mod tests;
