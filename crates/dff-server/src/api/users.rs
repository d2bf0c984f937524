//! `register` and `login` for inventory page users.

use axum::{extract::State, response::IntoResponse, Extension, Json};
use serde::{Deserialize, Serialize};

use super::{map_db_error, ApiError, ApiResponse, AppState};
use crate::auth::{hash_password, sign_token, verify_password};
use crate::middleware::{AuthState, RequestId};

#[derive(Debug, Deserialize)]
pub(super) struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    fn validate(&self, request_id: &str) -> Result<(), ApiError> {
        if self.username.trim().is_empty() || self.password.is_empty() {
            return Err(ApiError::new(
                request_id,
                "validation_error",
                "username and password are required",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub(super) struct MessageData {
    message: &'static str,
}

#[derive(Debug, Serialize)]
pub(super) struct LoginData {
    message: &'static str,
    token: String,
}

fn internal(request_id: String, context: &str, error: &dyn std::fmt::Display) -> ApiError {
    tracing::error!(error = %error, "{context}");
    ApiError::new(request_id, "internal_error", "internal server error")
}

pub(super) async fn register(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Json(body): Json<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate(&req_id.0)?;

    let password = body.password;
    let hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| internal(req_id.0.clone(), "password hashing task failed", &e))?
        .map_err(|e| internal(req_id.0.clone(), "password hashing failed", &e))?;

    let user_id = dff_db::create_user(&state.pool, body.username.trim(), &hash)
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;
    tracing::info!(user_id, "user registered");

    Ok(Json(ApiResponse::new(
        req_id.0,
        MessageData {
            message: "user registered successfully",
        },
    )))
}

pub(super) async fn login(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Extension(auth): Extension<AuthState>,
    Json(body): Json<Credentials>,
) -> Result<impl IntoResponse, ApiError> {
    body.validate(&req_id.0)?;

    let user = dff_db::get_user_by_username(&state.pool, body.username.trim())
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?
        .ok_or_else(|| ApiError::new(req_id.0.clone(), "not_found", "user does not exist"))?;

    let password = body.password;
    let stored_hash = user.password_hash.clone();
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &stored_hash))
        .await
        .map_err(|e| internal(req_id.0.clone(), "password check task failed", &e))?
        .map_err(|e| internal(req_id.0.clone(), "password check failed", &e))?;
    if !valid {
        return Err(ApiError::new(
            req_id.0,
            "unauthorized",
            "invalid password",
        ));
    }

    let token = sign_token(user.id, auth.secret())
        .map_err(|e| internal(req_id.0.clone(), "token signing failed", &e))?;

    Ok(Json(ApiResponse::new(
        req_id.0,
        LoginData {
            message: "login successful",
            token,
        },
    )))
}
