//! Login and logout

use std::sync::Arc;

use axum::{
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use timeline_core::models::{LoginRequest, LoginResponse, UserRole};
use timeline_core::AppError;

use crate::auth::cookie::{expired_session_cookie, session_cookie};
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;

const INVALID_CREDENTIALS: &str = "Invalid username or password";

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

#[tracing::instrument(skip(state, request))]
pub async fn login(
    State(state): State<Arc<AppState>>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> Result<Response, HttpAppError> {
    let (Some(username), Some(password)) =
        (non_empty(request.username), non_empty(request.password))
    else {
        return Err(AppError::InvalidInput("Username and password are required".to_string()).into());
    };

    let Some(user) = state.db.users.find_by_username(&username).await? else {
        tracing::info!(username = %username, "Login failed: unknown user");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()).into());
    };

    let hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AppError::Internal(format!("Password check failed: {}", e)))?;

    let matches = match verified {
        Ok(matches) => matches,
        Err(e) => {
            tracing::warn!(user_id = user.id, error = %e, "Stored password hash is unreadable");
            false
        }
    };
    if !matches {
        tracing::info!(user_id = user.id, "Login failed: wrong password");
        return Err(AppError::Unauthorized(INVALID_CREDENTIALS.to_string()).into());
    }

    let role = UserRole::for_username(&user.username);
    let token = state.jwt.issue(&user, role)?;
    let cookie = session_cookie(
        &token,
        state.jwt.expiry_seconds(),
        state.config.is_production(),
    );

    tracing::info!(user_id = user.id, role = role.as_str(), "Login succeeded");

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(LoginResponse {
            token,
            role,
            success: true,
        }),
    )
        .into_response())
}

/// Clear the session cookie. Used by both `/logout` and `/clear-session`.
pub async fn logout() -> impl IntoResponse {
    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Json(serde_json::json!({ "success": true })),
    )
}
