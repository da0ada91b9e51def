use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use timeline_core::AppError;

use crate::auth::cookie::session_from_cookie_header;
use crate::auth::jwt::JwtService;
use crate::error::HttpAppError;

/// Bearer token first, then the session cookie
fn token_from_headers(headers: &HeaderMap) -> Option<&str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());

    bearer.or_else(|| {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .find_map(session_from_cookie_header)
    })
}

/// Rejects requests without a valid session and attaches an `AuthContext`
/// to those with one.
pub async fn auth_middleware(
    State(jwt): State<Arc<JwtService>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(token) = token_from_headers(request.headers()) else {
        return HttpAppError(AppError::Unauthorized("Authentication required".to_string()))
            .into_response();
    };

    match jwt.verify(token) {
        Ok(ctx) => {
            tracing::debug!(user_id = ctx.user_id, role = ctx.role.as_str(), "Authenticated");
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Err(e) => HttpAppError(e).into_response(),
    }
}
