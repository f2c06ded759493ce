use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::{
    api::state::AppState,
    auth::SESSION_COOKIE,
    domain::User,
    error::{AppError, Result},
    service::admin_service::require_super_admin,
};

#[derive(Clone)]
pub struct CurrentUser {
    pub user: User,
}

/// Session token from the `session` cookie, or an `Authorization: Bearer` header.
pub fn session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if !cookie.value().is_empty() {
            return Some(cookie.value().to_string());
        }
    }

    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

async fn resolve_user(state: &AppState, token: &str) -> Result<Option<User>> {
    let Some(user_id) = state.service_context.auth_service.validate_session(token).await? else {
        return Ok(None);
    };

    state.service_context.user_repo.find_by_id(user_id).await
}

pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = session_token(&jar, request.headers()).ok_or(AppError::Unauthorized)?;
    let user = resolve_user(&state, &token).await?.ok_or(AppError::Unauthorized)?;

    request.extensions_mut().insert(CurrentUser { user });

    Ok(next.run(request).await)
}

pub async fn require_super_admin_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let token = session_token(&jar, request.headers()).ok_or(AppError::Unauthorized)?;
    let user = resolve_user(&state, &token).await?.ok_or(AppError::Unauthorized)?;

    require_super_admin(&user)?;

    request.extensions_mut().insert(CurrentUser { user });

    Ok(next.run(request).await)
}

/// Attaches the current user when a valid session is presented, without
/// rejecting anonymous requests.
pub async fn optional_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(token) = session_token(&jar, request.headers()) {
        match resolve_user(&state, &token).await {
            Ok(Some(user)) => {
                request.extensions_mut().insert(CurrentUser { user });
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Session lookup failed: {}", e),
        }
    }

    next.run(request).await
}
