use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Extension,
    Json,
};
use axum_extra::extract::CookieJar;
use serde::Serialize;

use crate::{
    api::{
        middleware::auth::{session_token, CurrentUser},
        state::AppState,
    },
    auth::AuthService,
    domain::{ChangePasswordRequest, LoginRequest, User},
    error::{AppError, Result},
};

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: User,
    pub token: String,
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<LoginResponse>)> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(AppError::BadRequest("Username and password are required".to_string()));
    }

    let outcome = state.service_context.admin_service
        .login(&req.username, &req.password)
        .await?;

    let cookie = state.service_context.auth_service
        .create_session_cookie(&outcome.token, state.settings.server.is_https());

    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            user: outcome.user,
            token: outcome.token,
        }),
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<(CookieJar, StatusCode)> {
    if let Some(token) = session_token(&jar, &headers) {
        if let Err(e) = state.service_context.admin_service.logout(&token).await {
            tracing::warn!("Failed to revoke session on logout: {}", e);
        }
    }

    Ok((jar.add(AuthService::create_logout_cookie()), StatusCode::NO_CONTENT))
}

pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<User> {
    Json(current.user)
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<StatusCode> {
    state.service_context.admin_service
        .change_password(&current.user, &req.old_password, &req.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
