use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension,
    Json,
};
use uuid::Uuid;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    domain::{CreateAdminRequest, ResetPasswordRequest, User},
    error::Result,
};

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<User>>> {
    Ok(Json(state.service_context.admin_service.list_admins().await?))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Json(req): Json<CreateAdminRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = state.service_context.admin_service
        .create_admin(&current.user, req)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn reset_password(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<StatusCode> {
    state.service_context.admin_service
        .reset_password(&current.user, id, &req.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service_context.admin_service
        .delete_admin(&current.user, id)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
