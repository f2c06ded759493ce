use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension,
    Json,
};
use uuid::Uuid;

use crate::{
    api::{
        middleware::{auth::CurrentUser, client::ClientAddr},
        state::AppState,
    },
    domain::{
        Announcement, AnnouncementFilter, CreateAnnouncementRequest, UpdateAnnouncementRequest,
    },
    error::Result,
};

pub async fn list(
    State(state): State<AppState>,
    Query(filter): Query<AnnouncementFilter>,
) -> Result<Json<Vec<Announcement>>> {
    let announcements = state.service_context.announcement_service
        .list_published(&filter)
        .await?;

    Ok(Json(announcements))
}

pub async fn list_all(State(state): State<AppState>) -> Result<Json<Vec<Announcement>>> {
    Ok(Json(state.service_context.announcement_service.list_all().await?))
}

pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.service_context.announcement_service.categories().await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    ClientAddr(client): ClientAddr,
    user: Option<Extension<CurrentUser>>,
) -> Result<Json<Announcement>> {
    let announcement = state.service_context.announcement_service
        .read(id, &client, user.is_some())
        .await?;

    Ok(Json(announcement))
}

pub async fn create(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CreateAnnouncementRequest>,
) -> Result<(StatusCode, Json<Announcement>)> {
    let announcement = state.service_context.announcement_service.create(request).await?;
    tracing::debug!("{} created announcement {}", user.user.username, announcement.id);

    Ok((StatusCode::CREATED, Json(announcement)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAnnouncementRequest>,
) -> Result<Json<Announcement>> {
    let announcement = state.service_context.announcement_service.update(id, request).await?;
    Ok(Json(announcement))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service_context.announcement_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
