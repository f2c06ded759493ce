use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    api::state::AppState,
    domain::{Event, EventRangeQuery, EventRequest},
    error::Result,
};

pub async fn list(
    State(state): State<AppState>,
    Query(range): Query<EventRangeQuery>,
) -> Result<Json<Vec<Event>>> {
    Ok(Json(state.service_context.event_service.list(&range).await?))
}

pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>> {
    Ok(Json(state.service_context.event_service.get(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    Json(request): Json<EventRequest>,
) -> Result<(StatusCode, Json<Event>)> {
    let event = state.service_context.event_service.create(request).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<EventRequest>,
) -> Result<Json<Event>> {
    Ok(Json(state.service_context.event_service.update(id, request).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.service_context.event_service.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
