pub mod handlers;
pub mod middleware;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::CorsLayer,
    services::ServeDir,
    trace::TraceLayer,
};
use std::sync::Arc;

use crate::{
    config::Settings,
    service::ServiceContext,
};
use state::AppState;

// Room for multipart boundaries and part headers on top of the file itself
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub fn create_app(service_context: Arc<ServiceContext>, settings: Arc<Settings>) -> Router {
    let app_state = AppState::new(service_context, settings.clone());
    let upload_dir = app_state.service_context.image_service.store().dir().to_path_buf();

    Router::new()
        .route("/health", get(handlers::root::health_check))
        .route("/api", get(handlers::root::api_info))
        .merge(public_routes())
        .merge(reader_routes(app_state.clone()))
        .merge(admin_routes(app_state.clone(), settings.uploads.max_bytes))
        .merge(super_admin_routes(app_state.clone()))
        .nest_service(&settings.uploads.url_prefix, ServeDir::new(upload_dir))
        .with_state(app_state)
        .layer(CompressionLayer::new())
        .layer(cors_layer(&settings))
        .layer(TraceLayer::new_for_http())
}

fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/api/announcements", get(handlers::announcements::list))
        .route("/api/categories", get(handlers::announcements::categories))
        .route("/api/events", get(handlers::events::list))
        .route("/api/events/:id", get(handlers::events::get))
        .route("/api/auth/login", post(handlers::auth::login))
        .route("/api/auth/logout", post(handlers::auth::logout))
}

// Admins may preview unpublished announcements here
fn reader_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/announcements/:id", get(handlers::announcements::get))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::optional_auth,
        ))
}

fn admin_routes(state: AppState, max_upload_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/api/announcements", post(handlers::announcements::create))
        .route("/api/announcements/:id", put(handlers::announcements::update))
        .route("/api/announcements/:id", delete(handlers::announcements::delete))
        .route("/api/admin/announcements", get(handlers::announcements::list_all))
        .route(
            "/api/upload",
            post(handlers::uploads::upload)
                .layer(DefaultBodyLimit::max(max_upload_bytes + MULTIPART_OVERHEAD)),
        )
        .route("/api/images", get(handlers::uploads::list))
        .route("/api/events", post(handlers::events::create))
        .route("/api/events/:id", put(handlers::events::update))
        .route("/api/events/:id", delete(handlers::events::delete))
        .route("/api/auth/me", get(handlers::auth::me))
        .route("/api/auth/change-password", post(handlers::auth::change_password))
        .route("/api/admins", get(handlers::admins::list))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_auth,
        ))
}

fn super_admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/api/admins", post(handlers::admins::create))
        .route("/api/admins/:id/password", put(handlers::admins::reset_password))
        .route("/api/admins/:id", delete(handlers::admins::delete))
        .route_layer(axum::middleware::from_fn_with_state(
            state,
            middleware::auth::require_super_admin_auth,
        ))
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let Some(origin) = settings.server.cors_origin.as_deref() else {
        return CorsLayer::permissive();
    };

    match origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            .allow_credentials(true),
        Err(e) => {
            tracing::warn!("Invalid CORS origin '{}': {}. Allowing any origin.", origin, e);
            CorsLayer::permissive()
        }
    }
}
