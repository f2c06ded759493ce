use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};

use crate::{
    api::state::AppState,
    domain::{Image, UploadResponse},
    error::{AppError, Result},
};

const IMAGE_FIELD: &str = "image";

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>)> {
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(IMAGE_FIELD) {
            // Drain fields we do not use
            let _ = field.bytes().await.map_err(multipart_error)?;
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().map(str::to_string);
        let data = field.bytes().await.map_err(multipart_error)?;

        let (image, deduplicated) = state.service_context.image_service
            .upload(&filename, content_type.as_deref(), &data)
            .await?;

        let status = if deduplicated { StatusCode::OK } else { StatusCode::CREATED };
        return Ok((
            status,
            Json(UploadResponse {
                url: image.url.clone(),
                image,
                deduplicated,
            }),
        ));
    }

    Err(AppError::BadRequest(format!("Missing '{}' file field", IMAGE_FIELD)))
}

pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Image>>> {
    Ok(Json(state.service_context.image_service.list().await?))
}

fn multipart_error(e: MultipartError) -> AppError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        AppError::PayloadTooLarge("File too large".to_string())
    } else {
        AppError::BadRequest(format!("Invalid multipart body: {}", e.body_text()))
    }
}
