use axum::{
    Router,
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Response},
    routing::get,
};
use uuid::Uuid;

use crate::{error::AppResult, services::image_service, state::AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/{id}", get(get_image))
}

#[utoipa::path(
    get,
    path = "/api/images/{id}",
    params(
        ("id" = Uuid, Path, description = "Image ID")
    ),
    responses(
        (status = 200, description = "Raw image bytes with the stored mime type"),
        (status = 404, description = "Image not found"),
    ),
    tag = "Images"
)]
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Response> {
    let blob = image_service::get_image(&state.pool, id).await?;
    Ok(([(header::CONTENT_TYPE, blob.mime_type)], blob.image_data).into_response())
}
