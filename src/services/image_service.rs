use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    db::DbPool,
    error::{AppError, AppResult},
};

#[derive(FromRow)]
pub struct ImageBlob {
    pub mime_type: String,
    pub image_data: Vec<u8>,
}

/// Fetch raw image bytes and mime type for `/api/images/{id}`.
pub async fn get_image(pool: &DbPool, id: Uuid) -> AppResult<ImageBlob> {
    let blob: Option<ImageBlob> =
        sqlx::query_as("SELECT mime_type, image_data FROM product_images WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

    match blob {
        Some(blob) => Ok(blob),
        None => Err(AppError::NotFound),
    }
}
