use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

/// Decoded image part from a multipart upload.
#[derive(Debug)]
pub struct NewProductImage {
    pub data: Vec<u8>,
    pub mime_type: String,
}

/// Parsed from multipart form fields, not JSON; see `routes::products`.
#[derive(Debug)]
pub struct CreateProductRequest {
    pub title: String,
    pub description: String,
    pub price: Decimal,
    pub category_id: Uuid,
    pub quantity: i32,
    pub condition: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year_of_manufacture: Option<i32>,
    pub material: Option<String>,
    pub color: Option<String>,
    pub dimension_l: Option<Decimal>,
    pub dimension_w: Option<Decimal>,
    pub dimension_h: Option<Decimal>,
    pub is_original: bool,
    pub has_manual: bool,
    pub working_condition: Option<String>,
    pub images: Vec<NewProductImage>,
}

/// Partial update. `existing_image_ids`, when present, lists the images to
/// keep; any other stored image is removed. New uploads are appended.
#[derive(Debug, Default)]
pub struct UpdateProductRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub category_id: Option<Uuid>,
    pub quantity: Option<i32>,
    pub condition: Option<String>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year_of_manufacture: Option<i32>,
    pub material: Option<String>,
    pub color: Option<String>,
    pub dimension_l: Option<Decimal>,
    pub dimension_w: Option<Decimal>,
    pub dimension_h: Option<Decimal>,
    pub is_original: Option<bool>,
    pub has_manual: Option<bool>,
    pub working_condition: Option<String>,
    pub existing_image_ids: Option<Vec<Uuid>>,
    pub images: Vec<NewProductImage>,
}

/// A product plus the ids to fetch its images from `/api/images/{id}`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ProductDetail {
    pub product: Product,
    pub image_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ProductList {
    pub items: Vec<ProductDetail>,
}
