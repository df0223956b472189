use axum::{
    Json, Router,
    extract::{Multipart, Path, Query, State},
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

use crate::{
    dto::products::{
        CreateProductRequest, NewProductImage, ProductDetail, ProductList, UpdateProductRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    response::ApiResponse,
    routes::params::ProductQuery,
    services::product_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::get(list_products).post(create_product))
        .route(
            "/{id}",
            axum::routing::get(get_product)
                .put(update_product)
                .delete(delete_product),
        )
}

#[utoipa::path(
    get,
    path = "/api/products",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("q" = Option<String>, Query, description = "Free-text search on title and description"),
        ("category_id" = Option<Uuid>, Query, description = "Filter by category"),
        ("min_price" = Option<String>, Query, description = "Minimum price"),
        ("max_price" = Option<String>, Query, description = "Maximum price"),
        ("sort_by" = Option<String>, Query, description = "created_at, price or title"),
        ("sort_order" = Option<String>, Query, description = "asc or desc"),
    ),
    responses(
        (status = 200, description = "List products", body = ApiResponse<ProductList>)
    ),
    tag = "Products"
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductQuery>,
) -> AppResult<Json<ApiResponse<ProductList>>> {
    let resp = product_service::list_products(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Get product", body = ApiResponse<ProductDetail>),
        (status = 404, description = "Product not found"),
    ),
    tag = "Products"
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let resp = product_service::get_product(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/products",
    request_body(content_type = "multipart/form-data", description = "Product fields plus any number of `images` file parts"),
    responses(
        (status = 201, description = "Create product", body = ApiResponse<ProductDetail>),
        (status = 400, description = "Invalid input"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn create_product(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let form = ProductForm::collect(multipart).await?;
    let payload = form.into_create_request()?;
    let resp = product_service::create_product(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    request_body(content_type = "multipart/form-data", description = "Fields to change; `existing_image_ids` lists images to keep, new `images` parts are appended"),
    responses(
        (status = 200, description = "Updated product", body = ApiResponse<ProductDetail>),
        (status = 403, description = "Caller is not the seller"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn update_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Json<ApiResponse<ProductDetail>>> {
    let form = ProductForm::collect(multipart).await?;
    let payload = form.into_update_request()?;
    let resp = product_service::update_product(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}",
    params(
        ("id" = Uuid, Path, description = "Product ID")
    ),
    responses(
        (status = 200, description = "Deleted product"),
        (status = 403, description = "Caller is not the seller"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Products"
)]
pub async fn delete_product(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    let resp = product_service::delete_product(&state, &user, id).await?;
    Ok(Json(resp))
}

/// Collected multipart body: text fields by name, `images` file parts, and
/// the optional `existing_image_ids` keep-list.
#[derive(Default)]
struct ProductForm {
    fields: HashMap<String, String>,
    images: Vec<NewProductImage>,
    existing_image_ids: Vec<Uuid>,
    saw_existing_image_ids: bool,
}

impl ProductForm {
    async fn collect(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = Self::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|err| AppError::Validation(err.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            match name.as_str() {
                "images" => {
                    let mime_type = field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string();
                    let data = field
                        .bytes()
                        .await
                        .map_err(|err| AppError::Validation(err.to_string()))?
                        .to_vec();
                    if !data.is_empty() {
                        form.images.push(NewProductImage { data, mime_type });
                    }
                }
                "existing_image_ids" => {
                    form.saw_existing_image_ids = true;
                    let text = field
                        .text()
                        .await
                        .map_err(|err| AppError::Validation(err.to_string()))?;
                    for part in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
                        let id = Uuid::parse_str(part).map_err(|_| {
                            AppError::Validation("existing_image_ids must be UUIDs".into())
                        })?;
                        form.existing_image_ids.push(id);
                    }
                }
                _ => {
                    let value = field
                        .text()
                        .await
                        .map_err(|err| AppError::Validation(err.to_string()))?;
                    form.fields.insert(name, value);
                }
            }
        }
        Ok(form)
    }

    fn into_create_request(mut self) -> AppResult<CreateProductRequest> {
        Ok(CreateProductRequest {
            title: self.required("title")?,
            description: self.required("description")?,
            price: self.required_parsed("price")?,
            category_id: self.required_parsed("category_id")?,
            quantity: self.required_parsed("quantity")?,
            condition: self.required("condition")?,
            brand: self.optional("brand"),
            model: self.optional("model"),
            year_of_manufacture: self.optional_parsed("year_of_manufacture")?,
            material: self.optional("material"),
            color: self.optional("color"),
            dimension_l: self.optional_parsed("dimension_l")?,
            dimension_w: self.optional_parsed("dimension_w")?,
            dimension_h: self.optional_parsed("dimension_h")?,
            is_original: self.flag("is_original"),
            has_manual: self.flag("has_manual"),
            working_condition: self.optional("working_condition"),
            images: self.images,
        })
    }

    fn into_update_request(mut self) -> AppResult<UpdateProductRequest> {
        Ok(UpdateProductRequest {
            title: self.optional("title"),
            description: self.optional("description"),
            price: self.optional_parsed::<Decimal>("price")?,
            category_id: self.optional_parsed::<Uuid>("category_id")?,
            quantity: self.optional_parsed::<i32>("quantity")?,
            condition: self.optional("condition"),
            brand: self.optional("brand"),
            model: self.optional("model"),
            year_of_manufacture: self.optional_parsed("year_of_manufacture")?,
            material: self.optional("material"),
            color: self.optional("color"),
            dimension_l: self.optional_parsed("dimension_l")?,
            dimension_w: self.optional_parsed("dimension_w")?,
            dimension_h: self.optional_parsed("dimension_h")?,
            is_original: self.optional_flag("is_original"),
            has_manual: self.optional_flag("has_manual"),
            working_condition: self.optional("working_condition"),
            existing_image_ids: self
                .saw_existing_image_ids
                .then_some(self.existing_image_ids),
            images: self.images,
        })
    }

    fn required(&mut self, name: &str) -> AppResult<String> {
        self.fields
            .remove(name)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| AppError::Validation(format!("{name} is required")))
    }

    fn required_parsed<T: FromStr>(&mut self, name: &str) -> AppResult<T> {
        let value = self.required(name)?;
        value
            .trim()
            .parse::<T>()
            .map_err(|_| AppError::Validation(format!("{name} is not valid")))
    }

    fn optional(&mut self, name: &str) -> Option<String> {
        self.fields.remove(name).filter(|v| !v.trim().is_empty())
    }

    fn optional_parsed<T: FromStr>(&mut self, name: &str) -> AppResult<Option<T>> {
        match self.optional(name) {
            Some(value) => value
                .trim()
                .parse::<T>()
                .map(Some)
                .map_err(|_| AppError::Validation(format!("{name} is not valid"))),
            None => Ok(None),
        }
    }

    fn flag(&mut self, name: &str) -> bool {
        self.optional_flag(name).unwrap_or(false)
    }

    fn optional_flag(&mut self, name: &str) -> Option<bool> {
        self.optional(name)
            .map(|v| matches!(v.trim(), "true" | "1"))
    }
}
