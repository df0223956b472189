use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::FromRow;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    db::DbPool,
    dto::cart::{AddToCartRequest, CartItemDto, CartList},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, Product},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
};

#[derive(FromRow)]
struct CartWithProductRow {
    cart_id: Uuid,
    quantity: i32,
    product_id: Uuid,
    seller_id: Uuid,
    category_id: Uuid,
    title: String,
    description: String,
    price: Decimal,
    product_quantity: i32,
    condition: String,
    brand: Option<String>,
    model: Option<String>,
    year_of_manufacture: Option<i32>,
    material: Option<String>,
    color: Option<String>,
    dimension_l: Option<Decimal>,
    dimension_w: Option<Decimal>,
    dimension_h: Option<Decimal>,
    is_original: bool,
    has_manual: bool,
    working_condition: Option<String>,
    created_at: DateTime<Utc>,
}

pub async fn list_cart(
    pool: &DbPool,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<CartList>> {
    let (page, limit, offset) = pagination.normalize();
    let rows = sqlx::query_as::<_, CartWithProductRow>(
        r#"
        SELECT ci.id AS cart_id, ci.quantity,
               p.id AS product_id, p.seller_id, p.category_id, p.title, p.description,
               p.price, p.quantity AS product_quantity, p.condition, p.brand, p.model,
               p.year_of_manufacture, p.material, p.color,
               p.dimension_l, p.dimension_w, p.dimension_h,
               p.is_original, p.has_manual, p.working_condition, p.created_at
        FROM cart_items ci
        JOIN products p ON p.id = ci.product_id
        WHERE ci.user_id = $1
        ORDER BY ci.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(user.user_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user.user_id)
        .fetch_one(pool)
        .await?;

    let product_ids: Vec<Uuid> = rows.iter().map(|row| row.product_id).collect();
    let mut images = images_by_product(pool, &product_ids).await?;

    let items = rows
        .into_iter()
        .map(|row| CartItemDto {
            id: row.cart_id,
            image_ids: images.remove(&row.product_id).unwrap_or_default(),
            product: Product {
                id: row.product_id,
                seller_id: row.seller_id,
                category_id: row.category_id,
                title: row.title,
                description: row.description,
                price: row.price,
                quantity: row.product_quantity,
                condition: row.condition,
                brand: row.brand,
                model: row.model,
                year_of_manufacture: row.year_of_manufacture,
                material: row.material,
                color: row.color,
                dimension_l: row.dimension_l,
                dimension_w: row.dimension_w,
                dimension_h: row.dimension_h,
                is_original: row.is_original,
                has_manual: row.has_manual,
                working_condition: row.working_condition,
                created_at: row.created_at,
            },
            quantity: row.quantity,
        })
        .collect();

    let meta = Meta::new(page, limit, total.0);
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

pub async fn add_to_cart(
    pool: &DbPool,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity <= 0 {
        return Err(AppError::Validation(
            "quantity must be greater than 0".to_string(),
        ));
    }

    let product_exist: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM products WHERE id = $1")
        .bind(payload.product_id)
        .fetch_optional(pool)
        .await?;
    if product_exist.is_none() {
        return Err(AppError::Validation("product not found".to_string()));
    }

    // One row per (user, product): a second add replaces the quantity.
    let cart_item: CartItem = sqlx::query_as(
        r#"
        INSERT INTO cart_items (user_id, product_id, quantity)
        VALUES ($1, $2, $3)
        ON CONFLICT (user_id, product_id) DO UPDATE SET quantity = EXCLUDED.quantity
        RETURNING *
        "#,
    )
    .bind(user.user_id)
    .bind(payload.product_id)
    .bind(payload.quantity)
    .fetch_one(pool)
    .await?;

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_update",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": payload.product_id, "quantity": payload.quantity })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success("OK", cart_item, None))
}

pub async fn remove_from_cart(
    pool: &DbPool,
    user: &AuthUser,
    product_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let result = sqlx::query("DELETE FROM cart_items WHERE product_id = $1 AND user_id = $2")
        .bind(product_id)
        .bind(user.user_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound);
    }

    if let Err(err) = log_audit(
        pool,
        Some(user.user_id),
        "cart_remove",
        Some("cart_items"),
        Some(serde_json::json!({ "product_id": product_id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

async fn images_by_product(
    pool: &DbPool,
    product_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<Uuid>>> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows: Vec<(Uuid, Uuid)> = sqlx::query_as(
        "SELECT id, product_id FROM product_images WHERE product_id = ANY($1) ORDER BY created_at",
    )
    .bind(product_ids)
    .fetch_all(pool)
    .await?;

    let mut map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for (image_id, product_id) in rows {
        map.entry(product_id).or_default().push(image_id);
    }
    Ok(map)
}
