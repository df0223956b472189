use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, EntityTrait, FromQueryResult,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::products::{CreateProductRequest, ProductDetail, ProductList, UpdateProductRequest},
    entity::{
        categories::Entity as Categories,
        product_images::{
            ActiveModel as ProductImageActive, Column as ImageCol, Entity as ProductImages,
        },
        products::{ActiveModel, Column, Entity as Products, Model as ProductModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::Product,
    response::{ApiResponse, Meta},
    routes::params::{ProductQuery, ProductSortBy, SortOrder},
    state::AppState,
};

pub async fn list_products(
    state: &AppState,
    query: ProductQuery,
) -> AppResult<ApiResponse<ProductList>> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = Condition::all();

    if let Some(search) = query.q.as_ref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", search);
        condition = condition.add(
            Condition::any()
                .add(Expr::col(Column::Title).ilike(pattern.clone()))
                .add(Expr::col(Column::Description).ilike(pattern)),
        );
    }

    if let Some(category_id) = query.category_id {
        condition = condition.add(Column::CategoryId.eq(category_id));
    }

    if let Some(min_price) = query.min_price {
        condition = condition.add(Column::Price.gte(min_price));
    }

    if let Some(max_price) = query.max_price {
        condition = condition.add(Column::Price.lte(max_price));
    }

    let sort_by = query.sort_by.unwrap_or(ProductSortBy::CreatedAt);
    let sort_order = query.sort_order.unwrap_or(SortOrder::Desc);
    let sort_col = match sort_by {
        ProductSortBy::CreatedAt => Column::CreatedAt,
        ProductSortBy::Price => Column::Price,
        ProductSortBy::Title => Column::Title,
    };

    let mut finder = Products::find().filter(condition);
    finder = match sort_order {
        SortOrder::Asc => finder.order_by_asc(sort_col),
        SortOrder::Desc => finder.order_by_desc(sort_col),
    };

    let total = finder.clone().count(&state.orm).await? as i64;

    let products: Vec<ProductModel> = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let product_ids: Vec<Uuid> = products.iter().map(|p| p.id).collect();
    let mut images = image_ids_by_product(&state.orm, &product_ids).await?;

    let items = products
        .into_iter()
        .map(|model| ProductDetail {
            image_ids: images.remove(&model.id).unwrap_or_default(),
            product: product_from_entity(model),
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Products",
        ProductList { items },
        Some(meta),
    ))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<ProductDetail>> {
    let model = Products::find_by_id(id).one(&state.orm).await?;
    let model = match model {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    let mut images = image_ids_by_product(&state.orm, &[model.id]).await?;
    let detail = ProductDetail {
        image_ids: images.remove(&model.id).unwrap_or_default(),
        product: product_from_entity(model),
    };
    Ok(ApiResponse::success("Product", detail, None))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    validate_title(&payload.title)?;
    validate_description(&payload.description)?;
    validate_price(payload.price)?;
    validate_quantity(payload.quantity)?;
    validate_condition(&payload.condition)?;

    let txn = state.orm.begin().await?;

    ensure_category_exists(&txn, payload.category_id).await?;

    let active = ActiveModel {
        id: Set(Uuid::new_v4()),
        seller_id: Set(user.user_id),
        category_id: Set(payload.category_id),
        title: Set(payload.title),
        description: Set(payload.description),
        price: Set(payload.price),
        quantity: Set(payload.quantity),
        condition: Set(payload.condition),
        brand: Set(payload.brand),
        model: Set(payload.model),
        year_of_manufacture: Set(payload.year_of_manufacture),
        material: Set(payload.material),
        color: Set(payload.color),
        dimension_l: Set(payload.dimension_l),
        dimension_w: Set(payload.dimension_w),
        dimension_h: Set(payload.dimension_h),
        is_original: Set(payload.is_original),
        has_manual: Set(payload.has_manual),
        working_condition: Set(payload.working_condition),
        created_at: NotSet,
    };
    let product = active.insert(&txn).await?;

    let mut image_ids = Vec::with_capacity(payload.images.len());
    for image in payload.images {
        let stored = ProductImageActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            image_data: Set(image.data),
            mime_type: Set(image.mime_type),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
        image_ids.push(stored.id);
    }

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_create",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let detail = ProductDetail {
        product: product_from_entity(product),
        image_ids,
    };
    Ok(ApiResponse::success(
        "Product created",
        detail,
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<ProductDetail>> {
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    if existing.seller_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    let txn = state.orm.begin().await?;

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        validate_title(&title)?;
        active.title = Set(title);
    }
    if let Some(description) = payload.description {
        validate_description(&description)?;
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        validate_price(price)?;
        active.price = Set(price);
    }
    if let Some(category_id) = payload.category_id {
        ensure_category_exists(&txn, category_id).await?;
        active.category_id = Set(category_id);
    }
    if let Some(quantity) = payload.quantity {
        validate_quantity(quantity)?;
        active.quantity = Set(quantity);
    }
    if let Some(condition) = payload.condition {
        validate_condition(&condition)?;
        active.condition = Set(condition);
    }
    if let Some(brand) = payload.brand {
        active.brand = Set(Some(brand));
    }
    if let Some(model) = payload.model {
        active.model = Set(Some(model));
    }
    if let Some(year) = payload.year_of_manufacture {
        active.year_of_manufacture = Set(Some(year));
    }
    if let Some(material) = payload.material {
        active.material = Set(Some(material));
    }
    if let Some(color) = payload.color {
        active.color = Set(Some(color));
    }
    if let Some(dimension_l) = payload.dimension_l {
        active.dimension_l = Set(Some(dimension_l));
    }
    if let Some(dimension_w) = payload.dimension_w {
        active.dimension_w = Set(Some(dimension_w));
    }
    if let Some(dimension_h) = payload.dimension_h {
        active.dimension_h = Set(Some(dimension_h));
    }
    if let Some(is_original) = payload.is_original {
        active.is_original = Set(is_original);
    }
    if let Some(has_manual) = payload.has_manual {
        active.has_manual = Set(has_manual);
    }
    if let Some(working_condition) = payload.working_condition {
        active.working_condition = Set(Some(working_condition));
    }

    let product = active.update(&txn).await?;

    // Images not listed in existing_image_ids are dropped; new uploads append.
    if let Some(keep) = payload.existing_image_ids {
        ProductImages::delete_many()
            .filter(
                Condition::all()
                    .add(ImageCol::ProductId.eq(product.id))
                    .add(ImageCol::Id.is_not_in(keep)),
            )
            .exec(&txn)
            .await?;
    }
    for image in payload.images {
        ProductImageActive {
            id: Set(Uuid::new_v4()),
            product_id: Set(product.id),
            image_data: Set(image.data),
            mime_type: Set(image.mime_type),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;
    }

    let mut images = image_ids_by_product(&txn, &[product.id]).await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_update",
        Some("products"),
        Some(serde_json::json!({ "product_id": product.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let detail = ProductDetail {
        image_ids: images.remove(&product.id).unwrap_or_default(),
        product: product_from_entity(product),
    };
    Ok(ApiResponse::success("Updated", detail, Some(Meta::empty())))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let existing = Products::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };
    if existing.seller_id != user.user_id {
        return Err(AppError::Forbidden);
    }

    // Images and cart references cascade; order snapshots keep price/quantity.
    Products::delete_by_id(id).exec(&state.orm).await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "product_delete",
        Some("products"),
        Some(serde_json::json!({ "product_id": id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[derive(Debug, FromQueryResult)]
struct ImageRef {
    id: Uuid,
    product_id: Uuid,
}

/// Image ids per product, without pulling the blobs off the wire.
pub async fn image_ids_by_product<C: ConnectionTrait>(
    conn: &C,
    product_ids: &[Uuid],
) -> AppResult<HashMap<Uuid, Vec<Uuid>>> {
    if product_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let refs = ProductImages::find()
        .select_only()
        .column(ImageCol::Id)
        .column(ImageCol::ProductId)
        .filter(ImageCol::ProductId.is_in(product_ids.to_vec()))
        .order_by_asc(ImageCol::CreatedAt)
        .into_model::<ImageRef>()
        .all(conn)
        .await?;

    let mut map: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
    for image in refs {
        map.entry(image.product_id).or_default().push(image.id);
    }
    Ok(map)
}

async fn ensure_category_exists<C: ConnectionTrait>(conn: &C, id: Uuid) -> AppResult<()> {
    let exists = Categories::find_by_id(id).one(conn).await?;
    if exists.is_none() {
        return Err(AppError::Validation("category not found".into()));
    }
    Ok(())
}

fn validate_title(title: &str) -> AppResult<()> {
    if title.trim().len() < 3 {
        return Err(AppError::Validation(
            "title must be at least 3 characters".into(),
        ));
    }
    Ok(())
}

fn validate_description(description: &str) -> AppResult<()> {
    if description.trim().len() < 10 {
        return Err(AppError::Validation(
            "description must be at least 10 characters".into(),
        ));
    }
    Ok(())
}

fn validate_price(price: Decimal) -> AppResult<()> {
    if price <= Decimal::ZERO {
        return Err(AppError::Validation("price must be positive".into()));
    }
    Ok(())
}

fn validate_quantity(quantity: i32) -> AppResult<()> {
    if quantity < 0 {
        return Err(AppError::Validation("quantity must not be negative".into()));
    }
    Ok(())
}

fn validate_condition(condition: &str) -> AppResult<()> {
    if condition.trim().len() < 3 {
        return Err(AppError::Validation(
            "condition must be at least 3 characters".into(),
        ));
    }
    Ok(())
}

pub fn product_from_entity(model: ProductModel) -> Product {
    Product {
        id: model.id,
        seller_id: model.seller_id,
        category_id: model.category_id,
        title: model.title,
        description: model.description,
        price: model.price,
        quantity: model.quantity,
        condition: model.condition,
        brand: model.brand,
        model: model.model,
        year_of_manufacture: model.year_of_manufacture,
        material: model.material,
        color: model.color,
        dimension_l: model.dimension_l,
        dimension_w: model.dimension_w,
        dimension_h: model.dimension_h,
        is_original: model.is_original,
        has_manual: model.has_manual,
        working_condition: model.working_condition,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
