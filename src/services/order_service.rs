use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::orders::{OrderHistory, OrderHistoryEntry, OrderLine, OrderWithItems},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
            Model as OrderItemModel,
        },
        orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel},
        products::{Column as ProdCol, Entity as Products},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    services::product_service::product_from_entity,
    state::AppState,
};

/// Convert the caller's cart into an order.
///
/// Total computation, order + line insertion and cart clearing run inside one
/// transaction: a failure at any point leaves no partial order behind. Line
/// prices are snapshots of the product price at this instant.
pub async fn checkout(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<OrderWithItems>> {
    let txn = state.orm.begin().await?;

    let cart_rows = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::CreatedAt)
        .all(&txn)
        .await?;

    if cart_rows.is_empty() {
        return Err(AppError::Domain("Cart is empty".into()));
    }

    let product_ids: Vec<Uuid> = cart_rows.iter().map(|row| row.product_id).collect();

    // Lock the referenced products so a concurrent price update cannot land
    // between reading the price and writing the snapshot.
    let products = Products::find()
        .filter(ProdCol::Id.is_in(product_ids))
        .lock(LockType::Update)
        .all(&txn)
        .await?;
    let products: HashMap<Uuid, _> = products.into_iter().map(|p| (p.id, p)).collect();

    let mut total_amount = Decimal::ZERO;
    for row in &cart_rows {
        if row.quantity <= 0 {
            return Err(AppError::Domain("Cart has invalid quantity".into()));
        }
        let product = products.get(&row.product_id).ok_or(AppError::NotFound)?;
        total_amount += product.price * Decimal::from(row.quantity);
    }

    let order = OrderActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user.user_id),
        total_amount: Set(total_amount),
        created_at: NotSet,
    }
    .insert(&txn)
    .await?;

    let mut order_items: Vec<OrderItem> = Vec::with_capacity(cart_rows.len());
    for row in &cart_rows {
        let product = products.get(&row.product_id).ok_or(AppError::NotFound)?;
        let item = OrderItemActive {
            id: Set(Uuid::new_v4()),
            order_id: Set(order.id),
            product_id: Set(Some(row.product_id)),
            quantity: Set(row.quantity),
            price: Set(product.price),
            created_at: NotSet,
        }
        .insert(&txn)
        .await?;

        order_items.push(order_item_from_entity(item));
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.user_id),
        "checkout",
        Some("orders"),
        Some(serde_json::json!({ "order_id": order.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Checkout success",
        OrderWithItems {
            order: order_from_entity(order),
            items: order_items,
        },
        Some(Meta::empty()),
    ))
}

/// All orders for the caller, newest first, each with its line snapshots and
/// the live product when it still exists.
pub async fn order_history(
    state: &AppState,
    user: &AuthUser,
    pagination: Pagination,
) -> AppResult<ApiResponse<OrderHistory>> {
    let (page, limit, offset) = pagination.normalize();

    let finder = Orders::find()
        .filter(OrderCol::UserId.eq(user.user_id))
        .order_by_desc(OrderCol::CreatedAt);

    let total = finder.clone().count(&state.orm).await? as i64;

    let orders: Vec<OrderModel> = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(&state.orm)
        .await?;

    let order_ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let items: Vec<OrderItemModel> = if order_ids.is_empty() {
        Vec::new()
    } else {
        OrderItems::find()
            .filter(OrderItemCol::OrderId.is_in(order_ids))
            .order_by_asc(OrderItemCol::CreatedAt)
            .all(&state.orm)
            .await?
    };

    let product_ids: Vec<Uuid> = items.iter().filter_map(|i| i.product_id).collect();
    let products: HashMap<Uuid, _> = if product_ids.is_empty() {
        HashMap::new()
    } else {
        Products::find()
            .filter(ProdCol::Id.is_in(product_ids))
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|p| (p.id, p))
            .collect()
    };

    let mut lines_by_order: HashMap<Uuid, Vec<OrderLine>> = HashMap::new();
    for item in items {
        let product = item
            .product_id
            .and_then(|id| products.get(&id).cloned())
            .map(product_from_entity);
        lines_by_order
            .entry(item.order_id)
            .or_default()
            .push(OrderLine {
                item: order_item_from_entity(item),
                product,
            });
    }

    let entries = orders
        .into_iter()
        .map(|order| OrderHistoryEntry {
            items: lines_by_order.remove(&order.id).unwrap_or_default(),
            order: order_from_entity(order),
        })
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Orders",
        OrderHistory { items: entries },
        Some(meta),
    ))
}

fn order_from_entity(model: OrderModel) -> Order {
    Order {
        id: model.id,
        user_id: model.user_id,
        total_amount: model.total_amount,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn order_item_from_entity(model: OrderItemModel) -> OrderItem {
    OrderItem {
        id: model.id,
        order_id: model.order_id,
        product_id: model.product_id,
        quantity: model.quantity,
        price: model.price,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
