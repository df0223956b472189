use serde::Serialize;
use utoipa::ToSchema;

use crate::models::{Order, OrderItem, Product};

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderWithItems {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

/// History line: the snapshot plus the live product when it still exists.
#[derive(Debug, Serialize, ToSchema)]
pub struct OrderLine {
    pub item: OrderItem,
    pub product: Option<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderHistoryEntry {
    pub order: Order,
    pub items: Vec<OrderLine>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderHistory {
    pub items: Vec<OrderHistoryEntry>,
}
