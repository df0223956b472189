use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Full user row. Never serialized to clients directly; see `dto::auth::PublicUser`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub two_factor_enabled: bool,
    pub otp_code: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub password_reset_token: Option<String>,
    pub password_reset_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Uuid,
    pub category_id: Uuid,
    pub title: String,
    pub description: String,
    #[schema(value_type = String, example = "25.00")]
    pub price: Decimal,
    pub quantity: i32,
    pub condition: String,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year_of_manufacture: Option<i32>,
    pub material: Option<String>,
    pub color: Option<String>,
    #[schema(value_type = Option<String>)]
    pub dimension_l: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub dimension_w: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub dimension_h: Option<Decimal>,
    pub is_original: bool,
    pub has_manual: bool,
    pub working_condition: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    #[schema(value_type = String, example = "68.00")]
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// Line snapshot: `price` is the product price at checkout time and never
/// changes afterwards. `product_id` goes null if the product is later deleted.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Option<Uuid>,
    pub quantity: i32,
    #[schema(value_type = String, example = "25.00")]
    pub price: Decimal,
    pub created_at: DateTime<Utc>,
}
