use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Category;

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryList {
    pub items: Vec<Category>,
}
