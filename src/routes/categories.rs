use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::categories::CategoryList,
    error::AppResult,
    models::Category,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_categories))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "List categories", body = ApiResponse<CategoryList>)
    ),
    tag = "Categories"
)]
pub async fn list_categories(
    State(state): State<AppState>,
) -> AppResult<Json<ApiResponse<CategoryList>>> {
    let items = sqlx::query_as::<_, Category>("SELECT * FROM categories ORDER BY name")
        .fetch_all(&state.pool)
        .await?;

    Ok(Json(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::empty()),
    )))
}
