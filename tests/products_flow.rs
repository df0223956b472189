use ecofinds_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::products::{CreateProductRequest, NewProductImage},
    entity::{categories::ActiveModel as CategoryActive, users::ActiveModel as UserActive},
    error::AppError,
    mailer::Mailer,
    middleware::auth::AuthUser,
    routes::params::{Pagination, ProductQuery},
    services::{image_service, product_service},
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, Set, Statement};
use uuid::Uuid;

// Catalog flow: create with an image upload, find it through search, and
// enforce that only the seller can delete.
#[tokio::test]
async fn product_ownership_and_search_flow() -> anyhow::Result<()> {
    // Allow skipping when no DB is configured in the environment.
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run integration flow tests."
            );
            return Ok(());
        }
    };

    let state = setup_state(&database_url).await?;

    let seller_id = create_user(&state, "seller", "seller@example.com").await?;
    let stranger_id = create_user(&state, "stranger", "stranger@example.com").await?;
    let category_id = create_category(&state, "Furniture").await?;

    let seller = AuthUser { user_id: seller_id };
    let stranger = AuthUser {
        user_id: stranger_id,
    };

    let jpeg_bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10];
    let resp = product_service::create_product(
        &state,
        &seller,
        CreateProductRequest {
            title: "Walnut Side Table".into(),
            description: "Mid-century side table with patina".into(),
            price: "85.00".parse::<Decimal>()?,
            category_id,
            quantity: 1,
            condition: "used".into(),
            brand: Some("Handmade".into()),
            model: None,
            year_of_manufacture: Some(1968),
            material: Some("walnut".into()),
            color: Some("brown".into()),
            dimension_l: None,
            dimension_w: None,
            dimension_h: None,
            is_original: true,
            has_manual: false,
            working_condition: None,
            images: vec![NewProductImage {
                data: jpeg_bytes.clone(),
                mime_type: "image/jpeg".into(),
            }],
        },
    )
    .await?;
    let detail = resp.data.unwrap();
    let product_id = detail.product.id;
    assert_eq!(detail.image_ids.len(), 1);

    // Stored image round-trips through the blob endpoint service.
    let blob = image_service::get_image(&state.pool, detail.image_ids[0]).await?;
    assert_eq!(blob.mime_type, "image/jpeg");
    assert_eq!(blob.image_data, jpeg_bytes);

    // Free-text search finds it; an unrelated term does not.
    let query = |q: &str| ProductQuery {
        pagination: Pagination {
            page: Some(1),
            per_page: Some(20),
        },
        q: Some(q.to_string()),
        category_id: Some(category_id),
        min_price: None,
        max_price: None,
        sort_by: None,
        sort_order: None,
    };
    let found = product_service::list_products(&state, query("walnut")).await?;
    assert_eq!(found.data.unwrap().items.len(), 1);
    let missed = product_service::list_products(&state, query("surfboard")).await?;
    assert!(missed.data.unwrap().items.is_empty());

    // Only the seller may delete.
    let err = product_service::delete_product(&state, &stranger, product_id)
        .await
        .expect_err("non-owner delete");
    assert!(matches!(err, AppError::Forbidden));

    product_service::delete_product(&state, &seller, product_id).await?;
    let err = product_service::get_product(&state, product_id)
        .await
        .expect_err("deleted product must be gone");
    assert!(matches!(err, AppError::NotFound));

    // Deleting an unknown id reports NotFound, not Forbidden.
    let err = product_service::delete_product(&state, &seller, Uuid::new_v4())
        .await
        .expect_err("unknown product");
    assert!(matches!(err, AppError::NotFound));

    Ok(())
}

async fn setup_state(database_url: &str) -> anyhow::Result<AppState> {
    let pool = create_pool(database_url).await?;
    let orm = create_orm_conn(database_url).await?;
    run_migrations(&orm).await?;

    // Clean tables between runs
    let backend = orm.get_database_backend();
    orm.execute(Statement::from_string(
        backend,
        "TRUNCATE TABLE order_items, orders, cart_items, product_images, products, categories, audit_logs, users RESTART IDENTITY CASCADE",
    ))
    .await?;

    Ok(AppState {
        pool,
        orm,
        mailer: Mailer::disabled(),
    })
}

async fn create_user(state: &AppState, username: &str, email: &str) -> anyhow::Result<Uuid> {
    let user = UserActive {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set("dummy".into()),
        ..Default::default()
    }
    .insert(&state.orm)
    .await?;

    Ok(user.id)
}

async fn create_category(state: &AppState, name: &str) -> anyhow::Result<Uuid> {
    let category = CategoryActive {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        ..Default::default()
    }
    .insert(&state.orm)
    .await?;

    Ok(category.id)
}
