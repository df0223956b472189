use ecofinds_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::cart::AddToCartRequest,
    entity::{
        categories::ActiveModel as CategoryActive,
        products::{ActiveModel as ProductActive, Entity as Products},
        users::ActiveModel as UserActive,
    },
    error::AppError,
    mailer::Mailer,
    middleware::auth::AuthUser,
    services::{cart_service, order_service},
    state::AppState,
};
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set, Statement};
use uuid::Uuid;

// Integration flow: cart -> checkout snapshots prices atomically and clears
// the cart; later price changes never touch the recorded order.
#[tokio::test]
async fn checkout_snapshots_prices_and_clears_cart() -> anyhow::Result<()> {
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

    let user_id = create_user(&state, "buyer", "buyer@example.com").await?;
    let category_id = create_category(&state, "Electronics").await?;
    let cheap = create_product(&state, user_id, category_id, "Worn Paperback", "18.00").await?;
    let pricey = create_product(&state, user_id, category_id, "Film Camera", "25.00").await?;

    let auth_user = AuthUser { user_id };

    cart_service::add_to_cart(
        &state.pool,
        &auth_user,
        AddToCartRequest {
            product_id: pricey,
            quantity: 2,
        },
    )
    .await?;
    cart_service::add_to_cart(
        &state.pool,
        &auth_user,
        AddToCartRequest {
            product_id: cheap,
            quantity: 1,
        },
    )
    .await?;

    let checkout_resp = order_service::checkout(&state, &auth_user).await?;
    let data = checkout_resp.data.unwrap();
    assert_eq!(data.order.total_amount, dec("68.00"));
    assert_eq!(data.items.len(), 2);
    let snapshot = |product_id: Uuid| {
        data.items
            .iter()
            .find(|item| item.product_id == Some(product_id))
            .expect("line for product")
            .price
    };
    assert_eq!(snapshot(pricey), dec("25.00"));
    assert_eq!(snapshot(cheap), dec("18.00"));

    // Cart must be empty after a successful checkout.
    let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM cart_items WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(remaining.0, 0);

    // A later price change never alters the recorded snapshot.
    let camera = Products::find_by_id(pricey).one(&state.orm).await?.unwrap();
    let mut active: ProductActive = camera.into();
    active.price = Set(dec("99.99"));
    active.update(&state.orm).await?;

    let history = order_service::order_history(
        &state,
        &auth_user,
        ecofinds_api::routes::params::Pagination {
            page: Some(1),
            per_page: Some(20),
        },
    )
    .await?;
    let entries = history.data.unwrap().items;
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].order.total_amount, dec("68.00"));
    let recorded = entries[0]
        .items
        .iter()
        .find(|line| line.item.product_id == Some(pricey))
        .expect("line for camera");
    assert_eq!(recorded.item.price, dec("25.00"));
    assert_eq!(
        recorded.product.as_ref().map(|p| p.price),
        Some(dec("99.99"))
    );

    // Empty cart: no order row, Domain error back to the caller.
    let err = order_service::checkout(&state, &auth_user)
        .await
        .expect_err("empty cart must not check out");
    assert!(matches!(err, AppError::Domain(_)));
    let orders: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders WHERE user_id = $1")
        .bind(user_id)
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(orders.0, 1);

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

async fn create_product(
    state: &AppState,
    seller_id: Uuid,
    category_id: Uuid,
    title: &str,
    price: &str,
) -> anyhow::Result<Uuid> {
    let product = ProductActive {
        id: Set(Uuid::new_v4()),
        seller_id: Set(seller_id),
        category_id: Set(category_id),
        title: Set(title.to_string()),
        description: Set("A well-loved second-hand item".into()),
        price: Set(dec(price)),
        quantity: Set(1),
        condition: Set("used".into()),
        ..Default::default()
    }
    .insert(&state.orm)
    .await?;

    Ok(product.id)
}

fn dec(value: &str) -> Decimal {
    value.parse().expect("valid decimal literal")
}
