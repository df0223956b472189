use argon2::{
    Argon2, PasswordHasher,
    password_hash::{SaltString, rand_core::OsRng},
};
use rust_decimal::Decimal;
use uuid::Uuid;

use ecofinds_api::{config::AppConfig, db::create_pool};

const CATEGORIES: &[&str] = &[
    "Electronics",
    "Furniture",
    "Clothing",
    "Books",
    "Sports & Outdoors",
];

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = AppConfig::from_env()?;

    let pool = create_pool(&config.database_url).await?;
    // Ensure migrations are applied.
    sqlx::migrate!("./migrations").run(&pool).await?;

    seed_categories(&pool).await?;
    let seller_id = ensure_user(&pool, "greenseller", "seller@example.com", "seller123").await?;
    let buyer_id = ensure_user(&pool, "thriftbuyer", "buyer@example.com", "buyer123").await?;
    seed_products(&pool, seller_id).await?;

    println!("Seed completed. Seller ID: {seller_id}, Buyer ID: {buyer_id}");
    Ok(())
}

async fn seed_categories(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    for name in CATEGORIES {
        sqlx::query("INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING")
            .bind(name)
            .execute(pool)
            .await?;
    }
    println!("Seeded categories");
    Ok(())
}

async fn ensure_user(
    pool: &sqlx::PgPool,
    username: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<Uuid> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!(e.to_string()))?
        .to_string();

    let row: Option<(Uuid,)> = sqlx::query_as(
        r#"
        INSERT INTO users (username, email, password_hash)
        VALUES ($1, $2, $3)
        ON CONFLICT (email) DO NOTHING
        RETURNING id
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .fetch_optional(pool)
    .await?;

    // If user already exists, fetch id
    let user_id = match row {
        Some((id,)) => id,
        None => {
            let existing: (Uuid,) = sqlx::query_as("SELECT id FROM users WHERE email = $1")
                .bind(email)
                .fetch_one(pool)
                .await?;
            existing.0
        }
    };

    println!("Ensured user {email}");
    Ok(user_id)
}

async fn seed_products(pool: &sqlx::PgPool, seller_id: Uuid) -> anyhow::Result<()> {
    let products = vec![
        (
            "Refurbished Laptop",
            "13-inch ultrabook, new battery, light scratches on the lid",
            "450.00",
            "Electronics",
            "refurbished",
        ),
        (
            "Oak Bookshelf",
            "Solid oak, five shelves, minor wear on the base",
            "85.00",
            "Furniture",
            "used",
        ),
        (
            "Vintage Denim Jacket",
            "Classic 90s cut, size M, freshly cleaned",
            "25.00",
            "Clothing",
            "used",
        ),
        (
            "Road Bike Helmet",
            "Worn twice, no impacts, includes original padding",
            "18.00",
            "Sports & Outdoors",
            "like new",
        ),
    ];

    for (title, description, price, category, condition) in products {
        let exists: Option<(Uuid,)> =
            sqlx::query_as("SELECT id FROM products WHERE title = $1 AND seller_id = $2")
                .bind(title)
                .bind(seller_id)
                .fetch_optional(pool)
                .await?;
        if exists.is_some() {
            continue;
        }

        let (category_id,): (Uuid,) =
            sqlx::query_as("SELECT id FROM categories WHERE name = $1")
                .bind(category)
                .fetch_one(pool)
                .await?;

        sqlx::query(
            r#"
            INSERT INTO products (seller_id, category_id, title, description, price, quantity, condition)
            VALUES ($1, $2, $3, $4, $5, 1, $6)
            "#,
        )
        .bind(seller_id)
        .bind(category_id)
        .bind(title)
        .bind(description)
        .bind(price.parse::<Decimal>()?)
        .bind(condition)
        .execute(pool)
        .await?;
    }

    println!("Seeded products");
    Ok(())
}
