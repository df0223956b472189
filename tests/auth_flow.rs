use ecofinds_api::{
    db::{create_orm_conn, create_pool, run_migrations},
    dto::auth::{
        ForgotPasswordRequest, LoginOutcome, LoginRequest, RegisterRequest, ResetPasswordRequest,
        SetTwoFactorRequest, VerifyOtpRequest,
    },
    error::AppError,
    mailer::Mailer,
    middleware::auth::AuthUser,
    services::auth_service,
    state::AppState,
};
use sea_orm::{ConnectionTrait, Statement};

// Registration, credential checks, the 2FA detour and password reset,
// exercised against a real database.
#[tokio::test]
async fn register_login_2fa_and_password_reset_flow() -> anyhow::Result<()> {
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
    // SAFETY: tests run single-process; nothing else reads the var concurrently.
    unsafe { std::env::set_var("JWT_SECRET", "integration-test-secret") };

    let state = setup_state(&database_url).await?;

    // Register issues a token right away.
    let resp = auth_service::register_user(
        &state,
        RegisterRequest {
            username: "ecouser".into(),
            email: "ecouser@example.com".into(),
            password: "hunter22".into(),
        },
    )
    .await?;
    let registered = resp.data.unwrap();
    assert!(!registered.token.is_empty());
    let user_id = registered.user.id;

    // A duplicate email or username conflicts and creates no second row.
    let err = auth_service::register_user(
        &state,
        RegisterRequest {
            username: "someone-else".into(),
            email: "ecouser@example.com".into(),
            password: "hunter22".into(),
        },
    )
    .await
    .expect_err("duplicate email must conflict");
    assert!(matches!(err, AppError::Conflict(_)));
    let err = auth_service::register_user(
        &state,
        RegisterRequest {
            username: "ecouser".into(),
            email: "other@example.com".into(),
            password: "hunter22".into(),
        },
    )
    .await
    .expect_err("duplicate username must conflict");
    assert!(matches!(err, AppError::Conflict(_)));
    let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
        .fetch_one(&state.pool)
        .await?;
    assert_eq!(count.0, 1);

    // Unknown identifier vs. wrong password are distinct failures.
    let err = auth_service::login_user(
        &state,
        LoginRequest {
            identifier: "nobody".into(),
            password: "hunter22".into(),
        },
    )
    .await
    .expect_err("unknown user");
    assert!(matches!(err, AppError::NotFound));
    let err = auth_service::login_user(
        &state,
        LoginRequest {
            identifier: "ecouser".into(),
            password: "wrong-password".into(),
        },
    )
    .await
    .expect_err("bad password");
    assert!(matches!(err, AppError::Unauthorized));

    // Email works as identifier too.
    let resp = auth_service::login_user(
        &state,
        LoginRequest {
            identifier: "ecouser@example.com".into(),
            password: "hunter22".into(),
        },
    )
    .await?;
    assert!(matches!(
        resp.data.unwrap(),
        LoginOutcome::Authenticated(_)
    ));

    // With 2FA enabled, login parks the attempt without a token.
    let auth_user = AuthUser { user_id };
    auth_service::set_two_factor(&state, &auth_user, SetTwoFactorRequest { enabled: true })
        .await?;
    let resp = auth_service::login_user(
        &state,
        LoginRequest {
            identifier: "ecouser".into(),
            password: "hunter22".into(),
        },
    )
    .await?;
    match resp.data.unwrap() {
        LoginOutcome::TwoFactorPending {
            two_factor_required,
            user_id: pending_id,
        } => {
            assert!(two_factor_required);
            assert_eq!(pending_id, user_id);
        }
        LoginOutcome::Authenticated(_) => panic!("2FA login must not return a token"),
    }

    let (otp,): (Option<String>,) = sqlx::query_as("SELECT otp_code FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&state.pool)
        .await?;
    let otp = otp.expect("OTP persisted for pending login");

    let err = auth_service::verify_otp(
        &state,
        VerifyOtpRequest {
            user_id,
            code: "000000".into(),
        },
    )
    .await
    .err();
    // The seeded code is random; in the unlikely event it is 000000 the
    // verification legitimately succeeds, so only assert when it differs.
    if otp != "000000" {
        assert!(matches!(err, Some(AppError::Domain(_))));
    }

    let resp = auth_service::verify_otp(&state, VerifyOtpRequest { user_id, code: otp }).await?;
    assert!(!resp.data.unwrap().token.is_empty());

    // Forgot-password is response-identical for known and unknown emails.
    let known = auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            email: "ecouser@example.com".into(),
        },
    )
    .await?;
    let unknown = auth_service::forgot_password(
        &state,
        ForgotPasswordRequest {
            email: "ghost@example.com".into(),
        },
    )
    .await?;
    assert_eq!(known.message, unknown.message);

    // Reset with the stored token, then the old password stops working.
    let (reset_token,): (Option<String>,) =
        sqlx::query_as("SELECT password_reset_token FROM users WHERE id = $1")
            .bind(user_id)
            .fetch_one(&state.pool)
            .await?;
    let reset_token = reset_token.expect("reset token persisted");

    let err = auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            token: "not-a-real-token".into(),
            password: "brand-new-pass".into(),
        },
    )
    .await
    .expect_err("bogus token");
    assert!(matches!(err, AppError::Domain(_)));

    auth_service::reset_password(
        &state,
        ResetPasswordRequest {
            token: reset_token,
            password: "brand-new-pass".into(),
        },
    )
    .await?;

    let err = auth_service::login_user(
        &state,
        LoginRequest {
            identifier: "ecouser".into(),
            password: "hunter22".into(),
        },
    )
    .await
    .expect_err("old password after reset");
    assert!(matches!(err, AppError::Unauthorized));

    // Disable 2FA again and the new password logs straight in.
    auth_service::set_two_factor(&state, &auth_user, SetTwoFactorRequest { enabled: false })
        .await?;
    let resp = auth_service::login_user(
        &state,
        LoginRequest {
            identifier: "ecouser".into(),
            password: "brand-new-pass".into(),
        },
    )
    .await?;
    assert!(matches!(
        resp.data.unwrap(),
        LoginOutcome::Authenticated(_)
    ));

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
