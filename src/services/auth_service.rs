use argon2::{
    Argon2, PasswordHasher,
    password_hash::{PasswordHash, PasswordVerifier, SaltString},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use password_hash::rand_core::OsRng;
use rand::{Rng, distributions::Alphanumeric, thread_rng};
use uuid::Uuid;

use crate::{
    audit::log_audit,
    dto::auth::{
        AuthResponse, Claims, ForgotPasswordRequest, LoginOutcome, LoginRequest, PublicUser,
        RegisterRequest, ResetPasswordRequest, SetTwoFactorRequest, VerifyOtpRequest,
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    response::{ApiResponse, Meta},
    state::AppState,
};

const OTP_TTL_MINUTES: i64 = 10;
const RESET_TOKEN_TTL_HOURS: i64 = 1;

// Identical for known and unknown addresses so responses cannot be used to
// probe which emails are registered.
const FORGOT_PASSWORD_MESSAGE: &str =
    "If a user with that email exists, a password reset link has been sent.";

pub async fn register_user(
    state: &AppState,
    payload: RegisterRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    if payload.username.trim().len() < 3 {
        return Err(AppError::Validation(
            "username must be at least 3 characters".into(),
        ));
    }
    if !payload.email.contains('@') {
        return Err(AppError::Validation("email is not valid".into()));
    }
    if payload.password.len() < 6 {
        return Err(AppError::Validation(
            "password must be at least 6 characters".into(),
        ));
    }

    let exist: Option<(Uuid,)> =
        sqlx::query_as("SELECT id FROM users WHERE email = $1 OR username = $2")
            .bind(payload.email.as_str())
            .bind(payload.username.as_str())
            .fetch_optional(&state.pool)
            .await?;

    if exist.is_some() {
        return Err(AppError::Conflict(
            "User with this email or username already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password)?;

    let user: User = sqlx::query_as(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING *",
    )
    .bind(payload.username.as_str())
    .bind(payload.email.as_str())
    .bind(password_hash)
    .fetch_one(&state.pool)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "user_register",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let token = issue_token(user.id)?;
    let resp = AuthResponse {
        token,
        user: user.into(),
    };
    Ok(ApiResponse::success("User created", resp, None))
}

pub async fn login_user(
    state: &AppState,
    payload: LoginRequest,
) -> AppResult<ApiResponse<LoginOutcome>> {
    let user: Option<User> =
        sqlx::query_as("SELECT * FROM users WHERE username = $1 OR email = $1")
            .bind(payload.identifier.as_str())
            .fetch_optional(&state.pool)
            .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    if user.two_factor_enabled {
        let code = generate_otp();
        let expires_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);
        sqlx::query("UPDATE users SET otp_code = $2, otp_expires_at = $3 WHERE id = $1")
            .bind(user.id)
            .bind(code.as_str())
            .bind(expires_at)
            .execute(&state.pool)
            .await?;

        state.mailer.send_otp(&user.email, &code).await?;

        return Ok(ApiResponse::success(
            "OTP sent",
            LoginOutcome::pending(user.id),
            Some(Meta::empty()),
        ));
    }

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let token = issue_token(user.id)?;
    let resp = LoginOutcome::Authenticated(AuthResponse {
        token,
        user: user.into(),
    });
    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

pub async fn verify_otp(
    state: &AppState,
    payload: VerifyOtpRequest,
) -> AppResult<ApiResponse<AuthResponse>> {
    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(payload.user_id)
        .fetch_optional(&state.pool)
        .await?;

    let user = match user {
        Some(u) => u,
        None => return Err(AppError::Domain("Invalid or expired OTP".into())),
    };

    let code_valid = match (user.otp_code.as_deref(), user.otp_expires_at) {
        (Some(stored), Some(expires_at)) => {
            stored == payload.code && expires_at > Utc::now()
        }
        _ => false,
    };
    if !code_valid {
        return Err(AppError::Domain("Invalid or expired OTP".into()));
    }

    let user: User = sqlx::query_as(
        "UPDATE users SET otp_code = NULL, otp_expires_at = NULL WHERE id = $1 RETURNING *",
    )
    .bind(user.id)
    .fetch_one(&state.pool)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "user_login",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id, "otp": true })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    let token = issue_token(user.id)?;
    let resp = AuthResponse {
        token,
        user: user.into(),
    };
    Ok(ApiResponse::success("Logged in", resp, Some(Meta::empty())))
}

pub async fn forgot_password(
    state: &AppState,
    payload: ForgotPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if !payload.email.contains('@') {
        return Err(AppError::Validation("email is not valid".into()));
    }

    let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
        .bind(payload.email.as_str())
        .fetch_optional(&state.pool)
        .await?;

    if let Some(user) = user {
        let token: String = thread_rng()
            .sample_iter(&Alphanumeric)
            .take(48)
            .map(char::from)
            .collect();
        let expires_at = Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS);

        sqlx::query(
            "UPDATE users SET password_reset_token = $2, password_reset_expires_at = $3 WHERE id = $1",
        )
        .bind(user.id)
        .bind(token.as_str())
        .bind(expires_at)
        .execute(&state.pool)
        .await?;

        // A failed dispatch must not change the response, so it is only logged.
        if let Err(err) = state.mailer.send_password_reset(&user.email, &token).await {
            tracing::warn!(error = %err, "password reset mail dispatch failed");
        }
    }

    Ok(ApiResponse::success(
        FORGOT_PASSWORD_MESSAGE,
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

pub async fn reset_password(
    state: &AppState,
    payload: ResetPasswordRequest,
) -> AppResult<ApiResponse<serde_json::Value>> {
    if payload.password.len() < 6 {
        return Err(AppError::Validation(
            "password must be at least 6 characters".into(),
        ));
    }

    let user: Option<User> =
        sqlx::query_as("SELECT * FROM users WHERE password_reset_token = $1")
            .bind(payload.token.as_str())
            .fetch_optional(&state.pool)
            .await?;

    let expired = |expires_at: Option<DateTime<Utc>>| {
        expires_at.map(|t| t <= Utc::now()).unwrap_or(true)
    };
    let user = match user {
        Some(u) if !expired(u.password_reset_expires_at) => u,
        _ => return Err(AppError::Domain("Invalid or expired reset token".into())),
    };

    let password_hash = hash_password(&payload.password)?;
    sqlx::query(
        r#"
        UPDATE users
        SET password_hash = $2, password_reset_token = NULL, password_reset_expires_at = NULL
        WHERE id = $1
        "#,
    )
    .bind(user.id)
    .bind(password_hash)
    .execute(&state.pool)
    .await?;

    if let Err(err) = log_audit(
        &state.pool,
        Some(user.id),
        "password_reset",
        Some("users"),
        Some(serde_json::json!({ "user_id": user.id })),
    )
    .await
    {
        tracing::warn!(error = %err, "audit log failed");
    }

    Ok(ApiResponse::success(
        "Password has been reset successfully.",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Toggles two-factor on the caller's own account only.
pub async fn set_two_factor(
    state: &AppState,
    user: &AuthUser,
    payload: SetTwoFactorRequest,
) -> AppResult<ApiResponse<PublicUser>> {
    let updated: Option<User> = sqlx::query_as(
        "UPDATE users SET two_factor_enabled = $2 WHERE id = $1 RETURNING *",
    )
    .bind(user.user_id)
    .bind(payload.enabled)
    .fetch_optional(&state.pool)
    .await?;

    let updated = match updated {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success(
        "Two-factor updated",
        updated.into(),
        Some(Meta::empty()),
    ))
}

pub async fn me(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<PublicUser>> {
    let found: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
        .bind(user.user_id)
        .fetch_optional(&state.pool)
        .await?;

    let found = match found {
        Some(u) => u,
        None => return Err(AppError::NotFound),
    };

    Ok(ApiResponse::success("OK", found.into(), None))
}

fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?
        .to_string();
    Ok(hash)
}

fn verify_password(password: &str, stored_hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(stored_hash)
        .map_err(|_| AppError::Internal(anyhow::anyhow!("Invalid password hash")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

fn generate_otp() -> String {
    let code: u32 = thread_rng().gen_range(0..1_000_000);
    format!("{code:06}")
}

pub fn issue_token(user_id: Uuid) -> AppResult<String> {
    let secret = std::env::var("JWT_SECRET")
        .map_err(|_| AppError::Internal(anyhow::anyhow!("JWT_SECRET is not set")))?;

    let expiration = Utc::now()
        .checked_add_signed(Duration::hours(24))
        .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Failed to set expiration")))?;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expiration.timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(anyhow::anyhow!(e.to_string())))?;

    Ok(token)
}
