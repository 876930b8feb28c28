//! Account registration, login and password reset.
//!
//! The only unauthenticated routes. All of them pass through the
//! fixed-window rate limiter keyed by client address before touching
//! the database.

use axum::{
    extract::{ConnectInfo, State},
    routing::post,
    Json, Router,
};
use chrono::{Duration, Utc};
use mongodb::bson::{doc, DateTime};
use serde::Deserialize;
use serde_json::{json, Value};
use std::net::SocketAddr;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{hash_password, issue_token, verify_password};
use crate::error::ApiError;
use crate::mail;
use crate::models::{Account, ResetToken, ROLE_MANAGER};
use crate::routes::{non_empty, ok};
use crate::state::SharedState;

const RESET_TOKEN_TTL_HOURS: i64 = 1;
const MIN_PASSWORD_LEN: usize = 8;

pub fn routes() -> Router<SharedState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterPayload {
    name: String,
    email: String,
    password: String,
    store_name: String,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct ForgotPasswordPayload {
    email: String,
}

#[derive(Debug, Deserialize)]
struct ResetPasswordPayload {
    token: String,
    password: String,
}

fn validate_email(email: &str) -> Result<String, ApiError> {
    let trimmed = email.trim().to_ascii_lowercase();
    let parts: Vec<&str> = trimmed.split('@').collect();
    if parts.len() != 2 || parts[0].is_empty() || !parts[1].contains('.') {
        return Err(ApiError::validation("invalid email address"));
    }
    Ok(trimmed)
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn account_json(account: &Account) -> Value {
    json!({
        "id": account.id.map(|id| id.to_hex()),
        "name": account.name,
        "email": account.email,
        "role": account.role,
        "storeName": account.store_name,
    })
}

async fn register(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<RegisterPayload>,
) -> Result<Json<Value>, ApiError> {
    state.auth_limiter.check(&addr.ip().to_string(), "register")?;

    let name = non_empty(&payload.name, "name")?;
    let store_name = non_empty(&payload.store_name, "storeName")?;
    let email = validate_email(&payload.email)?;
    validate_password(&payload.password)?;

    if state
        .db
        .accounts()
        .find_one(doc! { "email": &email })
        .await?
        .is_some()
    {
        return Err(ApiError::conflict("email already registered"));
    }

    let mut account = Account {
        id: None,
        name,
        email,
        password_hash: hash_password(&payload.password, state.config.bcrypt_cost)?,
        role: ROLE_MANAGER.to_string(),
        store_name,
        created_at: DateTime::now(),
    };

    let inserted = state.db.accounts().insert_one(&account).await?;
    let account_id = inserted
        .inserted_id
        .as_object_id()
        .ok_or_else(|| ApiError::internal("insert returned no object id"))?;
    account.id = Some(account_id);

    let token = issue_token(
        &account_id.to_hex(),
        ROLE_MANAGER,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;

    info!(account = %account_id, "Registered manager account");
    Ok(ok(json!({ "token": token, "account": account_json(&account) })))
}

async fn login(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<Value>, ApiError> {
    state.auth_limiter.check(&addr.ip().to_string(), "login")?;

    let email = validate_email(&payload.email)?;
    let account = state
        .db
        .accounts()
        .find_one(doc! { "email": &email })
        .await?
        .ok_or_else(|| ApiError::auth("invalid credentials"))?;

    if !verify_password(&payload.password, &account.password_hash) {
        warn!(email = %email, "Failed login attempt");
        return Err(ApiError::auth("invalid credentials"));
    }

    let account_id = account
        .id
        .ok_or_else(|| ApiError::internal("account missing id"))?;
    let token = issue_token(
        &account_id.to_hex(),
        &account.role,
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
    )?;

    info!(account = %account_id, "Logged in");
    Ok(ok(json!({ "token": token, "account": account_json(&account) })))
}

async fn forgot_password(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<ForgotPasswordPayload>,
) -> Result<Json<Value>, ApiError> {
    state
        .auth_limiter
        .check(&addr.ip().to_string(), "forgot-password")?;

    let email = validate_email(&payload.email)?;
    let mailer = state
        .mailer
        .as_ref()
        .ok_or_else(|| ApiError::internal("mail delivery not configured"))?;

    // The response is identical whether or not the account exists.
    if let Some(account) = state
        .db
        .accounts()
        .find_one(doc! { "email": &email })
        .await?
    {
        let account_id = account
            .id
            .ok_or_else(|| ApiError::internal("account missing id"))?;
        let token = Uuid::new_v4().to_string();
        let reset = ResetToken {
            id: None,
            account_id,
            token: token.clone(),
            expires_at: DateTime::from_chrono(Utc::now() + Duration::hours(RESET_TOKEN_TTL_HOURS)),
            created_at: DateTime::now(),
        };
        state.db.reset_tokens().insert_one(&reset).await?;
        mailer
            .send_text(
                &account.email,
                mail::password_reset_subject(),
                mail::password_reset_body(&account.name, &token),
            )
            .await?;
        info!(account = %account_id, "Issued password reset token");
    }

    Ok(ok(json!({ "message": "if the account exists, a reset code was sent" })))
}

async fn reset_password(
    State(state): State<SharedState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(payload): Json<ResetPasswordPayload>,
) -> Result<Json<Value>, ApiError> {
    state
        .auth_limiter
        .check(&addr.ip().to_string(), "reset-password")?;

    let token = non_empty(&payload.token, "token")?;
    validate_password(&payload.password)?;

    let reset = state
        .db
        .reset_tokens()
        .find_one(doc! { "token": &token })
        .await?
        .ok_or_else(|| ApiError::auth("invalid or expired reset token"))?;

    if reset.expires_at.to_chrono() <= Utc::now() {
        state
            .db
            .reset_tokens()
            .delete_one(doc! { "token": &token })
            .await?;
        return Err(ApiError::auth("invalid or expired reset token"));
    }

    let password_hash = hash_password(&payload.password, state.config.bcrypt_cost)?;
    let updated = state
        .db
        .accounts()
        .update_one(
            doc! { "_id": reset.account_id },
            doc! { "$set": { "password_hash": password_hash } },
        )
        .await?;
    if updated.matched_count == 0 {
        return Err(ApiError::not_found("account no longer exists"));
    }

    state
        .db
        .reset_tokens()
        .delete_one(doc! { "token": &token })
        .await?;

    info!(account = %reset.account_id, "Password reset");
    Ok(ok(json!({ "message": "password updated" })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_normalizes_case() {
        assert_eq!(
            validate_email(" Maria@Example.COM ").unwrap(),
            "maria@example.com"
        );
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("two@@example.com").is_err());
        assert!(validate_email("user@nodot").is_err());
    }

    #[test]
    fn password_length_is_enforced() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
