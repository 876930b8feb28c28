//! Bearer-token authentication with bcrypt password hashing.
//!
//! HS256 JWTs carry `{ sub, role, iat, exp }`; `sub` is the account id,
//! and for managers it doubles as the tenant key every query is scoped
//! to. The `Manager` and `Owner` extractors do verification plus role
//! checking, so handlers never touch raw headers.

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::models::{ROLE_MANAGER, ROLE_OWNER};
use crate::state::SharedState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Account id (hex). For managers this is the tenant key.
    pub sub: String,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_token(
    account_id: &str,
    role: &str,
    secret: &str,
    ttl_hours: i64,
) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
        sub: account_id.to_string(),
        role: role.to_string(),
        iat: now.timestamp(),
        exp: (now + Duration::hours(ttl_hours)).timestamp(),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|err| ApiError::internal(format!("token encode: {err}")))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map(|data| data.claims)
    .map_err(|err| match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => ApiError::auth("token expired"),
        _ => ApiError::auth("invalid token"),
    })
}

pub fn hash_password(password: &str, cost: u32) -> Result<String, ApiError> {
    bcrypt::hash(password, cost).map_err(ApiError::from)
}

pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

fn bearer_claims(parts: &Parts, state: &SharedState) -> Result<Claims, ApiError> {
    let header = parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::auth("missing bearer token"))?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(|| ApiError::auth("missing bearer token"))?;
    verify_token(token.trim(), &state.config.jwt_secret)
}

/// Authenticated manager. `store_id` is the tenant key for every query
/// the handler makes.
#[derive(Debug, Clone)]
pub struct Manager {
    pub store_id: ObjectId,
    pub claims: Claims,
}

impl FromRequestParts<SharedState> for Manager {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)?;
        if claims.role != ROLE_MANAGER {
            return Err(ApiError::forbidden("manager role required"));
        }
        let store_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| ApiError::auth("invalid token subject"))?;
        Ok(Manager { store_id, claims })
    }
}

/// Authenticated owner; may enumerate all tenants in the owner views.
#[derive(Debug, Clone)]
pub struct Owner {
    pub account_id: ObjectId,
    pub claims: Claims,
}

impl FromRequestParts<SharedState> for Owner {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let claims = bearer_claims(parts, state)?;
        if claims.role != ROLE_OWNER {
            return Err(ApiError::forbidden("owner role required"));
        }
        let account_id = ObjectId::parse_str(&claims.sub)
            .map_err(|_| ApiError::auth("invalid token subject"))?;
        Ok(Owner { account_id, claims })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn token_round_trips_subject_and_role() {
        let id = ObjectId::new().to_hex();
        let token = issue_token(&id, ROLE_MANAGER, SECRET, 1).expect("should issue");
        let claims = verify_token(&token, SECRET).expect("should verify");
        assert_eq!(claims.sub, id);
        assert_eq!(claims.role, ROLE_MANAGER);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn expired_token_is_rejected_as_expired() {
        let token = issue_token("abc", ROLE_MANAGER, SECRET, -1).expect("should issue");
        let err = verify_token(&token, SECRET).expect_err("should reject");
        assert!(matches!(err, ApiError::Auth(msg) if msg.contains("expired")));
    }

    #[test]
    fn wrong_secret_is_rejected_as_invalid() {
        let token = issue_token("abc", ROLE_MANAGER, SECRET, 1).expect("should issue");
        let err = verify_token(&token, "other-secret").expect_err("should reject");
        assert!(matches!(err, ApiError::Auth(msg) if msg.contains("invalid")));
    }

    #[test]
    fn password_hash_verifies_and_rejects() {
        // Minimum cost keeps the test fast; production cost comes from config.
        let hash = hash_password("hunter2hunter2", 4).expect("should hash");
        assert!(verify_password("hunter2hunter2", &hash));
        assert!(!verify_password("wrong-password", &hash));
        assert!(!verify_password("hunter2hunter2", "not-a-hash"));
    }
}
