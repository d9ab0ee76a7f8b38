use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use renthub_db::Database;
use renthub_db::admin::AdminTargets;
use renthub_types::api::{Claims, LoginRequest, LoginResponse, RegisterRequest, RegisterResponse};

use crate::cache::ListingCache;
use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub admin: AdminTargets,
    pub cache: ListingCache,
}

/// The identity provider proper lives outside this system; registration
/// and login exist so every action has a stable authenticated user id.
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    if req.username.chars().count() < 3 || req.username.chars().count() > 32 {
        return Err(ApiError::validation(
            "username",
            "username must be 3 to 32 characters",
        ));
    }
    if req.password.chars().count() < 8 {
        return Err(ApiError::validation(
            "password",
            "password must be at least 8 characters",
        ));
    }

    let taken = {
        let db = state.clone();
        let username = req.username.clone();
        tokio::task::spawn_blocking(move || db.db.get_user_by_username(&username))
            .await
            .map_err(|e| ApiError::Internal(e.into()))??
            .is_some()
    };
    if taken {
        return Err(ApiError::Conflict);
    }

    // Argon2id with a fresh salt
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("password hash failed: {}", e)))?
        .to_string();

    let user_id = Uuid::new_v4();

    {
        let db = state.clone();
        let id = user_id.to_string();
        let username = req.username.clone();
        tokio::task::spawn_blocking(move || db.db.create_user(&id, &username, &password_hash))
            .await
            .map_err(|e| ApiError::Internal(e.into()))??;
    }

    let token = create_token(&state.jwt_secret, user_id, &req.username)?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user_id, token })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let user = {
        let db = state.clone();
        let username = req.username.clone();
        tokio::task::spawn_blocking(move || db.db.get_user_by_username(&username))
            .await
            .map_err(|e| ApiError::Internal(e.into()))??
            .ok_or(ApiError::Unauthorized)?
    };

    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("stored hash unreadable: {}", e)))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let user_id: Uuid = user
        .id
        .parse()
        .map_err(|e| ApiError::Internal(anyhow::anyhow!("corrupt user id '{}': {}", user.id, e)))?;

    let token = create_token(&state.jwt_secret, user_id, &user.username)?;

    Ok(Json(LoginResponse {
        user_id,
        username: user.username,
        token,
    }))
}

pub fn create_token(secret: &str, user_id: Uuid, username: &str) -> Result<String, ApiError> {
    let claims = Claims {
        sub: user_id,
        username: username.to_string(),
        exp: (chrono::Utc::now() + chrono::Duration::days(30)).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| ApiError::Internal(anyhow::Error::new(e)))?;

    Ok(token)
}
