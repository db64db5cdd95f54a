use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::WithRejection;
use tracing::info;

use sahyog_db::Database;
use sahyog_gateway::dispatcher::Dispatcher;
use sahyog_types::api::{AuthResponse, LoginRequest, SignupRequest};
use sahyog_types::models::{Role, User};
use sahyog_types::token::Claims;

use crate::error::{ApiError, ApiResult};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    pub dispatcher: Dispatcher,
}

impl AppStateInner {
    pub fn new(db: Database, jwt_secret: String, token_ttl: chrono::Duration) -> AppState {
        Arc::new(Self {
            db,
            jwt_secret,
            token_ttl,
            dispatcher: Dispatcher::new(),
        })
    }

    fn issue_token(&self, user: &User) -> ApiResult<String> {
        Claims::for_user(user, self.token_ttl)
            .encode(&self.jwt_secret)
            .map_err(|e| ApiError::Internal(e.into()))
    }
}

pub async fn signup(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<SignupRequest>, ApiError>,
) -> ApiResult<impl IntoResponse> {
    req.validate().map_err(|e| ApiError::invalid("Invalid user data", e))?;

    let email = normalize_email(&req.email);
    if state.db.get_user_by_email(&email)?.is_some() {
        return Err(ApiError::BadRequest("User already exists"));
    }

    let password_hash = hash_password(req.password).await?;

    // A concurrent signup can still win the insert; the UNIQUE index decides.
    let user = state
        .db
        .create_user(req.name.trim(), &email, &password_hash, req.role)?
        .ok_or(ApiError::BadRequest("User already exists"))?;

    let token = state.issue_token(&user)?;
    info!("user {} signed up as {}", user.id, user.role);

    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

pub async fn login(
    State(state): State<AppState>,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<Json<AuthResponse>> {
    // Same error for an unknown email and a wrong password.
    let row = state
        .db
        .get_user_by_email(&normalize_email(&req.email))?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(req.password, row.password.clone()).await? {
        return Err(ApiError::InvalidCredentials);
    }

    let user = row.into_user();
    let token = state.issue_token(&user)?;

    Ok(Json(AuthResponse { user, token }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> ApiResult<Json<User>> {
    let user = state
        .db
        .get_user(claims.sub)?
        .ok_or(ApiError::NotFound("User not found"))?;
    Ok(Json(user))
}

/// Creates the operator's admin account on startup, or confirms it exists.
pub async fn ensure_admin(state: &AppState, name: &str, email: &str, password: &str) -> anyhow::Result<User> {
    let email = normalize_email(email);
    if let Some(row) = state.db.get_user_by_email(&email)? {
        anyhow::ensure!(row.role == Role::Admin, "{} exists but is not an admin", email);
        return Ok(row.into_user());
    }

    let password_hash = hash_password(password.to_string()).await?;
    let user = state
        .db
        .create_user(name, &email, &password_hash, Role::Admin)?
        .ok_or_else(|| anyhow::anyhow!("{} was registered concurrently", email))?;

    info!("admin account {} created", email);
    Ok(user)
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Argon2id, off the async runtime.
async fn hash_password(password: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow::anyhow!("password hashing failed: {}", e))?;
        Ok(hash.to_string())
    })
    .await?
}

async fn verify_password(password: String, stored_hash: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || -> anyhow::Result<bool> {
        let parsed = PasswordHash::new(&stored_hash)
            .map_err(|e| anyhow::anyhow!("stored password hash unreadable: {}", e))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    })
    .await?
}
