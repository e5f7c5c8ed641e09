use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{jwt, password};
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::users::repository;

// -- Request/Response types --

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: String,
    pub user: User,
}

fn issue_token(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let access_token = jwt::create_access_token(
        &state.jwt_secret,
        &user.id,
        &user.email,
        state.config.auth.token_hours,
    )
    .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok(AuthResponse { access_token, user })
}

// -- Handlers --

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Response> {
    let email = password::normalize_email(&req.email)?;
    password::check_password_rules(&req.password, state.config.auth.min_password_len)?;

    if repository::find_by_email(&state.db, &email)?.is_some() {
        return Err(AppError::Conflict("Email already registered".into()));
    }

    let hash = password::hash_password(&req.password, state.config.auth.bcrypt_cost)?;
    let name = req
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let user = repository::insert(&state.db, &email, &hash, name)?;
    tracing::info!("Registered user {}", user.id);

    let body = issue_token(&state, user)?;
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    // Malformed emails can't match a stored account; same answer as a wrong password
    let email = password::normalize_email(&req.email).map_err(|_| invalid())?;
    let Some(user) = repository::find_by_email(&state.db, &email)? else {
        password::verify_without_account(&req.password, state.config.auth.bcrypt_cost);
        return Err(invalid());
    };

    if !password::verify_password(&req.password, &user.password_hash) {
        tracing::warn!("Failed login for user {}", user.id);
        return Err(invalid());
    }

    Ok(Json(issue_token(&state, user)?))
}

/// GET /auth/me
pub async fn me(State(state): State<AppState>, user: CurrentUser) -> AppResult<Json<User>> {
    let user = repository::find_by_id(&state.db, &user.id)?.ok_or(AppError::NotFound)?;
    Ok(Json(user))
}
