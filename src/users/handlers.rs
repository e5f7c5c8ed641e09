use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Deserializer};

use crate::auth::password;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::extractors::CurrentUser;
use crate::state::AppState;
use crate::users::repository;

#[derive(Deserialize, Default)]
pub struct UpdateProfileRequest {
    #[serde(default, deserialize_with = "present")]
    pub name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub image: Option<Option<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`).
fn present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Blank strings clear a field the same way `null` does.
fn blank_to_none(field: Option<Option<String>>) -> Option<Option<String>> {
    field.map(|v| {
        v.map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    })
}

/// GET /users/profile
pub async fn get_profile(
    State(state): State<AppState>,
    user: CurrentUser,
) -> AppResult<Json<User>> {
    let user = repository::find_by_id(&state.db, &user.id)?.ok_or(AppError::NotFound)?;
    Ok(Json(user))
}

/// PUT /users/profile
pub async fn update_profile(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<User>> {
    let updated = repository::update_profile(
        &state.db,
        &user.id,
        blank_to_none(req.name),
        blank_to_none(req.image),
    )?;
    Ok(Json(updated))
}

/// PUT /users/password
pub async fn change_password(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(req): Json<ChangePasswordRequest>,
) -> AppResult<StatusCode> {
    let stored = repository::find_by_id(&state.db, &user.id)?.ok_or(AppError::NotFound)?;

    if !password::verify_password(&req.current_password, &stored.password_hash) {
        return Err(AppError::Unauthorized("Current password is incorrect".into()));
    }
    password::check_password_rules(&req.new_password, state.config.auth.min_password_len)?;

    let hash = password::hash_password(&req.new_password, state.config.auth.bcrypt_cost)?;
    repository::update_password_hash(&state.db, &user.id, &hash)?;
    tracing::info!("Password changed for user {}", user.id);

    Ok(StatusCode::NO_CONTENT)
}
