use axum::routing::{get, put};
use axum::Router;

use crate::state::AppState;
use crate::users::handlers;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/users/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        .route("/users/password", put(handlers::change_password))
}
