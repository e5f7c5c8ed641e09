use axum::routing::{get, post};
use axum::Router;

use crate::chat::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/chat/message", post(handlers::send_message))
        .route("/chat/conversations", get(handlers::list_conversations))
        .route(
            "/chat/history/{id}",
            get(handlers::get_history).delete(handlers::delete_history),
        )
}
