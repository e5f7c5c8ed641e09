use axum::routing::get;
use axum::Router;

use crate::diary::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/diary", get(handlers::list).post(handlers::create))
        .route("/diary/stats", get(handlers::stats))
        .route(
            "/diary/{id}",
            get(handlers::get)
                .put(handlers::update)
                .delete(handlers::delete),
        )
}
