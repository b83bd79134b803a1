use crate::events::slot_events;
use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{get, post, put},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::index))
        .route("/api/dashboard", get(handlers::dashboard))
        .route(
            "/api/children",
            get(handlers::list_children)
                .post(handlers::create_child)
                .put(handlers::replace_children),
        )
        .route("/api/children/:id", put(handlers::update_child))
        .route("/api/children/:id/delete", post(handlers::delete_child))
        .route("/api/clear", post(handlers::clear_all))
        .route("/api/events", get(slot_events))
        .with_state(state)
}
