mod dto;
pub mod handlers;

use axum::routing::{get, post};
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/usda/search", post(handlers::usda_search))
        .route("/usda/food/:id", get(handlers::usda_food))
        .route("/chat", post(handlers::chat))
}
