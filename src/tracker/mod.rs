pub mod analytics;
pub mod dto;
pub mod handlers;
pub mod merge;
pub mod metrics;
pub mod model;
pub mod repo;
pub mod services;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::day_routes())
        .merge(handlers::history_routes())
}
