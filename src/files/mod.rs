pub mod handlers;
pub mod repo;
pub mod repo_types;
mod services;

use crate::state::AppState;
use axum::Router;

pub fn router(max_bytes: usize) -> Router<AppState> {
    handlers::routes(max_bytes)
}
