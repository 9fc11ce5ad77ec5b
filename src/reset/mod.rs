use crate::state::AppState;
use axum::Router;

mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod password;
pub mod services;
mod token;

pub fn router() -> Router<AppState> {
    handlers::reset_routes()
}
