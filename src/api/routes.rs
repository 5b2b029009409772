use axum::Router;

use crate::api::AppState;

pub mod data;
pub mod jobs;
pub mod system;

pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(jobs::routes())
        .merge(data::routes())
        .merge(system::routes())
}
