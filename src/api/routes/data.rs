use axum::{routing::get, Router};

use crate::api::handlers::data;
use crate::api::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/data/price/:ticker", get(data::price_history))
}
