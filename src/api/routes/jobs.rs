use axum::{
    routing::{get, post},
    Router,
};

use crate::api::handlers::jobs;
use crate::api::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/jobs/backtest", post(jobs::create_backtest))
        .route("/jobs/status/:job_id", get(jobs::job_status))
        .route("/jobs/results/:job_id", get(jobs::job_results))
        .route("/jobs/history", get(jobs::job_history))
}
