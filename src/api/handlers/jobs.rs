use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::jobs::{HistoryEntry, JobResultSnapshot, JobStatusSnapshot};
use crate::portfolio::PortfolioRequest;

/// 回測任務提交請求
#[derive(Debug, Deserialize)]
pub struct BacktestRequest {
    pub portfolio: PortfolioRequest,
}

/// 任務提交回應
#[derive(Debug, Serialize)]
pub struct JobSubmitted {
    pub job_id: Uuid,
}

/// POST /jobs/backtest - 提交回測任務
///
/// 驗證通過回傳 202 與任務 ID；驗證失敗回傳 422 與拒絕原因，
/// 不建立任何任務。
pub async fn create_backtest(
    State(state): State<AppState>,
    Json(request): Json<BacktestRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let job_id = state.orchestrator.submit(&request.portfolio).await?;

    Ok((StatusCode::ACCEPTED, Json(JobSubmitted { job_id })))
}

/// GET /jobs/status/{job_id} - 查詢任務狀態
pub async fn job_status(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobStatusSnapshot>, ApiError> {
    let snapshot = state.orchestrator.get_status(job_id).await?;
    Ok(Json(snapshot))
}

/// GET /jobs/results/{job_id} - 查詢任務結果
pub async fn job_results(
    State(state): State<AppState>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<JobResultSnapshot>, ApiError> {
    let snapshot = state.orchestrator.get_result(job_id).await?;
    Ok(Json(snapshot))
}

/// GET /jobs/history - 已完成回測的歷史清單
pub async fn job_history(
    State(state): State<AppState>,
) -> Result<Json<Vec<HistoryEntry>>, ApiError> {
    let history = state.orchestrator.list_history().await?;
    Ok(Json(history))
}
