use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::jobs::{LookupError, SubmitError};
use crate::market_data::MarketDataError;

/// API 錯誤
///
/// 業務層錯誤與傳輸層錯誤映射到不同的狀態碼：驗證拒絕 422、
/// 未知任務 404、數據查詢失敗 400、基礎設施故障 503。
/// 回應主體固定為 `{"detail": <原因>}`。
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    UnprocessableEntity(String),
    ServiceUnavailable(String),
}

impl ApiError {
    fn parts(self) -> (StatusCode, String) {
        match self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, detail),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, detail),
            ApiError::UnprocessableEntity(detail) => (StatusCode::UNPROCESSABLE_ENTITY, detail),
            ApiError::ServiceUnavailable(detail) => (StatusCode::SERVICE_UNAVAILABLE, detail),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = self.parts();
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

impl From<SubmitError> for ApiError {
    fn from(err: SubmitError) -> Self {
        match err {
            SubmitError::Rejected(rejection) => {
                ApiError::UnprocessableEntity(rejection.to_string())
            }
            SubmitError::Store(e) => ApiError::ServiceUnavailable(e.to_string()),
            SubmitError::Queue(e) => ApiError::ServiceUnavailable(e.to_string()),
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::NotFound(job_id) => ApiError::NotFound(format!("job {job_id} not found")),
            LookupError::Store(e) => ApiError::ServiceUnavailable(e.to_string()),
        }
    }
}

impl From<MarketDataError> for ApiError {
    fn from(err: MarketDataError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}
