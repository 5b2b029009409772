// api.rs - API服務模組，宣告子模組
//
// API服務模組提供外部接口，是任務編排器之上的薄層：
// - 任務提交與輪詢端點
// - 歷史清單與價格查詢端點
// - 健康檢查

/// 錯誤映射
pub mod error;
/// API處理器模組
pub mod handlers;
/// REST API實現
pub mod rest;
/// API路由定義
pub mod routes;

use std::sync::Arc;

use crate::jobs::JobOrchestrator;
use crate::market_data::MarketDataProvider;

pub use error::ApiError;
pub use rest::RestApi;

/// 各處理器共享的應用狀態
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<JobOrchestrator>,
    pub market_data: Arc<dyn MarketDataProvider>,
}

impl AppState {
    pub fn new(orchestrator: Arc<JobOrchestrator>, market_data: Arc<dyn MarketDataProvider>) -> Self {
        Self {
            orchestrator,
            market_data,
        }
    }
}
