#![allow(dead_code)] // 每個測試二進位只用到部分輔助函數

use chrono::{Duration, NaiveDate};
use std::sync::Arc;
use tokio::task::JoinHandle;

use fininsight_server::backtest::BacktestEngine;
use fininsight_server::jobs::queue::InMemoryJobQueue;
use fininsight_server::jobs::store::InMemoryJobStore;
use fininsight_server::jobs::{
    spawn_workers, BacktestWorker, JobOrchestrator, JobQueue, JobStore,
};
use fininsight_server::market_data::{ClosePrice, InMemoryDataProvider, MarketDataProvider};
use fininsight_server::portfolio::{AssetWeightRequest, PortfolioRequest, PortfolioValidator};

pub fn date(s: &str) -> NaiveDate {
    s.parse().expect("invalid test date")
}

/// 從起始日開始逐日展開收盤價
pub fn daily_closes(start: &str, closes: &[f64]) -> Vec<ClosePrice> {
    let first = date(start);
    closes
        .iter()
        .enumerate()
        .map(|(i, close)| ClosePrice {
            date: first + Duration::days(i as i64),
            close: *close,
        })
        .collect()
}

/// AAPL/MSFT 各四個交易日的固定數據
pub fn two_asset_provider() -> InMemoryDataProvider {
    InMemoryDataProvider::new()
        .with_series("AAPL", daily_closes("2024-01-01", &[100.0, 102.0, 104.0, 106.0]))
        .with_series("MSFT", daily_closes("2024-01-01", &[200.0, 198.0, 202.0, 206.0]))
}

pub fn portfolio_request(name: &str, assets: Vec<(&str, f64)>) -> PortfolioRequest {
    PortfolioRequest {
        name: name.to_string(),
        initial_value: 10000.0,
        start_date: "2024-01-01".to_string(),
        end_date: "2024-01-31".to_string(),
        assets: assets
            .into_iter()
            .map(|(ticker, weight)| AssetWeightRequest {
                ticker: ticker.to_string(),
                weight,
            })
            .collect(),
    }
}

/// 記憶體後端的完整管線：儲存 + 佇列 + 工作者池 + 編排器
pub struct TestStack {
    pub orchestrator: Arc<JobOrchestrator>,
    pub queue: Arc<dyn JobQueue>,
    pub workers: Vec<JoinHandle<()>>,
}

pub fn spawn_stack(provider: Arc<dyn MarketDataProvider>) -> TestStack {
    let store: Arc<dyn JobStore> = Arc::new(InMemoryJobStore::new());
    let queue: Arc<dyn JobQueue> = Arc::new(InMemoryJobQueue::new());

    let engine = Arc::new(BacktestEngine::new(provider));
    let worker = Arc::new(BacktestWorker::new(store.clone(), engine));
    let workers = spawn_workers(2, worker, queue.clone());

    let orchestrator = Arc::new(JobOrchestrator::new(
        store,
        queue.clone(),
        PortfolioValidator::default(),
    ));

    TestStack {
        orchestrator,
        queue,
        workers,
    }
}
