use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 單日收盤價
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosePrice {
    pub date: NaiveDate,
    pub close: f64,
}

/// 市場數據錯誤
///
/// 錯誤訊息會成為任務失敗原因的一部分，直接面向客戶端。
#[derive(Error, Debug)]
pub enum MarketDataError {
    #[error("no price data available for ticker {0}")]
    NoData(String),

    #[error("unknown ticker {0}")]
    UnknownTicker(String),

    #[error("failed to read price data: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse price data: {0}")]
    Csv(#[from] csv::Error),

    #[error("malformed price row for {ticker}: {detail}")]
    Malformed { ticker: String, detail: String },
}

/// 市場數據提供者接口
///
/// 對單一標的回傳 `[start, end]`（含端點）範圍內、依日期遞增排序的
/// 每日收盤價序列。讀取是唯一的副作用。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// 加載指定標的在日期範圍內的每日收盤價
    async fn daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ClosePrice>, MarketDataError>;
}
