use async_trait::async_trait;
use chrono::NaiveDate;
use moka::future::Cache;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::market_data::provider::{ClosePrice, MarketDataError, MarketDataProvider};

/// 價格序列快取鍵
fn series_key(ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!("closes:{ticker}:{start}:{end}")
}

/// 市場數據快取層
///
/// 以 (標的, 日期範圍) 為鍵快取已取得的收盤價序列，同一標的的
/// 並發任務不會重複讀取來源。只快取成功結果。
pub struct CachedDataProvider {
    inner: Arc<dyn MarketDataProvider>,
    cache: Cache<String, Arc<Vec<ClosePrice>>>,
}

impl CachedDataProvider {
    /// 以容量與存活時間包裝一個數據來源
    pub fn new(inner: Arc<dyn MarketDataProvider>, capacity: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(capacity)
            .time_to_live(ttl)
            .build();

        Self { inner, cache }
    }
}

#[async_trait]
impl MarketDataProvider for CachedDataProvider {
    async fn daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ClosePrice>, MarketDataError> {
        let key = series_key(ticker, start, end);

        if let Some(cached) = self.cache.get(&key).await {
            debug!(ticker, "price series cache hit");
            return Ok((*cached).clone());
        }

        let closes = self.inner.daily_closes(ticker, start, end).await?;
        self.cache.insert(key, Arc::new(closes.clone())).await;

        Ok(closes)
    }
}
