use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;

use crate::market_data::provider::{ClosePrice, MarketDataError, MarketDataProvider};

/// 記憶體固定數據提供者
///
/// 用於測試與本地展示：序列在建構時注入，不做任何 IO。
#[derive(Debug, Default, Clone)]
pub struct InMemoryDataProvider {
    series: HashMap<String, Vec<ClosePrice>>,
}

impl InMemoryDataProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注入一檔標的的收盤價序列
    pub fn with_series(mut self, ticker: &str, closes: Vec<ClosePrice>) -> Self {
        self.insert(ticker, closes);
        self
    }

    /// 注入或覆蓋一檔標的的收盤價序列
    pub fn insert(&mut self, ticker: &str, mut closes: Vec<ClosePrice>) {
        closes.sort_by_key(|p| p.date);
        self.series.insert(ticker.to_uppercase(), closes);
    }
}

#[async_trait]
impl MarketDataProvider for InMemoryDataProvider {
    async fn daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ClosePrice>, MarketDataError> {
        let series = self
            .series
            .get(&ticker.to_uppercase())
            .ok_or_else(|| MarketDataError::UnknownTicker(ticker.to_string()))?;

        let closes: Vec<ClosePrice> = series
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .copied()
            .collect();

        if closes.is_empty() {
            return Err(MarketDataError::NoData(ticker.to_string()));
        }

        Ok(closes)
    }
}
