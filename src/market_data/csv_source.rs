use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::market_data::provider::{ClosePrice, MarketDataError, MarketDataProvider};

/// CSV 價格檔案的單列格式
#[derive(Debug, Deserialize)]
struct PriceRow {
    date: NaiveDate,
    close: f64,
}

/// 以本地 CSV 目錄為來源的市場數據提供者
///
/// 目錄下每檔標的一個 `<TICKER>.csv`，欄位為 `date,close`。
/// 檔案不存在視為未知標的；範圍內沒有任何資料列視為無數據。
pub struct CsvDataProvider {
    directory: PathBuf,
}

impl CsvDataProvider {
    /// 以價格檔案目錄建立提供者
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    fn ticker_path(&self, ticker: &str) -> PathBuf {
        self.directory.join(format!("{ticker}.csv"))
    }

    fn read_closes(
        path: &Path,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ClosePrice>, MarketDataError> {
        let mut reader = csv::Reader::from_path(path)?;
        let mut closes = Vec::new();

        for row in reader.deserialize::<PriceRow>() {
            let row = row.map_err(|e| MarketDataError::Malformed {
                ticker: ticker.to_string(),
                detail: e.to_string(),
            })?;

            if row.date >= start && row.date <= end {
                closes.push(ClosePrice {
                    date: row.date,
                    close: row.close,
                });
            }
        }

        closes.sort_by_key(|p| p.date);

        if closes.is_empty() {
            return Err(MarketDataError::NoData(ticker.to_string()));
        }

        Ok(closes)
    }
}

#[async_trait]
impl MarketDataProvider for CsvDataProvider {
    async fn daily_closes(
        &self,
        ticker: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<ClosePrice>, MarketDataError> {
        let path = self.ticker_path(ticker);
        if !path.exists() {
            return Err(MarketDataError::UnknownTicker(ticker.to_string()));
        }

        debug!(ticker, path = %path.display(), "loading daily closes from csv");

        // CSV 解析是同步 IO，移出執行緒池外執行
        let ticker = ticker.to_string();
        tokio::task::spawn_blocking(move || Self::read_closes(&path, &ticker, start, end))
            .await
            .map_err(|e| MarketDataError::Malformed {
                ticker: "?".to_string(),
                detail: format!("blocking read task failed: {e}"),
            })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;

    fn write_csv(dir: &Path, ticker: &str, rows: &[(&str, f64)]) {
        let mut file = std::fs::File::create(dir.join(format!("{ticker}.csv"))).unwrap();
        writeln!(file, "date,close").unwrap();
        for (date, close) in rows {
            writeln!(file, "{date},{close}").unwrap();
        }
    }

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_reads_in_range_sorted() {
        let dir = tempfile::tempdir().unwrap();
        // 亂序寫入，含範圍外的列
        write_csv(
            dir.path(),
            "AAPL",
            &[
                ("2024-01-03", 104.0),
                ("2024-01-01", 100.0),
                ("2024-01-02", 102.0),
                ("2023-12-29", 99.0),
                ("2024-02-01", 110.0),
            ],
        );

        let provider = CsvDataProvider::new(dir.path());
        let closes = provider
            .daily_closes("AAPL", date("2024-01-01"), date("2024-01-31"))
            .await
            .unwrap();

        assert_eq!(closes.len(), 3);
        assert_eq!(closes[0].date, date("2024-01-01"));
        assert_eq!(closes[2].date, date("2024-01-03"));
        assert_eq!(closes[1].close, 102.0);
    }

    #[tokio::test]
    async fn test_missing_file_is_unknown_ticker() {
        let dir = tempfile::tempdir().unwrap();
        let provider = CsvDataProvider::new(dir.path());

        let err = provider
            .daily_closes("NOPE", date("2024-01-01"), date("2024-01-31"))
            .await
            .unwrap_err();
        assert_matches!(err, MarketDataError::UnknownTicker(t) if t == "NOPE");
    }

    #[tokio::test]
    async fn test_empty_range_is_no_data() {
        let dir = tempfile::tempdir().unwrap();
        write_csv(dir.path(), "AAPL", &[("2024-01-01", 100.0)]);

        let provider = CsvDataProvider::new(dir.path());
        let err = provider
            .daily_closes("AAPL", date("2024-06-01"), date("2024-06-30"))
            .await
            .unwrap_err();
        assert_matches!(err, MarketDataError::NoData(t) if t == "AAPL");
    }

    #[tokio::test]
    async fn test_malformed_row_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("BAD.csv")).unwrap();
        writeln!(file, "date,close").unwrap();
        writeln!(file, "2024-01-01,not-a-number").unwrap();

        let provider = CsvDataProvider::new(dir.path());
        let err = provider
            .daily_closes("BAD", date("2024-01-01"), date("2024-01-31"))
            .await
            .unwrap_err();
        assert_matches!(err, MarketDataError::Malformed { ticker, .. } if ticker == "BAD");
    }
}
