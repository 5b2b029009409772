use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

use crate::backtest::metrics;
use crate::backtest::results::{BacktestResult, TimeseriesPoint};
use crate::market_data::MarketDataProvider;
use crate::portfolio::Portfolio;

/// 回測引擎錯誤
///
/// 皆為輸入數據問題：由工作者轉為終端 FAILURE，不重試。
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no usable price data for ticker {ticker}: {detail}")]
    DataUnavailable { ticker: String, detail: String },

    #[error("insufficient overlapping price data: fewer than 2 common trading dates")]
    InsufficientData,
}

/// 回測引擎
///
/// 對已驗證的投資組合執行估值模擬。除讀取市場數據外沒有副作用，
/// 相同輸入產生逐位元相同的輸出。
///
/// 交易日對齊採「交集」策略：只保留每檔標的都有報價的日期，
/// 不向前填補、不虛構未觀察到的價格。
pub struct BacktestEngine {
    provider: Arc<dyn MarketDataProvider>,
}

impl BacktestEngine {
    /// 以市場數據提供者建立引擎
    pub fn new(provider: Arc<dyn MarketDataProvider>) -> Self {
        Self { provider }
    }

    /// 執行回測
    pub async fn run(&self, portfolio: &Portfolio) -> Result<BacktestResult, EngineError> {
        info!(
            portfolio = %portfolio.name,
            assets = portfolio.assets.len(),
            "starting backtest"
        );

        // 1. 取得各標的的收盤價序列
        let mut series = Vec::with_capacity(portfolio.assets.len());
        for asset in &portfolio.assets {
            let closes = self
                .provider
                .daily_closes(&asset.ticker, portfolio.start_date, portfolio.end_date)
                .await
                .map_err(|e| EngineError::DataUnavailable {
                    ticker: asset.ticker.clone(),
                    detail: e.to_string(),
                })?;

            let by_date: BTreeMap<NaiveDate, f64> =
                closes.into_iter().map(|p| (p.date, p.close)).collect();

            if by_date.is_empty() {
                return Err(EngineError::DataUnavailable {
                    ticker: asset.ticker.clone(),
                    detail: "empty price series".to_string(),
                });
            }

            series.push(by_date);
        }

        // 2. 對齊到所有標的共同的交易日（交集，遞增）
        let Some(first_series) = series.first() else {
            return Err(EngineError::InsufficientData);
        };
        let common_dates: Vec<NaiveDate> = first_series
            .keys()
            .filter(|date| series.iter().all(|s| s.contains_key(*date)))
            .copied()
            .collect();

        debug!(common_dates = common_dates.len(), "aligned trading dates");

        if common_dates.len() < 2 {
            return Err(EngineError::InsufficientData);
        }

        // 3-4. 每期加權報酬與估值遞推
        let mut portfolio_returns = Vec::with_capacity(common_dates.len() - 1);
        for t in 1..common_dates.len() {
            let mut daily_return = 0.0;
            for (asset, closes) in portfolio.assets.iter().zip(&series) {
                let prev = closes[&common_dates[t - 1]];
                let current = closes[&common_dates[t]];

                if prev <= 0.0 {
                    return Err(EngineError::DataUnavailable {
                        ticker: asset.ticker.clone(),
                        detail: format!("non-positive close {} on {}", prev, common_dates[t - 1]),
                    });
                }

                daily_return += asset.weight * (current / prev - 1.0);
            }
            portfolio_returns.push(daily_return);
        }

        let mut values = Vec::with_capacity(common_dates.len());
        let mut value = portfolio.initial_value;
        values.push(value);
        for daily_return in &portfolio_returns {
            value *= 1.0 + daily_return;
            values.push(value);
        }

        // 5-7. 指標推導
        let final_value = value;
        let cumulative_return = final_value / portfolio.initial_value - 1.0;
        let volatility = metrics::annualized_volatility(&portfolio_returns);
        let sharpe_ratio = metrics::sharpe_ratio(&portfolio_returns, volatility);

        let timeseries = common_dates
            .iter()
            .zip(&values)
            .map(|(date, value)| TimeseriesPoint {
                date: *date,
                value: metrics::round_money(*value),
            })
            .collect();

        info!(
            portfolio = %portfolio.name,
            final_value,
            "backtest finished"
        );

        Ok(BacktestResult {
            portfolio: portfolio.name.clone(),
            final_value: metrics::round_money(final_value),
            cumulative_return: metrics::round_metric(cumulative_return),
            volatility: metrics::round_metric(volatility),
            sharpe_ratio: sharpe_ratio.map(metrics::round_metric),
            timeseries,
        })
    }
}
