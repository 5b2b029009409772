use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

use crate::portfolio::types::{AssetWeight, Portfolio, PortfolioRequest};

/// 權重總和允許的絕對誤差
pub const WEIGHT_SUM_TOLERANCE: f64 = 1.0e-3;

/// 正規化後允許的標的代碼格式
static TICKER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z0-9.\-]{1,12}$").expect("invalid ticker pattern"));

/// 投資組合被拒絕的原因，逐條對應單一驗證規則
///
/// 錯誤訊息直接回傳給客戶端顯示。
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PortfolioRejection {
    #[error("portfolio name must not be empty")]
    EmptyName,

    #[error("initial_value must be positive, got {0}")]
    NonPositiveInitialValue(f64),

    #[error("{field} is not a valid calendar date: {value}")]
    InvalidDate { field: &'static str, value: String },

    #[error("start_date must be earlier than end_date")]
    InvalidDateRange,

    #[error("date range of {days} days exceeds the maximum of {max} days")]
    RangeTooLong { days: i64, max: i64 },

    #[error("portfolio must include at least one asset")]
    NoAssets,

    #[error("asset ticker must not be empty")]
    EmptyTicker,

    #[error("invalid ticker symbol: {0}")]
    InvalidTicker(String),

    #[error("duplicate ticker in portfolio: {0}")]
    DuplicateTicker(String),

    #[error("weight for {ticker} must be within [0, 1], got {weight}")]
    WeightOutOfRange { ticker: String, weight: f64 },

    #[error("asset weights must sum to 1.0 (within 0.001), got {0:.4}")]
    WeightSum(f64),
}

/// 投資組合驗證器
///
/// 依序檢查並在第一個失敗的規則短路。通過驗證後回傳正規化的
/// [`Portfolio`]：日期已解析、標的代碼已轉為大寫。
#[derive(Debug, Clone)]
pub struct PortfolioValidator {
    max_range_days: i64,
}

impl Default for PortfolioValidator {
    fn default() -> Self {
        Self {
            max_range_days: 3650,
        }
    }
}

impl PortfolioValidator {
    /// 以日期範圍上限建立驗證器
    pub fn new(max_range_days: i64) -> Self {
        Self { max_range_days }
    }

    /// 驗證提交的投資組合
    pub fn validate(&self, request: &PortfolioRequest) -> Result<Portfolio, PortfolioRejection> {
        // 1. 名稱非空
        if request.name.trim().is_empty() {
            return Err(PortfolioRejection::EmptyName);
        }

        // 2. 初始資金為正
        if !(request.initial_value > 0.0) {
            return Err(PortfolioRejection::NonPositiveInitialValue(
                request.initial_value,
            ));
        }

        // 3. 日期可解析、順序正確、範圍在執行預算內
        let start_date = parse_date("start_date", &request.start_date)?;
        let end_date = parse_date("end_date", &request.end_date)?;

        if start_date >= end_date {
            return Err(PortfolioRejection::InvalidDateRange);
        }

        let days = (end_date - start_date).num_days();
        if days > self.max_range_days {
            return Err(PortfolioRejection::RangeTooLong {
                days,
                max: self.max_range_days,
            });
        }

        // 4. 資產非空、代碼合法且不重複（大小寫不敏感）
        if request.assets.is_empty() {
            return Err(PortfolioRejection::NoAssets);
        }

        let mut seen = HashSet::new();
        let mut assets = Vec::with_capacity(request.assets.len());

        for asset in &request.assets {
            let ticker = asset.ticker.trim().to_uppercase();
            if ticker.is_empty() {
                return Err(PortfolioRejection::EmptyTicker);
            }
            if !TICKER_PATTERN.is_match(&ticker) {
                return Err(PortfolioRejection::InvalidTicker(asset.ticker.clone()));
            }
            if !seen.insert(ticker.clone()) {
                return Err(PortfolioRejection::DuplicateTicker(ticker));
            }

            assets.push(AssetWeight {
                ticker,
                weight: asset.weight,
            });
        }

        // 5. 個別權重在 [0, 1]
        for asset in &assets {
            if !(0.0..=1.0).contains(&asset.weight) {
                return Err(PortfolioRejection::WeightOutOfRange {
                    ticker: asset.ticker.clone(),
                    weight: asset.weight,
                });
            }
        }

        // 6. 權重總和在容差內
        let sum: f64 = assets.iter().map(|a| a.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PortfolioRejection::WeightSum(sum));
        }

        Ok(Portfolio {
            name: request.name.trim().to_string(),
            initial_value: request.initial_value,
            start_date,
            end_date,
            assets,
        })
    }
}

fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, PortfolioRejection> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| PortfolioRejection::InvalidDate {
        field,
        value: value.to_string(),
    })
}
