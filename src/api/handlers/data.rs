use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::AppState;
use crate::backtest::metrics::round_money;

/// 未指定範圍時回溯的天數
const DEFAULT_LOOKBACK_DAYS: i64 = 90;

/// 價格查詢的日期範圍
#[derive(Debug, Deserialize)]
pub struct PriceRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// 單日收盤價回應
#[derive(Debug, Serialize)]
pub struct StockPrice {
    pub date: NaiveDate,
    pub close: f64,
}

/// GET /data/price/{ticker} - 歷史收盤價查詢
///
/// 未提供日期範圍時預設回傳最近 90 天。
pub async fn price_history(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(range): Query<PriceRangeQuery>,
) -> Result<Json<Vec<StockPrice>>, ApiError> {
    let end = range.end_date.unwrap_or_else(|| Utc::now().date_naive());
    let start = range
        .start_date
        .unwrap_or(end - Duration::days(DEFAULT_LOOKBACK_DAYS));

    if start > end {
        return Err(ApiError::BadRequest(
            "start_date must not be after end_date".to_string(),
        ));
    }

    let ticker = ticker.trim().to_uppercase();
    let closes = state.market_data.daily_closes(&ticker, start, end).await?;

    let prices = closes
        .into_iter()
        .map(|p| StockPrice {
            date: p.date,
            close: round_money(p.close),
        })
        .collect();

    Ok(Json(prices))
}
