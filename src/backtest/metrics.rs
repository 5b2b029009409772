//! 風險/報酬指標計算
//!
//! 以 252 個交易日的慣例做年化。標準差使用樣本標準差（n-1）。

use statrs::statistics::Statistics;

/// 年化交易日數慣例
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// 年化波動率：日報酬樣本標準差 × √252
///
/// 少於兩筆報酬無法估計離散度，回傳 0。
pub fn annualized_volatility(daily_returns: &[f64]) -> f64 {
    if daily_returns.len() < 2 {
        return 0.0;
    }

    daily_returns.std_dev() * TRADING_DAYS_PER_YEAR.sqrt()
}

/// 年化夏普比率：平均日報酬 × 252 / 年化波動率
///
/// 零波動率時比率未定義，回傳 `None` 而非傳播除零錯誤。
pub fn sharpe_ratio(daily_returns: &[f64], annualized_volatility: f64) -> Option<f64> {
    if annualized_volatility > 0.0 {
        Some(daily_returns.mean() * TRADING_DAYS_PER_YEAR / annualized_volatility)
    } else {
        None
    }
}

/// 金額顯示精度（2 位小數）
pub fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 指標顯示精度（6 位小數）
pub fn round_metric(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}
