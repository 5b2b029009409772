use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// 單日投資組合估值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeseriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// 回測成功的終端輸出
///
/// 金額四捨五入到小數點後 2 位，指標到 6 位；`sharpe_ratio` 在
/// 零波動率時為 `None`（JSON `null`）。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    /// 投資組合名稱（為顯示用途反正規化）
    pub portfolio: String,
    /// 期末投資組合價值
    pub final_value: f64,
    /// 區間累積報酬率
    pub cumulative_return: f64,
    /// 年化波動率
    pub volatility: f64,
    /// 年化夏普比率，零波動率時未定義
    pub sharpe_ratio: Option<f64>,
    /// 每一共同交易日的估值序列，日期嚴格遞增
    pub timeseries: Vec<TimeseriesPoint>,
}
