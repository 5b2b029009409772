//! 回測模組
//!
//! 此模組負責執行投資組合回測：取得各標的的每日收盤價、對齊交易日、
//! 模擬每日估值並推導風險/報酬指標。引擎無狀態，相同輸入必產生
//! 相同輸出。

pub mod engine;
pub mod metrics;
pub mod results;

// 重新導出主要類型和結構
pub use engine::{BacktestEngine, EngineError};
pub use results::{BacktestResult, TimeseriesPoint};
