//! 監控模組
//!
//! 集中任務管線的指標名稱與註冊，並負責 Prometheus 匯出端點的啟動。

pub mod metrics;

pub use metrics::{describe_pipeline_metrics, init_prometheus_exporter};
