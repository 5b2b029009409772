// monitor/metrics.rs - 任務管線監控指標

use anyhow::Result;
use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tracing::info;

use crate::config::MetricsConfig;

/// 已提交的任務數
pub const JOBS_SUBMITTED: &str = "fininsight_jobs_submitted_total";
/// 成功完成的任務數
pub const JOBS_SUCCEEDED: &str = "fininsight_jobs_succeeded_total";
/// 以 FAILURE 結束的任務數
pub const JOBS_FAILED: &str = "fininsight_jobs_failed_total";
/// 提交時被拒絕的投資組合數
pub const JOBS_REJECTED: &str = "fininsight_jobs_rejected_total";
/// 單次回測執行時間
pub const ENGINE_RUN_SECONDS: &str = "fininsight_engine_run_seconds";

/// 註冊任務管線指標的描述
pub fn describe_pipeline_metrics() {
    describe_counter!(JOBS_SUBMITTED, "Backtest jobs accepted for execution");
    describe_counter!(JOBS_SUCCEEDED, "Backtest jobs that reached SUCCESS");
    describe_counter!(JOBS_FAILED, "Backtest jobs that reached FAILURE");
    describe_counter!(JOBS_REJECTED, "Portfolio submissions rejected at validation");
    describe_histogram!(
        ENGINE_RUN_SECONDS,
        Unit::Seconds,
        "Wall-clock duration of a single engine run"
    );
}

/// 依配置啟動 Prometheus 匯出端點
pub fn init_prometheus_exporter(config: &MetricsConfig) -> Result<()> {
    if !config.prometheus_enabled {
        return Ok(());
    }

    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), config.prometheus_port);
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Prometheus exporter listening on {}", addr);

    Ok(())
}
