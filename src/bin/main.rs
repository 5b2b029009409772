use anyhow::{anyhow, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use fininsight_server::api::{AppState, RestApi};
use fininsight_server::backtest::BacktestEngine;
use fininsight_server::config;
use fininsight_server::config::LogConfig;
use fininsight_server::jobs::queue::{InMemoryJobQueue, RabbitMQJobQueue};
use fininsight_server::jobs::store::{InMemoryJobStore, PgJobStore};
use fininsight_server::jobs::{
    spawn_workers, BacktestWorker, JobOrchestrator, JobQueue, JobStore,
};
use fininsight_server::market_data::{CachedDataProvider, CsvDataProvider, MarketDataProvider};
use fininsight_server::monitor;
use fininsight_server::portfolio::PortfolioValidator;

/// 命令行參數
#[derive(Parser, Debug)]
#[command(name = "fininsight_server", about = "Portfolio backtesting job server")]
struct Args {
    /// 配置文件目錄（覆蓋 CONFIG_DIR 環境變數）
    #[arg(long)]
    config_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if let Some(dir) = &args.config_dir {
        std::env::set_var("CONFIG_DIR", dir);
    }

    // 初始化配置
    config::init_config()?;
    let app_config = config::get_config();

    // 初始化日誌系統
    init_logging(&app_config.log)?;

    // 初始化監控指標
    monitor::describe_pipeline_metrics();
    monitor::init_prometheus_exporter(&app_config.metrics)?;

    // 建立任務儲存
    let store: Arc<dyn JobStore> = match app_config.store.backend.to_lowercase().as_str() {
        "postgres" => {
            let db_config = app_config
                .database
                .as_ref()
                .ok_or_else(|| anyhow!("store.backend=postgres 需要 database 配置"))?;
            let store = PgJobStore::connect(db_config).await?;
            store.run_migrations().await?;
            info!("任務儲存後端: postgres");
            Arc::new(store)
        }
        _ => {
            info!("任務儲存後端: memory");
            Arc::new(InMemoryJobStore::new())
        }
    };

    // 建立任務佇列
    let queue: Arc<dyn JobQueue> = match app_config.queue.backend.to_lowercase().as_str() {
        "rabbitmq" => {
            let mq_config = app_config
                .queue
                .rabbitmq
                .as_ref()
                .ok_or_else(|| anyhow!("queue.backend=rabbitmq 需要 queue.rabbitmq 配置"))?;
            info!("任務佇列後端: rabbitmq");
            Arc::new(RabbitMQJobQueue::connect(mq_config).await?)
        }
        _ => {
            info!("任務佇列後端: memory");
            Arc::new(InMemoryJobQueue::new())
        }
    };

    // 建立市場數據提供者：CSV 目錄 + 記憶體快取
    let csv_provider: Arc<dyn MarketDataProvider> =
        Arc::new(CsvDataProvider::new(&app_config.market_data.directory));
    let market_data: Arc<dyn MarketDataProvider> = Arc::new(CachedDataProvider::new(
        csv_provider,
        app_config.market_data.cache_capacity,
        Duration::from_secs(app_config.market_data.cache_ttl_secs),
    ));

    // 啟動工作者池
    let engine = Arc::new(BacktestEngine::new(market_data.clone()));
    let worker = Arc::new(BacktestWorker::new(store.clone(), engine));
    let worker_handles = spawn_workers(
        app_config.worker.effective_count(),
        worker,
        queue.clone(),
    );

    // 建立編排器與 REST API
    let validator = PortfolioValidator::new(app_config.worker.max_range_days);
    let orchestrator = Arc::new(JobOrchestrator::new(store, queue.clone(), validator));
    let state = AppState::new(orchestrator, market_data);

    let rest_api = RestApi::new(app_config.server.clone());

    info!("伺服器初始化完成，等待請求...");
    info!("監聽端口: {}", app_config.server.port);

    // 等待關閉信號
    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("接收到關閉信號，正在退出..."),
            Err(err) => error!("無法監聽關閉信號: {}", err),
        }
    };

    rest_api.start(state, shutdown).await?;

    // 關閉佇列並等待工作者排空
    info!("正在關閉任務佇列...");
    queue.close().await;
    for handle in worker_handles {
        if let Err(e) = handle.await {
            error!("工作者結束異常: {}", e);
        }
    }

    info!("伺服器已關閉");
    Ok(())
}

// 初始化日誌系統
fn init_logging(log_config: &LogConfig) -> Result<()> {
    let level = match log_config.level.as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO, // 默認為INFO
    };

    let builder = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_max_level(level);

    let result = if log_config.format.to_lowercase() == "json" {
        tracing::subscriber::set_global_default(builder.json().finish())
    } else {
        tracing::subscriber::set_global_default(builder.finish())
    };

    result.map_err(|e| anyhow!("設置日誌系統失敗: {}", e))?;

    info!("日誌系統初始化完成");
    Ok(())
}
