use metrics::{counter, histogram};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::backtest::BacktestEngine;
use crate::jobs::queue::JobQueue;
use crate::jobs::store::JobStore;
use crate::jobs::types::JobOutcome;
use crate::monitor::metrics::{ENGINE_RUN_SECONDS, JOBS_FAILED, JOBS_SUCCEEDED};

/// 出列失敗後的退避時間
const DEQUEUE_RETRY_DELAY: Duration = Duration::from_secs(1);

/// 回測工作者
///
/// 從佇列取出任務 ID、載入任務、執行引擎並以條件寫入記錄終端狀態。
/// 引擎失敗在此邊界被捕捉並轉為 FAILURE，單一任務的失敗不影響其他
/// 進行中的任務，也不會終止工作者。
pub struct BacktestWorker {
    store: Arc<dyn JobStore>,
    engine: Arc<BacktestEngine>,
}

impl BacktestWorker {
    pub fn new(store: Arc<dyn JobStore>, engine: Arc<BacktestEngine>) -> Self {
        Self { store, engine }
    }

    /// 工作者主循環，佇列關閉並排空後結束
    pub async fn run(&self, queue: Arc<dyn JobQueue>) {
        loop {
            let delivery = match queue.dequeue().await {
                Ok(Some(delivery)) => delivery,
                Ok(None) => break,
                Err(e) => {
                    error!("failed to dequeue job: {}", e);
                    tokio::time::sleep(DEQUEUE_RETRY_DELAY).await;
                    continue;
                }
            };

            let job_id = delivery.job_id();
            self.process(job_id).await;

            // 終端狀態寫入之後才確認投遞
            if let Err(e) = delivery.ack().await {
                error!(%job_id, "failed to acknowledge delivery: {}", e);
            }
        }
    }

    /// 處理單一任務；任何錯誤都在此吸收
    async fn process(&self, job_id: Uuid) {
        let job = match self.store.get(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                warn!(%job_id, "dequeued job does not exist in store");
                return;
            }
            Err(e) => {
                // 不確認也不寫入，留待重投遞
                error!(%job_id, "failed to load job: {}", e);
                return;
            }
        };

        // 重投遞的已完成任務：直接確認，不得重跑
        if job.status.is_terminal() {
            debug!(%job_id, status = %job.status, "job already terminal, skipping redelivery");
            return;
        }

        let started = Instant::now();
        let outcome = match self.engine.run(&job.portfolio).await {
            Ok(result) => {
                counter!(JOBS_SUCCEEDED).increment(1);
                JobOutcome::Success(result)
            }
            Err(e) => {
                counter!(JOBS_FAILED).increment(1);
                warn!(%job_id, "backtest failed: {}", e);
                JobOutcome::Failure(e.to_string())
            }
        };
        histogram!(ENGINE_RUN_SECONDS).record(started.elapsed().as_secs_f64());

        match self.store.complete(job_id, outcome).await {
            Ok(true) => info!(%job_id, "job reached terminal state"),
            Ok(false) => {
                warn!(%job_id, "terminal state already written, dropping duplicate completion")
            }
            Err(e) => {
                // 任務保持 PENDING，等待重投遞
                error!(%job_id, "failed to persist terminal state: {}", e);
            }
        }
    }
}

/// 啟動工作者池
///
/// 每個工作者一次處理一個任務；完成順序與提交順序無關。
pub fn spawn_workers(
    count: usize,
    worker: Arc<BacktestWorker>,
    queue: Arc<dyn JobQueue>,
) -> Vec<JoinHandle<()>> {
    info!(count, "starting backtest worker pool");

    (0..count)
        .map(|index| {
            let worker = worker.clone();
            let queue = queue.clone();
            tokio::spawn(async move {
                debug!(worker = index, "backtest worker started");
                worker.run(queue).await;
                debug!(worker = index, "backtest worker stopped");
            })
        })
        .collect()
}
