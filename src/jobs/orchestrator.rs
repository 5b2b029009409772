use metrics::counter;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::backtest::BacktestResult;
use crate::jobs::queue::{JobQueue, QueueError};
use crate::jobs::store::{JobStore, StoreError};
use crate::jobs::types::{HistoryEntry, Job, JobStatus};
use crate::monitor::metrics::{JOBS_REJECTED, JOBS_SUBMITTED};
use crate::portfolio::{PortfolioRejection, PortfolioRequest, PortfolioValidator};

/// 提交失敗原因
///
/// `Rejected` 是業務層拒絕（客戶端可修正）；`Store`/`Queue` 是基礎
/// 設施故障，此時任務可能根本不存在，不進入任務狀態機。
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("{0}")]
    Rejected(#[from] PortfolioRejection),

    #[error("job store unavailable: {0}")]
    Store(#[from] StoreError),

    #[error("job queue unavailable: {0}")]
    Queue(#[from] QueueError),
}

/// 讀取失敗原因
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("job store unavailable: {0}")]
    Store(#[from] StoreError),
}

/// 任務狀態快照（輪詢契約）
#[derive(Debug, Clone, Serialize)]
pub struct JobStatusSnapshot {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 任務結果快照
///
/// PENDING 任務回傳目前狀態而沒有 `result`/`error`，代表「尚未就緒」，
/// 不是錯誤。
#[derive(Debug, Clone, Serialize)]
pub struct JobResultSnapshot {
    pub job_id: Uuid,
    pub status: JobStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<BacktestResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 各協作方的健康快照
#[derive(Debug, Clone, Copy, Serialize)]
pub struct HealthSnapshot {
    pub store: bool,
    pub queue: bool,
}

/// 任務編排器
///
/// 串接驗證器 → 儲存 → 佇列的狀態機，獨占任務生命週期轉移；
/// API 層只消費此處的契約。提交路徑與工作者執行互不阻塞。
pub struct JobOrchestrator {
    store: Arc<dyn JobStore>,
    queue: Arc<dyn JobQueue>,
    validator: PortfolioValidator,
}

impl JobOrchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        queue: Arc<dyn JobQueue>,
        validator: PortfolioValidator,
    ) -> Self {
        Self {
            store,
            queue,
            validator,
        }
    }

    /// 提交回測任務
    ///
    /// 同步驗證；驗證失敗不建立任務，呼叫端立即取得拒絕原因。
    /// 成功時任務以 PENDING 持久化並入列，不等待執行就回傳 ID。
    pub async fn submit(&self, request: &PortfolioRequest) -> Result<Uuid, SubmitError> {
        let portfolio = self.validator.validate(request).map_err(|rejection| {
            counter!(JOBS_REJECTED).increment(1);
            debug!(%rejection, "portfolio rejected at submission");
            rejection
        })?;

        let job = Job::new(portfolio);
        let job_id = job.job_id;

        self.store.create(&job).await?;
        self.queue.enqueue(job_id).await?;

        counter!(JOBS_SUBMITTED).increment(1);
        info!(%job_id, portfolio = %job.portfolio.name, "backtest job submitted");

        Ok(job_id)
    }

    /// 讀取任務目前狀態
    pub async fn get_status(&self, job_id: Uuid) -> Result<JobStatusSnapshot, LookupError> {
        let job = self
            .store
            .get(job_id)
            .await?
            .ok_or(LookupError::NotFound(job_id))?;

        Ok(JobStatusSnapshot {
            job_id: job.job_id,
            status: job.status,
            error: job.error,
        })
    }

    /// 讀取任務結果
    pub async fn get_result(&self, job_id: Uuid) -> Result<JobResultSnapshot, LookupError> {
        let job = self
            .store
            .get(job_id)
            .await?
            .ok_or(LookupError::NotFound(job_id))?;

        Ok(JobResultSnapshot {
            job_id: job.job_id,
            status: job.status,
            result: job.result,
            error: job.error,
        })
    }

    /// 列出已完成回測的歷史，由新到舊
    pub async fn list_history(&self) -> Result<Vec<HistoryEntry>, LookupError> {
        Ok(self.store.list_history().await?)
    }

    /// 檢查儲存與佇列協作方的健康狀態
    pub async fn check_health(&self) -> HealthSnapshot {
        HealthSnapshot {
            store: self.store.check_health().await.is_ok(),
            queue: self.queue.check_health().await.is_ok(),
        }
    }
}
