use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::jobs::types::{HistoryEntry, Job, JobOutcome};

pub mod memory;
pub mod postgres;

pub use memory::InMemoryJobStore;
pub use postgres::PgJobStore;

/// 歷史清單最多回傳的筆數
pub const HISTORY_LIMIT: usize = 50;

/// 任務儲存錯誤
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("job {0} already exists")]
    DuplicateJob(Uuid),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("corrupt job record {job_id}: {detail}")]
    Corrupt { job_id: Uuid, detail: String },
}

/// 任務儲存接口
///
/// 負責任務的持久化與原子狀態轉移。任何可以 job_id 定位紀錄、
/// 支援條件更新的後端都能滿足此契約。
#[async_trait]
pub trait JobStore: Send + Sync {
    /// 建立新任務；任務 ID 已存在時失敗
    async fn create(&self, job: &Job) -> Result<(), StoreError>;

    /// 讀取任務目前狀態
    async fn get(&self, job_id: Uuid) -> Result<Option<Job>, StoreError>;

    /// PENDING → 終端狀態的條件轉移
    ///
    /// 單一原子寫入：只有仍為 PENDING 的任務會被更新。任務不存在或
    /// 已為終端狀態時不寫入並回傳 `false`，因此重複投遞不會產生第二次
    /// 終端寫入。
    async fn complete(&self, job_id: Uuid, outcome: JobOutcome) -> Result<bool, StoreError>;

    /// 列出 SUCCESS 任務，依建立時間由新到舊，至多 [`HISTORY_LIMIT`] 筆
    async fn list_history(&self) -> Result<Vec<HistoryEntry>, StoreError>;

    /// 儲存後端健康檢查
    async fn check_health(&self) -> Result<(), StoreError>;
}
