//! 非同步回測任務模組
//!
//! 此模組負責任務生命週期：提交驗證、持久化、佇列投遞、工作者執行
//! 與輪詢契約。任務狀態機為 PENDING → SUCCESS | FAILURE，終端狀態
//! 不可變。

pub mod orchestrator;
pub mod queue;
pub mod store;
pub mod types;
pub mod worker;

// 重新導出主要類型和結構
pub use orchestrator::{JobOrchestrator, JobResultSnapshot, JobStatusSnapshot, LookupError, SubmitError};
pub use queue::{JobDelivery, JobQueue, QueueError, QueueMessage};
pub use store::{JobStore, StoreError, HISTORY_LIMIT};
pub use types::{HistoryEntry, Job, JobOutcome, JobStatus};
pub use worker::{spawn_workers, BacktestWorker};
