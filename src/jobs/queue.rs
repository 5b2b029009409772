use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod memory;
pub mod rabbitmq;

pub use memory::InMemoryJobQueue;
pub use rabbitmq::RabbitMQJobQueue;

/// 任務佇列錯誤
#[derive(Error, Debug)]
pub enum QueueError {
    #[error("queue is closed")]
    Closed,

    #[error("broker connection error: {0}")]
    Connection(String),

    #[error("broker error: {0}")]
    Broker(#[from] lapin::Error),

    #[error("connection pool error: {0}")]
    Pool(#[from] deadpool_lapin::PoolError),

    #[error("message serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("malformed queue message: {0}")]
    Malformed(String),
}

/// 佇列訊息封裝
///
/// 佇列只攜帶任務 ID；任務本體一律從儲存載入，投遞重複時由
/// 工作者的條件寫入保證冪等。
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueMessage {
    /// 唯一訊息ID
    pub message_id: String,
    /// 任務ID
    pub job_id: Uuid,
    /// 入列時間
    pub enqueued_at: DateTime<Utc>,
}

impl QueueMessage {
    /// 為任務建立新訊息
    pub fn new(job_id: Uuid) -> Self {
        Self {
            message_id: Uuid::new_v4().to_string(),
            job_id,
            enqueued_at: Utc::now(),
        }
    }
}

/// 一筆待確認的佇列投遞
#[async_trait]
pub trait JobDelivery: Send {
    /// 投遞的任務 ID
    fn job_id(&self) -> Uuid;

    /// 確認訊息處理完成
    async fn ack(self: Box<Self>) -> Result<(), QueueError>;
}

/// 任務佇列接口
///
/// 提交端入列，工作者端出列。後端需提供至少一次投遞；重複投遞由
/// 工作者側的冪等處理吸收。
#[async_trait]
pub trait JobQueue: Send + Sync {
    /// 將任務 ID 放入佇列
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError>;

    /// 等待下一筆投遞；佇列關閉且排空後回傳 `None`
    async fn dequeue(&self) -> Result<Option<Box<dyn JobDelivery>>, QueueError>;

    /// 關閉佇列：停止接受新任務並喚醒等待中的工作者
    async fn close(&self);

    /// 佇列後端健康檢查
    async fn check_health(&self) -> Result<(), QueueError>;
}
