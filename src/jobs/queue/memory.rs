use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use uuid::Uuid;

use crate::jobs::queue::{JobDelivery, JobQueue, QueueError, QueueMessage};

/// 記憶體任務佇列
///
/// 以 tokio mpsc 通道為後端。`close` 丟棄發送端；等待中的工作者在
/// 通道排空後收到 `None` 結束主循環。用於開發環境與測試。
pub struct InMemoryJobQueue {
    tx: Mutex<Option<mpsc::UnboundedSender<QueueMessage>>>,
    rx: Mutex<mpsc::UnboundedReceiver<QueueMessage>>,
}

impl Default for InMemoryJobQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryJobQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(rx),
        }
    }
}

/// 記憶體投遞：通道本身即交付保證，確認為無操作
struct MemoryDelivery {
    job_id: Uuid,
}

#[async_trait]
impl JobDelivery for MemoryDelivery {
    fn job_id(&self) -> Uuid {
        self.job_id
    }

    async fn ack(self: Box<Self>) -> Result<(), QueueError> {
        Ok(())
    }
}

#[async_trait]
impl JobQueue for InMemoryJobQueue {
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError> {
        let guard = self.tx.lock().await;
        let tx = guard.as_ref().ok_or(QueueError::Closed)?;

        tx.send(QueueMessage::new(job_id))
            .map_err(|_| QueueError::Closed)
    }

    async fn dequeue(&self) -> Result<Option<Box<dyn JobDelivery>>, QueueError> {
        let mut rx = self.rx.lock().await;

        match rx.recv().await {
            Some(message) => Ok(Some(Box::new(MemoryDelivery {
                job_id: message.job_id,
            }))),
            None => Ok(None),
        }
    }

    async fn close(&self) {
        // 丟棄發送端；接收端排空後結束
        self.tx.lock().await.take();
    }

    async fn check_health(&self) -> Result<(), QueueError> {
        if self.tx.lock().await.is_some() {
            Ok(())
        } else {
            Err(QueueError::Closed)
        }
    }
}
