use async_trait::async_trait;
use deadpool_lapin::{Manager, Pool};
use futures::StreamExt;
use lapin::{
    options::{
        BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, BasicQosOptions,
        QueueDeclareOptions,
    },
    types::FieldTable,
    BasicProperties, Channel, ConnectionProperties, Consumer,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::RabbitMQConfig;
use crate::jobs::queue::{JobDelivery, JobQueue, QueueError, QueueMessage};

/// 持久化訊息的投遞模式
const DELIVERY_MODE_PERSISTENT: u8 = 2;

/// RabbitMQ 任務佇列
///
/// 單一持久化佇列攜帶 [`QueueMessage`]；訊息在工作者寫入終端狀態後
/// 才確認，因此代理提供至少一次投遞，重複投遞由工作者的條件寫入
/// 吸收。
pub struct RabbitMQJobQueue {
    pool: Pool,
    config: RabbitMQConfig,
    consumer: Mutex<Option<(Channel, Consumer)>>,
    consumer_seq: AtomicUsize,
    closed: AtomicBool,
    shutdown: Notify,
}

impl RabbitMQJobQueue {
    /// 建立連接池、測試連線並宣告持久化佇列
    pub async fn connect(config: &RabbitMQConfig) -> Result<Self, QueueError> {
        info!("Creating RabbitMQ connection pool to {}", config.url);

        let manager = Manager::new(config.url.clone(), ConnectionProperties::default());
        let pool = Pool::builder(manager)
            .max_size(config.pool_size as usize)
            .build()
            .map_err(|e| QueueError::Connection(e.to_string()))?;

        // 測試連接並宣告佇列
        let conn = pool.get().await?;
        let channel = conn.create_channel().await?;
        channel
            .queue_declare(
                &config.queue_name,
                QueueDeclareOptions {
                    durable: true,
                    ..QueueDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await?;

        info!("Successfully connected to RabbitMQ");

        Ok(Self {
            pool,
            config: config.clone(),
            consumer: Mutex::new(None),
            consumer_seq: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        })
    }

    async fn create_consumer(&self) -> Result<(Channel, Consumer), QueueError> {
        let conn = self.pool.get().await?;
        let channel = conn.create_channel().await?;

        channel
            .basic_qos(self.config.prefetch_count, BasicQosOptions::default())
            .await?;

        let tag = format!(
            "{}-{}",
            self.config.consumer_tag_prefix,
            self.consumer_seq.fetch_add(1, Ordering::SeqCst)
        );

        debug!(queue = %self.config.queue_name, tag, "starting consumer");

        let consumer = channel
            .basic_consume(
                &self.config.queue_name,
                &tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok((channel, consumer))
    }
}

/// RabbitMQ 投遞，在終端狀態寫入後確認
struct RabbitDelivery {
    job_id: Uuid,
    channel: Channel,
    delivery_tag: u64,
}

#[async_trait]
impl JobDelivery for RabbitDelivery {
    fn job_id(&self) -> Uuid {
        self.job_id
    }

    async fn ack(self: Box<Self>) -> Result<(), QueueError> {
        self.channel
            .basic_ack(self.delivery_tag, BasicAckOptions::default())
            .await?;
        Ok(())
    }
}

#[async_trait]
impl JobQueue for RabbitMQJobQueue {
    async fn enqueue(&self, job_id: Uuid) -> Result<(), QueueError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }

        let conn = self.pool.get().await?;
        let channel = conn.create_channel().await?;

        let payload = serde_json::to_vec(&QueueMessage::new(job_id))?;

        debug!(%job_id, queue = %self.config.queue_name, "publishing job message");

        channel
            .basic_publish(
                "", // 預設交換機
                &self.config.queue_name,
                BasicPublishOptions::default(),
                &payload,
                BasicProperties::default().with_delivery_mode(DELIVERY_MODE_PERSISTENT),
            )
            .await?;

        Ok(())
    }

    async fn dequeue(&self) -> Result<Option<Box<dyn JobDelivery>>, QueueError> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(None);
        }

        let mut guard = self.consumer.lock().await;
        if guard.is_none() {
            *guard = Some(self.create_consumer().await?);
        }
        let (channel, consumer) = guard.as_mut().ok_or(QueueError::Closed)?;

        loop {
            tokio::select! {
                _ = self.shutdown.notified() => return Ok(None),
                next = consumer.next() => match next {
                    None => return Ok(None),
                    Some(Err(e)) => {
                        error!("Error receiving message: {}", e);
                        return Err(e.into());
                    }
                    Some(Ok(delivery)) => {
                        match serde_json::from_slice::<QueueMessage>(&delivery.data) {
                            Ok(message) => {
                                return Ok(Some(Box::new(RabbitDelivery {
                                    job_id: message.job_id,
                                    channel: channel.clone(),
                                    delivery_tag: delivery.delivery_tag,
                                })));
                            }
                            Err(e) => {
                                // 確認後丟棄無法解析的訊息，避免無限重投遞
                                warn!("Dropping malformed queue message: {}", e);
                                channel
                                    .basic_ack(delivery.delivery_tag, BasicAckOptions::default())
                                    .await?;
                            }
                        }
                    }
                }
            }
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown.notify_waiters();
    }

    async fn check_health(&self) -> Result<(), QueueError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(QueueError::Closed);
        }

        let _ = self.pool.get().await?;
        Ok(())
    }
}
