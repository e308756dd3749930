use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use uuid::Uuid;

use super::mode::DeliveryMode;
use crate::cache::models::queue::CachedQueuedMessage;
use crate::cache::operations::QueueCacheOperations;
use crate::cache::store::KvStore;
use crate::clock::{Clock, chrono_duration};
use crate::error::RelayError;
use crate::integrations::Deliverer;

/// 兜底过期时间，消息无论是否投递成功最多保存这么久
pub const DEFAULT_MESSAGE_TTL: Duration = Duration::from_secs(24 * 3600);
/// 投递认领标记的有效期，需大于单次投递的最长耗时
pub const DEFAULT_CLAIM_TTL: Duration = Duration::from_secs(120);
/// 单次扫描的时间预算
pub const DEFAULT_SWEEP_BUDGET: Duration = Duration::from_secs(50);

/// 单条消息的投递结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    /// 还没到计划投递时间
    NotDue,
    /// 消息已不存在（已被投递或已过期）
    Missing,
    /// 另一条投递路径持有认领
    Claimed,
}

/// 延迟投递队列
///
/// 每条消息独立存储在 `queue:<id>` 下，存在即待投递。即时尝试
/// (`attempt_deliver_soon`) 和周期扫描 (`sweep`) 是两条相互独立的投递路径，
/// 都经过 `deliver_claimed`：先认领，再重读，投递成功后删除。
pub struct DeliveryQueue {
    pub(super) store: Arc<dyn KvStore>,
    pub(super) clock: Arc<dyn Clock>,
    deliverer: Arc<dyn Deliverer>,
    message_ttl: Duration,
    claim_ttl: Duration,
    pub(super) sweep_budget: Duration,
}

impl DeliveryQueue {
    pub fn new(
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        deliverer: Arc<dyn Deliverer>,
    ) -> Self {
        Self {
            store,
            clock,
            deliverer,
            message_ttl: DEFAULT_MESSAGE_TTL,
            claim_ttl: DEFAULT_CLAIM_TTL,
            sweep_budget: DEFAULT_SWEEP_BUDGET,
        }
    }

    pub fn with_message_ttl(mut self, ttl: Duration) -> Self {
        self.message_ttl = ttl;
        self
    }

    pub fn with_claim_ttl(mut self, ttl: Duration) -> Self {
        self.claim_ttl = ttl;
        self
    }

    pub fn with_sweep_budget(mut self, budget: Duration) -> Self {
        self.sweep_budget = budget;
        self
    }

    /// 持久化一条已改写的消息，返回消息ID
    pub async fn enqueue(&self, payload: String, mode: DeliveryMode) -> Result<String, RelayError> {
        let delay = mode.delay(&mut rand::thread_rng());
        let now = self.clock.now();
        let message = CachedQueuedMessage {
            id: Uuid::new_v4().to_string(),
            payload,
            queued_at: now,
            scheduled_for: now + chrono_duration(delay),
        };

        QueueCacheOperations::put_message(self.store.as_ref(), &message, self.message_ttl).await?;

        tracing::info!(
            id = %message.id,
            delay_secs = delay.as_secs(),
            "message queued"
        );
        Ok(message.id)
    }

    /// 尽力而为的即时投递：已到期就当场投递，未到期什么也不做，交给扫描
    pub async fn attempt_deliver_soon(&self, id: &str) -> Result<DeliveryOutcome, RelayError> {
        match QueueCacheOperations::get_message(self.store.as_ref(), id).await? {
            None => Ok(DeliveryOutcome::Missing),
            Some(message) if !message.is_due(self.clock.now()) => Ok(DeliveryOutcome::NotDue),
            Some(_) => self.deliver_claimed(id).await,
        }
    }

    /// 在后台任务中调用 `attempt_deliver_soon`，错误只记录日志
    pub fn spawn_attempt(self: &Arc<Self>, id: String) -> JoinHandle<()> {
        let queue = Arc::clone(self);
        tokio::spawn(async move {
            match queue.attempt_deliver_soon(&id).await {
                Ok(outcome) => tracing::debug!(id = %id, ?outcome, "inline delivery attempt"),
                Err(e) => tracing::warn!(id = %id, "inline delivery attempt failed: {}", e),
            }
        })
    }

    /// 认领后投递。认领失败说明另一条路径正在处理，直接跳过
    pub(super) async fn deliver_claimed(&self, id: &str) -> Result<DeliveryOutcome, RelayError> {
        let owner = Uuid::new_v4().to_string();
        if !QueueCacheOperations::claim(self.store.as_ref(), id, &owner, self.claim_ttl).await? {
            tracing::debug!(id = %id, "message claimed elsewhere, skipping");
            return Ok(DeliveryOutcome::Claimed);
        }

        let result = self.deliver_after_claim(id).await;

        // 成功时消息已删除，失败时释放认领让下一次扫描重试
        if let Err(e) = QueueCacheOperations::release(self.store.as_ref(), id, &owner).await {
            tracing::warn!(id = %id, "failed to release claim, it will expire: {}", e);
        }
        result
    }

    async fn deliver_after_claim(&self, id: &str) -> Result<DeliveryOutcome, RelayError> {
        // 认领之前读到的内容可能已过时，重新读取
        let message = match QueueCacheOperations::get_message(self.store.as_ref(), id).await? {
            Some(message) => message,
            None => return Ok(DeliveryOutcome::Missing),
        };
        if !message.is_due(self.clock.now()) {
            return Ok(DeliveryOutcome::NotDue);
        }

        self.deliverer
            .deliver(&message.payload)
            .await
            .map_err(|e| RelayError::DeliveryFailed {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        // 投递成功但删除失败时，下一次扫描会重复投递
        if let Err(e) = QueueCacheOperations::delete_message(self.store.as_ref(), id).await {
            tracing::error!(id = %id, "delivered but failed to remove from queue: {}", e);
            return Err(e.into());
        }

        let waited = self.clock.now() - message.queued_at;
        tracing::info!(id = %id, waited_secs = waited.num_seconds(), "message delivered");
        Ok(DeliveryOutcome::Delivered)
    }
}
