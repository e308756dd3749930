use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 待投递消息。存储中存在即代表未投递，没有单独的状态字段
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CachedQueuedMessage {
    pub id: String,
    pub payload: String,
    pub queued_at: DateTime<Utc>,
    pub scheduled_for: DateTime<Utc>,
}

impl CachedQueuedMessage {
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_for <= now
    }
}
