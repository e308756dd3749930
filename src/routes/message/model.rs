use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct SubmitMessageRequest {
    pub message: String,
}

/// 不返回消息ID和计划投递时间，避免提交方据此推断发送时刻
#[derive(Debug, Serialize, Deserialize)]
pub struct SubmitMessageResponse {
    pub queued: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}
