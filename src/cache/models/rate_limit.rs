use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 固定窗口限流缓存数据模型
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CachedRateWindow {
    pub key: String,
    pub count: u32,
    pub window_reset_at: DateTime<Utc>,
}

impl CachedRateWindow {
    /// 以 now 为起点开启一个新窗口
    pub fn fresh(key: &str, now: DateTime<Utc>, window: chrono::Duration) -> Self {
        Self {
            key: key.to_string(),
            count: 0,
            window_reset_at: now + window,
        }
    }

    /// 到达重置时间的窗口视为已过期
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.window_reset_at
    }
}
