use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};

/// std Duration 转 chrono Duration，超出范围时截断到一百年
pub fn chrono_duration(d: std::time::Duration) -> chrono::Duration {
    const CEILING: std::time::Duration = std::time::Duration::from_secs(100 * 365 * 24 * 3600);
    chrono::Duration::from_std(d.min(CEILING)).unwrap_or(chrono::Duration::zero())
}

/// 时间来源。限流窗口、投递时间和内存存储的过期都从这里取当前时间
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动推进的时钟，测试用
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    pub fn set(&self, at: DateTime<Utc>) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now = at;
    }

    pub fn advance(&self, by: std::time::Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        *now += chrono_duration(by);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}
