//! 固定窗口配额闸门
//!
//! 每个调用方身份对应一个 `ratelimit:<identity>` 窗口，窗口在 `window_reset_at`
//! 到期后由存储 TTL 自动清除，下一次请求透明地开启新窗口。
//!
//! `check_and_consume` 是两次独立的存储调用（读、写），没有加锁也没有 CAS。
//! 同一身份的并发请求可能都读到自增前的计数而同时放行，最坏多放行一次。
//! 需要严格计数时应换用支持原子自增的 `KvStore` 实现，调用方无需改动。

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cache::models::rate_limit::CachedRateWindow;
use crate::cache::operations::RateLimitCacheOperations;
use crate::cache::store::KvStore;
use crate::clock::{Clock, chrono_duration};
use crate::error::RelayError;

/// 配额状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaStatus {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct QuotaGate {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl QuotaGate {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// 读取当前窗口，不存在或已到重置时间则视为从 now 开始的新窗口
    async fn resolve_window(
        &self,
        key: &str,
        window: Duration,
        now: DateTime<Utc>,
    ) -> Result<CachedRateWindow, RelayError> {
        let current = RateLimitCacheOperations::get_window(self.store.as_ref(), key).await?;
        Ok(match current {
            Some(w) if !w.is_expired(now) => w,
            _ => CachedRateWindow::fresh(key, now, chrono_duration(window)),
        })
    }

    /// 放行则计数加一并返回剩余配额，超限时返回 `QuotaExceeded` 且不修改窗口
    pub async fn check_and_consume(
        &self,
        key: &str,
        max_requests: u32,
        window: Duration,
    ) -> Result<QuotaStatus, RelayError> {
        let now = self.clock.now();
        let mut current = self.resolve_window(key, window, now).await?;

        if current.count >= max_requests {
            tracing::warn!(
                key = %key,
                count = current.count,
                reset_at = %current.window_reset_at,
                "quota exceeded"
            );
            return Err(RelayError::QuotaExceeded {
                count: current.count,
                reset_at: current.window_reset_at,
            });
        }

        current.count += 1;
        let ttl = (current.window_reset_at - now)
            .to_std()
            .unwrap_or(Duration::ZERO);
        RateLimitCacheOperations::set_window(self.store.as_ref(), &current, ttl).await?;

        tracing::debug!(key = %key, count = current.count, "quota consumed");
        Ok(QuotaStatus {
            limit: max_requests,
            remaining: max_requests - current.count,
            reset_at: current.window_reset_at,
        })
    }

    /// 只读查询，不创建也不修改窗口
    pub async fn peek_status(
        &self,
        key: &str,
        max_requests: u32,
        window: Duration,
    ) -> Result<QuotaStatus, RelayError> {
        let now = self.clock.now();
        let current = self.resolve_window(key, window, now).await?;
        Ok(QuotaStatus {
            limit: max_requests,
            remaining: max_requests.saturating_sub(current.count),
            reset_at: current.window_reset_at,
        })
    }

    pub async fn reset(&self, key: &str) -> Result<(), RelayError> {
        RateLimitCacheOperations::delete_window(self.store.as_ref(), key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::MemoryStore;
    use crate::clock::ManualClock;

    const WINDOW: Duration = Duration::from_secs(60);

    fn gate() -> (QuotaGate, ManualClock, Arc<MemoryStore>) {
        let clock = ManualClock::default();
        let store = Arc::new(MemoryStore::with_clock(Arc::new(clock.clone())));
        let gate = QuotaGate::new(store.clone(), Arc::new(clock.clone()));
        (gate, clock, store)
    }

    #[tokio::test]
    async fn test_consume_until_exceeded() {
        let (gate, _clock, _store) = gate();

        for expected in (0..10).rev() {
            let status = gate.check_and_consume("ip1", 10, WINDOW).await.unwrap();
            assert_eq!(status.remaining, expected);
            assert_eq!(status.limit, 10);
        }

        match gate.check_and_consume("ip1", 10, WINDOW).await {
            Err(RelayError::QuotaExceeded { count, .. }) => assert_eq!(count, 10),
            other => panic!("expected QuotaExceeded, got {:?}", other),
        }

        let status = gate.peek_status("ip1", 10, WINDOW).await.unwrap();
        assert_eq!(status.remaining, 0);
    }

    #[tokio::test]
    async fn test_rejection_does_not_mutate_window() {
        let (gate, _clock, _store) = gate();
        gate.check_and_consume("k", 1, WINDOW).await.unwrap();

        for _ in 0..3 {
            assert!(gate.check_and_consume("k", 1, WINDOW).await.is_err());
        }
        match gate.check_and_consume("k", 1, WINDOW).await {
            Err(RelayError::QuotaExceeded { count, .. }) => assert_eq!(count, 1),
            other => panic!("expected QuotaExceeded, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_window_resets_after_expiry() {
        let (gate, clock, _store) = gate();
        let first = gate.check_and_consume("k", 2, WINDOW).await.unwrap();
        gate.check_and_consume("k", 2, WINDOW).await.unwrap();
        assert!(gate.check_and_consume("k", 2, WINDOW).await.is_err());

        clock.set(first.reset_at);
        let status = gate.check_and_consume("k", 2, WINDOW).await.unwrap();
        assert_eq!(status.remaining, 1);
        assert!(status.reset_at > first.reset_at);
    }

    #[tokio::test]
    async fn test_boundary_is_treated_as_expired() {
        let (gate, clock, store) = gate();
        let now = clock.now();

        // 存储中的窗口还没被 TTL 清除，但逻辑上已到重置时间
        let stale = CachedRateWindow {
            key: "edge".to_string(),
            count: 5,
            window_reset_at: now,
        };
        RateLimitCacheOperations::set_window(store.as_ref(), &stale, Duration::from_secs(3600))
            .await
            .unwrap();

        let status = gate.check_and_consume("edge", 5, WINDOW).await.unwrap();
        assert_eq!(status.remaining, 4);
        assert_eq!(status.reset_at, now + chrono::Duration::seconds(60));
    }

    #[tokio::test]
    async fn test_window_entry_expires_at_original_reset() {
        let (gate, clock, store) = gate();
        let first = gate.check_and_consume("k", 5, WINDOW).await.unwrap();

        clock.advance(Duration::from_secs(20));
        let second = gate.check_and_consume("k", 5, WINDOW).await.unwrap();
        assert_eq!(second.reset_at, first.reset_at);

        clock.set(first.reset_at - chrono::Duration::seconds(1));
        assert!(store.get("ratelimit:k").await.unwrap().is_some());

        clock.set(first.reset_at);
        assert!(store.get("ratelimit:k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_window_starts_fresh() {
        let (gate, _clock, store) = gate();
        store
            .put("ratelimit:k", "{not json".to_string(), WINDOW)
            .await
            .unwrap();

        let status = gate.check_and_consume("k", 3, WINDOW).await.unwrap();
        assert_eq!(status.remaining, 2);

        let peeked = gate.peek_status("k", 3, WINDOW).await.unwrap();
        assert_eq!(peeked.remaining, 2);
    }

    #[tokio::test]
    async fn test_peek_is_side_effect_free() {
        let (gate, _clock, store) = gate();

        let peeked = gate.peek_status("k", 3, WINDOW).await.unwrap();
        assert_eq!(peeked.remaining, 3);
        assert!(store.list("ratelimit:").await.unwrap().is_empty());

        for _ in 0..5 {
            gate.peek_status("k", 3, WINDOW).await.unwrap();
        }
        let status = gate.check_and_consume("k", 3, WINDOW).await.unwrap();
        assert_eq!(status.remaining, 2);
        assert_eq!(gate.peek_status("k", 3, WINDOW).await.unwrap().remaining, 2);
    }

    #[tokio::test]
    async fn test_zero_max_always_rejects() {
        let (gate, _clock, _store) = gate();
        assert!(matches!(
            gate.check_and_consume("k", 0, WINDOW).await,
            Err(RelayError::QuotaExceeded { count: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_reset_clears_window() {
        let (gate, _clock, _store) = gate();
        gate.check_and_consume("k", 1, WINDOW).await.unwrap();
        assert!(gate.check_and_consume("k", 1, WINDOW).await.is_err());

        gate.reset("k").await.unwrap();
        assert!(gate.check_and_consume("k", 1, WINDOW).await.is_ok());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let (gate, _clock, _store) = gate();
        gate.check_and_consume("a", 1, WINDOW).await.unwrap();
        assert!(gate.check_and_consume("a", 1, WINDOW).await.is_err());
        assert!(gate.check_and_consume("b", 1, WINDOW).await.is_ok());
    }
}
