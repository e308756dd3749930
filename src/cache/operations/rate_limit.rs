use std::time::Duration;

use crate::cache::keys::rate_limit_key;
use crate::cache::models::rate_limit::CachedRateWindow;
use crate::cache::store::KvStore;
use crate::error::StoreError;

/// 限流窗口缓存操作
pub struct RateLimitCacheOperations;

impl RateLimitCacheOperations {
    /// 获取限流窗口，无法解析的窗口按不存在处理，下一次写入会覆盖它
    pub async fn get_window(
        store: &dyn KvStore,
        identity: &str,
    ) -> Result<Option<CachedRateWindow>, StoreError> {
        let Some(json) = store.get(&rate_limit_key(identity)).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&json) {
            Ok(window) => Ok(Some(window)),
            Err(e) => {
                tracing::warn!(identity = %identity, "discarding unreadable rate limit window: {}", e);
                Ok(None)
            }
        }
    }

    /// 写入限流窗口，ttl 为窗口剩余时长，由存储自动清除过期窗口
    pub async fn set_window(
        store: &dyn KvStore,
        window: &CachedRateWindow,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(window)?;
        store.put(&rate_limit_key(&window.key), json, ttl).await
    }

    /// 删除限流窗口
    pub async fn delete_window(store: &dyn KvStore, identity: &str) -> Result<(), StoreError> {
        store.delete(&rate_limit_key(identity)).await
    }
}
