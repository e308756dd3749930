//! 键值存储抽象
//!
//! 限流窗口和投递队列只通过 `KvStore` 读写，不假设任何事务或多键原子性。
//! 读改写之间的竞态由具体实现决定能否消除：`put_if_absent` 默认是非原子的
//! 先读后写，Redis 实现用 `SET NX PX` 覆盖为原子操作。

mod memory_store;
mod redis_store;

pub use memory_store::MemoryStore;
pub use redis_store::RedisStore;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// 写入并设置过期时间，ttl 为零时按 1 毫秒处理
    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), StoreError>;

    /// 键不存在时写入，返回是否写入成功
    async fn put_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        if self.get(key).await?.is_some() {
            return Ok(false);
        }
        self.put(key, value, ttl).await?;
        Ok(true)
    }

    /// 删除不存在的键不算错误
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn list(&self, prefix: &str) -> Result<Vec<String>, StoreError>;
}

/// 存储层统一使用的毫秒级 TTL，至少 1 毫秒
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_millis_rounds_up_zero() {
        assert_eq!(ttl_millis(Duration::ZERO), 1);
        assert_eq!(ttl_millis(Duration::from_secs(2)), 2000);
    }
}
