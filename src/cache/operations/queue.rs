use std::time::Duration;

use crate::cache::keys::{QUEUE_PREFIX, claim_key, queue_id_from_key, queue_key};
use crate::cache::models::queue::CachedQueuedMessage;
use crate::cache::store::KvStore;
use crate::error::StoreError;

/// 投递队列缓存操作
pub struct QueueCacheOperations;

impl QueueCacheOperations {
    /// 缓存待投递消息，ttl 为兜底过期时间，与计划投递时间无关
    pub async fn put_message(
        store: &dyn KvStore,
        message: &CachedQueuedMessage,
        ttl: Duration,
    ) -> Result<(), StoreError> {
        let json = serde_json::to_string(message)?;
        store.put(&queue_key(&message.id), json, ttl).await
    }

    /// 获取待投递消息
    pub async fn get_message(
        store: &dyn KvStore,
        id: &str,
    ) -> Result<Option<CachedQueuedMessage>, StoreError> {
        match store.get(&queue_key(id)).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// 删除消息
    pub async fn delete_message(store: &dyn KvStore, id: &str) -> Result<(), StoreError> {
        store.delete(&queue_key(id)).await
    }

    /// 列出队列中所有消息ID
    pub async fn list_ids(store: &dyn KvStore) -> Result<Vec<String>, StoreError> {
        let keys = store.list(QUEUE_PREFIX).await?;
        Ok(keys
            .iter()
            .filter_map(|key| queue_id_from_key(key))
            .map(str::to_string)
            .collect())
    }

    /// 认领一条消息的投递权，已被其他路径认领时返回 false
    pub async fn claim(
        store: &dyn KvStore,
        id: &str,
        owner: &str,
        ttl: Duration,
    ) -> Result<bool, StoreError> {
        store.put_if_absent(&claim_key(id), owner.to_string(), ttl).await
    }

    /// 释放认领，仅当认领仍属于 owner 时删除，过期后被他人重新认领的标记保持不动
    pub async fn release(store: &dyn KvStore, id: &str, owner: &str) -> Result<bool, StoreError> {
        let key = claim_key(id);
        match store.get(&key).await? {
            Some(current) if current == owner => {
                store.delete(&key).await?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
