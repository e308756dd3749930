// 缓存模块
// 包含键值存储抽象、缓存数据结构和操作逻辑

pub mod keys;
pub mod models;
pub mod operations;
pub mod store;

// 重新导出常用类型和函数，方便其他模块使用
pub use models::{CachedQueuedMessage, CachedRateWindow};
pub use operations::{QueueCacheOperations, RateLimitCacheOperations};
pub use store::{KvStore, MemoryStore, RedisStore};
