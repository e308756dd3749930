/// 缓存操作
/// 在 KvStore 之上读写限流窗口和待投递消息

// 限流窗口缓存操作
pub mod rate_limit;

// 投递队列缓存操作
pub mod queue;

pub use queue::QueueCacheOperations;
pub use rate_limit::RateLimitCacheOperations;
