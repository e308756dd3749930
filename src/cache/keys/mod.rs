/// 缓存键模块
/// 提供限流窗口和投递队列的键生成函数

// 限流窗口键模块
pub mod rate_limit_keys;

// 投递队列键模块
pub mod queue_keys;

pub use queue_keys::{QUEUE_PREFIX, claim_key, queue_id_from_key, queue_key};
pub use rate_limit_keys::{RATE_LIMIT_PREFIX, rate_limit_key};
