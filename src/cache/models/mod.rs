/// 缓存数据模型
/// 定义写入键值存储的结构体

// 限流窗口模型
pub mod rate_limit;

// 待投递消息模型
pub mod queue;

pub use queue::CachedQueuedMessage;
pub use rate_limit::CachedRateWindow;
