/// 限流窗口缓存键前缀
pub const RATE_LIMIT_PREFIX: &str = "ratelimit:";

/// 生成限流窗口缓存键
pub fn rate_limit_key(identity: &str) -> String {
    format!("{}{}", RATE_LIMIT_PREFIX, identity)
}
