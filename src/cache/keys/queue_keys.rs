/// 待投递消息缓存键前缀
pub const QUEUE_PREFIX: &str = "queue:";

/// 投递认领标记前缀，不能落在 QUEUE_PREFIX 之下
const CLAIM_PREFIX: &str = "claim:queue:";

/// 生成待投递消息缓存键
pub fn queue_key(id: &str) -> String {
    format!("{}{}", QUEUE_PREFIX, id)
}

/// 生成投递认领标记键
pub fn claim_key(id: &str) -> String {
    format!("{}{}", CLAIM_PREFIX, id)
}

/// 从队列键中取回消息ID
pub fn queue_id_from_key(key: &str) -> Option<&str> {
    key.strip_prefix(QUEUE_PREFIX).filter(|id| !id.is_empty())
}
