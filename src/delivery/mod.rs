//! 延迟投递队列
//!
//! 存储布局：`queue:<id>` → 消息 JSON，TTL 为兜底过期时间；
//! `claim:queue:<id>` → 投递认领标记，短 TTL。

mod mode;
mod queue;
mod sweep;

pub use mode::DeliveryMode;
pub use queue::{
    DEFAULT_CLAIM_TTL, DEFAULT_MESSAGE_TTL, DEFAULT_SWEEP_BUDGET, DeliveryOutcome, DeliveryQueue,
};
pub use sweep::{SweepReport, spawn_sweeper};
