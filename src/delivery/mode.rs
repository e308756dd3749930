use std::time::Duration;

use rand::Rng;

use crate::config::Config;

/// 投递时间策略
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// 立即投递，调试和测试路径使用
    Immediate,
    /// 固定延迟，运维配置了延迟覆盖时使用
    FixedDelay(Duration),
    /// 在 [min, max] 内均匀随机延迟，默认的匿名化行为
    RandomJitter { min: Duration, max: Duration },
}

impl DeliveryMode {
    pub fn from_config(config: &Config) -> Self {
        if config.deliver_immediately {
            return DeliveryMode::Immediate;
        }
        if let Some(secs) = config.delivery_delay_secs {
            return DeliveryMode::FixedDelay(Duration::from_secs(secs));
        }
        let (min, max) = config.jitter_range();
        DeliveryMode::jitter(min, max)
    }

    /// 构造随机抖动策略，区间颠倒时自动交换
    pub fn jitter(min: Duration, max: Duration) -> Self {
        if min <= max {
            DeliveryMode::RandomJitter { min, max }
        } else {
            DeliveryMode::RandomJitter { min: max, max: min }
        }
    }

    /// 该策略可能产生的最长延迟
    pub fn max_delay(&self) -> Duration {
        match *self {
            DeliveryMode::Immediate => Duration::ZERO,
            DeliveryMode::FixedDelay(d) => d,
            DeliveryMode::RandomJitter { min, max } => min.max(max),
        }
    }

    /// 计算本次投递的延迟
    pub fn delay<R: Rng + ?Sized>(&self, rng: &mut R) -> Duration {
        match *self {
            DeliveryMode::Immediate => Duration::ZERO,
            DeliveryMode::FixedDelay(d) => d,
            DeliveryMode::RandomJitter { min, max } => {
                let (lo, hi) = if min <= max { (min, max) } else { (max, min) };
                let lo_ms = u64::try_from(lo.as_millis()).unwrap_or(u64::MAX);
                let hi_ms = u64::try_from(hi.as_millis()).unwrap_or(u64::MAX);
                Duration::from_millis(rng.gen_range(lo_ms..=hi_ms))
            }
        }
    }
}
