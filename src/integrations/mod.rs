//! 外部能力：语言模型改写和邮件投递
//!
//! 核心逻辑只依赖 `Transformer` 和 `Deliverer` 两个 trait，具体服务在启动时按配置选择。

mod openai;
mod resend;

pub use openai::{OpenAiTransformer, PassthroughTransformer};
pub use resend::{LogDeliverer, ResendDeliverer};

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::Config;
use crate::error::RelayError;

/// 投递前的文本改写，由调用方在入队前调用
#[async_trait]
pub trait Transformer: Send + Sync {
    async fn transform(&self, text: &str) -> Result<String, RelayError>;
}

/// 把最终文本送达收件人，只由投递队列调用
#[async_trait]
pub trait Deliverer: Send + Sync {
    async fn deliver(&self, text: &str) -> Result<(), RelayError>;
}

/// 按配置选择改写服务，未配置密钥时原样透传
pub fn transformer_from_config(config: &Config) -> Arc<dyn Transformer> {
    match &config.openai_api_key {
        Some(api_key) => Arc::new(OpenAiTransformer::new(
            config.openai_base_url.clone(),
            api_key.clone(),
            config.openai_model.clone(),
        )),
        None => {
            tracing::warn!("OPENAI_API_KEY not set, messages will be relayed without rewriting");
            Arc::new(PassthroughTransformer)
        }
    }
}

/// 按配置选择投递服务，未配置密钥时只写日志
pub fn deliverer_from_config(config: &Config) -> Arc<dyn Deliverer> {
    match &config.resend_api_key {
        Some(api_key) => Arc::new(ResendDeliverer::new(
            api_key.clone(),
            config.relay_from.clone(),
            config.relay_to.clone(),
            config.relay_subject.clone(),
        )),
        None => {
            tracing::warn!("RESEND_API_KEY not set, deliveries will only be logged");
            Arc::new(LogDeliverer)
        }
    }
}
