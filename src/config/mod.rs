use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::delivery::DeliveryMode;

/// 运行环境，决定默认的投递抖动区间
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnv {
    Production,
    Staging,
    Development,
}

impl FromStr for AppEnv {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Ok(AppEnv::Production),
            "staging" | "preview" => Ok(AppEnv::Staging),
            "development" | "dev" | "local" => Ok(AppEnv::Development),
            other => Err(format!("unknown APP_ENV: {}", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub redis_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub api_base_uri: String,
    pub app_env: AppEnv,

    // 限流
    pub rate_limit_window_secs: u64,
    pub rate_limit_requests: u32,

    // 投递调度
    pub deliver_immediately: bool,
    pub delivery_delay_secs: Option<u64>,
    pub jitter_min_secs: Option<u64>,
    pub jitter_max_secs: Option<u64>,
    pub queue_ttl_secs: u64,
    pub claim_ttl_secs: u64,
    pub sweep_budget_secs: u64,
    pub sweep_interval_secs: u64,
    pub cron_secret: Option<String>,

    // 外部服务
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_base_url: String,
    pub resend_api_key: Option<String>,
    pub relay_from: String,
    pub relay_to: String,
    pub relay_subject: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            redis_url: "redis://127.0.0.1/".to_string(),
            server_host: "::".to_string(),
            server_port: 3000,
            api_base_uri: "/api".to_string(),
            app_env: AppEnv::Development,
            rate_limit_window_secs: 3600,
            rate_limit_requests: 10,
            deliver_immediately: false,
            delivery_delay_secs: None,
            jitter_min_secs: None,
            jitter_max_secs: None,
            queue_ttl_secs: 24 * 3600,
            claim_ttl_secs: 120,
            sweep_budget_secs: 50,
            sweep_interval_secs: 0,
            cron_secret: None,
            openai_api_key: None,
            openai_model: "gpt-4o-mini".to_string(),
            openai_base_url: "https://api.openai.com/v1".to_string(),
            resend_api_key: None,
            relay_from: "relay@localhost".to_string(),
            relay_to: "inbox@localhost".to_string(),
            relay_subject: "New anonymous message".to_string(),
        }
    }
}

/// 读取可选环境变量，空字符串视为未设置
fn optional(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// 读取数值型环境变量，无法解析时使用默认值
fn parsed_or<T: FromStr>(name: &str, default: T) -> T {
    optional(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn flag(name: &str) -> bool {
    matches!(
        optional(name).as_deref().map(str::to_ascii_lowercase).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenv::dotenv().ok();

        let defaults = Config::default();
        let app_env = optional("APP_ENV")
            .and_then(|v| match v.parse() {
                Ok(app_env) => Some(app_env),
                Err(e) => {
                    tracing::warn!("{}, falling back to development", e);
                    None
                }
            })
            .unwrap_or(defaults.app_env);

        Ok(Config {
            redis_url: env::var("REDIS_URL")?,
            server_host: optional("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: parsed_or("SERVER_PORT", defaults.server_port),
            api_base_uri: optional("API_BASE_URI").unwrap_or(defaults.api_base_uri),
            app_env,
            rate_limit_window_secs: parsed_or("RATE_LIMIT_WINDOW", defaults.rate_limit_window_secs),
            rate_limit_requests: parsed_or("RATE_LIMIT_REQUESTS", defaults.rate_limit_requests),
            deliver_immediately: flag("DELIVER_IMMEDIATELY"),
            delivery_delay_secs: optional("DELIVERY_DELAY_SECS").and_then(|v| v.parse().ok()),
            jitter_min_secs: optional("JITTER_MIN_SECS").and_then(|v| v.parse().ok()),
            jitter_max_secs: optional("JITTER_MAX_SECS").and_then(|v| v.parse().ok()),
            queue_ttl_secs: parsed_or("QUEUE_TTL_SECS", defaults.queue_ttl_secs),
            claim_ttl_secs: parsed_or("CLAIM_TTL_SECS", defaults.claim_ttl_secs),
            sweep_budget_secs: parsed_or("SWEEP_BUDGET_SECS", defaults.sweep_budget_secs),
            sweep_interval_secs: parsed_or("SWEEP_INTERVAL_SECS", defaults.sweep_interval_secs),
            cron_secret: optional("CRON_SECRET"),
            openai_api_key: optional("OPENAI_API_KEY"),
            openai_model: optional("OPENAI_MODEL").unwrap_or(defaults.openai_model),
            openai_base_url: optional("OPENAI_BASE_URL").unwrap_or(defaults.openai_base_url),
            resend_api_key: optional("RESEND_API_KEY"),
            relay_from: optional("RELAY_FROM").unwrap_or(defaults.relay_from),
            relay_to: optional("RELAY_TO").unwrap_or(defaults.relay_to),
            relay_subject: optional("RELAY_SUBJECT").unwrap_or(defaults.relay_subject),
        })
    }

    pub fn rate_limit_window(&self) -> Duration {
        Duration::from_secs(self.rate_limit_window_secs)
    }

    pub fn queue_ttl(&self) -> Duration {
        Duration::from_secs(self.queue_ttl_secs)
    }

    /// 消息实际使用的兜底过期时间，至少覆盖最长投递延迟加一个认领周期，
    /// 否则消息会在到期之前被存储清除
    pub fn message_ttl(&self) -> Duration {
        let required = DeliveryMode::from_config(self)
            .max_delay()
            .saturating_add(self.claim_ttl());
        let configured = self.queue_ttl();
        if configured < required {
            tracing::warn!(
                queue_ttl_secs = configured.as_secs(),
                required_secs = required.as_secs(),
                "QUEUE_TTL_SECS is shorter than the longest delivery delay, raising it"
            );
            return required;
        }
        configured
    }

    pub fn claim_ttl(&self) -> Duration {
        Duration::from_secs(self.claim_ttl_secs)
    }

    pub fn sweep_budget(&self) -> Duration {
        Duration::from_secs(self.sweep_budget_secs)
    }

    /// 默认抖动区间：生产环境 1~6 小时，预发 1~5 分钟，开发 0~30 秒
    pub fn jitter_range(&self) -> (Duration, Duration) {
        let (min, max) = match self.app_env {
            AppEnv::Production => (3600, 6 * 3600),
            AppEnv::Staging => (60, 300),
            AppEnv::Development => (0, 30),
        };
        (
            Duration::from_secs(self.jitter_min_secs.unwrap_or(min)),
            Duration::from_secs(self.jitter_max_secs.unwrap_or(max)),
        )
    }
}
