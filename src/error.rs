use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::utils::{error_codes, error_to_api_response};

/// 键值存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("quota exceeded: {count} requests in current window, resets at {reset_at}")]
    QuotaExceeded {
        count: u32,
        reset_at: DateTime<Utc>,
    },
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
    #[error("delivery of {id} failed: {reason}")]
    DeliveryFailed { id: String, reason: String },
    #[error("{service} request failed: {reason}")]
    Upstream {
        service: &'static str,
        reason: String,
    },
    #[error("invalid request: {0}")]
    Validation(String),
}

impl RelayError {
    pub fn upstream(service: &'static str, reason: impl ToString) -> Self {
        RelayError::Upstream {
            service,
            reason: reason.to_string(),
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            RelayError::QuotaExceeded { .. } => {
                (StatusCode::TOO_MANY_REQUESTS, error_codes::RATE_LIMIT)
            }
            RelayError::Validation(_) => (StatusCode::BAD_REQUEST, error_codes::VALIDATION_ERROR),
            RelayError::StoreUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, error_codes::STORE_UNAVAILABLE)
            }
            RelayError::Upstream { .. } | RelayError::DeliveryFailed { .. } => {
                (StatusCode::BAD_GATEWAY, error_codes::UPSTREAM_ERROR)
            }
        };

        let msg = match &self {
            RelayError::QuotaExceeded { reset_at, .. } => {
                format!("请求过于频繁，请在 {} 之后重试", reset_at.to_rfc3339())
            }
            RelayError::Validation(reason) => reason.clone(),
            // 内部错误细节只写日志，不返回给调用方
            RelayError::StoreUnavailable(_) => "服务暂时不可用".to_string(),
            RelayError::Upstream { .. } | RelayError::DeliveryFailed { .. } => {
                "上游服务调用失败".to_string()
            }
        };

        (status, error_to_api_response::<()>(code, msg)).into_response()
    }
}
