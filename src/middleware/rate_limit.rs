use std::convert::Infallible;
use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, FromRequestParts, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::{AppState, error::RelayError, quota::QuotaStatus, utils::hash_identity};

const SESSION_HEADER: &str = "x-session-token";
const SESSION_COOKIE: &str = "relay_session";

/// 解析客户端IP：x-real-ip，其次 x-forwarded-for 第一个非空项，最后是连接地址
fn client_ip(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    let remote_ip = remote.map(|addr| addr.ip().to_string());
    headers
        .get("x-real-ip")
        .and_then(|h| h.to_str().ok())
        .filter(|ip| !ip.trim().is_empty())
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|h| h.to_str().ok())
                .and_then(|s| s.split(',').find(|ip| !ip.trim().is_empty()))
        })
        .or(remote_ip.as_deref()) // 降级使用连接IP
        .unwrap_or("unknown")
        .trim()
        .to_string()
}

/// 会话令牌：请求头优先，其次 cookie
fn session_token(headers: &HeaderMap) -> String {
    headers
        .get(SESSION_HEADER)
        .and_then(|h| h.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            CookieJar::from_headers(headers)
                .get(SESSION_COOKIE)
                .map(|c| c.value().to_string())
                .filter(|s| !s.is_empty())
        })
        .unwrap_or_else(|| "anonymous".to_string())
}

/// 由网络地址和会话令牌组合出限流身份，只保存哈希
pub fn client_identity(headers: &HeaderMap, remote: Option<SocketAddr>) -> String {
    hash_identity(&client_ip(headers, remote), &session_token(headers))
}

/// 限流身份提取器
#[derive(Debug, Clone)]
pub struct ClientIdentity(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientIdentity {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ci| ci.0);
        Ok(ClientIdentity(client_identity(&parts.headers, remote)))
    }
}

/// 写入 x-ratelimit-* 响应头
pub fn apply_rate_limit_headers(headers: &mut HeaderMap, status: &QuotaStatus) {
    headers.insert(
        HeaderName::from_static("x-ratelimit-limit"),
        HeaderValue::from(status.limit),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-remaining"),
        HeaderValue::from(status.remaining),
    );
    headers.insert(
        HeaderName::from_static("x-ratelimit-reset"),
        HeaderValue::from(status.reset_at.timestamp()),
    );
}

/// 提交接口的配额闸门，放行时把 `QuotaStatus` 放进请求扩展供处理器使用
pub async fn quota_guard(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let remote = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0);
    let identity = client_identity(req.headers(), remote);

    let result = state
        .gate
        .check_and_consume(
            &identity,
            state.config.rate_limit_requests,
            state.config.rate_limit_window(),
        )
        .await;

    match result {
        Ok(status) => {
            req.extensions_mut().insert(status);
            let mut response = next.run(req).await;
            apply_rate_limit_headers(response.headers_mut(), &status);
            response
        }
        Err(RelayError::QuotaExceeded { count, reset_at }) => {
            let status = QuotaStatus {
                limit: state.config.rate_limit_requests,
                remaining: 0,
                reset_at,
            };
            let retry_after = (reset_at - state.clock.now()).num_seconds().max(0);
            let mut response = RelayError::QuotaExceeded { count, reset_at }.into_response();
            apply_rate_limit_headers(response.headers_mut(), &status);
            response
                .headers_mut()
                .insert(axum::http::header::RETRY_AFTER, HeaderValue::from(retry_after));
            response
        }
        // 存储不可用时拒绝请求
        Err(e) => {
            tracing::error!("quota check failed: {}", e);
            e.into_response()
        }
    }
}
