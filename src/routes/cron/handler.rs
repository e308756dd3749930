use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};

use super::model::SweepResponse;
use crate::{
    AppState,
    utils::{error_codes, error_to_api_response, success_to_api_response, tokens_match},
};

/// 定时任务入口：扫描队列并投递到期消息。配置了 CRON_SECRET 时要求 Bearer 认证
#[axum::debug_handler]
pub async fn sweep_queue(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
) -> Response {
    if let Some(secret) = &state.config.cron_secret {
        let authorized = auth
            .as_ref()
            .is_some_and(|TypedHeader(header)| tokens_match(header.token(), secret));
        if !authorized {
            tracing::warn!("Rejected unauthorized sweep trigger");
            return (
                StatusCode::UNAUTHORIZED,
                error_to_api_response::<()>(error_codes::AUTH_FAILED, "未授权访问".to_string()),
            )
                .into_response();
        }
    }

    match state.queue.sweep().await {
        Ok(report) => (
            StatusCode::OK,
            success_to_api_response(SweepResponse::from(&report)),
        )
            .into_response(),
        Err(e) => {
            tracing::error!("Sweep failed: {}", e);
            e.into_response()
        }
    }
}
