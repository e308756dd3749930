use axum::{
    extract::{Extension, Json, State},
    http::StatusCode,
};

use super::model::{SubmitMessageRequest, SubmitMessageResponse};
use crate::{
    AppState,
    delivery::DeliveryMode,
    error::RelayError,
    quota::QuotaStatus,
    utils::{ApiResponse, success_to_api_response},
};

/// 提交一条匿名消息：改写后入队，由即时尝试或定时扫描投递
#[axum::debug_handler]
pub async fn submit_message(
    State(state): State<AppState>,
    Extension(quota): Extension<QuotaStatus>,
    Json(req): Json<SubmitMessageRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubmitMessageResponse>>), RelayError> {
    let message = req.message.trim();
    if message.is_empty() {
        return Err(RelayError::Validation("消息内容不能为空".to_string()));
    }

    let rewritten = state.transformer.transform(message).await.map_err(|e| {
        tracing::error!("Failed to transform message: {}", e);
        e
    })?;

    let mode = DeliveryMode::from_config(&state.config);
    let id = state.queue.enqueue(rewritten, mode).await.map_err(|e| {
        tracing::error!("Failed to enqueue message: {}", e);
        e
    })?;

    // 未到期时这是空操作，投递留给扫描
    state.queue.spawn_attempt(id);

    Ok((
        StatusCode::CREATED,
        success_to_api_response(SubmitMessageResponse {
            queued: true,
            remaining: quota.remaining,
            reset_at: quota.reset_at,
        }),
    ))
}
