use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use crate::{
    AppState,
    error::RelayError,
    middleware::{ClientIdentity, apply_rate_limit_headers},
    utils::success_to_api_response,
};

/// 查询当前配额，不消耗配额
#[axum::debug_handler]
pub async fn quota_status(
    State(state): State<AppState>,
    ClientIdentity(identity): ClientIdentity,
) -> Result<impl IntoResponse, RelayError> {
    let status = state
        .gate
        .peek_status(
            &identity,
            state.config.rate_limit_requests,
            state.config.rate_limit_window(),
        )
        .await?;

    let mut headers = HeaderMap::new();
    apply_rate_limit_headers(&mut headers, &status);
    Ok((StatusCode::OK, headers, success_to_api_response(status)))
}
