use axum::{
    Router,
    routing::{get, post},
};

use crate::{
    AppState,
    middleware::{log_errors, quota_guard},
    routes,
};

// 提交路由，经过配额闸门
fn message_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/messages/submit", post(routes::message::submit_message))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            quota_guard,
        ))
}

// 配额查询路由
fn quota_routes() -> Router<AppState> {
    Router::new().route("/quota/status", get(routes::quota::quota_status))
}

// 定时任务路由
fn cron_routes() -> Router<AppState> {
    Router::new().route(
        "/cron/sweep",
        post(routes::cron::sweep_queue).get(routes::cron::sweep_queue),
    )
}

// 创建主路由
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .merge(message_routes(&state))
        .merge(quota_routes())
        .merge(cron_routes());

    // axum 不允许在根路径 nest
    let base = state.config.api_base_uri.trim_end_matches('/');
    let router = if base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(base, api)
    };
    let router = router.layer(axum::middleware::from_fn(log_errors));

    // 根据编译模式决定是否添加CORS
    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        router.layer(tower_http::cors::CorsLayer::permissive())
    };

    router.with_state(state)
}
