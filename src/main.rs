use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use relay_backend::{
    AppState,
    cache::store::RedisStore,
    clock::SystemClock,
    config::Config,
    delivery::{DeliveryMode, spawn_sweeper},
    integrations::{deliverer_from_config, transformer_from_config},
    router::create_router,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // 初始化日志
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 加载配置
    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        env = ?config.app_env,
        mode = ?DeliveryMode::from_config(&config),
        "Delivery scheduling configured"
    );

    // 设置 Redis 客户端
    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");
    let store = Arc::new(RedisStore::new(Arc::new(redis_client)));

    // 设置应用状态
    let state = AppState::new(
        config.clone(),
        store,
        Arc::new(SystemClock),
        transformer_from_config(&config),
        deliverer_from_config(&config),
    );

    // 进程内定时扫描只是补充，外部定时任务仍应调用 /cron/sweep
    if config.sweep_interval_secs > 0 {
        tracing::info!("In-process sweeper every {}s", config.sweep_interval_secs);
        spawn_sweeper(
            state.queue.clone(),
            Duration::from_secs(config.sweep_interval_secs),
        );
    }
    if config.cron_secret.is_none() {
        tracing::warn!("CRON_SECRET not set, sweep endpoint is unauthenticated");
    }

    let app = create_router(state);

    // 启动服务器
    let addr = SocketAddr::new(
        config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
