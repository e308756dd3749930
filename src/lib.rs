use std::sync::Arc;

use cache::store::KvStore;
use clock::Clock;
use config::Config;
use delivery::DeliveryQueue;
use integrations::{Deliverer, Transformer};
use quota::QuotaGate;

pub mod cache;
pub mod clock;
pub mod config;
pub mod delivery;
pub mod error;
pub mod integrations;
pub mod middleware;
pub mod quota;
pub mod router;
pub mod routes;
pub mod utils;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub gate: Arc<QuotaGate>,
    pub queue: Arc<DeliveryQueue>,
    pub transformer: Arc<dyn Transformer>,
}

impl AppState {
    /// 限流闸门和投递队列共用同一个存储和时钟
    pub fn new(
        config: Config,
        store: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
        transformer: Arc<dyn Transformer>,
        deliverer: Arc<dyn Deliverer>,
    ) -> Self {
        let gate = QuotaGate::new(store.clone(), clock.clone());
        let queue = DeliveryQueue::new(store, clock.clone(), deliverer)
            .with_message_ttl(config.message_ttl())
            .with_claim_ttl(config.claim_ttl())
            .with_sweep_budget(config.sweep_budget());

        Self {
            config,
            clock,
            gate: Arc::new(gate),
            queue: Arc::new(queue),
            transformer,
        }
    }
}
