//! Event handlers projecting tracked contract logs into the entity graph.
//!
//! Each module owns one contract family's events. Handlers receive an
//! [`engine::Env`] (store, chain reader, source registrar) and a decoded
//! event, and mutate the graph through typed get/put only. The
//! [`engine::Projector`] dispatches envelopes to the right module in
//! delivery order.

pub mod emissions;
pub mod engine;
pub mod erc20;
pub mod escrow;
pub mod factory;
pub mod gated_nft;
pub mod notice;
pub mod orderbook;
pub mod redeemable;
pub mod resolver;
pub mod sale;
pub mod stake;
pub mod tier;
pub mod verify;

pub use engine::{Env, Projector};

#[cfg(test)]
pub(crate) mod testutil {
    use std::sync::Arc;

    use entgraph_store::{MemoryStore, MockChain, RecordingSources};

    use crate::engine::Env;

    pub struct Harness {
        pub env: Env,
        pub store: Arc<MemoryStore>,
        pub chain: Arc<MockChain>,
        pub sources: Arc<RecordingSources>,
    }

    pub fn harness() -> Harness {
        let store = Arc::new(MemoryStore::new());
        let chain = Arc::new(MockChain::new());
        let sources = Arc::new(RecordingSources::new());
        let env = Env::new(store.clone(), chain.clone(), sources.clone());
        Harness {
            env,
            store,
            chain,
            sources,
        }
    }

    pub fn test_env() -> Env {
        harness().env
    }
}
