//! The projector: routes decoded event envelopes to domain handlers.

use std::sync::Arc;

use futures::{Stream, StreamExt};
use tracing::{debug, error};

use entgraph_core::chain::{ChainReader, SourceRegistrar};
use entgraph_core::error::ProjectionError;
use entgraph_core::events::{EventEnvelope, TrackedEvent};
use entgraph_core::store::EntityStore;

/// Shared collaborators handed to every handler.
#[derive(Clone)]
pub struct Env {
    pub store: Arc<dyn EntityStore>,
    pub chain: Arc<dyn ChainReader>,
    pub sources: Arc<dyn SourceRegistrar>,
}

impl Env {
    pub fn new(
        store: Arc<dyn EntityStore>,
        chain: Arc<dyn ChainReader>,
        sources: Arc<dyn SourceRegistrar>,
    ) -> Self {
        Self {
            store,
            chain,
            sources,
        }
    }
}

/// Applies events to the entity graph, one at a time, in delivery order.
pub struct Projector {
    env: Env,
}

impl Projector {
    pub fn new(env: Env) -> Self {
        Self { env }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Apply a single envelope. Errors abort the event; the store is left
    /// as the last successful `put` wrote it.
    pub async fn apply(&self, envelope: &EventEnvelope) -> Result<(), ProjectionError> {
        let ctx = &envelope.ctx;
        debug!(
            emitter = %ctx.emitter,
            block = ctx.block_number,
            log_index = ctx.log_index,
            "applying event"
        );
        match &envelope.event {
            TrackedEvent::Factory { kind, event } => {
                crate::factory::handle(&self.env, ctx, *kind, event).await
            }
            TrackedEvent::NoticeBoard(event) => crate::notice::handle(&self.env, ctx, event).await,
            TrackedEvent::Sale(event) => crate::sale::handle(&self.env, ctx, event).await,
            TrackedEvent::Verify(event) => crate::verify::handle(&self.env, ctx, event).await,
            TrackedEvent::Redeemable(event) => {
                crate::redeemable::handle(&self.env, ctx, event).await
            }
            TrackedEvent::Erc20(event) => crate::erc20::handle(&self.env, ctx, event).await,
            TrackedEvent::CombineTier(event) => crate::tier::handle_combine(&self.env, ctx, event).await,
            TrackedEvent::VerifyTier(event) => crate::tier::handle_verify(&self.env, ctx, event).await,
            TrackedEvent::Stake(event) => crate::stake::handle(&self.env, ctx, event).await,
            TrackedEvent::Emissions(event) => crate::emissions::handle(&self.env, ctx, event).await,
            TrackedEvent::GatedNft(event) => crate::gated_nft::handle(&self.env, ctx, event).await,
            TrackedEvent::Escrow(event) => crate::escrow::handle(&self.env, ctx, event).await,
            TrackedEvent::OrderBook(event) => crate::orderbook::handle(&self.env, ctx, event).await,
        }
    }

    /// Drain a stream of envelopes, stopping at the first fatal error.
    pub async fn run<S>(&self, stream: S) -> Result<(), ProjectionError>
    where
        S: Stream<Item = EventEnvelope>,
    {
        futures::pin_mut!(stream);
        while let Some(envelope) = stream.next().await {
            if let Err(e) = self.apply(&envelope).await {
                error!(
                    emitter = %envelope.ctx.emitter,
                    block = envelope.ctx.block_number,
                    log_index = envelope.ctx.log_index,
                    error = %e,
                    "event aborted"
                );
                return Err(e);
            }
        }
        Ok(())
    }
}
