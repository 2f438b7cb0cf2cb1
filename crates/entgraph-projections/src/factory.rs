//! Factory handlers: child bookkeeping and entity bootstrap.
//!
//! `NewChild` is the single discovery point for tracked child contracts.
//! The child's entity is created immediately (so later events always find
//! it) and its address is registered as a dynamic source.

use tracing::debug;

use entgraph_core::entities::emissions::EmissionsErc20;
use entgraph_core::entities::factory::{Factory, FactoryKind};
use entgraph_core::entities::gated_nft::GatedNft;
use entgraph_core::entities::sale::Sale;
use entgraph_core::entities::stake::StakeErc20;
use entgraph_core::entities::tier::{CombineTier, VerifyTier};
use entgraph_core::entities::verify::Verify;
use entgraph_core::error::ProjectionError;
use entgraph_core::event::EventCtx;
use entgraph_core::events::FactoryEvent;
use entgraph_core::store::EntityStoreExt;

use crate::engine::Env;

pub async fn handle(
    env: &Env,
    ctx: &EventCtx,
    kind: FactoryKind,
    event: &FactoryEvent,
) -> Result<(), ProjectionError> {
    match event {
        FactoryEvent::NewChild { sender, child } => {
            handle_new_child(env, ctx, kind, sender, child).await
        }
        FactoryEvent::Implementation { implementation } => {
            let mut factory = load_or_create(env, &ctx.emitter, kind).await?;
            factory.implementation = Some(implementation.clone());
            env.store.save(&factory).await?;
            Ok(())
        }
    }
}

pub(crate) async fn load_or_create(
    env: &Env,
    address: &str,
    kind: FactoryKind,
) -> Result<Factory, ProjectionError> {
    let factory: Option<Factory> = env.store.load(address).await?;
    Ok(factory.unwrap_or_else(|| Factory::new(address, kind)))
}

async fn handle_new_child(
    env: &Env,
    ctx: &EventCtx,
    kind: FactoryKind,
    sender: &str,
    child: &str,
) -> Result<(), ProjectionError> {
    debug!(factory = %ctx.emitter, child = %child, kind = kind.name(), "new child");

    let mut factory = load_or_create(env, &ctx.emitter, kind).await?;
    factory.add_child(child);
    env.store.save(&factory).await?;

    let block = ctx.block_number;
    let ts = ctx.block_timestamp;
    match kind {
        FactoryKind::Sale => {
            env.store
                .save(&Sale::new(child, block, ts, sender, &ctx.emitter))
                .await?;
        }
        FactoryKind::Verify => {
            env.store
                .save(&Verify::new(child, block, ts, sender, &ctx.emitter))
                .await?;
        }
        FactoryKind::CombineTier => {
            env.store
                .save(&CombineTier::new(child, block, ts, sender, &ctx.emitter))
                .await?;
        }
        FactoryKind::VerifyTier => {
            env.store
                .save(&VerifyTier::new(child, block, ts, sender, &ctx.emitter))
                .await?;
        }
        FactoryKind::EmissionsErc20 => {
            let mut emissions = EmissionsErc20::new(child, block, ts, sender, &ctx.emitter);
            emissions.name = env.chain.erc20_name(child).await;
            emissions.symbol = env.chain.erc20_symbol(child).await;
            emissions.decimals = env.chain.erc20_decimals(child).await;
            if let Some(supply) = env.chain.erc20_total_supply(child).await {
                emissions.total_supply = supply;
            }
            env.store.save(&emissions).await?;
        }
        FactoryKind::StakeErc20 => {
            let mut stake = StakeErc20::new(child, block, ts, sender, &ctx.emitter);
            stake.name = env.chain.erc20_name(child).await;
            stake.symbol = env.chain.erc20_symbol(child).await;
            stake.decimals = env.chain.erc20_decimals(child).await;
            if let Some(supply) = env.chain.erc20_total_supply(child).await {
                stake.total_supply = supply;
            }
            env.store.save(&stake).await?;
        }
        FactoryKind::GatedNft => {
            // Config arrives in the factory's Created event; the entity
            // exists from here so transfers in the same block resolve.
            let mut nft = GatedNft::new(child, block, ts, sender, &ctx.emitter);
            nft.owner = env.chain.contract_owner(child).await;
            env.store.save(&nft).await?;
        }
    }

    env.sources.register(child).await;
    Ok(())
}
