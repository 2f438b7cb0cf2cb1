//! Tier contract handlers.

use alloy_primitives::U256;

use entgraph_core::entities::tier::{CombineTier, VerifyTier};
use entgraph_core::entities::verify::Verify;
use entgraph_core::error::ProjectionError;
use entgraph_core::event::EventCtx;
use entgraph_core::events::{CombineTierEvent, VerifyTierEvent};
use entgraph_core::store::EntityStoreExt;
use entgraph_core::ZERO_ADDRESS;

use crate::engine::Env;

pub async fn handle_combine(
    env: &Env,
    ctx: &EventCtx,
    event: &CombineTierEvent,
) -> Result<(), ProjectionError> {
    let CombineTierEvent::Initialize { state, .. } = event;
    let Some(mut tier) = env.store.load::<CombineTier>(&ctx.emitter).await? else {
        return Ok(());
    };
    tier.combined_tiers_length = Some(U256::from(state.constants.len() as u64));
    tier.state = Some(state.clone());
    env.store.save(&tier).await?;
    Ok(())
}

pub async fn handle_verify(
    env: &Env,
    ctx: &EventCtx,
    event: &VerifyTierEvent,
) -> Result<(), ProjectionError> {
    let VerifyTierEvent::Initialize {
        verify_contract, ..
    } = event;

    // The referenced verify contract may not have come from the tracked
    // factory; a zeroed placeholder keeps the reference resolvable.
    if env.store.load::<Verify>(verify_contract).await?.is_none() {
        let placeholder = Verify::new(verify_contract, 0, 0, ZERO_ADDRESS, ZERO_ADDRESS);
        env.store.save(&placeholder).await?;
    }

    let Some(mut tier) = env.store.load::<VerifyTier>(&ctx.emitter).await? else {
        return Ok(());
    };
    tier.verify_contract = Some(verify_contract.clone());
    env.store.save(&tier).await?;
    Ok(())
}
