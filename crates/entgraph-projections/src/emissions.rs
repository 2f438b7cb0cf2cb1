//! Emissions token handlers.
//!
//! A claim is two logs in one transaction: the Claim event (handled first
//! or last, order is not guaranteed) and the mint transfer carrying the
//! claimed amount. Both fold into the `EmissionsClaim` record keyed by the
//! transaction hash.

use alloy_primitives::U256;

use entgraph_core::entities::emissions::{EmissionsClaim, EmissionsErc20};
use entgraph_core::error::ProjectionError;
use entgraph_core::event::EventCtx;
use entgraph_core::events::EmissionsEvent;
use entgraph_core::store::EntityStoreExt;
use entgraph_core::ZERO_ADDRESS;

use crate::engine::Env;

pub async fn handle(
    env: &Env,
    ctx: &EventCtx,
    event: &EmissionsEvent,
) -> Result<(), ProjectionError> {
    match event {
        EmissionsEvent::Initialize {
            allow_delegated_claims,
            calculate_claim_state_config,
            ..
        } => {
            let Some(mut emissions) = env.store.load::<EmissionsErc20>(&ctx.emitter).await? else {
                return Ok(());
            };
            emissions.allow_delegated_claims = Some(*allow_delegated_claims);
            emissions.calculate_claim_state_config = Some(calculate_claim_state_config.clone());
            env.store.save(&emissions).await?;
            Ok(())
        }
        EmissionsEvent::Claim {
            sender,
            claimant,
            data,
        } => handle_claim(env, ctx, sender, claimant, data).await,
        EmissionsEvent::Transfer { from, to, value } => {
            handle_transfer(env, ctx, from, to, *value).await
        }
    }
}

async fn handle_claim(
    env: &Env,
    ctx: &EventCtx,
    sender: &str,
    claimant: &str,
    data: &str,
) -> Result<(), ProjectionError> {
    let Some(mut emissions) = env.store.load::<EmissionsErc20>(&ctx.emitter).await? else {
        return Ok(());
    };

    let mut claim = env
        .store
        .load::<EmissionsClaim>(&ctx.tx_hash)
        .await?
        .unwrap_or(EmissionsClaim {
            id: ctx.tx_hash.clone(),
            block: ctx.block_number,
            timestamp: ctx.block_timestamp,
            sender: String::new(),
            claimant: String::new(),
            data: String::new(),
            amount: U256::ZERO,
            emissions: emissions.id.clone(),
        });
    claim.sender = sender.to_string();
    claim.claimant = claimant.to_string();
    claim.data = data.to_string();
    env.store.save(&claim).await?;

    if !emissions.claims.iter().any(|c| c == &claim.id) {
        emissions.claims.push(claim.id.clone());
        env.store.save(&emissions).await?;
    }
    Ok(())
}

async fn handle_transfer(
    env: &Env,
    ctx: &EventCtx,
    from: &str,
    _to: &str,
    value: U256,
) -> Result<(), ProjectionError> {
    let Some(mut emissions) = env.store.load::<EmissionsErc20>(&ctx.emitter).await? else {
        return Ok(());
    };
    if let Some(supply) = env.chain.erc20_total_supply(&ctx.emitter).await {
        emissions.total_supply = supply;
    }
    env.store.save(&emissions).await?;

    // Mints carry the claimed amount for the claim in this transaction.
    if from == ZERO_ADDRESS {
        let mut claim = env
            .store
            .load::<EmissionsClaim>(&ctx.tx_hash)
            .await?
            .unwrap_or(EmissionsClaim {
                id: ctx.tx_hash.clone(),
                block: ctx.block_number,
                timestamp: ctx.block_timestamp,
                sender: String::new(),
                claimant: String::new(),
                data: String::new(),
                amount: U256::ZERO,
                emissions: emissions.id.clone(),
            });
        claim.amount = value;
        env.store.save(&claim).await?;
    }
    Ok(())
}
