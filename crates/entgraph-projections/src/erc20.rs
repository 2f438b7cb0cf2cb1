//! External ERC20 registry and transfer handling.
//!
//! Registered tokens matter for two reasons: their metadata backs references
//! from sales, escrows and stake pools, and their transfers move stake-pool
//! balances.

use alloy_primitives::U256;
use tracing::debug;

use entgraph_core::entities::token::Erc20;
use entgraph_core::error::ProjectionError;
use entgraph_core::event::EventCtx;
use entgraph_core::events::Erc20Event;
use entgraph_core::store::EntityStoreExt;

use crate::engine::Env;

/// Load or register an external ERC20.
///
/// On first sight the token's logs become a dynamic source and its metadata
/// is read live, with the documented defaults standing in for reverted
/// reads. On every later call only `total_supply` is refreshed; a reverted
/// refresh keeps the previous value.
pub async fn get_or_create_erc20(
    env: &Env,
    ctx: &EventCtx,
    address: &str,
) -> Result<Erc20, ProjectionError> {
    let existing: Option<Erc20> = env.store.load(address).await?;
    let token = match existing {
        Some(mut token) => {
            if let Some(supply) = env.chain.erc20_total_supply(address).await {
                token.total_supply = supply;
            }
            token
        }
        None => {
            debug!(token = %address, "registering external erc20");
            let mut token = Erc20::new(address, ctx.block_number, ctx.block_timestamp);
            if let Some(name) = env.chain.erc20_name(address).await {
                token.name = name;
            }
            if let Some(symbol) = env.chain.erc20_symbol(address).await {
                token.symbol = symbol;
            }
            if let Some(decimals) = env.chain.erc20_decimals(address).await {
                token.decimals = decimals;
            }
            if let Some(supply) = env.chain.erc20_total_supply(address).await {
                token.total_supply = supply;
            }
            env.sources.register(address).await;
            token
        }
    };
    env.store.save(&token).await?;
    Ok(token)
}

/// Transfer on a registered external token.
///
/// When a counterparty is a stake pool backed by this token, the pool size
/// and the transacting holder's lifetime totals move with the transfer.
pub async fn handle(env: &Env, ctx: &EventCtx, event: &Erc20Event) -> Result<(), ProjectionError> {
    let Erc20Event::Transfer { from, to, value } = event;
    let token: Option<Erc20> = env.store.load(&ctx.emitter).await?;
    let Some(token) = token else {
        return Ok(());
    };

    if token.stake_contracts.iter().any(|s| s == to) {
        crate::stake::token_deposited(env, ctx, to, from, *value).await?;
    }
    if token.stake_contracts.iter().any(|s| s == from) {
        crate::stake::token_returned(env, ctx, from, to, *value).await?;
    }
    Ok(())
}

pub(crate) fn live_or(previous: U256, live: Option<U256>) -> U256 {
    live.unwrap_or(previous)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::harness;

    const TOKEN: &str = "0x00000000000000000000000000000000000000cc";

    fn ctx() -> EventCtx {
        EventCtx {
            emitter: TOKEN.into(),
            tx_hash: "0xt".into(),
            tx_from: "0xf".into(),
            block_number: 2,
            block_timestamp: 20,
            log_index: 0,
        }
    }

    #[tokio::test]
    async fn reverted_reads_fall_back_to_defaults() {
        let h = harness();
        let token = get_or_create_erc20(&h.env, &ctx(), TOKEN).await.unwrap();
        assert_eq!(token.name, "NONE");
        assert_eq!(token.symbol, "NONE");
        assert_eq!(token.decimals, 18);
        assert_eq!(token.total_supply, U256::ZERO);
    }

    #[tokio::test]
    async fn repeated_calls_register_the_source_once() {
        let h = harness();
        h.chain.set_erc20(TOKEN, "Dai", "DAI", 18, U256::from(100));
        get_or_create_erc20(&h.env, &ctx(), TOKEN).await.unwrap();

        // Supply moved on chain; only the refresh is visible on re-entry.
        h.chain.set_total_supply(TOKEN, U256::from(150));
        let token = get_or_create_erc20(&h.env, &ctx(), TOKEN).await.unwrap();
        assert_eq!(token.total_supply, U256::from(150));
        assert_eq!(h.sources.registered(), vec![TOKEN]);
    }
}
