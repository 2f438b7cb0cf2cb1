//! Stake pool handlers.
//!
//! A deposit shows up as two logs in one transaction: the stake token mint
//! (handled here) and the deposit-token transfer into the pool (handled in
//! `erc20`). Both fold into the same `StakeDeposit` record keyed by the
//! transaction hash, whichever arrives first creating it. Withdrawals
//! mirror that with a burn plus a transfer out.

use alloy_primitives::U256;

use entgraph_core::entities::stake::{StakeDeposit, StakeErc20, StakeHolder, StakeWithdraw};
use entgraph_core::error::ProjectionError;
use entgraph_core::event::EventCtx;
use entgraph_core::events::StakeEvent;
use entgraph_core::key::tight;
use entgraph_core::math;
use entgraph_core::store::EntityStoreExt;
use entgraph_core::ZERO_ADDRESS;

use crate::engine::Env;

pub async fn handle(env: &Env, ctx: &EventCtx, event: &StakeEvent) -> Result<(), ProjectionError> {
    match event {
        StakeEvent::Initialize {
            token,
            initial_ratio,
            ..
        } => handle_initialize(env, ctx, token, *initial_ratio).await,
        StakeEvent::Transfer { from, to, value } => {
            handle_transfer(env, ctx, from, to, *value).await
        }
    }
}

async fn handle_initialize(
    env: &Env,
    ctx: &EventCtx,
    token: &str,
    initial_ratio: U256,
) -> Result<(), ProjectionError> {
    let Some(mut stake) = env.store.load::<StakeErc20>(&ctx.emitter).await? else {
        return Ok(());
    };
    stake.name = env.chain.erc20_name(&ctx.emitter).await.or(stake.name);
    stake.symbol = env.chain.erc20_symbol(&ctx.emitter).await.or(stake.symbol);
    stake.decimals = env
        .chain
        .erc20_decimals(&ctx.emitter)
        .await
        .or(stake.decimals);
    if let Some(supply) = env.chain.erc20_total_supply(&ctx.emitter).await {
        stake.total_supply = supply;
    }
    stake.initial_ratio = Some(initial_ratio);

    let mut deposit_token = crate::erc20::get_or_create_erc20(env, ctx, token).await?;
    stake.token = Some(deposit_token.id.clone());
    if !deposit_token.stake_contracts.iter().any(|s| s == &stake.id) {
        deposit_token.stake_contracts.push(stake.id.clone());
        env.store.save(&deposit_token).await?;
    }

    env.store.save(&stake).await?;
    Ok(())
}

async fn handle_transfer(
    env: &Env,
    ctx: &EventCtx,
    from: &str,
    to: &str,
    value: U256,
) -> Result<(), ProjectionError> {
    let Some(mut stake) = env.store.load::<StakeErc20>(&ctx.emitter).await? else {
        return Ok(());
    };
    stake.total_supply = crate::erc20::live_or(
        stake.total_supply,
        env.chain.erc20_total_supply(&ctx.emitter).await,
    );
    refresh_ratios(&mut stake);

    if from == ZERO_ADDRESS {
        // Mint: the stake-token side of a deposit.
        let mut deposit = get_deposit(env, &ctx.tx_hash).await?;
        deposit.depositor = tight(&[&stake.id, to]);
        deposit.stake_token = stake.id.clone();
        deposit.token = stake.token.clone().unwrap_or_default();
        deposit.stake_token_minted = value;
        deposit.timestamp = ctx.block_timestamp;
        deposit.token_pool_size = stake.token_pool_size;
        deposit.value = value;
        env.store.save(&deposit).await?;
    }
    if to == ZERO_ADDRESS {
        // Burn: the stake-token side of a withdrawal.
        let mut withdraw = get_withdraw(env, &ctx.tx_hash).await?;
        withdraw.withdrawer = tight(&[&stake.id, from]);
        withdraw.stake_token = stake.id.clone();
        withdraw.token = stake.token.clone().unwrap_or_default();
        withdraw.stake_token_burned = value;
        withdraw.timestamp = ctx.block_timestamp;
        withdraw.token_pool_size = stake.token_pool_size;
        withdraw.value = value;
        env.store.save(&withdraw).await?;
    }

    if to != ZERO_ADDRESS {
        let mut holder = get_holder(env, &stake, to).await?;
        holder.balance += value;
        holder.total_entitlement = entitlement(&stake, holder.balance);
        env.store.save(&holder).await?;
    }
    if from != ZERO_ADDRESS {
        let mut holder = get_holder(env, &stake, from).await?;
        holder.balance = holder.balance.saturating_sub(value);
        holder.total_entitlement = entitlement(&stake, holder.balance);
        env.store.save(&holder).await?;
    }

    env.store.save(&stake).await?;
    Ok(())
}

/// Deposit-token arrival at the pool, called from the external-token
/// transfer handler. `depositor` is the transfer's sender.
pub(crate) async fn token_deposited(
    env: &Env,
    ctx: &EventCtx,
    stake_address: &str,
    depositor: &str,
    value: U256,
) -> Result<(), ProjectionError> {
    let Some(mut stake) = env.store.load::<StakeErc20>(stake_address).await? else {
        return Ok(());
    };
    stake.token_pool_size += value;
    stake.total_supply = crate::erc20::live_or(
        stake.total_supply,
        env.chain.erc20_total_supply(stake_address).await,
    );
    refresh_ratios(&mut stake);
    env.store.save(&stake).await?;

    let mut deposit = get_deposit(env, &ctx.tx_hash).await?;
    deposit.deposited_amount = value;
    deposit.token_pool_size = stake.token_pool_size;
    env.store.save(&deposit).await?;

    let mut holder = get_holder(env, &stake, depositor).await?;
    holder.total_stake += value;
    holder.total_deposited += value;
    holder.total_entitlement = entitlement(&stake, holder.balance);
    env.store.save(&holder).await?;
    Ok(())
}

/// Deposit-token leaving the pool, called from the external-token transfer
/// handler. `withdrawer` is the transfer's receiver.
pub(crate) async fn token_returned(
    env: &Env,
    ctx: &EventCtx,
    stake_address: &str,
    withdrawer: &str,
    value: U256,
) -> Result<(), ProjectionError> {
    let Some(mut stake) = env.store.load::<StakeErc20>(stake_address).await? else {
        return Ok(());
    };
    stake.token_pool_size = stake.token_pool_size.saturating_sub(value);
    stake.total_supply = crate::erc20::live_or(
        stake.total_supply,
        env.chain.erc20_total_supply(stake_address).await,
    );
    refresh_ratios(&mut stake);
    env.store.save(&stake).await?;

    let mut withdraw = get_withdraw(env, &ctx.tx_hash).await?;
    withdraw.returned_amount = value;
    withdraw.token_pool_size = stake.token_pool_size;
    env.store.save(&withdraw).await?;

    let mut holder = get_holder(env, &stake, withdrawer).await?;
    holder.total_stake = holder.total_stake.saturating_sub(value);
    holder.total_entitlement = entitlement(&stake, holder.balance);
    env.store.save(&holder).await?;
    Ok(())
}

/// Both pool ratios as 18-decimal fixed point; zero denominators leave the
/// previous value standing.
fn refresh_ratios(stake: &mut StakeErc20) {
    if !stake.token_pool_size.is_zero() {
        stake.token_to_stake_token_ratio = math::ratio(stake.total_supply, stake.token_pool_size);
    }
    if !stake.total_supply.is_zero() {
        stake.stake_token_to_token_ratio = math::ratio(stake.token_pool_size, stake.total_supply);
    }
}

fn entitlement(stake: &StakeErc20, balance: U256) -> U256 {
    if stake.total_supply.is_zero() {
        return U256::ZERO;
    }
    math::mul_div(balance, stake.token_pool_size, stake.total_supply)
}

async fn get_deposit(env: &Env, tx_hash: &str) -> Result<StakeDeposit, ProjectionError> {
    if let Some(deposit) = env.store.load::<StakeDeposit>(tx_hash).await? {
        return Ok(deposit);
    }
    let deposit = StakeDeposit {
        id: tx_hash.to_string(),
        timestamp: 0,
        depositor: ZERO_ADDRESS.to_string(),
        stake_token: ZERO_ADDRESS.to_string(),
        token: ZERO_ADDRESS.to_string(),
        stake_token_minted: U256::ZERO,
        token_pool_size: U256::ZERO,
        value: U256::ZERO,
        deposited_amount: U256::ZERO,
    };
    env.store.save(&deposit).await?;
    Ok(deposit)
}

async fn get_withdraw(env: &Env, tx_hash: &str) -> Result<StakeWithdraw, ProjectionError> {
    if let Some(withdraw) = env.store.load::<StakeWithdraw>(tx_hash).await? {
        return Ok(withdraw);
    }
    let withdraw = StakeWithdraw {
        id: tx_hash.to_string(),
        timestamp: 0,
        withdrawer: ZERO_ADDRESS.to_string(),
        stake_token: ZERO_ADDRESS.to_string(),
        token: ZERO_ADDRESS.to_string(),
        stake_token_burned: U256::ZERO,
        token_pool_size: U256::ZERO,
        value: U256::ZERO,
        returned_amount: U256::ZERO,
    };
    env.store.save(&withdraw).await?;
    Ok(withdraw)
}

async fn get_holder(
    env: &Env,
    stake: &StakeErc20,
    account: &str,
) -> Result<StakeHolder, ProjectionError> {
    let id = tight(&[&stake.id, account]);
    if let Some(holder) = env.store.load::<StakeHolder>(&id).await? {
        return Ok(holder);
    }
    Ok(StakeHolder::new(
        &id,
        account,
        &stake.id,
        stake.token.as_deref().unwrap_or(ZERO_ADDRESS),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::harness;
    use entgraph_core::events::Erc20Event;

    const STAKE: &str = "0x00000000000000000000000000000000000000aa";
    const TOKEN: &str = "0x00000000000000000000000000000000000000bb";
    const ALICE: &str = "0x0000000000000000000000000000000000000a11";

    fn ctx(emitter: &str, tx: &str) -> EventCtx {
        EventCtx {
            emitter: emitter.into(),
            tx_hash: tx.into(),
            tx_from: ALICE.into(),
            block_number: 6,
            block_timestamp: 60,
            log_index: 0,
        }
    }

    async fn seeded_pool(h: &crate::testutil::Harness) {
        h.env
            .store
            .save(&StakeErc20::new(STAKE, 1, 10, "0xd", "0xfac"))
            .await
            .unwrap();
        h.chain.set_erc20(STAKE, "Stake", "ST", 18, U256::ZERO);
        h.chain.set_erc20(TOKEN, "Token", "TKN", 18, U256::from(1_000_000));
        handle(
            &h.env,
            &ctx(STAKE, "0xinit"),
            &StakeEvent::Initialize {
                sender: "0xd".into(),
                token: TOKEN.into(),
                initial_ratio: math::one(),
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn initialize_links_pool_to_token() {
        let h = harness();
        seeded_pool(&h).await;

        let stake: StakeErc20 = h.env.store.load(STAKE).await.unwrap().unwrap();
        assert_eq!(stake.token.as_deref(), Some(TOKEN));
        assert_eq!(stake.symbol.as_deref(), Some("ST"));

        let token: entgraph_core::entities::token::Erc20 =
            h.env.store.load(TOKEN).await.unwrap().unwrap();
        assert_eq!(token.stake_contracts, vec![STAKE]);
    }

    #[tokio::test]
    async fn deposit_folds_mint_and_token_arrival() {
        let h = harness();
        seeded_pool(&h).await;

        // Mint of 100 stake tokens, then 100 deposit tokens arriving, both
        // in transaction 0xd1.
        h.chain.set_total_supply(STAKE, U256::from(100));
        handle(
            &h.env,
            &ctx(STAKE, "0xd1"),
            &StakeEvent::Transfer {
                from: ZERO_ADDRESS.into(),
                to: ALICE.into(),
                value: U256::from(100),
            },
        )
        .await
        .unwrap();
        crate::erc20::handle(
            &h.env,
            &ctx(TOKEN, "0xd1"),
            &Erc20Event::Transfer {
                from: ALICE.into(),
                to: STAKE.into(),
                value: U256::from(100),
            },
        )
        .await
        .unwrap();

        let deposit: StakeDeposit = h.env.store.load("0xd1").await.unwrap().unwrap();
        assert_eq!(deposit.stake_token_minted, U256::from(100));
        assert_eq!(deposit.deposited_amount, U256::from(100));
        assert_eq!(deposit.token_pool_size, U256::from(100));

        let stake: StakeErc20 = h.env.store.load(STAKE).await.unwrap().unwrap();
        assert_eq!(stake.token_pool_size, U256::from(100));
        assert_eq!(stake.stake_token_to_token_ratio, math::one());

        let holder: StakeHolder = h
            .env
            .store
            .load(&tight(&[STAKE, ALICE]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(holder.balance, U256::from(100));
        assert_eq!(holder.total_deposited, U256::from(100));
        assert_eq!(holder.total_stake, U256::from(100));
        assert_eq!(holder.total_entitlement, U256::from(100));
    }

    #[tokio::test]
    async fn withdrawal_keeps_lifetime_deposits() {
        let h = harness();
        seeded_pool(&h).await;
        h.chain.set_total_supply(STAKE, U256::from(100));
        handle(
            &h.env,
            &ctx(STAKE, "0xd1"),
            &StakeEvent::Transfer {
                from: ZERO_ADDRESS.into(),
                to: ALICE.into(),
                value: U256::from(100),
            },
        )
        .await
        .unwrap();
        crate::erc20::handle(
            &h.env,
            &ctx(TOKEN, "0xd1"),
            &Erc20Event::Transfer {
                from: ALICE.into(),
                to: STAKE.into(),
                value: U256::from(100),
            },
        )
        .await
        .unwrap();

        h.chain.set_total_supply(STAKE, U256::from(60));
        handle(
            &h.env,
            &ctx(STAKE, "0xw1"),
            &StakeEvent::Transfer {
                from: ALICE.into(),
                to: ZERO_ADDRESS.into(),
                value: U256::from(40),
            },
        )
        .await
        .unwrap();
        crate::erc20::handle(
            &h.env,
            &ctx(TOKEN, "0xw1"),
            &Erc20Event::Transfer {
                from: STAKE.into(),
                to: ALICE.into(),
                value: U256::from(40),
            },
        )
        .await
        .unwrap();

        let withdraw: StakeWithdraw = h.env.store.load("0xw1").await.unwrap().unwrap();
        assert_eq!(withdraw.stake_token_burned, U256::from(40));
        assert_eq!(withdraw.returned_amount, U256::from(40));

        let holder: StakeHolder = h
            .env
            .store
            .load(&tight(&[STAKE, ALICE]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(holder.balance, U256::from(60));
        assert_eq!(holder.total_stake, U256::from(60));
        // Lifetime deposits never shrink.
        assert_eq!(holder.total_deposited, U256::from(100));

        let stake: StakeErc20 = h.env.store.load(STAKE).await.unwrap().unwrap();
        assert_eq!(stake.token_pool_size, U256::from(60));
    }
}
