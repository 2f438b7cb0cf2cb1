//! Claim-escrow handlers.
//!
//! Deposits are segregated per `(sale, escrow, supply, token)` bucket and,
//! one level down, per depositor. `total_deposited` on a bucket only ever
//! grows; undeposits and withdrawals reduce `total_remaining`. Claimable
//! amounts for withdrawers are re-derived eagerly whenever a bucket or a
//! holder balance moves, so the stored graph never serves a stale claim.

use alloy_primitives::U256;

use entgraph_core::entities::escrow::{
    ClaimEscrow, EscrowDeposit, EscrowDepositor, EscrowPendingDeposit,
    EscrowPendingDepositorToken, EscrowSupplyTokenDeposit, EscrowSupplyTokenDepositor,
    EscrowSupplyTokenWithdrawer, EscrowUndeposit, EscrowWithdraw, EscrowWithdrawer,
};
use entgraph_core::entities::redeemable::RedeemableErc20;
use entgraph_core::entities::sale::{Sale, SaleRef, UnknownSale};
use entgraph_core::entities::token::Holder;
use entgraph_core::error::ProjectionError;
use entgraph_core::event::EventCtx;
use entgraph_core::events::EscrowEvent;
use entgraph_core::key::composite;
use entgraph_core::math;
use entgraph_core::store::EntityStoreExt;
use entgraph_core::ZERO_ADDRESS;

use crate::engine::Env;

pub async fn handle(
    env: &Env,
    ctx: &EventCtx,
    event: &EscrowEvent,
) -> Result<(), ProjectionError> {
    match event {
        EscrowEvent::PendingDeposit {
            sender,
            sale,
            redeemable,
            token,
            amount,
        } => handle_pending_deposit(env, ctx, sender, sale, redeemable, token, *amount).await,
        EscrowEvent::Deposit {
            depositor,
            sale,
            redeemable,
            token,
            supply,
            amount,
        } => handle_deposit(env, ctx, depositor, sale, redeemable, token, *supply, *amount).await,
        EscrowEvent::Sweep {
            depositor,
            sale,
            token,
            ..
        } => handle_sweep(env, ctx, depositor, sale, token).await,
        EscrowEvent::Undeposit {
            sender,
            sale,
            token,
            supply,
            amount,
        } => handle_undeposit(env, ctx, sender, sale, token, *supply, *amount).await,
        EscrowEvent::Withdraw {
            withdrawer,
            sale,
            redeemable,
            token,
            supply,
            amount,
        } => {
            handle_withdraw(env, ctx, withdrawer, sale, redeemable, token, *supply, *amount).await
        }
    }
}

async fn handle_pending_deposit(
    env: &Env,
    ctx: &EventCtx,
    sender: &str,
    sale: &str,
    redeemable: &str,
    token: &str,
    amount: U256,
) -> Result<(), ProjectionError> {
    let mut escrow = get_escrow(env, ctx).await?;
    let i_sale = crate::resolver::resolve_sale(env, sale).await?;
    let token_entity = crate::erc20::get_or_create_erc20(env, ctx, token).await?;
    let mut depositor = get_depositor(env, sender).await?;
    let redeemable_entity: Option<RedeemableErc20> = env.store.load(redeemable).await?;

    let record = EscrowPendingDeposit {
        id: ctx.tx_hash.clone(),
        depositor_address: sender.to_string(),
        depositor: depositor.id.clone(),
        escrow: escrow.id.clone(),
        escrow_address: ctx.emitter.clone(),
        i_sale: i_sale.clone(),
        i_sale_address: sale.to_string(),
        redeemable: redeemable_entity.map(|r| r.id),
        token: token_entity.id.clone(),
        token_address: token.to_string(),
        amount,
    };
    env.store.save(&record).await?;

    let mut pending =
        get_pending_depositor_token(env, ctx, sale, sender, token, &i_sale, &depositor.id).await?;
    pending.total_deposited += amount;
    pending.pending_deposits.push(record.id.clone());
    env.store.save(&pending).await?;

    depositor.pending_deposits.push(record.id.clone());
    if !depositor
        .pending_depositor_tokens
        .iter()
        .any(|p| p == &pending.id)
    {
        depositor.pending_depositor_tokens.push(pending.id.clone());
    }
    env.store.save(&depositor).await?;

    escrow.pending_deposits.push(record.id);
    if !escrow.depositors.iter().any(|d| d == &depositor.id) {
        escrow.depositors.push(depositor.id);
    }
    if !escrow
        .pending_depositor_tokens
        .iter()
        .any(|p| p == &pending.id)
    {
        escrow.pending_depositor_tokens.push(pending.id);
    }
    env.store.save(&escrow).await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_deposit(
    env: &Env,
    ctx: &EventCtx,
    depositor_address: &str,
    sale: &str,
    redeemable: &str,
    token: &str,
    supply: U256,
    amount: U256,
) -> Result<(), ProjectionError> {
    let mut escrow = get_escrow(env, ctx).await?;
    let i_sale = crate::resolver::resolve_sale(env, sale).await?;
    let token_entity = crate::erc20::get_or_create_erc20(env, ctx, token).await?;
    let mut depositor = get_depositor(env, depositor_address).await?;
    let redeemable_entity: Option<RedeemableErc20> = env.store.load(redeemable).await?;

    let record = EscrowDeposit {
        id: ctx.tx_hash.clone(),
        depositor_address: depositor_address.to_string(),
        depositor: depositor.id.clone(),
        escrow: escrow.id.clone(),
        escrow_address: ctx.emitter.clone(),
        i_sale: i_sale.clone(),
        i_sale_address: sale.to_string(),
        redeemable: redeemable_entity.as_ref().map(|r| r.id.clone()),
        redeemable_supply: supply,
        token: token_entity.id.clone(),
        token_address: token.to_string(),
        token_amount: amount,
    };
    env.store.save(&record).await?;

    let mut bucket =
        get_supply_token_deposit(env, sale, &ctx.emitter, supply, token, &i_sale, &token_entity.id)
            .await?;
    bucket.total_deposited += amount;
    bucket.total_remaining += amount;
    bucket.deposits.push(record.id.clone());
    if !bucket.depositors.iter().any(|d| d == &depositor.id) {
        bucket.depositors.push(depositor.id.clone());
    }
    if !bucket
        .depositor_addresses
        .iter()
        .any(|d| d == depositor_address)
    {
        bucket.depositor_addresses.push(depositor_address.to_string());
    }

    let mut slice = get_supply_token_depositor(
        env,
        sale,
        &ctx.emitter,
        supply,
        token,
        depositor_address,
        &i_sale,
        &depositor.id,
        &token_entity.id,
    )
    .await?;
    slice.deposits.push(record.id.clone());
    slice.total_deposited += amount;
    slice.total_remaining += amount;
    env.store.save(&slice).await?;

    // Every current holder of the redeemable becomes a (potential)
    // withdrawer of this bucket, with its claimable derived at the frozen
    // supply.
    if let Some(mut redeemable_entity) = redeemable_entity {
        for holder_id in redeemable_entity.holders.clone() {
            let Some(holder) = env.store.load::<Holder>(&holder_id).await? else {
                continue;
            };
            let mut withdrawer = get_supply_token_withdrawer(
                env,
                sale,
                &ctx.emitter,
                supply,
                token,
                &holder.address,
                &i_sale,
                &bucket.id,
            )
            .await?;
            withdrawer.deposit = bucket.id.clone();
            if !supply.is_zero() {
                withdrawer.redeemable_balance = holder.balance;
                withdrawer.claimable = math::mul_div(
                    bucket
                        .total_deposited
                        .saturating_sub(withdrawer.total_withdrawn_against),
                    holder.balance,
                    supply,
                );
            }
            env.store.save(&withdrawer).await?;

            if !bucket.withdraws.iter().any(|w| w == &withdrawer.id) {
                bucket.withdraws.push(withdrawer.id.clone());
            }
            if !redeemable_entity
                .escrow_supply_token_withdrawers
                .iter()
                .any(|w| w == &withdrawer.id)
            {
                redeemable_entity
                    .escrow_supply_token_withdrawers
                    .push(withdrawer.id.clone());
            }
            if !escrow
                .supply_token_withdrawers
                .iter()
                .any(|w| w == &withdrawer.id)
            {
                escrow.supply_token_withdrawers.push(withdrawer.id);
            }
        }
        env.store.save(&redeemable_entity).await?;
    }
    env.store.save(&bucket).await?;

    depositor.deposits.push(record.id.clone());
    if !depositor
        .supply_token_deposits
        .iter()
        .any(|b| b == &bucket.id)
    {
        depositor.supply_token_deposits.push(bucket.id.clone());
    }
    env.store.save(&depositor).await?;

    // A settled deposit after the sale ends sweeps the matching pending
    // aggregate.
    if sale_has_ended(env, sale).await? {
        let pending_id = composite(&[sale, &ctx.emitter, depositor_address, token]);
        if let Some(mut pending) = env
            .store
            .load::<EscrowPendingDepositorToken>(&pending_id)
            .await?
        {
            if !pending.swept {
                pending.swept = true;
                env.store.save(&pending).await?;
            }
        }
    }

    escrow.deposits.push(record.id);
    if !escrow.depositors.iter().any(|d| d == &depositor.id) {
        escrow.depositors.push(depositor.id);
    }
    if !escrow.supply_token_deposits.iter().any(|b| b == &bucket.id) {
        escrow.supply_token_deposits.push(bucket.id);
    }
    if !escrow
        .supply_token_depositors
        .iter()
        .any(|s| s == &slice.id)
    {
        escrow.supply_token_depositors.push(slice.id);
    }
    env.store.save(&escrow).await?;
    Ok(())
}

/// Marks a depositor's pending aggregate swept. Honored only once the
/// referenced sale has settled; a sweep against a Pending or Active sale
/// leaves the aggregate untouched.
async fn handle_sweep(
    env: &Env,
    ctx: &EventCtx,
    depositor_address: &str,
    sale: &str,
    token: &str,
) -> Result<(), ProjectionError> {
    if !sale_has_ended(env, sale).await? {
        return Ok(());
    }
    let pending_id = composite(&[sale, &ctx.emitter, depositor_address, token]);
    if let Some(mut pending) = env
        .store
        .load::<EscrowPendingDepositorToken>(&pending_id)
        .await?
    {
        if !pending.swept {
            pending.swept = true;
            env.store.save(&pending).await?;
        }
    }
    Ok(())
}

async fn handle_undeposit(
    env: &Env,
    ctx: &EventCtx,
    sender: &str,
    sale: &str,
    token: &str,
    supply: U256,
    amount: U256,
) -> Result<(), ProjectionError> {
    let mut escrow = get_escrow(env, ctx).await?;
    let i_sale = crate::resolver::resolve_sale(env, sale).await?;
    let token_entity = crate::erc20::get_or_create_erc20(env, ctx, token).await?;

    let record = EscrowUndeposit {
        id: ctx.tx_hash.clone(),
        sender: sender.to_string(),
        escrow: escrow.id.clone(),
        escrow_address: ctx.emitter.clone(),
        i_sale: i_sale.clone(),
        i_sale_address: sale.to_string(),
        token: token_entity.id.clone(),
        token_address: token.to_string(),
        redeemable_supply: supply,
        token_amount: amount,
    };
    env.store.save(&record).await?;

    escrow.undeposits.push(record.id.clone());
    env.store.save(&escrow).await?;

    let mut depositor = get_depositor(env, sender).await?;
    depositor.undeposits.push(record.id.clone());
    env.store.save(&depositor).await?;

    let mut slice = get_supply_token_depositor(
        env,
        sale,
        &ctx.emitter,
        supply,
        token,
        sender,
        &i_sale,
        &depositor.id,
        &token_entity.id,
    )
    .await?;
    slice.undeposits.push(record.id);
    slice.total_remaining = slice.total_remaining.saturating_sub(amount);
    env.store.save(&slice).await?;

    let mut bucket =
        get_supply_token_deposit(env, sale, &ctx.emitter, supply, token, &i_sale, &token_entity.id)
            .await?;
    bucket.total_remaining = bucket.total_remaining.saturating_sub(amount);
    env.store.save(&bucket).await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_withdraw(
    env: &Env,
    ctx: &EventCtx,
    withdrawer_address: &str,
    sale: &str,
    redeemable: &str,
    token: &str,
    supply: U256,
    amount: U256,
) -> Result<(), ProjectionError> {
    let mut escrow = get_escrow(env, ctx).await?;
    let i_sale = crate::resolver::resolve_sale(env, sale).await?;
    let token_entity = crate::erc20::get_or_create_erc20(env, ctx, token).await?;
    let redeemable_entity: Option<RedeemableErc20> = env.store.load(redeemable).await?;

    let record = EscrowWithdraw {
        id: ctx.tx_hash.clone(),
        withdrawer: withdrawer_address.to_string(),
        escrow: escrow.id.clone(),
        escrow_address: ctx.emitter.clone(),
        i_sale: i_sale.clone(),
        i_sale_address: sale.to_string(),
        redeemable: redeemable_entity.map(|r| r.id),
        redeemable_supply: supply,
        token: token_entity.id.clone(),
        token_address: token.to_string(),
        token_amount: amount,
    };
    env.store.save(&record).await?;

    escrow.withdraws.push(record.id.clone());

    let mut withdrawer = get_withdrawer(env, &ctx.emitter, withdrawer_address).await?;
    withdrawer.withdraws.push(record.id.clone());
    env.store.save(&withdrawer).await?;
    if !escrow.withdrawers.iter().any(|w| w == &withdrawer.id) {
        escrow.withdrawers.push(withdrawer.id.clone());
    }

    let mut bucket =
        get_supply_token_deposit(env, sale, &ctx.emitter, supply, token, &i_sale, &token_entity.id)
            .await?;
    bucket.total_remaining = bucket.total_remaining.saturating_sub(amount);

    let mut stw = get_supply_token_withdrawer(
        env,
        sale,
        &ctx.emitter,
        supply,
        token,
        withdrawer_address,
        &i_sale,
        &bucket.id,
    )
    .await?;
    stw.deposit = bucket.id.clone();
    stw.total_withdrawn += amount;
    stw.total_withdrawn_against = bucket.total_deposited;
    stw.withdraws.push(record.id);
    if !supply.is_zero() {
        if let Some(holder) = env
            .store
            .load::<Holder>(&composite(&[redeemable, withdrawer_address]))
            .await?
        {
            stw.redeemable_balance = holder.balance;
        }
        stw.claimable = math::mul_div(
            bucket
                .total_deposited
                .saturating_sub(stw.total_withdrawn_against),
            stw.redeemable_balance,
            supply,
        );
    }
    env.store.save(&stw).await?;

    // Peers of this bucket keep their own withdrawn-against marker; only
    // their balance-dependent claimable is re-derived.
    if !supply.is_zero() {
        for peer_id in &bucket.withdraws {
            if peer_id == &stw.id {
                continue;
            }
            let Some(mut peer) = env
                .store
                .load::<EscrowSupplyTokenWithdrawer>(peer_id)
                .await?
            else {
                continue;
            };
            if let Some(holder) = env
                .store
                .load::<Holder>(&composite(&[redeemable, &peer.withdrawer_address]))
                .await?
            {
                peer.redeemable_balance = holder.balance;
            }
            peer.claimable = math::mul_div(
                bucket
                    .total_deposited
                    .saturating_sub(peer.total_withdrawn_against),
                peer.redeemable_balance,
                supply,
            );
            env.store.save(&peer).await?;
        }
    }

    if !bucket.withdraws.iter().any(|w| w == &stw.id) {
        bucket.withdraws.push(stw.id.clone());
    }
    env.store.save(&bucket).await?;

    if !escrow.supply_token_withdrawers.iter().any(|w| w == &stw.id) {
        escrow.supply_token_withdrawers.push(stw.id);
    }
    env.store.save(&escrow).await?;
    Ok(())
}

/// Re-derive one withdrawer's claimable after `account`'s balance of the
/// redeemable `token` moved. Called from the redeemable transfer handler.
pub(crate) async fn refresh_withdrawer_for(
    env: &Env,
    withdrawer_id: &str,
    token: &str,
    account: &str,
) -> Result<(), ProjectionError> {
    if account == ZERO_ADDRESS {
        return Ok(());
    }
    let Some(mut withdrawer) = env
        .store
        .load::<EscrowSupplyTokenWithdrawer>(withdrawer_id)
        .await?
    else {
        return Ok(());
    };
    if withdrawer.withdrawer_address != account {
        return Ok(());
    }
    let Some(bucket) = env
        .store
        .load::<EscrowSupplyTokenDeposit>(&withdrawer.deposit)
        .await?
    else {
        return Ok(());
    };
    if bucket.redeemable_supply.is_zero() {
        return Ok(());
    }
    let Some(holder) = env
        .store
        .load::<Holder>(&composite(&[token, account]))
        .await?
    else {
        return Ok(());
    };
    withdrawer.redeemable_balance = holder.balance;
    withdrawer.claimable = math::mul_div(
        bucket
            .total_deposited
            .saturating_sub(withdrawer.total_withdrawn_against),
        holder.balance,
        bucket.redeemable_supply,
    );
    env.store.save(&withdrawer).await?;
    Ok(())
}

async fn sale_has_ended(env: &Env, sale: &str) -> Result<bool, ProjectionError> {
    if let Some(sale) = env.store.load::<Sale>(sale).await? {
        return Ok(sale.sale_status.has_ended());
    }
    if let Some(unknown) = env.store.load::<UnknownSale>(sale).await? {
        return Ok(unknown.sale_status.has_ended());
    }
    Ok(false)
}

async fn get_escrow(env: &Env, ctx: &EventCtx) -> Result<ClaimEscrow, ProjectionError> {
    let escrow = match env.store.load::<ClaimEscrow>(&ctx.emitter).await? {
        Some(escrow) => escrow,
        None => {
            let escrow = ClaimEscrow::new(&ctx.emitter, ctx.block_number, ctx.block_timestamp);
            env.store.save(&escrow).await?;
            escrow
        }
    };
    Ok(escrow)
}

async fn get_depositor(env: &Env, address: &str) -> Result<EscrowDepositor, ProjectionError> {
    let depositor = match env.store.load::<EscrowDepositor>(address).await? {
        Some(depositor) => depositor,
        None => {
            let depositor = EscrowDepositor::new(address);
            env.store.save(&depositor).await?;
            depositor
        }
    };
    Ok(depositor)
}

async fn get_withdrawer(
    env: &Env,
    escrow: &str,
    account: &str,
) -> Result<EscrowWithdrawer, ProjectionError> {
    let id = composite(&[escrow, account]);
    let withdrawer = match env.store.load::<EscrowWithdrawer>(&id).await? {
        Some(withdrawer) => withdrawer,
        None => {
            let withdrawer = EscrowWithdrawer::new(&id, account, escrow);
            env.store.save(&withdrawer).await?;
            withdrawer
        }
    };
    Ok(withdrawer)
}

async fn get_supply_token_deposit(
    env: &Env,
    sale: &str,
    escrow: &str,
    supply: U256,
    token_address: &str,
    i_sale: &SaleRef,
    token: &str,
) -> Result<EscrowSupplyTokenDeposit, ProjectionError> {
    let id = composite(&[sale, escrow, &supply.to_string(), token_address]);
    let bucket = match env.store.load::<EscrowSupplyTokenDeposit>(&id).await? {
        Some(bucket) => bucket,
        None => EscrowSupplyTokenDeposit {
            id,
            i_sale: i_sale.clone(),
            i_sale_address: sale.to_string(),
            escrow: escrow.to_string(),
            escrow_address: escrow.to_string(),
            redeemable_supply: supply,
            token: token.to_string(),
            token_address: token_address.to_string(),
            deposits: Vec::new(),
            depositors: Vec::new(),
            depositor_addresses: Vec::new(),
            withdraws: Vec::new(),
            total_deposited: U256::ZERO,
            total_remaining: U256::ZERO,
        },
    };
    Ok(bucket)
}

#[allow(clippy::too_many_arguments)]
async fn get_supply_token_depositor(
    env: &Env,
    sale: &str,
    escrow: &str,
    supply: U256,
    token_address: &str,
    depositor_address: &str,
    i_sale: &SaleRef,
    depositor: &str,
    token: &str,
) -> Result<EscrowSupplyTokenDepositor, ProjectionError> {
    let id = composite(&[
        sale,
        escrow,
        depositor_address,
        &supply.to_string(),
        token_address,
    ]);
    let slice = match env.store.load::<EscrowSupplyTokenDepositor>(&id).await? {
        Some(slice) => slice,
        None => EscrowSupplyTokenDepositor {
            id,
            i_sale: i_sale.clone(),
            i_sale_address: sale.to_string(),
            escrow: escrow.to_string(),
            escrow_address: escrow.to_string(),
            depositor: depositor.to_string(),
            depositor_address: depositor_address.to_string(),
            redeemable_supply: supply,
            token: token.to_string(),
            token_address: token_address.to_string(),
            deposits: Vec::new(),
            undeposits: Vec::new(),
            total_deposited: U256::ZERO,
            total_remaining: U256::ZERO,
        },
    };
    Ok(slice)
}

#[allow(clippy::too_many_arguments)]
async fn get_supply_token_withdrawer(
    env: &Env,
    sale: &str,
    escrow: &str,
    supply: U256,
    token_address: &str,
    withdrawer_address: &str,
    i_sale: &SaleRef,
    deposit: &str,
) -> Result<EscrowSupplyTokenWithdrawer, ProjectionError> {
    let id = composite(&[
        sale,
        escrow,
        &supply.to_string(),
        token_address,
        withdrawer_address,
    ]);
    let withdrawer = match env.store.load::<EscrowSupplyTokenWithdrawer>(&id).await? {
        Some(withdrawer) => withdrawer,
        None => EscrowSupplyTokenWithdrawer {
            id,
            withdrawer_address: withdrawer_address.to_string(),
            deposit: deposit.to_string(),
            i_sale: i_sale.clone(),
            i_sale_address: sale.to_string(),
            withdraws: Vec::new(),
            total_withdrawn: U256::ZERO,
            total_withdrawn_against: U256::ZERO,
            claimable: U256::ZERO,
            redeemable_balance: U256::ZERO,
        },
    };
    Ok(withdrawer)
}

async fn get_pending_depositor_token(
    env: &Env,
    ctx: &EventCtx,
    sale: &str,
    depositor_address: &str,
    token_address: &str,
    i_sale: &SaleRef,
    depositor: &str,
) -> Result<EscrowPendingDepositorToken, ProjectionError> {
    let id = composite(&[sale, &ctx.emitter, depositor_address, token_address]);
    let pending = match env
        .store
        .load::<EscrowPendingDepositorToken>(&id)
        .await?
    {
        Some(pending) => pending,
        None => EscrowPendingDepositorToken {
            id,
            i_sale: i_sale.clone(),
            i_sale_address: sale.to_string(),
            escrow: ctx.emitter.clone(),
            escrow_address: ctx.emitter.clone(),
            depositor: depositor.to_string(),
            depositor_address: depositor_address.to_string(),
            pending_deposits: Vec::new(),
            token: token_address.to_string(),
            token_address: token_address.to_string(),
            total_deposited: U256::ZERO,
            swept: false,
        },
    };
    Ok(pending)
}
