//! RedeemableERC20 handlers.

use alloy_primitives::U256;

use entgraph_core::entities::redeemable::{
    Redeem, RedeemableErc20, TreasuryAsset, TreasuryAssetCaller,
};
use entgraph_core::entities::token::Holder;
use entgraph_core::error::ProjectionError;
use entgraph_core::event::EventCtx;
use entgraph_core::events::RedeemableEvent;
use entgraph_core::key::composite;
use entgraph_core::math;
use entgraph_core::store::EntityStoreExt;
use entgraph_core::ZERO_ADDRESS;

use crate::engine::Env;

/// Load or create a redeemable token entity and register its logs as a
/// dynamic source. Called from the sale Initialize handler, which is the
/// discovery point for these tokens.
pub async fn get_or_create_redeemable(
    env: &Env,
    ctx: &EventCtx,
    token: &str,
    deployer: &str,
    sale: &str,
) -> Result<RedeemableErc20, ProjectionError> {
    let existing: Option<RedeemableErc20> = env.store.load(token).await?;
    let mut redeemable = match existing {
        Some(redeemable) => redeemable,
        None => {
            let redeemable =
                RedeemableErc20::new(token, ctx.block_number, ctx.block_timestamp, deployer);
            env.sources.register(token).await;
            redeemable
        }
    };
    redeemable.sale_address = sale.to_string();
    redeemable.name = env.chain.erc20_name(token).await.or(redeemable.name);
    redeemable.symbol = env.chain.erc20_symbol(token).await.or(redeemable.symbol);
    redeemable.decimals = env
        .chain
        .erc20_decimals(token)
        .await
        .or(redeemable.decimals);
    if let Some(supply) = env.chain.erc20_total_supply(token).await {
        redeemable.total_supply = supply;
    }
    env.store.save(&redeemable).await?;
    Ok(redeemable)
}

pub async fn handle(
    env: &Env,
    ctx: &EventCtx,
    event: &RedeemableEvent,
) -> Result<(), ProjectionError> {
    match event {
        RedeemableEvent::Initialize {
            sender,
            admin,
            tier,
            minimum_tier,
        } => handle_initialize(env, ctx, sender, admin, tier, *minimum_tier).await,
        RedeemableEvent::Sender { granted_sender, .. } => {
            handle_grant(env, ctx, granted_sender, Grant::Sender).await
        }
        RedeemableEvent::Receiver {
            granted_receiver, ..
        } => handle_grant(env, ctx, granted_receiver, Grant::Receiver).await,
        RedeemableEvent::Transfer { from, to, value } => {
            handle_transfer(env, ctx, from, to, *value).await
        }
        RedeemableEvent::TreasuryAsset { sender, asset } => {
            handle_treasury_asset(env, ctx, sender, asset).await
        }
        RedeemableEvent::Redeem {
            sender,
            treasury_asset,
            redeem_amount,
            asset_amount,
        } => {
            handle_redeem(
                env,
                ctx,
                sender,
                treasury_asset,
                *redeem_amount,
                *asset_amount,
            )
            .await
        }
    }
}

async fn handle_initialize(
    env: &Env,
    ctx: &EventCtx,
    sender: &str,
    admin: &str,
    tier: &str,
    minimum_tier: U256,
) -> Result<(), ProjectionError> {
    let Some(mut redeemable) = env.store.load::<RedeemableErc20>(&ctx.emitter).await? else {
        return Ok(());
    };
    redeemable.factory = Some(sender.to_string());
    redeemable.admin = Some(admin.to_string());
    redeemable.minimum_tier = Some(minimum_tier);
    redeemable.tier = Some(crate::resolver::resolve_tier(env, tier).await?);
    env.store.save(&redeemable).await?;
    Ok(())
}

enum Grant {
    Sender,
    Receiver,
}

/// Records an address exempted from the tier gate on one side of transfers.
async fn handle_grant(
    env: &Env,
    ctx: &EventCtx,
    account: &str,
    grant: Grant,
) -> Result<(), ProjectionError> {
    let Some(mut redeemable) = env.store.load::<RedeemableErc20>(&ctx.emitter).await? else {
        return Ok(());
    };
    let list = match grant {
        Grant::Sender => &mut redeemable.granted_senders,
        Grant::Receiver => &mut redeemable.granted_receivers,
    };
    list.push(account.to_string());
    env.store.save(&redeemable).await?;
    Ok(())
}

async fn handle_transfer(
    env: &Env,
    ctx: &EventCtx,
    from: &str,
    to: &str,
    value: U256,
) -> Result<(), ProjectionError> {
    if value.is_zero() {
        return Ok(());
    }
    let Some(mut redeemable) = env.store.load::<RedeemableErc20>(&ctx.emitter).await? else {
        return Ok(());
    };
    if let Some(supply) = env.chain.erc20_total_supply(&ctx.emitter).await {
        redeemable.total_supply = supply;
    }

    // Mint/burn counterparties and tracked contracts are not holders.
    if from != ZERO_ADDRESS && !crate::resolver::is_tracked_contract(env, from).await? {
        update_holder(env, &mut redeemable, from).await?;
    }
    if to != ZERO_ADDRESS && !crate::resolver::is_tracked_contract(env, to).await? {
        update_holder(env, &mut redeemable, to).await?;
    }

    // Any escrow withdrawer holding this token has its claimable re-derived
    // from the moved balance.
    for withdrawer_id in redeemable.escrow_supply_token_withdrawers.clone() {
        crate::escrow::refresh_withdrawer_for(env, &withdrawer_id, &ctx.emitter, from).await?;
        crate::escrow::refresh_withdrawer_for(env, &withdrawer_id, &ctx.emitter, to).await?;
    }

    env.store.save(&redeemable).await?;
    Ok(())
}

async fn update_holder(
    env: &Env,
    redeemable: &mut RedeemableErc20,
    account: &str,
) -> Result<(), ProjectionError> {
    let id = composite(&[&redeemable.id, account]);
    let mut holder = env.store.load::<Holder>(&id).await?.unwrap_or(Holder {
        id: id.clone(),
        address: account.to_string(),
        balance: U256::ZERO,
    });
    if let Some(balance) = env.chain.erc20_balance_of(&redeemable.id, account).await {
        holder.balance = balance;
    }
    env.store.save(&holder).await?;
    if !redeemable.holders.iter().any(|h| h == &id) {
        redeemable.holders.push(id);
    }
    Ok(())
}

async fn handle_treasury_asset(
    env: &Env,
    ctx: &EventCtx,
    sender: &str,
    asset: &str,
) -> Result<(), ProjectionError> {
    let redeemable: Option<RedeemableErc20> = env.store.load(&ctx.emitter).await?;
    let id = composite(&[&ctx.emitter, asset]);
    let mut treasury_asset = match env.store.load::<TreasuryAsset>(&id).await? {
        Some(existing) => existing,
        None => {
            let mut created = TreasuryAsset::new(
                &id,
                asset,
                &ctx.emitter,
                ctx.block_number,
                ctx.block_timestamp,
            );
            created.name = env.chain.erc20_name(asset).await;
            created.symbol = env.chain.erc20_symbol(asset).await;
            created.decimals = env.chain.erc20_decimals(asset).await;
            if let Some(supply) = env.chain.erc20_total_supply(asset).await {
                created.total_supply = supply;
            }
            if let Some(balance) = env.chain.erc20_balance_of(asset, &ctx.emitter).await {
                created.balance = balance;
                if let Some(redeemable) = &redeemable {
                    if !redeemable.total_supply.is_zero() {
                        created.redemption_ratio =
                            math::ratio(balance, redeemable.total_supply);
                    }
                }
            }
            if let Some(redeemable) = &redeemable {
                created.sale_address = redeemable.sale_address.clone();
            }
            created
        }
    };

    let caller = TreasuryAssetCaller {
        id: ctx.tx_hash.clone(),
        deploy_block: ctx.block_number,
        deploy_timestamp: ctx.block_timestamp,
        caller: sender.to_string(),
        redeemable_address: ctx.emitter.clone(),
        sale_address: treasury_asset.sale_address.clone(),
        treasury_asset: treasury_asset.id.clone(),
    };
    env.store.save(&caller).await?;

    treasury_asset.callers.push(caller.id.clone());
    env.store.save(&treasury_asset).await?;

    if let Some(mut redeemable) = redeemable {
        if !redeemable.treasury_assets.iter().any(|t| t == &id) {
            redeemable.treasury_assets.push(id);
        }
        env.store.save(&redeemable).await?;
    }
    Ok(())
}

async fn handle_redeem(
    env: &Env,
    ctx: &EventCtx,
    sender: &str,
    treasury_asset: &str,
    redeem_amount: U256,
    asset_amount: U256,
) -> Result<(), ProjectionError> {
    let Some(mut redeemable) = env.store.load::<RedeemableErc20>(&ctx.emitter).await? else {
        return Ok(());
    };

    let asset_id = composite(&[&ctx.emitter, treasury_asset]);
    let redeem = Redeem {
        id: composite(&[&ctx.tx_hash, &redeemable.redeems.len().to_string()]),
        deploy_block: ctx.block_number,
        deploy_timestamp: ctx.block_timestamp,
        caller: sender.to_string(),
        redeemable: redeemable.id.clone(),
        treasury_asset: asset_id.clone(),
        treasury_asset_amount: asset_amount,
        redeem_amount,
        sale_address: redeemable.sale_address.clone(),
    };
    env.store.save(&redeem).await?;

    if let Some(mut asset) = env.store.load::<TreasuryAsset>(&asset_id).await? {
        if let Some(balance) = env.chain.erc20_balance_of(treasury_asset, &ctx.emitter).await {
            asset.balance = balance;
            if !redeemable.total_supply.is_zero() {
                asset.redemption_ratio = math::ratio(balance, redeemable.total_supply);
            }
        }
        asset.redeems.push(redeem.id.clone());
        env.store.save(&asset).await?;
    }

    redeemable.redeems.push(redeem.id.clone());
    env.store.save(&redeemable).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::harness;

    const TOKEN: &str = "0x00000000000000000000000000000000000000bb";
    const ALICE: &str = "0x0000000000000000000000000000000000000a11";
    const BOB: &str = "0x0000000000000000000000000000000000000b0b";

    fn ctx(tx: &str) -> EventCtx {
        EventCtx {
            emitter: TOKEN.into(),
            tx_hash: tx.into(),
            tx_from: ALICE.into(),
            block_number: 4,
            block_timestamp: 40,
            log_index: 0,
        }
    }

    async fn seeded_redeemable(h: &crate::testutil::Harness) {
        let token = RedeemableErc20::new(TOKEN, 1, 10, "0xdep");
        h.env.store.save(&token).await.unwrap();
    }

    #[tokio::test]
    async fn transfer_tracks_both_holders() {
        let h = harness();
        seeded_redeemable(&h).await;
        h.chain.set_balance(TOKEN, ALICE, U256::from(60));
        h.chain.set_balance(TOKEN, BOB, U256::from(40));
        h.chain.set_total_supply(TOKEN, U256::from(100));

        let event = RedeemableEvent::Transfer {
            from: ALICE.into(),
            to: BOB.into(),
            value: U256::from(40),
        };
        handle(&h.env, &ctx("0xt1"), &event).await.unwrap();

        let redeemable: RedeemableErc20 = h.env.store.load(TOKEN).await.unwrap().unwrap();
        assert_eq!(redeemable.holders.len(), 2);
        assert_eq!(redeemable.total_supply, U256::from(100));

        let alice: Holder = h
            .env
            .store
            .load(&composite(&[TOKEN, ALICE]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(alice.balance, U256::from(60));
    }

    #[tokio::test]
    async fn grants_accumulate_on_the_token() {
        let h = harness();
        seeded_redeemable(&h).await;
        handle(
            &h.env,
            &ctx("0xg1"),
            &RedeemableEvent::Sender {
                sender: "0xadmin".into(),
                granted_sender: ALICE.into(),
            },
        )
        .await
        .unwrap();
        handle(
            &h.env,
            &ctx("0xg2"),
            &RedeemableEvent::Receiver {
                sender: "0xadmin".into(),
                granted_receiver: BOB.into(),
            },
        )
        .await
        .unwrap();

        let redeemable: RedeemableErc20 = h.env.store.load(TOKEN).await.unwrap().unwrap();
        assert_eq!(redeemable.granted_senders, vec![ALICE]);
        assert_eq!(redeemable.granted_receivers, vec![BOB]);
    }

    #[tokio::test]
    async fn zero_value_transfer_is_ignored() {
        let h = harness();
        seeded_redeemable(&h).await;
        let event = RedeemableEvent::Transfer {
            from: ALICE.into(),
            to: BOB.into(),
            value: U256::ZERO,
        };
        handle(&h.env, &ctx("0xt1"), &event).await.unwrap();
        let redeemable: RedeemableErc20 = h.env.store.load(TOKEN).await.unwrap().unwrap();
        assert!(redeemable.holders.is_empty());
    }

    #[tokio::test]
    async fn mint_counterparty_is_not_a_holder() {
        let h = harness();
        seeded_redeemable(&h).await;
        h.chain.set_balance(TOKEN, BOB, U256::from(100));

        let event = RedeemableEvent::Transfer {
            from: ZERO_ADDRESS.into(),
            to: BOB.into(),
            value: U256::from(100),
        };
        handle(&h.env, &ctx("0xt1"), &event).await.unwrap();

        let redeemable: RedeemableErc20 = h.env.store.load(TOKEN).await.unwrap().unwrap();
        assert_eq!(redeemable.holders, vec![composite(&[TOKEN, BOB])]);
    }

    #[tokio::test]
    async fn treasury_asset_announcement_registers_asset_and_caller() {
        let h = harness();
        seeded_redeemable(&h).await;
        let asset = "0x00000000000000000000000000000000000000dd";
        h.chain.set_erc20(asset, "Dai", "DAI", 18, U256::from(1000));
        h.chain.set_balance(asset, TOKEN, U256::from(500));
        h.chain.set_total_supply(TOKEN, U256::from(100));

        // Redeemable supply must be fresh for the ratio.
        let mut redeemable: RedeemableErc20 = h.env.store.load(TOKEN).await.unwrap().unwrap();
        redeemable.total_supply = U256::from(100);
        h.env.store.save(&redeemable).await.unwrap();

        let event = RedeemableEvent::TreasuryAsset {
            sender: ALICE.into(),
            asset: asset.into(),
        };
        handle(&h.env, &ctx("0xt1"), &event).await.unwrap();

        let id = composite(&[TOKEN, asset]);
        let treasury: TreasuryAsset = h.env.store.load(&id).await.unwrap().unwrap();
        assert_eq!(treasury.symbol.as_deref(), Some("DAI"));
        assert_eq!(treasury.balance, U256::from(500));
        assert_eq!(treasury.redemption_ratio, math::ratio(U256::from(500), U256::from(100)));
        assert_eq!(treasury.callers, vec!["0xt1"]);

        let redeemable: RedeemableErc20 = h.env.store.load(TOKEN).await.unwrap().unwrap();
        assert_eq!(redeemable.treasury_assets, vec![id]);
    }

    #[tokio::test]
    async fn redeem_records_and_updates_ratio() {
        let h = harness();
        seeded_redeemable(&h).await;
        let asset = "0x00000000000000000000000000000000000000dd";
        h.chain.set_erc20(asset, "Dai", "DAI", 18, U256::from(1000));
        h.chain.set_balance(asset, TOKEN, U256::from(500));
        handle(
            &h.env,
            &ctx("0xt1"),
            &RedeemableEvent::TreasuryAsset {
                sender: ALICE.into(),
                asset: asset.into(),
            },
        )
        .await
        .unwrap();

        let mut redeemable: RedeemableErc20 = h.env.store.load(TOKEN).await.unwrap().unwrap();
        redeemable.total_supply = U256::from(100);
        h.env.store.save(&redeemable).await.unwrap();
        h.chain.set_balance(asset, TOKEN, U256::from(450));

        let event = RedeemableEvent::Redeem {
            sender: ALICE.into(),
            treasury_asset: asset.into(),
            redeem_amount: U256::from(10),
            asset_amount: U256::from(50),
        };
        handle(&h.env, &ctx("0xt2"), &event).await.unwrap();

        let redeem_id = composite(&["0xt2", "0"]);
        let redeem: Redeem = h.env.store.load(&redeem_id).await.unwrap().unwrap();
        assert_eq!(redeem.redeem_amount, U256::from(10));
        assert_eq!(redeem.treasury_asset_amount, U256::from(50));

        let treasury: TreasuryAsset = h
            .env
            .store
            .load(&composite(&[TOKEN, asset]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(treasury.balance, U256::from(450));
        assert_eq!(treasury.redeems, vec![redeem_id.clone()]);

        let redeemable: RedeemableErc20 = h.env.store.load(TOKEN).await.unwrap().unwrap();
        assert_eq!(redeemable.redeems, vec![redeem_id]);
    }
}
