//! Sale lifecycle handlers.
//!
//! Buy and Refund recompute the sale aggregates with a full fold over the
//! recorded buys and refunds instead of mutating running totals, so a
//! replayed or reordered event inside one block cannot leave the totals
//! drifted.

use alloy_primitives::U256;
use tracing::warn;

use entgraph_core::entities::factory::Factory;
use entgraph_core::entities::sale::{
    Sale, SaleBuy, SaleEnd, SaleFeeRecipient, SaleReceipt, SaleRefund, SaleStart, SaleStatus,
};
use entgraph_core::error::ProjectionError;
use entgraph_core::event::EventCtx;
use entgraph_core::events::{ReceiptData, SaleEvent};
use entgraph_core::key::composite;
use entgraph_core::math;
use entgraph_core::store::EntityStoreExt;

use crate::engine::Env;

pub async fn handle(env: &Env, ctx: &EventCtx, event: &SaleEvent) -> Result<(), ProjectionError> {
    match event {
        SaleEvent::Construct {
            redeemable_erc20_factory,
            ..
        } => handle_construct(env, ctx, redeemable_erc20_factory).await,
        SaleEvent::Initialize {
            recipient,
            reserve,
            token,
            cooldown_duration,
            minimum_raise,
            dust_size,
            state_config,
            ..
        } => {
            handle_initialize(
                env,
                ctx,
                recipient,
                reserve,
                token,
                *cooldown_duration,
                *minimum_raise,
                *dust_size,
                state_config,
            )
            .await
        }
        SaleEvent::CooldownInitialize {
            cooldown_duration, ..
        } => handle_cooldown_initialize(env, ctx, *cooldown_duration).await,
        SaleEvent::Start { sender } => handle_start(env, ctx, sender).await,
        SaleEvent::End {
            sender,
            sale_status,
        } => handle_end(env, ctx, sender, *sale_status).await,
        SaleEvent::Buy {
            sender,
            fee_recipient,
            fee,
            minimum_units,
            desired_units,
            maximum_price,
            receipt,
        } => {
            handle_buy(
                env,
                ctx,
                sender,
                fee_recipient,
                *fee,
                *minimum_units,
                *desired_units,
                *maximum_price,
                receipt,
            )
            .await
        }
        SaleEvent::Refund { sender, receipt } => handle_refund(env, ctx, sender, receipt).await,
    }
}

async fn handle_construct(
    env: &Env,
    ctx: &EventCtx,
    redeemable_erc20_factory: &str,
) -> Result<(), ProjectionError> {
    let Some(sale) = env.store.load::<Sale>(&ctx.emitter).await? else {
        return Ok(());
    };
    if let Some(mut factory) = env.store.load::<Factory>(&sale.factory).await? {
        factory.redeemable_erc20_factory = Some(redeemable_erc20_factory.to_string());
        env.store.save(&factory).await?;
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_initialize(
    env: &Env,
    ctx: &EventCtx,
    recipient: &str,
    reserve: &str,
    token: &str,
    cooldown_duration: U256,
    minimum_raise: U256,
    dust_size: U256,
    state_config: &entgraph_core::entities::StateConfig,
) -> Result<(), ProjectionError> {
    let Some(mut sale) = env.store.load::<Sale>(&ctx.emitter).await? else {
        return Ok(());
    };

    let redeemable =
        crate::redeemable::get_or_create_redeemable(env, ctx, token, &ctx.tx_from, &ctx.emitter)
            .await?;
    sale.token = Some(redeemable.id);

    let reserve_token = crate::erc20::get_or_create_erc20(env, ctx, reserve).await?;
    sale.reserve = Some(reserve_token.id);

    sale.recipient = Some(recipient.to_string());
    sale.cooldown_duration = Some(cooldown_duration);
    sale.minimum_raise = minimum_raise;
    sale.dust_size = Some(dust_size);
    sale.sale_status = SaleStatus::Pending;
    sale.vm_state_config = Some(state_config.clone());
    if minimum_raise.is_zero() {
        sale.percent_raised = math::hundred_percent();
    }
    if let Some(balance) = env.chain.erc20_balance_of(token, &ctx.emitter).await {
        sale.units_available = balance;
    }
    env.store.save(&sale).await?;
    Ok(())
}

async fn handle_cooldown_initialize(
    env: &Env,
    ctx: &EventCtx,
    cooldown_duration: U256,
) -> Result<(), ProjectionError> {
    let Some(mut sale) = env.store.load::<Sale>(&ctx.emitter).await? else {
        return Ok(());
    };
    sale.cooldown_duration = Some(cooldown_duration);
    env.store.save(&sale).await?;
    Ok(())
}

async fn handle_start(env: &Env, ctx: &EventCtx, sender: &str) -> Result<(), ProjectionError> {
    let Some(mut sale) = env.store.load::<Sale>(&ctx.emitter).await? else {
        return Ok(());
    };
    let start = SaleStart {
        id: ctx.tx_hash.clone(),
        block: ctx.block_number,
        timestamp: ctx.block_timestamp,
        transaction_hash: ctx.tx_hash.clone(),
        sale: sale.id.clone(),
        sender: sender.to_string(),
    };
    env.store.save(&start).await?;

    sale.sale_status = SaleStatus::Active;
    sale.start_event = Some(start.id);
    env.store.save(&sale).await?;
    Ok(())
}

async fn handle_end(
    env: &Env,
    ctx: &EventCtx,
    sender: &str,
    sale_status: SaleStatus,
) -> Result<(), ProjectionError> {
    let Some(mut sale) = env.store.load::<Sale>(&ctx.emitter).await? else {
        return Ok(());
    };
    let end = SaleEnd {
        id: ctx.tx_hash.clone(),
        block: ctx.block_number,
        timestamp: ctx.block_timestamp,
        transaction_hash: ctx.tx_hash.clone(),
        sale: sale.id.clone(),
        sender: sender.to_string(),
        sale_status,
    };
    env.store.save(&end).await?;

    sale.sale_status = sale_status;
    sale.end_event = Some(end.id);
    env.store.save(&sale).await?;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn handle_buy(
    env: &Env,
    ctx: &EventCtx,
    sender: &str,
    fee_recipient: &str,
    fee: U256,
    minimum_units: U256,
    desired_units: U256,
    maximum_price: U256,
    receipt: &ReceiptData,
) -> Result<(), ProjectionError> {
    let Some(mut sale) = env.store.load::<Sale>(&ctx.emitter).await? else {
        return Ok(());
    };

    let receipt_entity = SaleReceipt {
        id: composite(&[&sale.id, &receipt.id.to_string()]),
        receipt_id: receipt.id,
        sale_transaction: ctx.tx_hash.clone(),
        fee_recipient: receipt.fee_recipient.clone(),
        fee: receipt.fee,
        units: receipt.units,
        price: receipt.price,
    };
    env.store.save(&receipt_entity).await?;

    let recipient_id = composite(&[&sale.id, fee_recipient]);
    let mut recipient = env
        .store
        .load::<SaleFeeRecipient>(&recipient_id)
        .await?
        .unwrap_or_else(|| SaleFeeRecipient::new(&recipient_id, fee_recipient, &sale.id));
    if !sale.sale_fee_recipients.iter().any(|r| r == &recipient_id) {
        sale.sale_fee_recipients.push(recipient_id.clone());
    }

    let buy = SaleBuy {
        id: ctx.tx_hash.clone(),
        block: ctx.block_number,
        timestamp: ctx.block_timestamp,
        transaction_hash: ctx.tx_hash.clone(),
        sale: sale.id.clone(),
        sale_address: sale.address.clone(),
        sender: sender.to_string(),
        fee_recipient_address: fee_recipient.to_string(),
        fee_recipient: recipient_id.clone(),
        fee,
        minimum_units,
        desired_units,
        maximum_price,
        receipt: receipt_entity.id.clone(),
        total_in: math::mul_div(receipt.units, receipt.price, math::one()) + receipt.fee,
        refunded: false,
        refund_event: None,
    };
    env.store.save(&buy).await?;

    recipient.buys.push(buy.id.clone());
    env.store.save(&recipient).await?;

    sale.buys.push(buy.id.clone());
    sale.sale_transactions.push(buy.id.clone());
    env.store.save(&sale).await?;

    update_sale(env, &sale.id).await?;
    update_fee_recipient(env, &recipient_id).await?;
    Ok(())
}

async fn handle_refund(
    env: &Env,
    ctx: &EventCtx,
    sender: &str,
    receipt: &ReceiptData,
) -> Result<(), ProjectionError> {
    let Some(mut sale) = env.store.load::<Sale>(&ctx.emitter).await? else {
        return Ok(());
    };

    let receipt_id = composite(&[&sale.id, &receipt.id.to_string()]);
    let receipt_entity = env.store.load::<SaleReceipt>(&receipt_id).await?;
    if receipt_entity.is_none() {
        warn!(sale = %sale.id, receipt = %receipt_id, "refund for unknown receipt");
    }

    let recipient_id = composite(&[&sale.id, &receipt.fee_recipient]);
    let total_out = receipt_entity
        .as_ref()
        .map(|r| math::mul_div(r.units, r.price, math::one()) + receipt.fee)
        .unwrap_or(U256::ZERO);

    let refund = SaleRefund {
        id: ctx.tx_hash.clone(),
        block: ctx.block_number,
        timestamp: ctx.block_timestamp,
        transaction_hash: ctx.tx_hash.clone(),
        sale: sale.id.clone(),
        sale_address: sale.address.clone(),
        sender: sender.to_string(),
        fee_recipient_address: receipt.fee_recipient.clone(),
        fee_recipient: recipient_id.clone(),
        fee: receipt.fee,
        receipt: receipt_id.clone(),
        total_out,
    };
    env.store.save(&refund).await?;

    if let Some(mut recipient) = env.store.load::<SaleFeeRecipient>(&recipient_id).await? {
        recipient.refunds.push(refund.id.clone());
        env.store.save(&recipient).await?;
    }

    // The receipt links back to the buy being unwound.
    if let Some(receipt_entity) = &receipt_entity {
        if let Some(mut buy) = env
            .store
            .load::<SaleBuy>(&receipt_entity.sale_transaction)
            .await?
        {
            buy.refunded = true;
            buy.refund_event = Some(refund.id.clone());
            env.store.save(&buy).await?;
        }
    }

    sale.refunds.push(refund.id.clone());
    sale.sale_transactions.push(refund.id.clone());
    env.store.save(&sale).await?;

    update_sale(env, &sale.id).await?;
    update_fee_recipient(env, &recipient_id).await?;
    Ok(())
}

/// Recompute a sale's aggregates from its buy and refund records.
async fn update_sale(env: &Env, sale_id: &str) -> Result<(), ProjectionError> {
    let Some(mut sale) = env.store.load::<Sale>(sale_id).await? else {
        return Ok(());
    };

    if let Some(token) = &sale.token {
        if let Some(balance) = env.chain.erc20_balance_of(token, &sale.address).await {
            sale.units_available = balance;
        }
    }

    let mut total_in = U256::ZERO;
    let mut buy_fee = U256::ZERO;
    let mut total_out = U256::ZERO;
    let mut refund_fee = U256::ZERO;

    for buy_id in &sale.buys {
        if let Some(buy) = env.store.load::<SaleBuy>(buy_id).await? {
            total_in += buy.total_in;
            buy_fee += buy.fee;
        }
    }
    for refund_id in &sale.refunds {
        if let Some(refund) = env.store.load::<SaleRefund>(refund_id).await? {
            total_out += refund.total_out;
            refund_fee += refund.fee;
        }
    }

    let net_fees = buy_fee.saturating_sub(refund_fee);
    if sale.sale_status >= SaleStatus::Active {
        sale.total_raised = total_in
            .saturating_sub(total_out)
            .saturating_sub(net_fees);
    }
    sale.total_fees = net_fees;
    sale.percent_raised = math::percent(sale.total_raised, sale.minimum_raise);
    env.store.save(&sale).await?;
    Ok(())
}

/// Recompute a fee recipient's total from its buy and refund records.
async fn update_fee_recipient(env: &Env, recipient_id: &str) -> Result<(), ProjectionError> {
    let Some(mut recipient) = env.store.load::<SaleFeeRecipient>(recipient_id).await? else {
        return Ok(());
    };

    let mut buy_fees = U256::ZERO;
    let mut refund_fees = U256::ZERO;
    for buy_id in &recipient.buys {
        if let Some(buy) = env.store.load::<SaleBuy>(buy_id).await? {
            buy_fees += buy.fee;
        }
    }
    for refund_id in &recipient.refunds {
        if let Some(refund) = env.store.load::<SaleRefund>(refund_id).await? {
            refund_fees += refund.fee;
        }
    }
    recipient.total_fees = buy_fees.saturating_sub(refund_fees);
    env.store.save(&recipient).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::harness;
    use entgraph_core::entities::StateConfig;

    const SALE: &str = "0x00000000000000000000000000000000000000aa";
    const TOKEN: &str = "0x00000000000000000000000000000000000000bb";
    const RESERVE: &str = "0x00000000000000000000000000000000000000cc";
    const FEE_RECIPIENT: &str = "0x00000000000000000000000000000000000000fe";

    fn ctx(tx: &str, block: u64) -> EventCtx {
        EventCtx {
            emitter: SALE.into(),
            tx_hash: tx.into(),
            tx_from: "0x00000000000000000000000000000000000000f0".into(),
            block_number: block,
            block_timestamp: block * 10,
            log_index: 0,
        }
    }

    fn wad(n: u64) -> U256 {
        U256::from(n) * math::one()
    }

    async fn seeded_sale(h: &crate::testutil::Harness, minimum_raise: U256) {
        let sale = Sale::new(SALE, 1, 10, "0xdep", "0xfac");
        h.env.store.save(&sale).await.unwrap();
        let init = SaleEvent::Initialize {
            sender: "0xdep".into(),
            recipient: "0xrec".into(),
            reserve: RESERVE.into(),
            token: TOKEN.into(),
            cooldown_duration: U256::from(100),
            minimum_raise,
            dust_size: U256::ZERO,
            state_config: StateConfig {
                sources: vec!["0x0102".into()],
                constants: vec![U256::from(7)],
            },
        };
        handle(&h.env, &ctx("0xinit", 1), &init).await.unwrap();
        handle(
            &h.env,
            &ctx("0xstart", 2),
            &SaleEvent::Start {
                sender: "0xdep".into(),
            },
        )
        .await
        .unwrap();
    }

    fn buy_event(receipt_id: u64, units: u64, price_wad: u64, fee: u64) -> SaleEvent {
        SaleEvent::Buy {
            sender: "0xbuyer".into(),
            fee_recipient: FEE_RECIPIENT.into(),
            fee: U256::from(fee),
            minimum_units: U256::from(1),
            desired_units: U256::from(units),
            maximum_price: wad(price_wad),
            receipt: ReceiptData {
                id: U256::from(receipt_id),
                fee_recipient: FEE_RECIPIENT.into(),
                fee: U256::from(fee),
                units: U256::from(units),
                price: wad(price_wad),
            },
        }
    }

    #[tokio::test]
    async fn event_for_unknown_sale_is_skipped() {
        let h = harness();
        handle(
            &h.env,
            &ctx("0xs", 2),
            &SaleEvent::Start {
                sender: "0x1".into(),
            },
        )
        .await
        .unwrap();
        assert!(h.env.store.load::<SaleStart>("0xs").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn zero_minimum_raise_reads_hundred_percent() {
        let h = harness();
        seeded_sale(&h, U256::ZERO).await;
        let sale: Sale = h.env.store.load(SALE).await.unwrap().unwrap();
        assert_eq!(sale.percent_raised, math::hundred_percent());
    }

    #[tokio::test]
    async fn cooldown_initialize_overrides_duration() {
        let h = harness();
        seeded_sale(&h, U256::from(1000)).await;
        handle(
            &h.env,
            &ctx("0xc1", 2),
            &SaleEvent::CooldownInitialize {
                sender: "0xdep".into(),
                cooldown_duration: U256::from(250),
            },
        )
        .await
        .unwrap();

        let sale: Sale = h.env.store.load(SALE).await.unwrap().unwrap();
        assert_eq!(sale.cooldown_duration, Some(U256::from(250)));
    }

    #[tokio::test]
    async fn buy_records_receipt_and_totals() {
        let h = harness();
        seeded_sale(&h, U256::from(1000)).await;

        // 10 units at 2.0 each plus fee 5 -> totalIn 25, raised 20.
        handle(&h.env, &ctx("0xb1", 3), &buy_event(1, 10, 2, 5))
            .await
            .unwrap();

        let buy: SaleBuy = h.env.store.load("0xb1").await.unwrap().unwrap();
        assert_eq!(buy.total_in, U256::from(25));
        assert!(!buy.refunded);

        let sale: Sale = h.env.store.load(SALE).await.unwrap().unwrap();
        assert_eq!(sale.total_raised, U256::from(20));
        assert_eq!(sale.total_fees, U256::from(5));
        assert_eq!(sale.buys, vec!["0xb1"]);
        assert_eq!(sale.sale_transactions, vec!["0xb1"]);

        let recipient_id = composite(&[SALE, FEE_RECIPIENT]);
        let recipient: SaleFeeRecipient =
            h.env.store.load(&recipient_id).await.unwrap().unwrap();
        assert_eq!(recipient.total_fees, U256::from(5));

        let receipt_id = composite(&[SALE, "1"]);
        let receipt: SaleReceipt = h.env.store.load(&receipt_id).await.unwrap().unwrap();
        assert_eq!(receipt.sale_transaction, "0xb1");
    }

    #[tokio::test]
    async fn buy_before_start_records_fees_but_not_raised() {
        let h = harness();
        let sale = Sale::new(SALE, 1, 10, "0xdep", "0xfac");
        h.env.store.save(&sale).await.unwrap();
        let init = SaleEvent::Initialize {
            sender: "0xdep".into(),
            recipient: "0xrec".into(),
            reserve: RESERVE.into(),
            token: TOKEN.into(),
            cooldown_duration: U256::from(100),
            minimum_raise: U256::from(1000),
            dust_size: U256::ZERO,
            state_config: StateConfig {
                sources: vec!["0x0102".into()],
                constants: vec![U256::from(7)],
            },
        };
        handle(&h.env, &ctx("0xinit", 1), &init).await.unwrap();

        handle(&h.env, &ctx("0xb1", 3), &buy_event(1, 10, 2, 5))
            .await
            .unwrap();

        let sale: Sale = h.env.store.load(SALE).await.unwrap().unwrap();
        assert_eq!(sale.sale_status, SaleStatus::Pending);
        assert_eq!(sale.total_raised, U256::ZERO);
        assert_eq!(sale.total_fees, U256::from(5));
    }

    #[tokio::test]
    async fn refund_unwinds_the_buy() {
        let h = harness();
        seeded_sale(&h, U256::from(1000)).await;
        handle(&h.env, &ctx("0xb1", 3), &buy_event(1, 10, 2, 5))
            .await
            .unwrap();

        let refund = SaleEvent::Refund {
            sender: "0xbuyer".into(),
            receipt: ReceiptData {
                id: U256::from(1),
                fee_recipient: FEE_RECIPIENT.into(),
                fee: U256::from(5),
                units: U256::from(10),
                price: wad(2),
            },
        };
        handle(&h.env, &ctx("0xr1", 4), &refund).await.unwrap();

        let buy: SaleBuy = h.env.store.load("0xb1").await.unwrap().unwrap();
        assert!(buy.refunded);
        assert_eq!(buy.refund_event.as_deref(), Some("0xr1"));

        let sale: Sale = h.env.store.load(SALE).await.unwrap().unwrap();
        assert_eq!(sale.total_raised, U256::ZERO);
        assert_eq!(sale.total_fees, U256::ZERO);
        assert_eq!(sale.sale_transactions, vec!["0xb1", "0xr1"]);

        let recipient_id = composite(&[SALE, FEE_RECIPIENT]);
        let recipient: SaleFeeRecipient =
            h.env.store.load(&recipient_id).await.unwrap().unwrap();
        assert_eq!(recipient.total_fees, U256::ZERO);
    }

    #[tokio::test]
    async fn end_freezes_status() {
        let h = harness();
        seeded_sale(&h, U256::from(20)).await;
        handle(&h.env, &ctx("0xb1", 3), &buy_event(1, 10, 2, 0))
            .await
            .unwrap();
        handle(
            &h.env,
            &ctx("0xe1", 5),
            &SaleEvent::End {
                sender: "0xdep".into(),
                sale_status: SaleStatus::Success,
            },
        )
        .await
        .unwrap();

        let sale: Sale = h.env.store.load(SALE).await.unwrap().unwrap();
        assert_eq!(sale.sale_status, SaleStatus::Success);
        assert_eq!(sale.end_event.as_deref(), Some("0xe1"));
        // 20 raised of 20 minimum.
        assert_eq!(sale.percent_raised, math::hundred_percent());
    }
}
