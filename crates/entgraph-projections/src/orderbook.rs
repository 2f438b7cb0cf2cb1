//! Order book handlers.
//!
//! Orders are content-addressed: the key is derived from the immutable
//! configuration tuple (see `key::order_key`), so OrderLive, OrderDead and
//! Clear all collapse onto the same entity without carrying an id on the
//! wire. A clearance is two events, Clear and AfterClear, folded into one
//! `OrderClear` record keyed by block timestamp.

use alloy_primitives::U256;
use tracing::info;

use entgraph_core::entities::orderbook::{
    Bounty, ClearStateChange, Order, OrderClear, TokenVault, Vault, VaultDeposit, VaultWithdraw,
};
use entgraph_core::error::ProjectionError;
use entgraph_core::event::EventCtx;
use entgraph_core::events::{ClearConfig, OrderBookEvent};
use entgraph_core::key::{composite, order_key, OrderConfig};
use entgraph_core::store::EntityStoreExt;

use crate::engine::Env;

pub async fn handle(
    env: &Env,
    ctx: &EventCtx,
    event: &OrderBookEvent,
) -> Result<(), ProjectionError> {
    match event {
        OrderBookEvent::OrderLive { config, .. } => handle_order_live(env, ctx, config).await,
        OrderBookEvent::OrderDead { config, .. } => handle_order_dead(env, ctx, config).await,
        OrderBookEvent::Deposit {
            sender,
            token,
            vault_id,
            amount,
        } => handle_deposit(env, ctx, sender, token, *vault_id, *amount).await,
        OrderBookEvent::Withdraw {
            sender,
            token,
            vault_id,
            requested_amount,
            amount,
        } => {
            handle_withdraw(env, ctx, sender, token, *vault_id, *requested_amount, *amount).await
        }
        OrderBookEvent::Clear {
            sender,
            order_a,
            order_b,
            clear_config,
        } => handle_clear(env, ctx, sender, order_a, order_b, clear_config).await,
        OrderBookEvent::AfterClear { state_change } => {
            handle_after_clear(env, ctx, state_change).await
        }
    }
}

async fn handle_order_live(
    env: &Env,
    ctx: &EventCtx,
    config: &OrderConfig,
) -> Result<(), ProjectionError> {
    let mut order = get_order(env, ctx, config).await?;
    order.order_liveness = true;
    order.tracking = config.tracking;
    env.store.save(&order).await?;
    Ok(())
}

async fn handle_order_dead(
    env: &Env,
    ctx: &EventCtx,
    config: &OrderConfig,
) -> Result<(), ProjectionError> {
    let mut order = get_order(env, ctx, config).await?;
    order.order_liveness = false;
    order.tracking = config.tracking;
    env.store.save(&order).await?;
    Ok(())
}

async fn handle_deposit(
    env: &Env,
    ctx: &EventCtx,
    sender: &str,
    token: &str,
    vault_id: U256,
    amount: U256,
) -> Result<(), ProjectionError> {
    let token_entity = crate::erc20::get_or_create_erc20(env, ctx, token).await?;
    let mut vault = get_vault(env, vault_id, sender).await?;
    let mut token_vault = get_token_vault(env, &token_entity.id, sender, vault_id).await?;

    token_vault.balance += amount;

    let record = VaultDeposit {
        id: ctx.tx_hash.clone(),
        sender: sender.to_string(),
        token: token_entity.id,
        vault_id,
        vault: vault.id.clone(),
        amount,
        token_vault: token_vault.id.clone(),
    };
    env.store.save(&record).await?;
    env.store.save(&token_vault).await?;

    vault.deposits.push(record.id);
    if !vault.token_vaults.iter().any(|t| t == &token_vault.id) {
        vault.token_vaults.push(token_vault.id);
    }
    env.store.save(&vault).await?;
    Ok(())
}

async fn handle_withdraw(
    env: &Env,
    ctx: &EventCtx,
    sender: &str,
    token: &str,
    vault_id: U256,
    requested_amount: U256,
    amount: U256,
) -> Result<(), ProjectionError> {
    let token_entity = crate::erc20::get_or_create_erc20(env, ctx, token).await?;
    let mut vault = get_vault(env, vault_id, sender).await?;
    let mut token_vault = get_token_vault(env, &token_entity.id, sender, vault_id).await?;

    token_vault.balance = token_vault.balance.saturating_sub(amount);

    let record = VaultWithdraw {
        id: ctx.tx_hash.clone(),
        sender: sender.to_string(),
        token: token_entity.id,
        vault_id,
        vault: vault.id.clone(),
        requested_amount,
        amount,
        token_vault: token_vault.id.clone(),
    };
    env.store.save(&record).await?;
    env.store.save(&token_vault).await?;

    vault.withdraws.push(record.id);
    if !vault.token_vaults.iter().any(|t| t == &token_vault.id) {
        vault.token_vaults.push(token_vault.id);
    }
    env.store.save(&vault).await?;
    Ok(())
}

async fn handle_clear(
    env: &Env,
    ctx: &EventCtx,
    sender: &str,
    order_a: &OrderConfig,
    order_b: &OrderConfig,
    clear_config: &ClearConfig,
) -> Result<(), ProjectionError> {
    let a: Option<Order> = env.store.load(&order_key(order_a)).await?;
    let b: Option<Order> = env.store.load(&order_key(order_b)).await?;
    let (Some(a), Some(b)) = (a, b) else {
        info!(tx = %ctx.tx_hash, "clear references unknown orders, skipping");
        return Ok(());
    };

    let id = ctx.block_timestamp.to_string();

    let bounty_vault_a = get_vault(env, clear_config.a_bounty_vault_id, sender).await?;
    let bounty_vault_b = get_vault(env, clear_config.b_bounty_vault_id, sender).await?;

    let bounty = Bounty {
        id: id.clone(),
        clearer: sender.to_string(),
        order_clear: id.clone(),
        bounty_vault_a: bounty_vault_a.id,
        bounty_vault_b: bounty_vault_b.id,
        bounty_token_a: a.output_token.clone(),
        bounty_token_b: b.output_token.clone(),
        bounty_amount_a: None,
        bounty_amount_b: None,
    };
    env.store.save(&bounty).await?;

    let clear = OrderClear {
        id: id.clone(),
        sender: sender.to_string(),
        clearer: sender.to_string(),
        order_a: a.id.clone(),
        order_b: b.id.clone(),
        owners: vec![a.owner, b.owner],
        a_input_token: a.input_token,
        b_input_token: b.input_token,
        bounty: id,
        state_change: None,
    };
    env.store.save(&clear).await?;
    Ok(())
}

async fn handle_after_clear(
    env: &Env,
    ctx: &EventCtx,
    state_change: &ClearStateChange,
) -> Result<(), ProjectionError> {
    let id = ctx.block_timestamp.to_string();

    if let Some(mut bounty) = env.store.load::<Bounty>(&id).await? {
        bounty.bounty_amount_a =
            Some(state_change.a_output.saturating_sub(state_change.b_input));
        bounty.bounty_amount_b =
            Some(state_change.b_output.saturating_sub(state_change.a_input));
        env.store.save(&bounty).await?;
    }

    let Some(mut clear) = env.store.load::<OrderClear>(&id).await? else {
        return Ok(());
    };
    clear.state_change = Some(state_change.clone());
    env.store.save(&clear).await?;

    if let Some(a) = env.store.load::<Order>(&clear.order_a).await? {
        credit_vault(env, &a.input_token_vault, &clear.id, state_change.a_input).await?;
        debit_vault(env, &a.output_token_vault, &clear.id, state_change.a_output).await?;
    }
    if let Some(b) = env.store.load::<Order>(&clear.order_b).await? {
        credit_vault(env, &b.input_token_vault, &clear.id, state_change.b_input).await?;
        debit_vault(env, &b.output_token_vault, &clear.id, state_change.b_output).await?;
    }
    Ok(())
}

async fn credit_vault(
    env: &Env,
    token_vault: &str,
    clear: &str,
    amount: U256,
) -> Result<(), ProjectionError> {
    if let Some(mut vault) = env.store.load::<TokenVault>(token_vault).await? {
        vault.balance += amount;
        vault.order_clears.push(clear.to_string());
        env.store.save(&vault).await?;
    }
    Ok(())
}

async fn debit_vault(
    env: &Env,
    token_vault: &str,
    clear: &str,
    amount: U256,
) -> Result<(), ProjectionError> {
    if let Some(mut vault) = env.store.load::<TokenVault>(token_vault).await? {
        vault.balance = vault.balance.saturating_sub(amount);
        vault.order_clears.push(clear.to_string());
        env.store.save(&vault).await?;
    }
    Ok(())
}

/// Load an order by its content-addressed key, creating it (and its vaults)
/// on first sight.
async fn get_order(
    env: &Env,
    ctx: &EventCtx,
    config: &OrderConfig,
) -> Result<Order, ProjectionError> {
    let key = order_key(config);
    if let Some(order) = env.store.load::<Order>(&key).await? {
        return Ok(order);
    }

    let input_token = crate::erc20::get_or_create_erc20(env, ctx, &config.input_token).await?;
    let output_token = crate::erc20::get_or_create_erc20(env, ctx, &config.output_token).await?;

    let mut input_token_vault =
        get_token_vault(env, &input_token.id, &config.owner, config.input_vault_id).await?;
    let mut output_token_vault =
        get_token_vault(env, &output_token.id, &config.owner, config.output_vault_id).await?;
    input_token_vault.add_order(&key);
    output_token_vault.add_order(&key);
    env.store.save(&input_token_vault).await?;
    env.store.save(&output_token_vault).await?;

    let mut input_vault = get_vault(env, config.input_vault_id, &config.owner).await?;
    if !input_vault
        .token_vaults
        .iter()
        .any(|t| t == &input_token_vault.id)
    {
        input_vault.token_vaults.push(input_token_vault.id.clone());
    }
    env.store.save(&input_vault).await?;

    let mut output_vault = get_vault(env, config.output_vault_id, &config.owner).await?;
    if !output_vault
        .token_vaults
        .iter()
        .any(|t| t == &output_token_vault.id)
    {
        output_vault.token_vaults.push(output_token_vault.id.clone());
    }
    env.store.save(&output_vault).await?;

    let order = Order {
        id: key,
        owner: config.owner.clone(),
        input_token: input_token.id,
        input_token_vault: input_token_vault.id,
        input_vault: input_vault.id,
        output_token: output_token.id,
        output_token_vault: output_token_vault.id,
        output_vault: output_vault.id,
        tracking: config.tracking,
        vm_state: hex_encode(&config.vm_state),
        order_liveness: false,
    };
    env.store.save(&order).await?;
    Ok(order)
}

async fn get_vault(env: &Env, vault_id: U256, owner: &str) -> Result<Vault, ProjectionError> {
    let id = composite(&[&vault_id.to_string(), owner]);
    let vault = match env.store.load::<Vault>(&id).await? {
        Some(vault) => vault,
        None => {
            let vault = Vault::new(&id, owner);
            env.store.save(&vault).await?;
            vault
        }
    };
    Ok(vault)
}

async fn get_token_vault(
    env: &Env,
    token: &str,
    owner: &str,
    vault_id: U256,
) -> Result<TokenVault, ProjectionError> {
    let id = composite(&[&vault_id.to_string(), owner, token]);
    let vault = match env.store.load::<TokenVault>(&id).await? {
        Some(vault) => vault,
        None => TokenVault::new(&id, owner, token, vault_id),
    };
    Ok(vault)
}

fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(2 + bytes.len() * 2);
    out.push_str("0x");
    for b in bytes {
        out.push_str(&format!("{b:02x}"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::harness;

    const BOOK: &str = "0x000000000000000000000000000000000000b00c";
    const ALICE: &str = "0x0000000000000000000000000000000000000a11";
    const BOB: &str = "0x0000000000000000000000000000000000000b0b";
    const CLEARER: &str = "0x0000000000000000000000000000000000000c1e";
    const TKA: &str = "0x00000000000000000000000000000000000000aa";
    const TKB: &str = "0x00000000000000000000000000000000000000bb";

    fn ctx(tx: &str, timestamp: u64) -> EventCtx {
        EventCtx {
            emitter: BOOK.into(),
            tx_hash: tx.into(),
            tx_from: ALICE.into(),
            block_number: 3,
            block_timestamp: timestamp,
            log_index: 0,
        }
    }

    fn order_a() -> OrderConfig {
        OrderConfig {
            owner: ALICE.into(),
            input_token: TKA.into(),
            input_vault_id: U256::from(1),
            output_token: TKB.into(),
            output_vault_id: U256::from(2),
            tracking: U256::ZERO,
            vm_state: vec![0x01],
        }
    }

    fn order_b() -> OrderConfig {
        OrderConfig {
            owner: BOB.into(),
            input_token: TKB.into(),
            input_vault_id: U256::from(3),
            output_token: TKA.into(),
            output_vault_id: U256::from(4),
            tracking: U256::ZERO,
            vm_state: vec![0x02],
        }
    }

    #[tokio::test]
    async fn order_live_then_dead_flips_liveness() {
        let h = harness();
        let config = order_a();
        handle(
            &h.env,
            &ctx("0x1", 100),
            &OrderBookEvent::OrderLive {
                sender: ALICE.into(),
                config: config.clone(),
            },
        )
        .await
        .unwrap();

        let key = order_key(&config);
        let order: Order = h.env.store.load(&key).await.unwrap().unwrap();
        assert!(order.order_liveness);
        assert_eq!(order.owner, ALICE);

        let input_vault_id = composite(&["1", ALICE]);
        let input_vault: Vault = h.env.store.load(&input_vault_id).await.unwrap().unwrap();
        assert_eq!(input_vault.token_vaults, vec![composite(&["1", ALICE, TKA])]);

        let itv: TokenVault = h
            .env
            .store
            .load(&composite(&["1", ALICE, TKA]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(itv.orders, vec![key.clone()]);

        handle(
            &h.env,
            &ctx("0x2", 110),
            &OrderBookEvent::OrderDead {
                sender: ALICE.into(),
                config,
            },
        )
        .await
        .unwrap();
        let order: Order = h.env.store.load(&key).await.unwrap().unwrap();
        assert!(!order.order_liveness);
    }

    #[tokio::test]
    async fn deposit_and_withdraw_move_the_token_vault_balance() {
        let h = harness();
        handle(
            &h.env,
            &ctx("0xd", 100),
            &OrderBookEvent::Deposit {
                sender: ALICE.into(),
                token: TKA.into(),
                vault_id: U256::from(7),
                amount: U256::from(500),
            },
        )
        .await
        .unwrap();

        let tv_id = composite(&["7", ALICE, TKA]);
        let tv: TokenVault = h.env.store.load(&tv_id).await.unwrap().unwrap();
        assert_eq!(tv.balance, U256::from(500));

        // Partial fill: 300 requested, 200 moved.
        handle(
            &h.env,
            &ctx("0xw", 110),
            &OrderBookEvent::Withdraw {
                sender: ALICE.into(),
                token: TKA.into(),
                vault_id: U256::from(7),
                requested_amount: U256::from(300),
                amount: U256::from(200),
            },
        )
        .await
        .unwrap();

        let tv: TokenVault = h.env.store.load(&tv_id).await.unwrap().unwrap();
        assert_eq!(tv.balance, U256::from(300));

        let withdraw: VaultWithdraw = h.env.store.load("0xw").await.unwrap().unwrap();
        assert_eq!(withdraw.requested_amount, U256::from(300));
        assert_eq!(withdraw.amount, U256::from(200));

        let vault: Vault = h
            .env
            .store
            .load(&composite(&["7", ALICE]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(vault.deposits, vec!["0xd"]);
        assert_eq!(vault.withdraws, vec!["0xw"]);
    }

    #[tokio::test]
    async fn clear_and_after_clear_fold_into_one_record() {
        let h = harness();
        for (tx, config) in [("0x1", order_a()), ("0x2", order_b())] {
            handle(
                &h.env,
                &ctx(tx, 100),
                &OrderBookEvent::OrderLive {
                    sender: config.owner.clone(),
                    config,
                },
            )
            .await
            .unwrap();
        }

        handle(
            &h.env,
            &ctx("0xc", 200),
            &OrderBookEvent::Clear {
                sender: CLEARER.into(),
                order_a: order_a(),
                order_b: order_b(),
                clear_config: ClearConfig {
                    a_bounty_vault_id: U256::from(91),
                    b_bounty_vault_id: U256::from(92),
                },
            },
        )
        .await
        .unwrap();

        let clear: OrderClear = h.env.store.load("200").await.unwrap().unwrap();
        assert_eq!(clear.owners, vec![ALICE.to_string(), BOB.to_string()]);
        assert!(clear.state_change.is_none());

        handle(
            &h.env,
            &ctx("0xc", 200),
            &OrderBookEvent::AfterClear {
                state_change: ClearStateChange {
                    a_input: U256::from(10),
                    a_output: U256::from(30),
                    b_input: U256::from(20),
                    b_output: U256::from(15),
                },
            },
        )
        .await
        .unwrap();

        let clear: OrderClear = h.env.store.load("200").await.unwrap().unwrap();
        assert_eq!(
            clear.state_change,
            Some(ClearStateChange {
                a_input: U256::from(10),
                a_output: U256::from(30),
                b_input: U256::from(20),
                b_output: U256::from(15),
            })
        );

        let bounty: Bounty = h.env.store.load("200").await.unwrap().unwrap();
        assert_eq!(bounty.bounty_amount_a, Some(U256::from(10)));
        assert_eq!(bounty.bounty_amount_b, Some(U256::from(5)));
        assert_eq!(bounty.bounty_token_a, TKB);
        assert_eq!(bounty.bounty_token_b, TKA);

        // A's input vault gained aInput, A's output vault lost aOutput.
        let a_in: TokenVault = h
            .env
            .store
            .load(&composite(&["1", ALICE, TKA]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(a_in.balance, U256::from(10));
        assert_eq!(a_in.order_clears, vec!["200"]);

        let b_in: TokenVault = h
            .env
            .store
            .load(&composite(&["3", BOB, TKB]))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(b_in.balance, U256::from(20));
    }

    #[tokio::test]
    async fn clear_against_unknown_orders_is_skipped() {
        let h = harness();
        handle(
            &h.env,
            &ctx("0xc", 300),
            &OrderBookEvent::Clear {
                sender: CLEARER.into(),
                order_a: order_a(),
                order_b: order_b(),
                clear_config: ClearConfig {
                    a_bounty_vault_id: U256::from(1),
                    b_bounty_vault_id: U256::from(2),
                },
            },
        )
        .await
        .unwrap();
        let clear: Option<OrderClear> = h.env.store.load("300").await.unwrap();
        assert!(clear.is_none());
    }
}
