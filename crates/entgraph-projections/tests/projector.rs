//! End-to-end projection runs over the in-memory store.

use std::sync::Arc;

use alloy_primitives::U256;
use futures::stream;

use entgraph_core::entities::escrow::{
    EscrowSupplyTokenDeposit, EscrowUndeposit, EscrowWithdraw,
};
use entgraph_core::entities::redeemable::RedeemableErc20;
use entgraph_core::entities::sale::{Sale, SaleStatus};
use entgraph_core::entities::stake::{StakeDeposit, StakeErc20};
use entgraph_core::entities::token::Erc20;
use entgraph_core::entities::factory::FactoryKind;
use entgraph_core::entities::StateConfig;
use entgraph_core::event::EventCtx;
use entgraph_core::events::{
    Erc20Event, EscrowEvent, EventEnvelope, FactoryEvent, ReceiptData, SaleEvent, StakeEvent,
    TrackedEvent,
};
use entgraph_core::key::composite;
use entgraph_core::math;
use entgraph_core::store::EntityStoreExt;
use entgraph_projections::{Env, Projector};
use entgraph_store::{MemoryStore, MockChain, RecordingSources};

const FACTORY: &str = "0x00000000000000000000000000000000000000fa";
const SALE: &str = "0x000000000000000000000000000000000000005a";
const TOKEN: &str = "0x00000000000000000000000000000000000000bb";
const RESERVE: &str = "0x00000000000000000000000000000000000000cc";
const ESCROW: &str = "0x00000000000000000000000000000000000000ee";
const STAKE: &str = "0x0000000000000000000000000000000000000057";
const DEPLOYER: &str = "0x00000000000000000000000000000000000000d0";
const ALICE: &str = "0x0000000000000000000000000000000000000a11";
const FEE_RECIPIENT: &str = "0x00000000000000000000000000000000000000fe";

struct World {
    projector: Projector,
    store: Arc<MemoryStore>,
    chain: Arc<MockChain>,
    sources: Arc<RecordingSources>,
}

fn world() -> World {
    let store = Arc::new(MemoryStore::new());
    let chain = Arc::new(MockChain::new());
    let sources = Arc::new(RecordingSources::new());
    let env = Env::new(store.clone(), chain.clone(), sources.clone());
    World {
        projector: Projector::new(env),
        store,
        chain,
        sources,
    }
}

fn envelope(emitter: &str, tx: &str, block: u64, event: TrackedEvent) -> EventEnvelope {
    EventEnvelope {
        ctx: EventCtx {
            emitter: emitter.into(),
            tx_hash: tx.into(),
            tx_from: DEPLOYER.into(),
            block_number: block,
            block_timestamp: block * 10,
            log_index: 0,
        },
        event,
    }
}

#[tokio::test]
async fn sale_lifecycle_from_factory_to_settlement() {
    let w = world();
    w.chain.set_erc20(TOKEN, "Raise", "RAISE", 18, U256::from(1000));
    w.chain.set_erc20(RESERVE, "Usd", "USD", 6, U256::from(1_000_000));
    w.chain.set_balance(TOKEN, SALE, U256::from(990));

    let events = vec![
        envelope(
            FACTORY,
            "0x01",
            1,
            TrackedEvent::Factory {
                kind: FactoryKind::Sale,
                event: FactoryEvent::NewChild {
                    sender: DEPLOYER.into(),
                    child: SALE.into(),
                },
            },
        ),
        envelope(
            SALE,
            "0x02",
            2,
            TrackedEvent::Sale(SaleEvent::Initialize {
                sender: DEPLOYER.into(),
                recipient: DEPLOYER.into(),
                reserve: RESERVE.into(),
                token: TOKEN.into(),
                cooldown_duration: U256::from(100),
                minimum_raise: U256::from(20),
                dust_size: U256::ZERO,
                state_config: StateConfig {
                    sources: vec!["0x0102".into()],
                    constants: vec![U256::from(7)],
                },
            }),
        ),
        envelope(
            SALE,
            "0x03",
            3,
            TrackedEvent::Sale(SaleEvent::Start {
                sender: DEPLOYER.into(),
            }),
        ),
        envelope(
            SALE,
            "0x04",
            4,
            TrackedEvent::Sale(SaleEvent::Buy {
                sender: ALICE.into(),
                fee_recipient: FEE_RECIPIENT.into(),
                fee: U256::from(5),
                minimum_units: U256::from(1),
                desired_units: U256::from(10),
                maximum_price: math::one() * U256::from(2),
                receipt: ReceiptData {
                    id: U256::from(1),
                    fee_recipient: FEE_RECIPIENT.into(),
                    fee: U256::from(5),
                    units: U256::from(10),
                    price: math::one() * U256::from(2),
                },
            }),
        ),
        envelope(
            SALE,
            "0x05",
            5,
            TrackedEvent::Sale(SaleEvent::End {
                sender: DEPLOYER.into(),
                sale_status: SaleStatus::Success,
            }),
        ),
    ];

    w.projector.run(stream::iter(events)).await.unwrap();

    let sale: Sale = w.store.load(SALE).await.unwrap().unwrap();
    assert_eq!(sale.sale_status, SaleStatus::Success);
    assert_eq!(sale.token.as_deref(), Some(TOKEN));
    assert_eq!(sale.reserve.as_deref(), Some(RESERVE));
    assert_eq!(sale.units_available, U256::from(990));
    // 10 units at 2.0 each: 20 raised, 5 fee on top.
    assert_eq!(sale.total_raised, U256::from(20));
    assert_eq!(sale.total_fees, U256::from(5));
    assert_eq!(sale.percent_raised, math::hundred_percent());
    assert_eq!(sale.buys, vec!["0x04"]);
    assert_eq!(sale.start_event.as_deref(), Some("0x03"));
    assert_eq!(sale.end_event.as_deref(), Some("0x05"));

    let redeemable: RedeemableErc20 = w.store.load(TOKEN).await.unwrap().unwrap();
    assert_eq!(redeemable.symbol.as_deref(), Some("RAISE"));
    assert_eq!(redeemable.sale_address, SALE);

    let reserve: Erc20 = w.store.load(RESERVE).await.unwrap().unwrap();
    assert_eq!(reserve.symbol, "USD");

    // Child and both tokens became dynamic sources.
    assert!(w.sources.contains(SALE));
    assert!(w.sources.contains(TOKEN));
    assert!(w.sources.contains(RESERVE));
}

#[tokio::test]
async fn escrow_bucket_conserves_deposits() {
    let w = world();
    w.store
        .save(&RedeemableErc20::new(TOKEN, 1, 10, DEPLOYER))
        .await
        .unwrap();

    let events = vec![
        envelope(
            ESCROW,
            "0xd1",
            10,
            TrackedEvent::Escrow(EscrowEvent::Deposit {
                depositor: ALICE.into(),
                sale: SALE.into(),
                redeemable: TOKEN.into(),
                token: RESERVE.into(),
                supply: U256::from(100),
                amount: U256::from(200),
            }),
        ),
        envelope(
            ESCROW,
            "0xd2",
            11,
            TrackedEvent::Escrow(EscrowEvent::Deposit {
                depositor: ALICE.into(),
                sale: SALE.into(),
                redeemable: TOKEN.into(),
                token: RESERVE.into(),
                supply: U256::from(100),
                amount: U256::from(300),
            }),
        ),
        envelope(
            ESCROW,
            "0xu1",
            12,
            TrackedEvent::Escrow(EscrowEvent::Undeposit {
                sender: ALICE.into(),
                sale: SALE.into(),
                token: RESERVE.into(),
                supply: U256::from(100),
                amount: U256::from(100),
            }),
        ),
        envelope(
            ESCROW,
            "0xw1",
            13,
            TrackedEvent::Escrow(EscrowEvent::Withdraw {
                withdrawer: ALICE.into(),
                sale: SALE.into(),
                redeemable: TOKEN.into(),
                token: RESERVE.into(),
                supply: U256::from(100),
                amount: U256::from(150),
            }),
        ),
    ];

    w.projector.run(stream::iter(events)).await.unwrap();

    let bucket_id = composite(&[SALE, ESCROW, "100", RESERVE]);
    let bucket: EscrowSupplyTokenDeposit = w.store.load(&bucket_id).await.unwrap().unwrap();
    assert_eq!(bucket.total_deposited, U256::from(500));

    // remaining = deposited - undeposited - withdrawn.
    let undeposit: EscrowUndeposit = w.store.load("0xu1").await.unwrap().unwrap();
    let withdraw: EscrowWithdraw = w.store.load("0xw1").await.unwrap().unwrap();
    assert_eq!(
        bucket.total_remaining,
        bucket.total_deposited - undeposit.token_amount - withdraw.token_amount
    );
    assert_eq!(bucket.total_remaining, U256::from(250));
    assert_eq!(bucket.deposits, vec!["0xd1", "0xd2"]);
}

#[tokio::test]
async fn stake_deposit_folds_across_contract_families() {
    let w = world();
    w.chain.set_erc20(STAKE, "Stake", "ST", 18, U256::ZERO);
    w.chain
        .set_erc20(RESERVE, "Usd", "USD", 6, U256::from(1_000_000));

    let events = vec![
        envelope(
            FACTORY,
            "0x01",
            1,
            TrackedEvent::Factory {
                kind: FactoryKind::StakeErc20,
                event: FactoryEvent::NewChild {
                    sender: DEPLOYER.into(),
                    child: STAKE.into(),
                },
            },
        ),
        envelope(
            STAKE,
            "0x02",
            2,
            TrackedEvent::Stake(StakeEvent::Initialize {
                sender: DEPLOYER.into(),
                token: RESERVE.into(),
                initial_ratio: math::one(),
            }),
        ),
    ];
    w.projector.run(stream::iter(events)).await.unwrap();

    // One transaction, two logs: stake mint and deposit-token arrival, in
    // either order.
    w.chain.set_total_supply(STAKE, U256::from(100));
    let deposit_logs = vec![
        envelope(
            RESERVE,
            "0xd1",
            3,
            TrackedEvent::Erc20(Erc20Event::Transfer {
                from: ALICE.into(),
                to: STAKE.into(),
                value: U256::from(100),
            }),
        ),
        envelope(
            STAKE,
            "0xd1",
            3,
            TrackedEvent::Stake(StakeEvent::Transfer {
                from: entgraph_core::ZERO_ADDRESS.into(),
                to: ALICE.into(),
                value: U256::from(100),
            }),
        ),
    ];
    w.projector.run(stream::iter(deposit_logs)).await.unwrap();

    let deposit: StakeDeposit = w.store.load("0xd1").await.unwrap().unwrap();
    assert_eq!(deposit.deposited_amount, U256::from(100));
    assert_eq!(deposit.stake_token_minted, U256::from(100));

    let stake: StakeErc20 = w.store.load(STAKE).await.unwrap().unwrap();
    assert_eq!(stake.token_pool_size, U256::from(100));
    assert_eq!(stake.total_supply, U256::from(100));
}
