//! The typed event model.
//!
//! Upstream log decoding is out of scope: events arrive here already decoded
//! into these variants, paired with an [`EventCtx`] carrying emitter and
//! block coordinates. One envelope per log, delivered in `(block_number,
//! log_index)` order.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use crate::entities::{
    factory::FactoryKind, gated_nft::Transferrable, orderbook::ClearStateChange,
    sale::SaleStatus, verify::VerifyEventKind, StateConfig,
};
use crate::event::EventCtx;
use crate::key::OrderConfig;

/// A decoded log plus its block/transaction coordinates.
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub ctx: EventCtx,
    pub event: TrackedEvent,
}

/// Every event shape the engine consumes, grouped by emitting contract
/// family.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TrackedEvent {
    Factory {
        kind: FactoryKind,
        event: FactoryEvent,
    },
    NoticeBoard(NoticeBoardEvent),
    Sale(SaleEvent),
    Verify(VerifyEvent),
    Redeemable(RedeemableEvent),
    /// Transfer on an externally registered ERC20 (dynamic source).
    Erc20(Erc20Event),
    CombineTier(CombineTierEvent),
    VerifyTier(VerifyTierEvent),
    Stake(StakeEvent),
    Emissions(EmissionsEvent),
    GatedNft(GatedNftEvent),
    Escrow(EscrowEvent),
    OrderBook(OrderBookEvent),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FactoryEvent {
    /// A child contract was deployed.
    NewChild { sender: String, child: String },
    /// The factory announced its implementation address.
    Implementation { implementation: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NoticeBoardEvent {
    NewNotice {
        sender: String,
        subject: String,
        /// Hex-encoded payload.
        data: String,
    },
}

/// Receipt tuple carried by both Buy and Refund.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptData {
    pub id: U256,
    pub fee_recipient: String,
    pub fee: U256,
    pub units: U256,
    pub price: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SaleEvent {
    /// Emitted once by the implementation; announces the sibling
    /// RedeemableERC20 factory.
    Construct {
        sender: String,
        redeemable_erc20_factory: String,
    },
    Initialize {
        sender: String,
        recipient: String,
        reserve: String,
        token: String,
        cooldown_duration: U256,
        minimum_raise: U256,
        dust_size: U256,
        state_config: StateConfig,
    },
    /// Emitted when the buy cooldown is configured, alongside Initialize.
    CooldownInitialize {
        sender: String,
        cooldown_duration: U256,
    },
    Start {
        sender: String,
    },
    End {
        sender: String,
        sale_status: SaleStatus,
    },
    Buy {
        sender: String,
        fee_recipient: String,
        fee: U256,
        minimum_units: U256,
        desired_units: U256,
        maximum_price: U256,
        receipt: ReceiptData,
    },
    Refund {
        sender: String,
        receipt: ReceiptData,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VerifyEvent {
    /// One of the six attestation shapes (approve/ban/remove and their
    /// requests); they share a parameter layout.
    Attest {
        kind: VerifyEventKind,
        sender: String,
        account: String,
        /// Hex-encoded evidence payload.
        data: String,
    },
    RoleGranted {
        /// keccak hash of the role name, hex-encoded.
        role: String,
        account: String,
        sender: String,
    },
    RoleRevoked {
        role: String,
        account: String,
        sender: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RedeemableEvent {
    Initialize {
        /// The deploying factory.
        sender: String,
        admin: String,
        tier: String,
        minimum_tier: U256,
    },
    /// Grants an address the right to send tokens regardless of tier.
    Sender {
        sender: String,
        granted_sender: String,
    },
    /// Grants an address the right to receive tokens regardless of tier.
    Receiver {
        sender: String,
        granted_receiver: String,
    },
    Transfer {
        from: String,
        to: String,
        value: U256,
    },
    /// An ERC20 announced as a treasury asset of this redeemable.
    TreasuryAsset {
        sender: String,
        asset: String,
    },
    Redeem {
        sender: String,
        treasury_asset: String,
        redeem_amount: U256,
        asset_amount: U256,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Erc20Event {
    Transfer {
        from: String,
        to: String,
        value: U256,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CombineTierEvent {
    /// Captures the combining VM program.
    Initialize {
        sender: String,
        state: StateConfig,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VerifyTierEvent {
    Initialize {
        sender: String,
        verify_contract: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StakeEvent {
    Initialize {
        sender: String,
        token: String,
        initial_ratio: U256,
    },
    /// Stake-token ERC20 transfer; mints (from zero) are deposits, burns
    /// (to zero) are withdrawals.
    Transfer {
        from: String,
        to: String,
        value: U256,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EmissionsEvent {
    Initialize {
        sender: String,
        allow_delegated_claims: bool,
        calculate_claim_state_config: StateConfig,
    },
    Claim {
        sender: String,
        claimant: String,
        /// Hex-encoded claim payload.
        data: String,
    },
    /// Emissions-token ERC20 transfer; the mint paired with a Claim carries
    /// the claimed amount.
    Transfer {
        from: String,
        to: String,
        value: U256,
    },
}

/// Static metadata announced when a gated NFT is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatedNftConfig {
    pub name: String,
    pub symbol: String,
    pub description: String,
    pub animation_url: String,
    pub animation_hash: String,
    pub image_url: String,
    pub image_hash: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GatedNftEvent {
    /// Emitted by the factory alongside NewChild; `address` names the child.
    Created {
        address: String,
        creator: String,
        config: GatedNftConfig,
        tier: String,
        minimum_status: U256,
        max_per_address: U256,
        transferrable: Transferrable,
        max_mintable: U256,
        royalty_recipient: String,
        royalty_bps: U256,
    },
    Transfer {
        from: String,
        to: String,
        token_id: U256,
    },
    OwnershipTransferred {
        old_owner: String,
        new_owner: String,
    },
    UpdatedRoyaltyRecipient {
        royalty_recipient: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EscrowEvent {
    PendingDeposit {
        sender: String,
        sale: String,
        redeemable: String,
        token: String,
        amount: U256,
    },
    Deposit {
        depositor: String,
        sale: String,
        redeemable: String,
        token: String,
        supply: U256,
        amount: U256,
    },
    /// Marks a depositor's pending balance as claimed into a supply-bound
    /// deposit once the sale settles.
    Sweep {
        sender: String,
        depositor: String,
        sale: String,
        token: String,
    },
    Undeposit {
        sender: String,
        sale: String,
        token: String,
        supply: U256,
        amount: U256,
    },
    Withdraw {
        withdrawer: String,
        sale: String,
        redeemable: String,
        token: String,
        supply: U256,
        amount: U256,
    },
}

/// Bounty vault ids carried by a Clear event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClearConfig {
    pub a_bounty_vault_id: U256,
    pub b_bounty_vault_id: U256,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderBookEvent {
    OrderLive {
        sender: String,
        config: OrderConfig,
    },
    OrderDead {
        sender: String,
        config: OrderConfig,
    },
    Deposit {
        sender: String,
        token: String,
        vault_id: U256,
        amount: U256,
    },
    Withdraw {
        sender: String,
        token: String,
        vault_id: U256,
        requested_amount: U256,
        amount: U256,
    },
    Clear {
        sender: String,
        order_a: OrderConfig,
        order_b: OrderConfig,
        clear_config: ClearConfig,
    },
    AfterClear {
        state_change: ClearStateChange,
    },
}
