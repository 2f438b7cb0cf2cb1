//! Order book entities: orders, vaults and clearances.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

/// A live or dead order, keyed by the content-addressed order hash (see
/// `key::order_key`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub owner: String,
    pub input_token: String,
    /// TokenVault id for the input side.
    pub input_token_vault: String,
    pub input_vault: String,
    pub output_token: String,
    /// TokenVault id for the output side.
    pub output_token_vault: String,
    pub output_vault: String,
    pub tracking: U256,
    /// Hex-encoded VM state used at clearance time.
    pub vm_state: String,
    /// True between OrderLive and OrderDead.
    pub order_liveness: bool,
}

impl_entity!(Order, Order);

/// All vaults of one owner under one vault id, keyed `vaultId - owner`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vault {
    pub id: String,
    pub owner: String,
    pub token_vaults: Vec<String>,
    pub deposits: Vec<String>,
    pub withdraws: Vec<String>,
}

impl Vault {
    pub fn new(id: &str, owner: &str) -> Self {
        Self {
            id: id.to_string(),
            owner: owner.to_string(),
            token_vaults: Vec::new(),
            deposits: Vec::new(),
            withdraws: Vec::new(),
        }
    }
}

impl_entity!(Vault, Vault);

/// Balance of one token inside a vault, keyed `vaultId - owner - token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenVault {
    pub id: String,
    pub owner: String,
    pub token: String,
    pub vault_id: U256,
    pub balance: U256,
    /// Orders that reference this token vault on either side.
    pub orders: Vec<String>,
    pub order_clears: Vec<String>,
}

impl TokenVault {
    pub fn new(id: &str, owner: &str, token: &str, vault_id: U256) -> Self {
        Self {
            id: id.to_string(),
            owner: owner.to_string(),
            token: token.to_string(),
            vault_id,
            balance: U256::ZERO,
            orders: Vec::new(),
            order_clears: Vec::new(),
        }
    }

    /// Attach an order. Idempotent per order id.
    pub fn add_order(&mut self, order: &str) {
        if !self.orders.iter().any(|o| o == order) {
            self.orders.push(order.to_string());
        }
    }
}

impl_entity!(TokenVault, TokenVault);

/// One vault deposit, keyed by transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultDeposit {
    pub id: String,
    pub sender: String,
    pub token: String,
    pub vault_id: U256,
    pub vault: String,
    pub amount: U256,
    pub token_vault: String,
}

impl_entity!(VaultDeposit, VaultDeposit);

/// One vault withdrawal, keyed by transaction hash. `amount` is what was
/// actually moved, which may be less than `requested_amount`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultWithdraw {
    pub id: String,
    pub sender: String,
    pub token: String,
    pub vault_id: U256,
    pub vault: String,
    pub requested_amount: U256,
    pub amount: U256,
    pub token_vault: String,
}

impl_entity!(VaultWithdraw, VaultWithdraw);

/// Balance movements of one clearance, folded from the AfterClear event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearStateChange {
    pub a_input: U256,
    pub a_output: U256,
    pub b_input: U256,
    pub b_output: U256,
}

/// A matched pair of orders being cleared, keyed by block timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderClear {
    pub id: String,
    pub sender: String,
    pub clearer: String,
    pub order_a: String,
    pub order_b: String,
    pub owners: Vec<String>,
    pub a_input_token: String,
    pub b_input_token: String,
    pub bounty: String,
    /// Folded in when the paired AfterClear event arrives.
    pub state_change: Option<ClearStateChange>,
}

impl_entity!(OrderClear, OrderClear);

/// The clearer's spread on one clearance, keyed by block timestamp.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounty {
    pub id: String,
    pub clearer: String,
    pub order_clear: String,
    pub bounty_vault_a: String,
    pub bounty_vault_b: String,
    pub bounty_token_a: String,
    pub bounty_token_b: String,
    /// `aOutput - bInput`, set when AfterClear arrives.
    pub bounty_amount_a: Option<U256>,
    /// `bOutput - aInput`, set when AfterClear arrives.
    pub bounty_amount_b: Option<U256>,
}

impl_entity!(Bounty, Bounty);
