//! Redeemable-token claim-escrow entities.
//!
//! The escrow segregates deposits per `(sale, escrow, supply, token)` and,
//! one level down, per depositor. `EscrowSupplyTokenWithdrawer` carries the
//! derived claimable amount for each (bucket, withdrawer) pair; it is
//! recomputed eagerly whenever the bucket or the holder's token balance
//! moves.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use super::sale::SaleRef;

/// A claim-escrow contract, keyed by address. Pure aggregation root.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimEscrow {
    pub id: String,
    pub address: String,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
    pub pending_deposits: Vec<String>,
    pub deposits: Vec<String>,
    pub undeposits: Vec<String>,
    pub withdraws: Vec<String>,
    pub pending_depositor_tokens: Vec<String>,
    pub supply_token_deposits: Vec<String>,
    pub supply_token_depositors: Vec<String>,
    pub supply_token_withdrawers: Vec<String>,
    pub depositors: Vec<String>,
    pub withdrawers: Vec<String>,
    pub notices: Vec<String>,
}

impl ClaimEscrow {
    pub fn new(address: &str, block: u64, timestamp: u64) -> Self {
        Self {
            id: address.to_string(),
            address: address.to_string(),
            deploy_block: block,
            deploy_timestamp: timestamp,
            pending_deposits: Vec::new(),
            deposits: Vec::new(),
            undeposits: Vec::new(),
            withdraws: Vec::new(),
            pending_depositor_tokens: Vec::new(),
            supply_token_deposits: Vec::new(),
            supply_token_depositors: Vec::new(),
            supply_token_withdrawers: Vec::new(),
            depositors: Vec::new(),
            withdrawers: Vec::new(),
            notices: Vec::new(),
        }
    }
}

impl_entity!(ClaimEscrow, ClaimEscrow);

/// A pending (pre-sale-settlement) deposit, keyed by transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowPendingDeposit {
    pub id: String,
    pub depositor_address: String,
    pub depositor: String,
    pub escrow: String,
    pub escrow_address: String,
    pub i_sale: SaleRef,
    pub i_sale_address: String,
    pub redeemable: Option<String>,
    pub token: String,
    pub token_address: String,
    pub amount: U256,
}

impl_entity!(EscrowPendingDeposit, EscrowPendingDeposit);

/// A settled deposit at a frozen redeemable supply, keyed by transaction
/// hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowDeposit {
    pub id: String,
    pub depositor_address: String,
    pub depositor: String,
    pub escrow: String,
    pub escrow_address: String,
    pub i_sale: SaleRef,
    pub i_sale_address: String,
    pub redeemable: Option<String>,
    pub redeemable_supply: U256,
    pub token: String,
    pub token_address: String,
    pub token_amount: U256,
}

impl_entity!(EscrowDeposit, EscrowDeposit);

/// An undeposit (depositor pull-back after a failed sale), keyed by
/// transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowUndeposit {
    pub id: String,
    pub sender: String,
    pub escrow: String,
    pub escrow_address: String,
    pub i_sale: SaleRef,
    pub i_sale_address: String,
    pub token: String,
    pub token_address: String,
    pub redeemable_supply: U256,
    pub token_amount: U256,
}

impl_entity!(EscrowUndeposit, EscrowUndeposit);

/// A pro-rata withdrawal after a successful sale, keyed by transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowWithdraw {
    pub id: String,
    pub withdrawer: String,
    pub escrow: String,
    pub escrow_address: String,
    pub i_sale: SaleRef,
    pub i_sale_address: String,
    pub redeemable: Option<String>,
    pub redeemable_supply: U256,
    pub token: String,
    pub token_address: String,
    pub token_amount: U256,
}

impl_entity!(EscrowWithdraw, EscrowWithdraw);

/// An account that has deposited into an escrow, keyed by address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowDepositor {
    pub id: String,
    pub address: String,
    pub pending_depositor_tokens: Vec<String>,
    pub supply_token_deposits: Vec<String>,
    pub pending_deposits: Vec<String>,
    pub deposits: Vec<String>,
    pub undeposits: Vec<String>,
}

impl EscrowDepositor {
    pub fn new(address: &str) -> Self {
        Self {
            id: address.to_string(),
            address: address.to_string(),
            pending_depositor_tokens: Vec::new(),
            supply_token_deposits: Vec::new(),
            pending_deposits: Vec::new(),
            deposits: Vec::new(),
            undeposits: Vec::new(),
        }
    }
}

impl_entity!(EscrowDepositor, EscrowDepositor);

/// An account that has withdrawn from an escrow, keyed
/// `escrowAddress - account`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowWithdrawer {
    pub id: String,
    pub address: String,
    pub escrow: String,
    pub escrow_address: String,
    pub withdraws: Vec<String>,
}

impl EscrowWithdrawer {
    pub fn new(id: &str, address: &str, escrow: &str) -> Self {
        Self {
            id: id.to_string(),
            address: address.to_string(),
            escrow: escrow.to_string(),
            escrow_address: escrow.to_string(),
            withdraws: Vec::new(),
        }
    }
}

impl_entity!(EscrowWithdrawer, EscrowWithdrawer);

/// The per-(sale, escrow, supply, token) deposit bucket, keyed
/// `saleAddress - escrowAddress - supply - tokenAddress`.
///
/// `total_deposited` is monotonic; undeposits and withdrawals reduce only
/// `total_remaining`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowSupplyTokenDeposit {
    pub id: String,
    pub i_sale: SaleRef,
    pub i_sale_address: String,
    pub escrow: String,
    pub escrow_address: String,
    pub redeemable_supply: U256,
    pub token: String,
    pub token_address: String,
    pub deposits: Vec<String>,
    pub depositors: Vec<String>,
    pub depositor_addresses: Vec<String>,
    pub withdraws: Vec<String>,
    pub total_deposited: U256,
    pub total_remaining: U256,
}

impl_entity!(EscrowSupplyTokenDeposit, EscrowSupplyTokenDeposit);

/// The per-depositor slice of a deposit bucket, keyed
/// `saleAddress - escrowAddress - depositor - supply - tokenAddress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowSupplyTokenDepositor {
    pub id: String,
    pub i_sale: SaleRef,
    pub i_sale_address: String,
    pub escrow: String,
    pub escrow_address: String,
    pub depositor: String,
    pub depositor_address: String,
    pub redeemable_supply: U256,
    pub token: String,
    pub token_address: String,
    pub deposits: Vec<String>,
    pub undeposits: Vec<String>,
    pub total_deposited: U256,
    pub total_remaining: U256,
}

impl_entity!(EscrowSupplyTokenDepositor, EscrowSupplyTokenDepositor);

/// Derived claim state for one (bucket, withdrawer) pair, keyed
/// `saleAddress - escrowAddress - supply - tokenAddress - withdrawer`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowSupplyTokenWithdrawer {
    pub id: String,
    pub withdrawer_address: String,
    pub deposit: String,
    pub i_sale: SaleRef,
    pub i_sale_address: String,
    pub withdraws: Vec<String>,
    pub total_withdrawn: U256,
    /// `total_deposited` of the bucket at the time of the last withdrawal.
    pub total_withdrawn_against: U256,
    /// `(totalDeposited - totalWithdrawnAgainst) * holderBalance / supply`.
    pub claimable: U256,
    pub redeemable_balance: U256,
}

impl_entity!(EscrowSupplyTokenWithdrawer, EscrowSupplyTokenWithdrawer);

/// Pre-settlement per-(sale, escrow, depositor, token) aggregate, keyed
/// `saleAddress - escrowAddress - depositor - tokenAddress`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EscrowPendingDepositorToken {
    pub id: String,
    pub i_sale: SaleRef,
    pub i_sale_address: String,
    pub escrow: String,
    pub escrow_address: String,
    pub depositor: String,
    pub depositor_address: String,
    pub pending_deposits: Vec<String>,
    pub token: String,
    pub token_address: String,
    pub total_deposited: U256,
    /// Set once the pending total is swept into a settled bucket.
    pub swept: bool,
}

impl_entity!(EscrowPendingDepositorToken, EscrowPendingDepositorToken);
