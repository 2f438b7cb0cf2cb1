//! Sale lifecycle entities.

use alloy_primitives::U256;
use serde::{Deserialize, Serialize};

use super::StateConfig;

/// On-chain sale lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SaleStatus {
    Pending,
    Active,
    Success,
    Fail,
}

impl SaleStatus {
    /// Decode the on-chain uint representation. Unknown values read as
    /// `Pending`.
    pub fn from_u8(v: u8) -> Self {
        match v {
            1 => Self::Active,
            2 => Self::Success,
            3 => Self::Fail,
            _ => Self::Pending,
        }
    }

    /// A sale has ended once it reaches Success or Fail.
    pub fn has_ended(&self) -> bool {
        matches!(self, Self::Success | Self::Fail)
    }
}

/// Which concrete entity a sale reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleRefKind {
    Sale,
    Unknown,
}

/// Tagged reference to an ISale contract. Addresses deployed outside the
/// tracked factory resolve to `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRef {
    pub kind: SaleRefKind,
    pub id: String,
}

/// A token sale contract, keyed by address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub address: String,
    pub deploy_block: u64,
    pub deploy_timestamp: u64,
    pub deployer: String,
    pub factory: String,
    /// Redeemable token being sold; set at Initialize.
    pub token: Option<String>,
    /// Reserve token buyers pay with; set at Initialize.
    pub reserve: Option<String>,
    pub recipient: Option<String>,
    pub cooldown_duration: Option<U256>,
    pub minimum_raise: U256,
    pub dust_size: Option<U256>,
    pub sale_status: SaleStatus,
    pub units_available: U256,
    pub total_raised: U256,
    pub total_fees: U256,
    /// `total_raised / minimum_raise` as 18-decimal percent; exactly 100%
    /// when `minimum_raise` is zero.
    pub percent_raised: U256,
    pub vm_state_config: Option<StateConfig>,
    pub start_event: Option<String>,
    pub end_event: Option<String>,
    pub buys: Vec<String>,
    pub refunds: Vec<String>,
    pub sale_transactions: Vec<String>,
    pub sale_fee_recipients: Vec<String>,
    pub notices: Vec<String>,
}

impl Sale {
    pub fn new(address: &str, block: u64, timestamp: u64, deployer: &str, factory: &str) -> Self {
        Self {
            id: address.to_string(),
            address: address.to_string(),
            deploy_block: block,
            deploy_timestamp: timestamp,
            deployer: deployer.to_string(),
            factory: factory.to_string(),
            token: None,
            reserve: None,
            recipient: None,
            cooldown_duration: None,
            minimum_raise: U256::ZERO,
            dust_size: None,
            sale_status: SaleStatus::Pending,
            units_available: U256::ZERO,
            total_raised: U256::ZERO,
            total_fees: U256::ZERO,
            percent_raised: U256::ZERO,
            vm_state_config: None,
            start_event: None,
            end_event: None,
            buys: Vec::new(),
            refunds: Vec::new(),
            sale_transactions: Vec::new(),
            sale_fee_recipients: Vec::new(),
            notices: Vec::new(),
        }
    }
}

impl_entity!(Sale, Sale);

/// One Buy event, keyed by transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleBuy {
    pub id: String,
    pub block: u64,
    pub timestamp: u64,
    pub transaction_hash: String,
    pub sale: String,
    pub sale_address: String,
    pub sender: String,
    pub fee_recipient_address: String,
    pub fee_recipient: String,
    pub fee: U256,
    pub minimum_units: U256,
    pub desired_units: U256,
    pub maximum_price: U256,
    pub receipt: String,
    /// `units * price / 10^18 + fee`: reserve units the buyer paid in total.
    pub total_in: U256,
    pub refunded: bool,
    pub refund_event: Option<String>,
}

impl_entity!(SaleBuy, SaleBuy);

/// One Refund event, keyed by transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleRefund {
    pub id: String,
    pub block: u64,
    pub timestamp: u64,
    pub transaction_hash: String,
    pub sale: String,
    pub sale_address: String,
    pub sender: String,
    pub fee_recipient_address: String,
    pub fee_recipient: String,
    pub fee: U256,
    pub receipt: String,
    pub total_out: U256,
}

impl_entity!(SaleRefund, SaleRefund);

/// Receipt attached to a buy or refund, keyed `saleAddress - receiptId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleReceipt {
    pub id: String,
    pub receipt_id: U256,
    pub sale_transaction: String,
    pub fee_recipient: String,
    pub fee: U256,
    pub units: U256,
    pub price: U256,
}

impl_entity!(SaleReceipt, SaleReceipt);

/// Start event, keyed by transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleStart {
    pub id: String,
    pub block: u64,
    pub timestamp: u64,
    pub transaction_hash: String,
    pub sale: String,
    pub sender: String,
}

impl_entity!(SaleStart, SaleStart);

/// End event, keyed by transaction hash.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleEnd {
    pub id: String,
    pub block: u64,
    pub timestamp: u64,
    pub transaction_hash: String,
    pub sale: String,
    pub sender: String,
    pub sale_status: SaleStatus,
}

impl_entity!(SaleEnd, SaleEnd);

/// Per-(sale, fee-recipient) fee aggregate, keyed `saleAddress - recipient`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleFeeRecipient {
    pub id: String,
    pub address: String,
    pub sale: String,
    pub total_fees: U256,
    pub buys: Vec<String>,
    pub refunds: Vec<String>,
}

impl SaleFeeRecipient {
    pub fn new(id: &str, address: &str, sale: &str) -> Self {
        Self {
            id: id.to_string(),
            address: address.to_string(),
            sale: sale.to_string(),
            total_fees: U256::ZERO,
            buys: Vec::new(),
            refunds: Vec::new(),
        }
    }
}

impl_entity!(SaleFeeRecipient, SaleFeeRecipient);

/// Placeholder for an ISale address deployed outside the tracked factory,
/// keyed by address.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnknownSale {
    pub id: String,
    pub address: String,
    pub sale_status: SaleStatus,
}

impl UnknownSale {
    pub fn new(address: &str) -> Self {
        Self {
            id: address.to_string(),
            address: address.to_string(),
            sale_status: SaleStatus::Pending,
        }
    }
}

impl_entity!(UnknownSale, UnknownSale);
