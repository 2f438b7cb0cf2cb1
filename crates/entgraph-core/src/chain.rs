//! Live contract-read and dynamic-source traits.
//!
//! Handlers perform synchronous read-only calls back to contracts mid-event
//! (refreshing a total supply, fetching a verify state). Any such call may
//! revert; a revert is represented as `None` and every call site substitutes
//! a documented fallback; a reverted read never aborts a handler.

use async_trait::async_trait;

use crate::entities::sale::SaleStatus;

use alloy_primitives::U256;

/// The three on-chain threshold timestamps backing a verify status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifyTimes {
    pub added_since: u64,
    pub approved_since: u64,
    pub banned_since: u64,
}

/// Read-only access to live contract state.
///
/// Every method returns `Option`: `None` means the call reverted (or the
/// address is not a contract implementing the method). Implementations must
/// never block on consensus; these are point reads at the current head.
#[async_trait]
pub trait ChainReader: Send + Sync {
    async fn erc20_name(&self, token: &str) -> Option<String>;
    async fn erc20_symbol(&self, token: &str) -> Option<String>;
    async fn erc20_decimals(&self, token: &str) -> Option<u8>;
    async fn erc20_total_supply(&self, token: &str) -> Option<U256>;
    async fn erc20_balance_of(&self, token: &str, owner: &str) -> Option<U256>;

    /// `saleStatus()` on an ISale contract.
    async fn sale_status(&self, sale: &str) -> Option<SaleStatus>;

    /// `state(account)` on a Verify contract.
    async fn verify_state(&self, verify: &str, account: &str) -> Option<VerifyTimes>;

    /// `owner()` on an Ownable contract (GatedNFT).
    async fn contract_owner(&self, contract: &str) -> Option<String>;
}

/// Side channel to the indexing host: start tracking a newly discovered
/// contract address so its own logs are delivered from now on.
///
/// Registration must be idempotent per address.
#[async_trait]
pub trait SourceRegistrar: Send + Sync {
    async fn register(&self, address: &str);
}
