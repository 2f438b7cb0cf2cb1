//! Chain-read and source-registrar test doubles.
//!
//! `MockChain` answers contract reads from preloaded maps; any address not
//! preloaded behaves like a reverting call. `RecordingSources` records
//! dynamic-source registrations for assertion.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use alloy_primitives::U256;
use entgraph_core::chain::{ChainReader, SourceRegistrar, VerifyTimes};
use entgraph_core::entities::sale::SaleStatus;

#[derive(Debug, Clone, Default)]
struct TokenMeta {
    name: Option<String>,
    symbol: Option<String>,
    decimals: Option<u8>,
    total_supply: Option<U256>,
}

/// Scripted chain state for tests.
#[derive(Default)]
pub struct MockChain {
    tokens: Mutex<HashMap<String, TokenMeta>>,
    balances: Mutex<HashMap<(String, String), U256>>,
    sale_statuses: Mutex<HashMap<String, SaleStatus>>,
    verify_states: Mutex<HashMap<(String, String), VerifyTimes>>,
    owners: Mutex<HashMap<String, String>>,
}

impl MockChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_erc20(&self, token: &str, name: &str, symbol: &str, decimals: u8, supply: U256) {
        self.tokens.lock().unwrap().insert(
            token.to_string(),
            TokenMeta {
                name: Some(name.to_string()),
                symbol: Some(symbol.to_string()),
                decimals: Some(decimals),
                total_supply: Some(supply),
            },
        );
    }

    pub fn set_total_supply(&self, token: &str, supply: U256) {
        self.tokens
            .lock()
            .unwrap()
            .entry(token.to_string())
            .or_default()
            .total_supply = Some(supply);
    }

    pub fn set_balance(&self, token: &str, owner: &str, balance: U256) {
        self.balances
            .lock()
            .unwrap()
            .insert((token.to_string(), owner.to_string()), balance);
    }

    /// Drop a balance entry so subsequent reads revert.
    pub fn clear_balance(&self, token: &str, owner: &str) {
        self.balances
            .lock()
            .unwrap()
            .remove(&(token.to_string(), owner.to_string()));
    }

    pub fn set_sale_status(&self, sale: &str, status: SaleStatus) {
        self.sale_statuses
            .lock()
            .unwrap()
            .insert(sale.to_string(), status);
    }

    pub fn set_verify_state(&self, verify: &str, account: &str, times: VerifyTimes) {
        self.verify_states
            .lock()
            .unwrap()
            .insert((verify.to_string(), account.to_string()), times);
    }

    pub fn set_owner(&self, contract: &str, owner: &str) {
        self.owners
            .lock()
            .unwrap()
            .insert(contract.to_string(), owner.to_string());
    }
}

#[async_trait]
impl ChainReader for MockChain {
    async fn erc20_name(&self, token: &str) -> Option<String> {
        self.tokens.lock().unwrap().get(token)?.name.clone()
    }

    async fn erc20_symbol(&self, token: &str) -> Option<String> {
        self.tokens.lock().unwrap().get(token)?.symbol.clone()
    }

    async fn erc20_decimals(&self, token: &str) -> Option<u8> {
        self.tokens.lock().unwrap().get(token)?.decimals
    }

    async fn erc20_total_supply(&self, token: &str) -> Option<U256> {
        self.tokens.lock().unwrap().get(token)?.total_supply
    }

    async fn erc20_balance_of(&self, token: &str, owner: &str) -> Option<U256> {
        self.balances
            .lock()
            .unwrap()
            .get(&(token.to_string(), owner.to_string()))
            .copied()
    }

    async fn sale_status(&self, sale: &str) -> Option<SaleStatus> {
        self.sale_statuses.lock().unwrap().get(sale).copied()
    }

    async fn verify_state(&self, verify: &str, account: &str) -> Option<VerifyTimes> {
        self.verify_states
            .lock()
            .unwrap()
            .get(&(verify.to_string(), account.to_string()))
            .copied()
    }

    async fn contract_owner(&self, contract: &str) -> Option<String> {
        self.owners.lock().unwrap().get(contract).cloned()
    }
}

/// Records dynamic-source registrations.
#[derive(Default)]
pub struct RecordingSources {
    registered: Mutex<Vec<String>>,
}

impl RecordingSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registered(&self) -> Vec<String> {
        self.registered.lock().unwrap().clone()
    }

    pub fn contains(&self, address: &str) -> bool {
        self.registered.lock().unwrap().iter().any(|a| a == address)
    }
}

#[async_trait]
impl SourceRegistrar for RecordingSources {
    async fn register(&self, address: &str) {
        let mut registered = self.registered.lock().unwrap();
        if !registered.iter().any(|a| a == address) {
            registered.push(address.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unset_reads_revert() {
        let chain = MockChain::new();
        assert!(chain.erc20_name("0xt").await.is_none());
        assert!(chain.sale_status("0xs").await.is_none());
    }

    #[tokio::test]
    async fn scripted_reads_answer() {
        let chain = MockChain::new();
        chain.set_erc20("0xt", "Token", "TKN", 18, U256::from(1000));
        chain.set_balance("0xt", "0xa", U256::from(7));

        assert_eq!(chain.erc20_symbol("0xt").await.as_deref(), Some("TKN"));
        assert_eq!(chain.erc20_balance_of("0xt", "0xa").await, Some(U256::from(7)));
        assert_eq!(chain.erc20_balance_of("0xt", "0xb").await, None);
    }

    #[tokio::test]
    async fn registration_is_idempotent() {
        let sources = RecordingSources::new();
        sources.register("0xa").await;
        sources.register("0xa").await;
        sources.register("0xb").await;
        assert_eq!(sources.registered(), vec!["0xa", "0xb"]);
        assert!(sources.contains("0xa"));
    }
}
