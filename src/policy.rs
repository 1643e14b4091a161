//! Policy Engine — the fixed, ordered set of admission rules applied to a
//! decoded `eth_sendRawTransaction` payload.
//!
//! Grounded on the upstream `checkTransaction`: rule order matters and is
//! never reordered by configuration. When the script hook is enabled it
//! fully replaces the to-address / value / tx-hash / whitelist rules below
//! it — its verdict is returned as-is, short-circuiting the rest of the
//! pipeline, exactly like the original's lua branch.

use std::collections::HashSet;

use alloy_primitives::{Address, B256, U256};

use crate::script::ScriptHook;
use crate::signer::{recover_sender, SignerError};
use crate::status::*;
use crate::tx::Transaction;
use crate::whitelist::WhitelistLookup;

pub struct PolicyConfig {
    pub chain_id: U256,

    pub min_gas_price: U256,
    pub max_gas_price: Option<U256>,
    pub min_gas_tip_cap: U256,
    pub max_gas_tip_cap: Option<U256>,

    pub min_gas_limit: u64,
    pub max_gas_limit: Option<u64>,

    /// `Some` when the script hook rule is active (`EnableLuaFilter`).
    /// `from_check` mirrors `EnableFromCheck`.
    pub script_from_check: Option<bool>,

    pub disable_contract_create: bool,
    pub to_blacklist: HashSet<Address>,

    pub max_value: U256,
    pub enable_max_value_verify: bool,

    pub tx_hash_blacklist: HashSet<B256>,

    pub from_blacklist: HashSet<Address>,
    pub enable_whitelist_db: bool,
}

/// Runs the ordered rule pipeline and returns the final status code.
/// `STATUS_OK` and `STATUS_VALUE_TOO_LARGE` are the only non-failure
/// outcomes; everything else is a hard rejection.
pub async fn admit(
    cfg: &PolicyConfig,
    tx: &Transaction,
    whitelist: &dyn WhitelistLookup,
    script: &dyn ScriptHook,
) -> u16 {
    let Some(chain_id) = tx.chain_id else {
        return STATUS_ILLEGAL_CHAIN_ID;
    };
    if chain_id != cfg.chain_id {
        return STATUS_ILLEGAL_CHAIN_ID;
    }

    if tx.gas_price < cfg.min_gas_price {
        return STATUS_GAS_PRICE_ERROR;
    }
    if let Some(max) = cfg.max_gas_price {
        if tx.gas_price > max {
            return STATUS_GAS_PRICE_ERROR;
        }
    }
    if let Some(tip) = tx.gas_tip_cap {
        if tip < cfg.min_gas_tip_cap {
            return STATUS_GAS_PRICE_ERROR;
        }
        if let Some(max) = cfg.max_gas_tip_cap {
            if tip > max {
                return STATUS_GAS_PRICE_ERROR;
            }
        }
    }

    if tx.gas_limit < cfg.min_gas_limit {
        return STATUS_GAS_LIMIT_ERROR;
    }
    if let Some(max) = cfg.max_gas_limit {
        if tx.gas_limit > max {
            return STATUS_GAS_LIMIT_ERROR;
        }
    }

    if let Some(from_check) = cfg.script_from_check {
        let hash = tx.hash();
        let from = if from_check {
            match recover_sender(tx, cfg.chain_id) {
                Ok(addr) => Some(addr),
                Err(_) => return STATUS_SIGNATURE_VERIFY_FAILED,
            }
        } else {
            None
        };
        if from_check && from == Some(Address::ZERO) {
            return STATUS_EMPTY_FROM_ADDRESS;
        }
        return script.call(&hash, from.as_ref(), tx.to.as_ref()).await;
    }

    match tx.to {
        None => {
            if cfg.disable_contract_create {
                return STATUS_CREATE_CONTRACT_NOT_ALLOWED;
            }
        }
        Some(to) => {
            if cfg.to_blacklist.contains(&to) {
                return STATUS_TO_ADDRESS_BLACKLIST;
            }
        }
    }

    let mut status = STATUS_OK;
    if tx.value > cfg.max_value {
        status = STATUS_VALUE_TOO_LARGE;
        if cfg.enable_max_value_verify {
            return STATUS_VALUE_TOO_LARGE_ERROR;
        }
    }

    if !cfg.tx_hash_blacklist.is_empty() {
        let hash = tx.hash();
        if hash == B256::ZERO {
            return STATUS_TRANSACTION_HASH_NIL;
        }
        if cfg.tx_hash_blacklist.contains(&hash) {
            return STATUS_TRANSACTION_HASH_BLACKLIST;
        }
    }

    if cfg.enable_whitelist_db || !cfg.from_blacklist.is_empty() {
        let from = match recover_sender(tx, cfg.chain_id) {
            Ok(addr) => addr,
            Err(SignerError::Unprotected | SignerError::ChainIdMismatch) => {
                return STATUS_ILLEGAL_CHAIN_ID
            }
            Err(_) => return STATUS_SIGNATURE_VERIFY_FAILED,
        };
        if from == Address::ZERO {
            return STATUS_EMPTY_FROM_ADDRESS;
        }

        if cfg.from_blacklist.contains(&from) {
            return STATUS_FROM_ADDRESS_BLACKLIST;
        }

        if cfg.enable_whitelist_db {
            let Some(to) = tx.to else {
                return STATUS_FROM_ADDRESS_BLACKLIST;
            };
            if !whitelist.is_whitelisted(from, to).await {
                return STATUS_FROM_ADDRESS_BLACKLIST;
            }
        }
    }

    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::script::DisabledScript;
    use crate::whitelist::NoWhitelist;
    use alloy_primitives::Bytes;

    fn base_tx() -> Transaction {
        Transaction {
            kind: crate::tx::TxKind::Legacy,
            chain_id: Some(U256::from(16888u64)),
            nonce: 0,
            gas_price: U256::from(10u64),
            gas_tip_cap: None,
            gas_limit: 21000,
            to: Some(Address::repeat_byte(0x11)),
            value: U256::ZERO,
            data: Bytes::new(),
            v: 27,
            r: U256::from(1u64),
            s: U256::from(1u64),
        }
    }

    fn base_cfg() -> PolicyConfig {
        PolicyConfig {
            chain_id: U256::from(16888u64),
            min_gas_price: U256::from(1u64),
            max_gas_price: None,
            min_gas_tip_cap: U256::ZERO,
            max_gas_tip_cap: None,
            min_gas_limit: 21000,
            max_gas_limit: None,
            script_from_check: None,
            disable_contract_create: false,
            to_blacklist: HashSet::new(),
            max_value: U256::MAX,
            enable_max_value_verify: false,
            tx_hash_blacklist: HashSet::new(),
            from_blacklist: HashSet::new(),
            enable_whitelist_db: false,
        }
    }

    #[tokio::test]
    async fn rejects_wrong_chain_id() {
        let mut tx = base_tx();
        tx.chain_id = Some(U256::from(1u64));
        let cfg = base_cfg();
        let status = admit(&cfg, &tx, &NoWhitelist, &DisabledScript).await;
        assert_eq!(status, STATUS_ILLEGAL_CHAIN_ID);
    }

    #[tokio::test]
    async fn rejects_gas_below_minimum() {
        let tx = base_tx();
        let mut cfg = base_cfg();
        cfg.min_gas_price = U256::from(100u64);
        let status = admit(&cfg, &tx, &NoWhitelist, &DisabledScript).await;
        assert_eq!(status, STATUS_GAS_PRICE_ERROR);
    }

    #[tokio::test]
    async fn accepts_well_formed_transaction() {
        let tx = base_tx();
        let cfg = base_cfg();
        let status = admit(&cfg, &tx, &NoWhitelist, &DisabledScript).await;
        assert_eq!(status, STATUS_OK);
    }

    #[tokio::test]
    async fn oversized_value_is_a_soft_warning_by_default() {
        let mut tx = base_tx();
        tx.value = U256::from(1000u64);
        let mut cfg = base_cfg();
        cfg.max_value = U256::from(1u64);
        let status = admit(&cfg, &tx, &NoWhitelist, &DisabledScript).await;
        assert_eq!(status, STATUS_VALUE_TOO_LARGE);
    }

    #[tokio::test]
    async fn oversized_value_hard_fails_when_enforced() {
        let mut tx = base_tx();
        tx.value = U256::from(1000u64);
        let mut cfg = base_cfg();
        cfg.max_value = U256::from(1u64);
        cfg.enable_max_value_verify = true;
        let status = admit(&cfg, &tx, &NoWhitelist, &DisabledScript).await;
        assert_eq!(status, STATUS_VALUE_TOO_LARGE_ERROR);
    }

    #[tokio::test]
    async fn contract_creation_blocked_when_disabled() {
        let mut tx = base_tx();
        tx.to = None;
        let mut cfg = base_cfg();
        cfg.disable_contract_create = true;
        let status = admit(&cfg, &tx, &NoWhitelist, &DisabledScript).await;
        assert_eq!(status, STATUS_CREATE_CONTRACT_NOT_ALLOWED);
    }
}
