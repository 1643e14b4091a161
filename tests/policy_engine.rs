//! Rule-order integration coverage beyond `src/policy.rs`'s own unit tests:
//! the tx-hash blacklist, from-address blacklist, and script short-circuit.

use alloy_primitives::{Address, Bytes, B256, U256};
use chainguard::policy::{admit, PolicyConfig};
use chainguard::script::{DisabledScript, ScriptHook};
use chainguard::tx::{Transaction, TxKind};
use chainguard::whitelist::{NoWhitelist, WhitelistLookup};
use std::collections::HashSet;

fn tx() -> Transaction {
    Transaction {
        kind: TxKind::Legacy,
        chain_id: Some(U256::from(16888u64)),
        nonce: 0,
        gas_price: U256::from(10u64),
        gas_tip_cap: None,
        gas_limit: 21000,
        to: Some(Address::repeat_byte(0x22)),
        value: U256::ZERO,
        data: Bytes::new(),
        v: 27,
        r: U256::from(1u64),
        s: U256::from(1u64),
    }
}

fn cfg() -> PolicyConfig {
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
async fn tx_hash_blacklist_rejects_a_known_hash() {
    let transaction = tx();
    let mut policy = cfg();
    policy.tx_hash_blacklist.insert(transaction.hash());
    let status = admit(&policy, &transaction, &NoWhitelist, &DisabledScript).await;
    assert_eq!(status, 427);
}

#[tokio::test]
async fn to_address_blacklist_rejects_matching_recipient() {
    let transaction = tx();
    let mut policy = cfg();
    policy.to_blacklist.insert(transaction.to.unwrap());
    let status = admit(&policy, &transaction, &NoWhitelist, &DisabledScript).await;
    assert_eq!(status, 428);
}

struct FixedScript(u16);

#[async_trait::async_trait]
impl ScriptHook for FixedScript {
    async fn call(&self, _hash: &B256, _from: Option<&Address>, _to: Option<&Address>) -> u16 {
        self.0
    }
}

#[tokio::test]
async fn script_hook_short_circuits_every_rule_below_it() {
    let mut transaction = tx();
    transaction.to = Some(Address::repeat_byte(0xff)); // would fail to-blacklist below
    let mut policy = cfg();
    policy.to_blacklist.insert(Address::repeat_byte(0xff));
    policy.script_from_check = Some(false);

    let status = admit(&policy, &transaction, &NoWhitelist, &FixedScript(200)).await;
    assert_eq!(status, 200, "script verdict must win over the to-blacklist rule below it");
}
