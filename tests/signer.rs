//! Integration-level signer coverage: malformed scalars and the
//! upper-half-`s` malleability guard, exercised through the public API
//! rather than `src/signer.rs`'s internal helpers.

use alloy_primitives::{Address, Bytes, U256};
use chainguard::signer::{recover_sender, SignerError};
use chainguard::tx::{Transaction, TxKind};

fn tx_with(r: U256, s: U256) -> Transaction {
    Transaction {
        kind: TxKind::Legacy,
        chain_id: Some(U256::from(16888u64)),
        nonce: 0,
        gas_price: U256::from(1u64),
        gas_tip_cap: None,
        gas_limit: 21000,
        to: Some(Address::ZERO),
        value: U256::ZERO,
        data: Bytes::new(),
        v: 27,
        r,
        s,
    }
}

#[test]
fn zero_r_is_rejected_before_recovery_is_attempted() {
    let tx = tx_with(U256::ZERO, U256::from(1u64));
    let err = recover_sender(&tx, U256::from(16888u64)).unwrap_err();
    assert!(matches!(err, SignerError::InvalidScalar));
}

#[test]
fn s_above_the_curve_half_order_is_rejected() {
    // secp256r1 order n; a couple past half_n is comfortably over the boundary.
    let n = U256::from_be_slice(
        &hex::decode("FFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551").unwrap(),
    );
    let half_n_plus_one = n / U256::from(2u64) + U256::from(2u64);
    let tx = tx_with(U256::from(1u64), half_n_plus_one);
    let err = recover_sender(&tx, U256::from(16888u64)).unwrap_err();
    assert!(matches!(err, SignerError::UpperHalfS));
}
