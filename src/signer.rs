//! Signer — P-256 (secp256r1) ECDSA public key recovery and address
//! derivation.
//!
//! Ethereum normally recovers against secp256k1; this chain signs over
//! P-256, so recovery can't reuse `alloy`'s or `ethers`'s secp256k1 machinery.
//! We lean on `p256`'s `ecdsa::VerifyingKey::recover_from_prehash`, which
//! implements the same ECDSA public-key-recovery algorithm the upstream
//! reference implementation hand-rolled (decompress the candidate point from
//! `r`, verify it lies in the prime-order subgroup, solve for `Q`), just
//! through the RustCrypto ecosystem's traits instead of raw big-integer
//! arithmetic.

use alloy_primitives::{keccak256, Address, B256, U256};
use p256::ecdsa::{RecoveryId, Signature, VerifyingKey};
use p256::elliptic_curve::bigint::{Encoding, U256 as CurveUint};
use p256::elliptic_curve::sec1::ToEncodedPoint;

use crate::tx::Transaction;

/// secp256r1 group order `n`.
const SECP256R1_N: CurveUint = CurveUint::from_be_hex(
    "FFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551",
);

#[derive(Debug, thiserror::Error)]
pub enum SignerError {
    #[error("transaction has no chain id")]
    Unprotected,
    #[error("chain id does not match the configured chain")]
    ChainIdMismatch,
    #[error("signature recovery id out of range")]
    InvalidRecoveryId,
    #[error("signature r or s is not a valid scalar")]
    InvalidScalar,
    #[error("signature s exceeds secp256r1 half-order")]
    UpperHalfS,
    #[error("public key recovery failed")]
    RecoveryFailed,
}

/// Keccak-256 of the RLP tuple `(nonce, gasPrice, gas, to, value, data,
/// chainId, 0, 0)` — the pre-image an EIP-155-style signer hashes,
/// independent of which envelope shape the transaction decoded from.
pub fn signing_hash(tx: &Transaction, chain_id: U256) -> B256 {
    use alloy_rlp::{Encodable, Header};

    let mut payload = Vec::new();
    tx.nonce.encode(&mut payload);
    tx.gas_price.encode(&mut payload);
    tx.gas_limit.encode(&mut payload);
    match tx.to {
        Some(addr) => addr.encode(&mut payload),
        None => payload.push(0x80),
    }
    tx.value.encode(&mut payload);
    tx.data.encode(&mut payload);
    chain_id.encode(&mut payload);
    0u8.encode(&mut payload);
    0u8.encode(&mut payload);

    let mut out = Vec::new();
    Header { list: true, payload_length: payload.len() }.encode(&mut out);
    out.extend_from_slice(&payload);
    keccak256(&out)
}

/// Recover the sender address of `tx`, against the configured chain id.
///
/// Mirrors the upstream `EIP155Signer.Sender`: requires a protected
/// (chain-id-bearing) transaction matching `expected_chain_id`, rejects a
/// high-half `s` before ever attempting recovery, and derives the address
/// as the low 20 bytes of `Keccak256(X || Y)` of the recovered point.
pub fn recover_sender(tx: &Transaction, expected_chain_id: U256) -> Result<Address, SignerError> {
    let chain_id = tx.chain_id.ok_or(SignerError::Unprotected)?;
    if chain_id != expected_chain_id {
        return Err(SignerError::ChainIdMismatch);
    }

    if tx.v < 27 || tx.v - 27 > 3 {
        return Err(SignerError::InvalidRecoveryId);
    }
    let rec_id_byte = (tx.v - 27) as u8;

    let r_bytes: [u8; 32] = tx.r.to_be_bytes();
    let s_bytes: [u8; 32] = tx.s.to_be_bytes();

    if !is_nonzero_below_n(&r_bytes) || !is_nonzero_below_n(&s_bytes) {
        return Err(SignerError::InvalidScalar);
    }
    if is_above_half_n(&s_bytes) {
        return Err(SignerError::UpperHalfS);
    }

    let signature =
        Signature::from_scalars(r_bytes, s_bytes).map_err(|_| SignerError::InvalidScalar)?;
    let recovery_id =
        RecoveryId::from_byte(rec_id_byte).ok_or(SignerError::InvalidRecoveryId)?;

    let sighash = signing_hash(tx, chain_id);
    let verifying_key = VerifyingKey::recover_from_prehash(sighash.as_slice(), &signature, recovery_id)
        .map_err(|_| SignerError::RecoveryFailed)?;

    let encoded = verifying_key.to_encoded_point(false);
    let uncompressed = encoded.as_bytes();
    debug_assert_eq!(uncompressed[0], 0x04);
    let hash = keccak256(&uncompressed[1..]);
    Ok(Address::from_slice(&hash[12..]))
}

fn is_nonzero_below_n(be_bytes: &[u8; 32]) -> bool {
    if be_bytes.iter().all(|&b| b == 0) {
        return false;
    }
    CurveUint::from_be_bytes(*be_bytes) < SECP256R1_N
}

fn is_above_half_n(be_bytes: &[u8; 32]) -> bool {
    let half_n = SECP256R1_N.shr_vartime(1);
    CurveUint::from_be_bytes(*be_bytes) > half_n
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;
    use crate::tx::{Transaction, TxKind};
    use alloy_primitives::Bytes;

    fn sample_tx() -> Transaction {
        Transaction {
            kind: TxKind::Legacy,
            chain_id: Some(U256::from(16888u64)),
            nonce: 0,
            gas_price: U256::from(1_000_000_000u64),
            gas_tip_cap: None,
            gas_limit: 21000,
            to: Some(Address::ZERO),
            value: U256::ZERO,
            data: Bytes::new(),
            v: 27,
            r: U256::from(1u64),
            s: U256::from(1u64),
        }
    }

    #[test]
    fn rejects_unprotected_transaction() {
        let mut tx = sample_tx();
        tx.chain_id = None;
        let err = recover_sender(&tx, U256::from(16888u64)).unwrap_err();
        assert!(matches!(err, SignerError::Unprotected));
    }

    #[test]
    fn rejects_mismatched_chain_id() {
        let tx = sample_tx();
        let err = recover_sender(&tx, U256::from(1u64)).unwrap_err();
        assert!(matches!(err, SignerError::ChainIdMismatch));
    }

    #[test]
    fn rejects_recovery_id_out_of_range() {
        let mut tx = sample_tx();
        tx.v = 40;
        let err = recover_sender(&tx, U256::from(16888u64)).unwrap_err();
        assert!(matches!(err, SignerError::InvalidRecoveryId));
    }

    #[test]
    fn signing_hash_is_stable_across_calls() {
        let tx = sample_tx();
        let a = signing_hash(&tx, U256::from(16888u64));
        let b = signing_hash(&tx, U256::from(16888u64));
        assert_eq!(a, b);
    }
}
