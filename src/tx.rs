//! Transaction Codec — hex-decodes `eth_sendRawTransaction`'s single
//! parameter and RLP-decodes the signed transaction envelope (legacy,
//! EIP-2930, EIP-1559).
//!
//! The chain this proxy fronts reuses Ethereum's three wire shapes but signs
//! over P-256 (see `signer.rs`); `v` is always stored as the raw
//! recovery-disambiguator the signer produced (not go-ethereum's EIP-155
//! `v` encoding, and not the 1-bit `yParity` EIP-2718 convention), and
//! `chain_id` is always present as an explicit field for protected
//! transactions regardless of envelope shape.

use alloy_eips::eip2930::AccessList;
use alloy_primitives::{keccak256, Address, Bytes, B256, U256};
use alloy_rlp::{Decodable, Encodable, Header};

#[derive(Debug, thiserror::Error)]
pub enum TxDecodeError {
    #[error("invalid hex transaction payload")]
    BadHex,
    #[error("empty transaction payload")]
    Empty,
    #[error("unsupported transaction type {0:#x}")]
    UnsupportedType(u8),
    #[error("rlp decode error: {0}")]
    Rlp(#[from] alloy_rlp::Error),
    #[error("trailing bytes after transaction envelope")]
    TrailingBytes,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Legacy,
    Eip2930,
    Eip1559,
}

/// A decoded signed transaction. Never mutated once produced.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub kind: TxKind,
    /// `None` only for an unprotected legacy transaction (no chain id in `v`).
    pub chain_id: Option<U256>,
    pub nonce: u64,
    /// Legacy/EIP-2930 gas price, or EIP-1559's `max_fee_per_gas`.
    pub gas_price: U256,
    /// `Some(max_priority_fee_per_gas)` for EIP-1559 only.
    pub gas_tip_cap: Option<U256>,
    pub gas_limit: u64,
    /// `None` signals contract creation.
    pub to: Option<Address>,
    pub value: U256,
    pub data: Bytes,
    pub v: u64,
    pub r: U256,
    pub s: U256,
}

impl Transaction {
    /// The transaction hash: keccak256 of the canonical signed envelope.
    /// This is distinct from the signer's pre-image signing hash.
    pub fn hash(&self) -> B256 {
        let mut buf = Vec::new();
        match self.kind {
            TxKind::Legacy => {
                self.encode_legacy_signed(&mut buf);
            }
            TxKind::Eip2930 => {
                buf.push(0x01);
                self.encode_typed_signed(&mut buf, false);
            }
            TxKind::Eip1559 => {
                buf.push(0x02);
                self.encode_typed_signed(&mut buf, true);
            }
        }
        keccak256(&buf)
    }

    fn encode_legacy_signed(&self, out: &mut Vec<u8>) {
        let mut payload = Vec::new();
        self.nonce.encode(&mut payload);
        self.gas_price.encode(&mut payload);
        self.gas_limit.encode(&mut payload);
        encode_to(self.to, &mut payload);
        self.value.encode(&mut payload);
        self.data.encode(&mut payload);
        self.v.encode(&mut payload);
        self.r.encode(&mut payload);
        self.s.encode(&mut payload);
        Header { list: true, payload_length: payload.len() }.encode(out);
        out.extend_from_slice(&payload);
    }

    fn encode_typed_signed(&self, out: &mut Vec<u8>, eip1559: bool) {
        let mut payload = Vec::new();
        self.chain_id.unwrap_or_default().encode(&mut payload);
        self.nonce.encode(&mut payload);
        if eip1559 {
            self.gas_tip_cap.unwrap_or_default().encode(&mut payload);
            self.gas_price.encode(&mut payload);
        } else {
            self.gas_price.encode(&mut payload);
        }
        self.gas_limit.encode(&mut payload);
        encode_to(self.to, &mut payload);
        self.value.encode(&mut payload);
        self.data.encode(&mut payload);
        AccessList::default().encode(&mut payload);
        self.v.encode(&mut payload);
        self.r.encode(&mut payload);
        self.s.encode(&mut payload);
        Header { list: true, payload_length: payload.len() }.encode(out);
        out.extend_from_slice(&payload);
    }
}

fn encode_to(to: Option<Address>, out: &mut Vec<u8>) {
    match to {
        Some(addr) => addr.encode(out),
        None => out.push(0x80),
    }
}

fn decode_to(buf: &mut &[u8]) -> Result<Option<Address>, alloy_rlp::Error> {
    let header = Header::decode(buf)?;
    if header.list {
        return Err(alloy_rlp::Error::UnexpectedList);
    }
    match header.payload_length {
        0 => Ok(None),
        20 => {
            let addr = Address::from_slice(&buf[..20]);
            *buf = &buf[20..];
            Ok(Some(addr))
        }
        _ => Err(alloy_rlp::Error::UnexpectedLength),
    }
}

/// `hexutil.Decode` equivalent: a `0x`-prefixed even-length hex string.
pub fn decode_hex_param(hex_param: &str) -> Result<Vec<u8>, TxDecodeError> {
    let stripped = hex_param.strip_prefix("0x").ok_or(TxDecodeError::BadHex)?;
    let bytes = hex::decode(stripped).map_err(|_| TxDecodeError::BadHex)?;
    if bytes.is_empty() {
        return Err(TxDecodeError::Empty);
    }
    Ok(bytes)
}

/// Decode the transaction envelope: legacy (bare RLP list), or EIP-2718
/// typed (`0x01`/`0x02` prefix followed by an RLP list).
pub fn decode_transaction(encoded: &[u8]) -> Result<Transaction, TxDecodeError> {
    if encoded.is_empty() {
        return Err(TxDecodeError::Empty);
    }

    let first = encoded[0];
    if first <= 0x7f {
        match first {
            0x01 => decode_eip2930(&encoded[1..]),
            0x02 => decode_eip1559(&encoded[1..]),
            other => Err(TxDecodeError::UnsupportedType(other)),
        }
    } else {
        decode_legacy(encoded)
    }
}

fn decode_legacy(encoded: &[u8]) -> Result<Transaction, TxDecodeError> {
    let mut buf = encoded;
    let header = Header::decode(&mut buf)?;
    if !header.list {
        return Err(alloy_rlp::Error::UnexpectedString.into());
    }
    let started = buf.len();

    let nonce = u64::decode(&mut buf)?;
    let gas_price = U256::decode(&mut buf)?;
    let gas_limit = u64::decode(&mut buf)?;
    let to = decode_to(&mut buf)?;
    let value = U256::decode(&mut buf)?;
    let data = Bytes::decode(&mut buf)?;
    let v = u64::decode(&mut buf)?;
    let r = U256::decode(&mut buf)?;
    let s = U256::decode(&mut buf)?;

    if started - buf.len() != header.payload_length {
        return Err(TxDecodeError::TrailingBytes);
    }
    if !buf.is_empty() {
        return Err(TxDecodeError::TrailingBytes);
    }

    // EIP-155: v >= 35 carries the chain id; 27/28 is an unprotected tx.
    // This proxy stores the raw recovery disambiguator directly in `v`
    // rather than EIP-155-encoding it, so an explicit low `v` (27/28) means
    // unprotected and anything else must decompose into chain id + v.
    let chain_id = if v >= 35 { Some(U256::from((v - 35) / 2)) } else { None };
    let v_norm = if let Some(cid) = chain_id {
        v - cid.to::<u64>() * 2 - 35 + 27
    } else {
        v
    };

    Ok(Transaction {
        kind: TxKind::Legacy,
        chain_id,
        nonce,
        gas_price,
        gas_tip_cap: None,
        gas_limit,
        to,
        value,
        data,
        v: v_norm,
        r,
        s,
    })
}

fn decode_eip2930(payload: &[u8]) -> Result<Transaction, TxDecodeError> {
    let mut buf = payload;
    let header = Header::decode(&mut buf)?;
    if !header.list {
        return Err(alloy_rlp::Error::UnexpectedString.into());
    }
    let started = buf.len();

    let chain_id = U256::decode(&mut buf)?;
    let nonce = u64::decode(&mut buf)?;
    let gas_price = U256::decode(&mut buf)?;
    let gas_limit = u64::decode(&mut buf)?;
    let to = decode_to(&mut buf)?;
    let value = U256::decode(&mut buf)?;
    let data = Bytes::decode(&mut buf)?;
    let _access_list = AccessList::decode(&mut buf)?;
    let v = u64::decode(&mut buf)?;
    let r = U256::decode(&mut buf)?;
    let s = U256::decode(&mut buf)?;

    if started - buf.len() != header.payload_length || !buf.is_empty() {
        return Err(TxDecodeError::TrailingBytes);
    }

    Ok(Transaction {
        kind: TxKind::Eip2930,
        chain_id: Some(chain_id),
        nonce,
        gas_price,
        gas_tip_cap: None,
        gas_limit,
        to,
        value,
        data,
        v: v + 27,
        r,
        s,
    })
}

fn decode_eip1559(payload: &[u8]) -> Result<Transaction, TxDecodeError> {
    let mut buf = payload;
    let header = Header::decode(&mut buf)?;
    if !header.list {
        return Err(alloy_rlp::Error::UnexpectedString.into());
    }
    let started = buf.len();

    let chain_id = U256::decode(&mut buf)?;
    let nonce = u64::decode(&mut buf)?;
    let gas_tip_cap = U256::decode(&mut buf)?;
    let gas_fee_cap = U256::decode(&mut buf)?;
    let gas_limit = u64::decode(&mut buf)?;
    let to = decode_to(&mut buf)?;
    let value = U256::decode(&mut buf)?;
    let data = Bytes::decode(&mut buf)?;
    let _access_list = AccessList::decode(&mut buf)?;
    let v = u64::decode(&mut buf)?;
    let r = U256::decode(&mut buf)?;
    let s = U256::decode(&mut buf)?;

    if started - buf.len() != header.payload_length || !buf.is_empty() {
        return Err(TxDecodeError::TrailingBytes);
    }

    Ok(Transaction {
        kind: TxKind::Eip1559,
        chain_id: Some(chain_id),
        nonce,
        gas_price: gas_fee_cap,
        gas_tip_cap: Some(gas_tip_cap),
        gas_limit,
        to,
        value,
        data,
        v: v + 27,
        r,
        s,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_param_requires_0x_prefix_and_body() {
        assert!(decode_hex_param("deadbeef").is_err());
        assert!(decode_hex_param("0x").is_err());
        assert!(decode_hex_param("0xdead").is_ok());
    }

    #[test]
    fn legacy_round_trips_through_hash() {
        let tx = Transaction {
            kind: TxKind::Legacy,
            chain_id: Some(U256::from(16888u64)),
            nonce: 1,
            gas_price: U256::from(1u64),
            gas_tip_cap: None,
            gas_limit: 21000,
            to: Some(Address::ZERO),
            value: U256::ZERO,
            data: Bytes::new(),
            v: 27,
            r: U256::from(1u64),
            s: U256::from(1u64),
        };
        let h1 = tx.hash();
        let h2 = tx.hash();
        assert_eq!(h1, h2);
    }
}
