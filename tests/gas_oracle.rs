//! Gas bounds and quantity-encoding coverage at the crate's public boundary.

use alloy_primitives::U256;
use chainguard::gas::encode_quantity;

#[test]
fn quantity_encoding_has_no_leading_zero_nibbles() {
    assert_eq!(encode_quantity(U256::from(0x10u64)), "0x10");
    assert_eq!(encode_quantity(U256::from(1u64)), "0x1");
    assert_eq!(encode_quantity(U256::ZERO), "0x0");
}
