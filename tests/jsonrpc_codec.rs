//! End-to-end codec behavior not already covered by `src/jsonrpc.rs`'s own
//! `#[cfg(test)]` block: batch parsing and the error-envelope shape clients
//! actually see on the wire.

use chainguard::jsonrpc::{is_batch, parse_batch, parse_single, IdField, JsonRpcReply};
use serde_json::json;

#[test]
fn batch_preserves_each_items_id_independently() {
    let body = json!([
        {"jsonrpc": "2.0", "id": 1, "method": "eth_chainId"},
        {"jsonrpc": "2.0", "id": "abc", "method": "eth_gasPrice"},
        {"jsonrpc": "2.0", "method": "eth_blockNumber"},
    ]);
    let raw = serde_json::to_vec(&body).unwrap();
    assert!(is_batch(&raw));

    let items = parse_batch(&raw).unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].id, IdField::Present(json!(1)));
    assert_eq!(items[1].id, IdField::Present(json!("abc")));
    assert!(items[2].id.is_absent());
}

#[test]
fn single_object_is_not_a_batch() {
    let raw = br#"{"jsonrpc":"2.0","id":1,"method":"eth_chainId"}"#;
    assert!(!is_batch(raw));
    let req = parse_single(raw).unwrap();
    assert_eq!(req.method, "eth_chainId");
}

#[test]
fn error_envelope_carries_the_internal_error_prefix() {
    let reply = JsonRpcReply::err(IdField::Present(json!(7)), 422);
    let value = serde_json::to_value(&reply).unwrap();
    assert_eq!(value["error"]["code"], 422);
    assert_eq!(value["error"]["message"], "Internal Error - 422");
    assert_eq!(value["id"], json!(7));
}
