//! Status Taxonomy — numeric status codes, human text, JSON-RPC error objects.
//!
//! Mirrors the original service's status space: `200`/`211` are admission
//! outcomes, `410-436` and `440-443` are request/policy rejections, `500` is
//! the catch-all internal error. The wire message is always
//! `"Internal Error - <code>"`.

use std::collections::HashMap;
use std::sync::OnceLock;

pub const STATUS_OK: u16 = 200;
pub const STATUS_VALUE_TOO_LARGE: u16 = 211;

pub const STATUS_BODY_NIL_OR_EMPTY: u16 = 410;
pub const STATUS_WHITELIST_NOT_SET: u16 = 411;
pub const STATUS_INVALID_JSON_REQUEST: u16 = 412;
pub const STATUS_NO_METHOD_PARAMS: u16 = 413;
pub const STATUS_JSONRPC_VERSION: u16 = 414;
pub const STATUS_METHOD_NOT_WHITELIST: u16 = 415;
pub const STATUS_METHOD_PARAMS_NOT_MATCH: u16 = 416;
pub const STATUS_METHOD_PARAMS_TYPE_ERROR: u16 = 417;
pub const STATUS_GAS_LIMIT_ERROR: u16 = 418;
pub const STATUS_CREATE_CONTRACT_NOT_ALLOWED: u16 = 419;
pub const STATUS_FROM_ADDRESS_BLACKLIST: u16 = 420;
pub const STATUS_EMPTY_FROM_ADDRESS: u16 = 421;
pub const STATUS_ILLEGAL_CHAIN_ID: u16 = 422;
pub const STATUS_SIGNATURE_VERIFY_FAILED: u16 = 423;
pub const STATUS_GAS_PRICE_ERROR: u16 = 424;
pub const STATUS_SECP256R1_HALF_N: u16 = 425;
pub const STATUS_TRANSACTION_HASH_NIL: u16 = 426;
pub const STATUS_TRANSACTION_HASH_BLACKLIST: u16 = 427;
pub const STATUS_TO_ADDRESS_BLACKLIST: u16 = 428;
pub const STATUS_READ_BODY_ERROR: u16 = 429;
pub const STATUS_FILTER_NO_CONFIG: u16 = 430;
pub const STATUS_METHOD_NOT_ALLOWED: u16 = 431;
pub const STATUS_DECODE_TRANSACTION_ERROR: u16 = 432;
pub const STATUS_VALUE_TOO_LARGE_ERROR: u16 = 433;
pub const STATUS_IPC_DIAL_ERROR: u16 = 434;
pub const STATUS_IPC_WRITE_ERROR: u16 = 435;
pub const STATUS_IPC_READ_ERROR: u16 = 436;

pub const STATUS_LUA_INIT_ERROR: u16 = 440;
pub const STATUS_LUA_CALL_ERROR: u16 = 441;
pub const STATUS_LUA_RETURN_ERROR: u16 = 442;
pub const STATUS_LUA_FILE_NOT_DO_ERROR: u16 = 443;

pub const STATUS_INTERNAL_ERROR: u16 = 500;

/// `"Internal Error - <code>"` — part of the wire contract, not just a log line.
pub const ERROR_MESSAGE_PREFIX: &str = "Internal Error";

pub const CONTENT_TYPE: &str = "application/json";
pub const MAX_REQUEST_CONTENT_LENGTH: usize = 1024 * 128;

fn status_text_table() -> &'static HashMap<u16, &'static str> {
    static TABLE: OnceLock<HashMap<u16, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| {
        HashMap::from([
            (STATUS_OK, "OK"),
            (STATUS_VALUE_TOO_LARGE, "value too large"),
            (STATUS_BODY_NIL_OR_EMPTY, "body nil or empty"),
            (STATUS_WHITELIST_NOT_SET, "whitelist not set"),
            (STATUS_INVALID_JSON_REQUEST, "invalid JSON request"),
            (STATUS_NO_METHOD_PARAMS, "no method and/or jsonrpc attribute"),
            (STATUS_JSONRPC_VERSION, "jsonrpc version not supported"),
            (STATUS_METHOD_NOT_WHITELIST, "jsonrpc method is not whitelisted"),
            (STATUS_METHOD_PARAMS_NOT_MATCH, "method params not match"),
            (STATUS_METHOD_PARAMS_TYPE_ERROR, "method params type not string"),
            (STATUS_GAS_LIMIT_ERROR, "gasLimit error"),
            (STATUS_CREATE_CONTRACT_NOT_ALLOWED, "create contract not allowed"),
            (STATUS_FROM_ADDRESS_BLACKLIST, "black list from address"),
            (STATUS_EMPTY_FROM_ADDRESS, "empty from address"),
            (STATUS_ILLEGAL_CHAIN_ID, "illegal chainID"),
            (STATUS_SIGNATURE_VERIFY_FAILED, "signature verification failed"),
            (STATUS_GAS_PRICE_ERROR, "gas price out of bounds"),
            (STATUS_SECP256R1_HALF_N, "signature s is bigger than secp256r1 half-n"),
            (STATUS_TRANSACTION_HASH_NIL, "empty transaction hash"),
            (STATUS_TRANSACTION_HASH_BLACKLIST, "black list transaction hash"),
            (STATUS_TO_ADDRESS_BLACKLIST, "black list to address"),
            (STATUS_READ_BODY_ERROR, "get body error"),
            (STATUS_FILTER_NO_CONFIG, "filter no config"),
            (STATUS_METHOD_NOT_ALLOWED, "the method is not available"),
            (STATUS_DECODE_TRANSACTION_ERROR, "decode transaction from hex string error"),
            (STATUS_VALUE_TOO_LARGE_ERROR, "value too large error"),
            (STATUS_IPC_DIAL_ERROR, "IPC dial error"),
            (STATUS_IPC_WRITE_ERROR, "IPC write error"),
            (STATUS_IPC_READ_ERROR, "IPC read error"),
            (STATUS_LUA_INIT_ERROR, "script init error"),
            (STATUS_LUA_CALL_ERROR, "script call error"),
            (STATUS_LUA_RETURN_ERROR, "script return error"),
            (STATUS_LUA_FILE_NOT_DO_ERROR, "script load error"),
            (STATUS_INTERNAL_ERROR, "Internal Error"),
        ])
    })
}

/// Thread-safe read-only lookup of human text for a status code.
pub fn status_text(code: u16) -> &'static str {
    status_text_table().get(&code).copied().unwrap_or("unknown status")
}

/// The literal `"Internal Error - <code>"` wire message for a status code.
pub fn error_message(code: u16) -> String {
    format!("{ERROR_MESSAGE_PREFIX} - {code}")
}
