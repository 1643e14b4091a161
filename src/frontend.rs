//! Frontend — the axum handler orchestrating validate → parse → policy →
//! relay → notify, plus the small set of auxiliary passthrough routes the
//! original wires up alongside the main proxy route.
//!
//! Grounded on `examples/original_source/server/server.go`'s `ServeHTTP`
//! and `examples/original_source/filter/batch.go`'s
//! `HandleJSONRequest`/`checkJSONBatchRequest`: on a clean admission, the
//! original (unmodified) request body is forwarded upstream verbatim and
//! the upstream's reply is what the client actually sees; only a rejection
//! produces a locally synthesized JSON-RPC error response that never
//! reaches the upstream at all.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::extract::{ConnectInfo, Request, State};
use axum::http::{header, HeaderMap, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::any;
use axum::Router;
use reqwest::Client;
use serde_json::Value;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Outcome, StatusError};
use crate::gas::{encode_quantity, GasBounds, GasOracle};
use crate::jsonrpc::{
    self, is_well_formed_method, parse_batch, parse_single, single_hex_param, IdField,
    JsonRpcReply, JsonRpcRequest,
};
use crate::notify::Notifier;
use crate::policy::{admit, PolicyConfig};
use crate::relay::{http as http_relay, ipc as ipc_relay, UpstreamTarget};
use crate::script::ScriptHook;
use crate::status::*;
use crate::tx::{decode_hex_param, decode_transaction};
use crate::whitelist::WhitelistLookup;

const GAS_PRICE_METHOD: &str = "eth_gasPrice";
const GAS_TIP_CAP_METHOD: &str = "eth_maxPriorityFeePerGas";
const SEND_RAW_TX_METHOD: &str = "eth_sendRawTransaction";

pub struct AppState {
    pub config: Config,
    pub upstream: UpstreamTarget,
    pub http_client: Client,
    pub http_relay: Option<http_relay::HttpRelay>,
    pub gas_oracle: GasOracle,
    pub notifier: Option<Notifier>,
    pub whitelist: Box<dyn WhitelistLookup>,
    pub script: Box<dyn ScriptHook>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let mut router = Router::new().fallback(handle_request).with_state(state.clone());

    if let Some(escrow_url) = state.config.escrow_url.clone() {
        let client = state.http_client.clone();
        router = router.route(
            "/escrow",
            any(move |req: Request| passthrough(client.clone(), escrow_url.clone(), req)),
        );
    }
    for (path, target) in state.config.http_routers.clone() {
        let client = state.http_client.clone();
        router = router.route(&path, any(move |req: Request| passthrough(client.clone(), target.clone(), req)));
    }

    router
}

async fn passthrough(client: Client, target: String, req: Request) -> Response {
    let method = req.method().clone();
    let headers = req.headers().clone();
    let body = match to_bytes(req.into_body(), MAX_REQUEST_CONTENT_LENGTH).await {
        Ok(b) => b,
        Err(_) => return StatusCode::BAD_REQUEST.into_response(),
    };

    let mut out = client.request(method, &target).body(body.to_vec());
    for (name, value) in headers.iter() {
        out = out.header(name, value);
    }
    match out.send().await {
        Ok(resp) => {
            let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
            let bytes = resp.bytes().await.unwrap_or_default();
            (status, bytes).into_response()
        }
        Err(_) => StatusCode::BAD_GATEWAY.into_response(),
    }
}

async fn handle_request(
    State(state): State<Arc<AppState>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    req: Request,
) -> Response {
    // Mirrors `server.go`'s literal ordering: the health probe is checked
    // first, unconditionally, before any other validation runs — a plain
    // `GET` with no query and no body has no `Content-Type` to reject it on.
    if is_health_probe(&req) {
        return StatusCode::OK.into_response();
    }

    if let Some(rejection) = validate_request(&req) {
        return rejection;
    }

    let is_options = req.method() == Method::OPTIONS;
    let (parts, body) = req.into_parts();

    let body_bytes = match to_bytes(body, MAX_REQUEST_CONTENT_LENGTH).await {
        Ok(b) => b,
        Err(_) => return json_error_response(IdField::Absent, STATUS_READ_BODY_ERROR),
    };

    if body_bytes.is_empty() {
        return json_error_response(IdField::Absent, STATUS_BODY_NIL_OR_EMPTY);
    }
    if is_options {
        return StatusCode::NO_CONTENT.into_response();
    }

    let outcome = if jsonrpc::is_batch(&body_bytes) {
        handle_batch(&state, &body_bytes).await
    } else {
        handle_single(&state, &body_bytes).await
    };

    match outcome {
        Outcome::Respond(response) => response,
        Outcome::Forward => {
            relay_to_upstream(&state, &parts.headers, &parts.method, parts.uri.path(), &body_bytes, &addr)
                .await
        }
    }
}

/// `server.go` gates the health probe on `GET`, no query string, and
/// `ContentLength == 0`; a missing `Content-Length` header (common for a
/// bodyless `GET`) is treated the same as an explicit zero.
fn is_health_probe(req: &Request) -> bool {
    if req.method() != Method::GET || req.uri().query().is_some() {
        return false;
    }
    match req.headers().get(header::CONTENT_LENGTH) {
        None => true,
        Some(len) => len.to_str().ok().and_then(|s| s.parse::<usize>().ok()).map_or(true, |n| n == 0),
    }
}

fn validate_request(req: &Request) -> Option<Response> {
    if req.method() == Method::PUT || req.method() == Method::DELETE {
        return Some(StatusCode::METHOD_NOT_ALLOWED.into_response());
    }
    if let Some(len) = req.headers().get(header::CONTENT_LENGTH) {
        if let Ok(len) = len.to_str().unwrap_or("").parse::<usize>() {
            if len > MAX_REQUEST_CONTENT_LENGTH {
                return Some(StatusCode::PAYLOAD_TOO_LARGE.into_response());
            }
        }
    }
    if req.method() != Method::OPTIONS {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        if !content_type.starts_with(CONTENT_TYPE) {
            return Some(StatusCode::UNSUPPORTED_MEDIA_TYPE.into_response());
        }
    }
    None
}

/// Runs the per-request pipeline for a single (non-batch) JSON-RPC message.
async fn handle_single(state: &Arc<AppState>, body: &[u8]) -> Outcome {
    let req = match parse_single(body) {
        Ok(r) => r,
        Err(_) => return Outcome::Respond(json_error_response(IdField::Absent, STATUS_INVALID_JSON_REQUEST)),
    };

    match dispatch_single(state, &req).await {
        Ok(outcome) => outcome,
        Err(err) => Outcome::Respond(json_error_response(req.id.clone(), err.code())),
    }
}

async fn dispatch_single(state: &Arc<AppState>, req: &JsonRpcRequest) -> Result<Outcome, StatusError> {
    if !is_well_formed_method(&req.method) {
        return Err(StatusError(STATUS_METHOD_NOT_ALLOWED));
    }
    if !state.config.method_whitelist.contains(&req.method) {
        return Err(StatusError(STATUS_METHOD_NOT_WHITELIST));
    }

    match req.method.as_str() {
        SEND_RAW_TX_METHOD => handle_send_raw_transaction(state, req).await,
        GAS_PRICE_METHOD => Ok(Outcome::Respond(handle_gas_price(state, req).await)),
        GAS_TIP_CAP_METHOD => Ok(Outcome::Respond(handle_gas_tip_cap(state, req).await)),
        _ => Ok(Outcome::Forward),
    }
}

async fn handle_send_raw_transaction(
    state: &Arc<AppState>,
    req: &JsonRpcRequest,
) -> Result<Outcome, StatusError> {
    let hex_param =
        single_hex_param(&req.params).ok_or(StatusError(STATUS_DECODE_TRANSACTION_ERROR))?;
    let raw_bytes =
        decode_hex_param(hex_param).map_err(|_| StatusError(STATUS_DECODE_TRANSACTION_ERROR))?;
    let tx = decode_transaction(&raw_bytes).map_err(|_| StatusError(STATUS_DECODE_TRANSACTION_ERROR))?;

    let policy_cfg = build_policy_config(&state.config);
    let status = admit(&policy_cfg, &tx, state.whitelist.as_ref(), state.script.as_ref()).await;

    match status {
        STATUS_OK => info!(status, "eth_sendRawTransaction admitted"),
        STATUS_VALUE_TOO_LARGE => warn!(status, "eth_sendRawTransaction admitted with oversized value"),
        other => return Err(StatusError(other)),
    }

    if state.config.enable_active_mq {
        if let Some(notifier) = &state.notifier {
            notifier.notify(hex_param.to_string());
        }
    }

    Ok(Outcome::Forward)
}

async fn handle_gas_price(state: &Arc<AppState>, req: &JsonRpcRequest) -> Response {
    let bounds = GasBounds { min: state.config.min_gas_price_wei, max: state.config.max_gas_price_wei };
    let price = state.gas_oracle.gas_price(&bounds).await;
    json_success_response(req.id.clone(), Value::String(encode_quantity(price)))
}

async fn handle_gas_tip_cap(state: &Arc<AppState>, req: &JsonRpcRequest) -> Response {
    let bounds =
        GasBounds { min: state.config.min_gas_tip_cap_wei, max: state.config.max_gas_tip_cap_wei };
    let tip = state.gas_oracle.gas_tip_cap(&bounds).await;
    json_success_response(req.id.clone(), Value::String(encode_quantity(tip)))
}

/// Mirrors `checkJSONBatchRequest`: every item is evaluated independently.
/// If nothing failed, the whole original body is forwarded upstream
/// unmodified (`Outcome::Forward`); otherwise a synthesized reply list is
/// returned directly, with gas-price/tip-cap and passthrough slots answered
/// as bare empty successes rather than real values — the batch asymmetry
/// this carries over from the original's commented-out real fetch path.
async fn handle_batch(state: &Arc<AppState>, body: &[u8]) -> Outcome {
    let items = match parse_batch(body) {
        Ok(items) => items,
        Err(_) => return Outcome::Respond(json_error_response(IdField::Absent, STATUS_INVALID_JSON_REQUEST)),
    };

    let mut replies = Vec::with_capacity(items.len());
    let mut any_error = false;

    for item in &items {
        match dispatch_batch_item(state, item).await {
            Ok(reply) => replies.push(reply),
            Err(err) => {
                replies.push(JsonRpcReply::err(item.id.clone(), err.code()));
                any_error = true;
            }
        }
    }

    if any_error {
        Outcome::Respond(json_batch_response(&replies))
    } else {
        Outcome::Forward
    }
}

async fn dispatch_batch_item(
    state: &Arc<AppState>,
    item: &JsonRpcRequest,
) -> Result<JsonRpcReply, StatusError> {
    if !is_well_formed_method(&item.method) {
        return Err(StatusError(STATUS_METHOD_NOT_ALLOWED));
    }
    if !state.config.method_whitelist.contains(&item.method) {
        return Err(StatusError(STATUS_METHOD_NOT_WHITELIST));
    }

    if item.method.as_str() != SEND_RAW_TX_METHOD {
        // Gas methods and every other whitelisted method get an empty
        // placeholder slot when the batch has to be answered locally.
        return Ok(JsonRpcReply::empty_ok(item.id.clone()));
    }

    let hex_param =
        single_hex_param(&item.params).ok_or(StatusError(STATUS_DECODE_TRANSACTION_ERROR))?;
    let decoded = decode_hex_param(hex_param).ok().and_then(|b| decode_transaction(&b).ok());
    let tx = decoded.ok_or(StatusError(STATUS_DECODE_TRANSACTION_ERROR))?;

    let policy_cfg = build_policy_config(&state.config);
    let status = admit(&policy_cfg, &tx, state.whitelist.as_ref(), state.script.as_ref()).await;
    match status {
        STATUS_OK | STATUS_VALUE_TOO_LARGE => {
            if status == STATUS_VALUE_TOO_LARGE {
                warn!(status, "batch item admitted with oversized value");
            }
            if state.config.enable_active_mq {
                if let Some(notifier) = &state.notifier {
                    notifier.notify(hex_param.to_string());
                }
            }
            Ok(JsonRpcReply::empty_ok(item.id.clone()))
        }
        other => Err(StatusError(other)),
    }
}

fn build_policy_config(config: &Config) -> PolicyConfig {
    PolicyConfig {
        chain_id: config.chain_id,
        min_gas_price: config.min_gas_price_wei,
        max_gas_price: config.max_gas_price_wei,
        min_gas_tip_cap: config.min_gas_tip_cap_wei,
        max_gas_tip_cap: config.max_gas_tip_cap_wei,
        min_gas_limit: config.min_gas_limit,
        max_gas_limit: config.max_gas_limit,
        script_from_check: if config.script_kind.is_enabled() { Some(config.enable_from_check) } else { None },
        disable_contract_create: config.disable_contract_create,
        to_blacklist: config.to_blacklist.clone(),
        max_value: config.max_value_wei,
        enable_max_value_verify: config.enable_max_value_verify,
        tx_hash_blacklist: config.tx_hash_blacklist.clone(),
        from_blacklist: config.from_blacklist.clone(),
        enable_whitelist_db: config.enable_whitelist_db,
    }
}

async fn relay_to_upstream(
    state: &Arc<AppState>,
    headers: &HeaderMap,
    method: &Method,
    request_path: &str,
    body: &[u8],
    _addr: &SocketAddr,
) -> Response {
    match &state.upstream {
        UpstreamTarget::Http(_) => {
            let Some(relay) = &state.http_relay else {
                return json_error_response(IdField::Absent, STATUS_INTERNAL_ERROR);
            };
            match relay.relay(request_path, method.clone(), headers.clone(), body.to_vec()).await {
                Ok(resp) => {
                    let mut response = Response::builder().status(resp.status);
                    for (name, value) in resp.headers.iter() {
                        response = response.header(name, value);
                    }
                    response
                        .body(Body::from_stream(resp.body))
                        .unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
                }
                Err(_) => json_error_response(IdField::Absent, STATUS_INTERNAL_ERROR),
            }
        }
        UpstreamTarget::Ipc(path) => match ipc_relay::relay(path, body).await {
            Ok(stream) => (StatusCode::OK, Body::from_stream(stream)).into_response(),
            Err(err) => {
                let status = match err {
                    ipc_relay::IpcRelayError::Dial => STATUS_IPC_DIAL_ERROR,
                    ipc_relay::IpcRelayError::Write => STATUS_IPC_WRITE_ERROR,
                    ipc_relay::IpcRelayError::Read => STATUS_IPC_READ_ERROR,
                };
                json_error_response(IdField::Absent, status)
            }
        },
    }
}

fn json_error_response(id: IdField, status: u16) -> Response {
    let reply = JsonRpcReply::err(id, status);
    let body = serde_json::to_vec(&reply).unwrap_or_default();
    (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}

fn json_success_response(id: IdField, result: Value) -> Response {
    let reply = JsonRpcReply::ok(id, result);
    let body = serde_json::to_vec(&reply).unwrap_or_default();
    (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}

fn json_batch_response(replies: &[JsonRpcReply]) -> Response {
    let body = serde_json::to_vec(replies).unwrap_or_default();
    (StatusCode::OK, [(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}
