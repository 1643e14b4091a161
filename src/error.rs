//! The two error-propagation flavors threaded through the request path,
//! named after the upstream's own `params.ErrorInternalError` /
//! `params.ErrorGuard` sentinels.
//!
//! `StatusError` is the "internal" flavor: a bare status code a pipeline
//! stage returns via `?`, still needing to be turned into a JSON-RPC error
//! envelope (carrying the request's own id) by the caller that catches it.
//! `Outcome` is the "guard" flavor: the top-level decision every dispatch
//! function resolves down to — either a synthesized response to send as-is,
//! or a signal to forward the original request upstream unchanged.

use std::fmt;

use axum::response::Response;

use crate::status::status_text;

#[derive(Debug)]
pub struct StatusError(pub u16);

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", status_text(self.0), self.0)
    }
}

impl std::error::Error for StatusError {}

impl StatusError {
    pub fn code(&self) -> u16 {
        self.0
    }
}

/// Mirrors the original's `ErrorGuard` sentinel, but as a real sum type:
/// a handler either hands back a response to send directly, or signals that
/// the original request body should be forwarded upstream unchanged.
pub enum Outcome {
    Respond(Response),
    Forward,
}
