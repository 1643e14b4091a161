//! Per-IP rate limiting — ambient, outside this service's policy scope.
//! A `governor`-backed `tower` layer keyed by the first available of
//! `X-Forwarded-For`, the socket address, then `X-Real-IP`, the same
//! header-priority the original's `tollbooth` integration used.

use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};

pub type IpRateLimiter = RateLimiter<IpAddr, DefaultKeyedStateStore<IpAddr>, DefaultClock>;

pub fn build_limiter(requests_per_second: u32) -> Arc<IpRateLimiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second.max(1)).unwrap());
    Arc::new(RateLimiter::keyed(quota))
}

fn client_ip(headers: &HeaderMap, connect_info: Option<&SocketAddr>) -> Option<IpAddr> {
    if let Some(value) = headers.get("x-forwarded-for") {
        if let Ok(text) = value.to_str() {
            if let Some(first) = text.split(',').next() {
                if let Ok(ip) = first.trim().parse() {
                    return Some(ip);
                }
            }
        }
    }
    if let Some(addr) = connect_info {
        return Some(addr.ip());
    }
    if let Some(value) = headers.get("x-real-ip") {
        if let Ok(text) = value.to_str() {
            if let Ok(ip) = text.trim().parse() {
                return Some(ip);
            }
        }
    }
    None
}

pub async fn rate_limit_layer(
    limiter: axum::extract::State<Arc<IpRateLimiter>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: axum::extract::Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let ip = client_ip(request.headers(), Some(&addr)).unwrap_or(addr.ip());
    if limiter.check_key(&ip).is_err() {
        return Err(StatusCode::TOO_MANY_REQUESTS);
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefers_forwarded_for_header() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", "203.0.113.9, 10.0.0.1".parse().unwrap());
        let fallback: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let ip = client_ip(&headers, Some(&fallback)).unwrap();
        assert_eq!(ip.to_string(), "203.0.113.9");
    }

    #[test]
    fn falls_back_to_socket_addr() {
        let headers = HeaderMap::new();
        let fallback: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let ip = client_ip(&headers, Some(&fallback)).unwrap();
        assert_eq!(ip.to_string(), "127.0.0.1");
    }
}
