//! HTTP Relay — reverse-proxies the validated request onto an `http(s)`
//! upstream, rewriting the path the way `httputil.NewSingleHostReverseProxy`
//! does: strip nothing from the incoming path, join it onto the upstream's
//! own base path, and propagate status/headers/body back verbatim.

use http::{HeaderMap, Method, StatusCode};
use reqwest::{Client, Url};
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::StreamExt;
use bytes::Bytes;

#[derive(Debug, thiserror::Error)]
pub enum HttpRelayError {
    #[error("upstream request failed: {0}")]
    Request(#[from] reqwest::Error),
}

pub struct HttpRelay {
    client: Client,
    base: Url,
}

pub struct RelayedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: ReceiverStream<Result<Bytes, std::io::Error>>,
}

impl HttpRelay {
    pub fn new(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    pub async fn relay(
        &self,
        request_path: &str,
        method: Method,
        headers: HeaderMap,
        body: Vec<u8>,
    ) -> Result<RelayedResponse, HttpRelayError> {
        let target = join_path(&self.base, request_path);
        let mut req = self.client.request(method, target).body(body);
        for (name, value) in headers.iter() {
            req = req.header(name, value);
        }

        let resp = req.send().await?;
        let status = StatusCode::from_u16(resp.status().as_u16())
            .unwrap_or(StatusCode::BAD_GATEWAY);

        let mut out_headers = HeaderMap::new();
        for (name, value) in resp.headers().iter() {
            out_headers.insert(name.clone(), value.clone());
        }

        let (tx, rx) = tokio::sync::mpsc::channel(4);
        let mut upstream_stream = resp.bytes_stream();
        tokio::spawn(async move {
            while let Some(chunk) = upstream_stream.next().await {
                let mapped = chunk.map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
                if tx.send(mapped).await.is_err() {
                    break;
                }
            }
        });

        Ok(RelayedResponse { status, headers: out_headers, body: ReceiverStream::new(rx) })
    }
}

fn join_path(base: &Url, request_path: &str) -> Url {
    let mut url = base.clone();
    let base_path = url.path().trim_end_matches('/');
    let joined = format!("{base_path}{request_path}");
    url.set_path(&joined);
    url
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_path_concatenates_base_and_request_path() {
        let base = Url::parse("https://upstream.example/rpc").unwrap();
        let joined = join_path(&base, "/v1/eth");
        assert_eq!(joined.path(), "/rpc/v1/eth");
    }

    #[test]
    fn join_path_handles_bare_base() {
        let base = Url::parse("https://upstream.example").unwrap();
        let joined = join_path(&base, "/eth_call");
        assert_eq!(joined.path(), "/eth_call");
    }
}
