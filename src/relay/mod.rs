//! Dual-transport upstream relay: `http(s)://` goes through a reqwest
//! reverse proxy, anything else is treated as a filesystem path to a Unix
//! domain socket, mirroring the upstream's `url.Parse(config.RawURL).Scheme`
//! dispatch in `server.go`.

pub mod http;
pub mod ipc;

use std::path::PathBuf;

use reqwest::Url;

#[derive(Debug, Clone)]
pub enum UpstreamTarget {
    Http(Url),
    Ipc(PathBuf),
}

impl UpstreamTarget {
    pub fn parse(raw_url: &str) -> Self {
        match Url::parse(raw_url) {
            Ok(url) if url.scheme() == "http" || url.scheme() == "https" => {
                UpstreamTarget::Http(url)
            }
            _ => UpstreamTarget::Ipc(PathBuf::from(raw_url)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_scheme_is_recognized() {
        assert!(matches!(
            UpstreamTarget::parse("https://rpc.example.com"),
            UpstreamTarget::Http(_)
        ));
    }

    #[test]
    fn bare_path_is_treated_as_ipc_socket() {
        assert!(matches!(
            UpstreamTarget::parse("/var/run/geth.ipc"),
            UpstreamTarget::Ipc(_)
        ));
    }
}
