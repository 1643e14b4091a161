//! Builds the process-wide `tracing` subscriber once, at startup, from
//! `config.log_level`. Every module below logs through ordinary
//! `tracing::{info,warn,error}` calls with structured fields — there is no
//! `ErrorLog` handle threaded through constructors the way the original
//! threads a `*log.Logger` everywhere.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

pub fn init(log_level: &str) {
    let filter = EnvFilter::try_new(log_level)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    Registry::default()
        .with(filter)
        .with(fmt_layer)
        .try_init()
        .ok();
}
