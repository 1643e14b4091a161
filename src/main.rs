//! Entry point: `chainguard version|init|server`.
//!
//! Grounded on `examples/original_source/cli`'s command set: `init` writes a
//! starter config file interactively, `server` loads the config and serves
//! the proxy, `version` just prints the build version.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::middleware;
use clap::{Parser, Subcommand};
use sqlx::mysql::MySqlConnectOptions;
use tracing::info;

use chainguard::frontend::{self, AppState};
use chainguard::gas::GasOracle;
use chainguard::notify::Notifier;
use chainguard::ratelimit::{build_limiter, rate_limit_layer};
use chainguard::relay::{http as http_relay, UpstreamTarget};
use chainguard::config::ScriptKind;
use chainguard::script::{DisabledScript, ExternalProcess, LuaScript, ScriptHook};
use chainguard::whitelist::{MySqlWhitelist, NoWhitelist, WhitelistLookup};
use chainguard::{config, logging};

#[derive(Parser)]
#[command(name = "chainguard", version, about = "Policy-enforcing reverse proxy for Ethereum-compatible JSON-RPC traffic")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the build version.
    Version,
    /// Write a starter configuration file.
    Init {
        #[arg(short, long, default_value = "chainguard.toml")]
        config: PathBuf,
    },
    /// Load the configuration and serve the proxy.
    Server {
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short = 'i', long = "rpcURL")]
        rpc_url: Option<String>,
        #[arg(short = 'H', long, default_value = "0.0.0.0")]
        host: String,
        #[arg(short, long, default_value_t = 8545)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Version => {
            println!("chainguard {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Init { config } => run_init(&config),
        Commands::Server { config, rpc_url, host, port } => {
            run_server(config.as_deref(), rpc_url, host, port).await
        }
    }
}

fn run_init(path: &PathBuf) -> Result<()> {
    if path.exists() {
        let overwrite = dialoguer::Confirm::new()
            .with_prompt(format!("{} already exists, overwrite?", path.display()))
            .default(false)
            .interact()?;
        if !overwrite {
            return Ok(());
        }
    }

    let rpc_url: String = dialoguer::Input::new()
        .with_prompt("upstream RPC URL")
        .default("https://rpc1.newchain.newtonproject.org".to_string())
        .interact_text()?;

    let template = include_str!("../config.example.toml");
    let rendered = template.replacen(
        "rpcURL = \"https://rpc1.newchain.newtonproject.org\"",
        &format!("rpcURL = \"{rpc_url}\""),
        1,
    );
    std::fs::write(path, rendered).with_context(|| format!("writing {}", path.display()))?;
    println!("wrote {}", path.display());
    Ok(())
}

async fn run_server(
    config_path: Option<&std::path::Path>,
    rpc_url_override: Option<String>,
    host: String,
    port: u16,
) -> Result<()> {
    let config = config::load(config_path, rpc_url_override).await.context("loading configuration")?;
    logging::init(&config.log_level);
    info!(chain_id = %config.chain_id, raw_url = %config.raw_url, "chainguard starting");

    let upstream = UpstreamTarget::parse(&config.raw_url);
    let http_client = reqwest::Client::new();

    let http_relay = match &upstream {
        UpstreamTarget::Http(url) => Some(http_relay::HttpRelay::new(http_client.clone(), url.clone())),
        UpstreamTarget::Ipc(_) => None,
    };

    let gas_oracle = GasOracle::new(http_client.clone(), config.raw_url.clone());

    let notifier = if config.enable_active_mq {
        let server = config
            .mq_server
            .as_deref()
            .context("EnableActiveMQ is true but MQServer is not set")?;
        Some(
            Notifier::connect(
                server,
                &config.mq_username,
                &config.mq_password,
                &config.mq_client_id,
                &config.mq_topic,
                config.mq_qos,
            )
            .await?,
        )
    } else {
        None
    };

    let whitelist: Box<dyn WhitelistLookup> = if config.enable_whitelist_db {
        let settings = config.whitelist_db.as_ref().expect("validated at load time");
        let connect_options = MySqlConnectOptions::new()
            .host(&settings.host)
            .username(&settings.user)
            .password(&settings.password)
            .database(&settings.database);
        Box::new(MySqlWhitelist::new(connect_options))
    } else {
        Box::new(NoWhitelist)
    };

    let script: Box<dyn ScriptHook> = match &config.script_kind {
        ScriptKind::Lua { file, call_function_name } => Box::new(LuaScript {
            script_path: file.to_string_lossy().into_owned(),
            call_function_name: call_function_name.clone(),
        }),
        ScriptKind::External { script_path } => {
            Box::new(ExternalProcess { script_path: script_path.to_string_lossy().into_owned() })
        }
        ScriptKind::Disabled => Box::new(DisabledScript),
    };

    let enable_ip_rate_limit = config.enable_ip_rate_limit;
    let ip_rate = config.ip_rate;
    let tls = config
        .ssl_certificate
        .clone()
        .zip(config.ssl_certificate_key.clone());

    let state = Arc::new(AppState {
        config,
        upstream,
        http_client,
        http_relay,
        gas_oracle,
        notifier,
        whitelist,
        script,
    });

    let mut router = frontend::router(state);
    if enable_ip_rate_limit {
        let limiter = build_limiter(ip_rate);
        router = router.layer(middleware::from_fn_with_state(limiter, rate_limit_layer));
    }
    let router = router.into_make_service_with_connect_info::<SocketAddr>();

    let addr: SocketAddr = format!("{host}:{port}").parse().context("parsing bind address")?;

    if let Some((cert, key)) = tls {
        info!(%addr, "listening with TLS");
        let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key).await?;
        axum_server::bind_rustls(addr, tls_config).serve(router).await?;
    } else {
        info!(%addr, "listening");
        axum_server::bind(addr).serve(router).await?;
    }

    Ok(())
}
