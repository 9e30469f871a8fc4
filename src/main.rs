use std::{io::Read as _, path::Path, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use smt_ws::{
    admin_token::AdminTokenHash,
    config::{Cli, Command, Config},
    oplog::TracingLog,
    smt::{ConfigProxy, ConfigSnapshot},
    yast::HttpYastService,
};

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let cmd = cli.command.clone().unwrap_or(Command::Run);

    match cmd {
        Command::Run => run_server(cli.config).await,
        Command::Read => read_once(&cli.config).await,
        Command::Write(args) => write_once(&cli.config, &args.from).await,
        Command::HashToken(args) => print_token_hash(&args.from_env),
    }
}

fn config_proxy(config: &Config) -> Result<ConfigProxy> {
    let yast = HttpYastService::new(&config.yast_base_url, config.yast_timeout())
        .context("build yast client")?;
    Ok(ConfigProxy::new(
        Arc::new(yast),
        Arc::new(TracingLog::new("smt")),
    ))
}

async fn run_server(config: Config) -> Result<()> {
    let smt = config_proxy(&config)?;
    let app = smt_ws::http::build_router(&config, smt)
        .context("invalid --admin-token-hash")?
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    info!(
        bind = %config.bind,
        yast_base_url = %config.yast_base_url,
        "starting smt-ws"
    );
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("bind {}", config.bind))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn read_once(config: &Config) -> Result<()> {
    let snapshot = config_proxy(config)?
        .retrieve()
        .await
        .context("read SMT config")?;
    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    Ok(())
}

async fn write_once(config: &Config, from: &Path) -> Result<()> {
    let raw = if from == Path::new("-") {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("read snapshot from stdin")?;
        buf
    } else {
        std::fs::read_to_string(from)
            .with_context(|| format!("read snapshot from {}", from.display()))?
    };
    let snapshot: ConfigSnapshot = serde_json::from_str(&raw).context("parse snapshot")?;

    config_proxy(config)?
        .submit(&snapshot)
        .await
        .context("write SMT config")?;
    Ok(())
}

fn print_token_hash(var: &str) -> Result<()> {
    let token = std::env::var(var).with_context(|| format!("read token from ${var}"))?;
    let hash = AdminTokenHash::generate(&token)?;
    println!("{}", hash.as_str());
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to install ctrl-c handler; graceful shutdown disabled");
        std::future::pending::<()>().await;
    }
}
