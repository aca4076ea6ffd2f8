//! Demo workload that fails a share of its requests on purpose.
//!
//! Run with: cargo run --bin broken-app -- [OPTIONS]

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use sre_agent::{
    config::DemoConfig,
    server::{log_subscriber, Server},
};

#[derive(Parser)]
#[command(author, version, about = "HTTP service that randomly fails to generate error logs", long_about = None)]
struct Cli {
    /// Address to listen on; defaults to DEMO_ADDR
    #[arg(short, long)]
    addr: Option<String>,

    /// Share of requests answered with 500, between 0 and 1; defaults to DEMO_FAILURE_RATE
    #[arg(short, long)]
    failure_rate: Option<f64>,

    /// Seed for reproducible failure sequences
    #[arg(short, long)]
    seed: Option<u64>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs must go to stdout so the cluster log pipeline picks them up
    let log_filter = format!("sre_agent={level},broken_app={level},tower_http=info", level = cli.log_level);
    log_subscriber(&log_filter, std::io::stdout).init();

    let mut config = DemoConfig::load()?;
    if let Some(addr) = cli.addr {
        config.addr = addr;
    }
    if let Some(rate) = cli.failure_rate {
        config.failure_rate = rate;
    }
    config.validate()?;

    let app = Server::from_config(&config, cli.seed).build_router();

    let listener = tokio::net::TcpListener::bind(&config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    info!(
        "broken-app listening on {} (failure rate {:.0}%)",
        config.addr,
        config.failure_rate * 100.0
    );

    axum::serve(listener, app).await?;

    Ok(())
}
