//! Log diagnosis agent
//!
//! Fetches recent logs for a workload, asks an LLM what went wrong and prints
//! the answer. Run with: cargo run --bin sre-agent -- [OPTIONS]

use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};

use sre_agent::{
    agent::{create_provider, AgentRuntime, BackendKind, LLMProvider, MockProvider},
    config::Config,
    logs::KubectlLogSource,
    Error,
};

#[derive(Parser)]
#[command(author, version, about = "Diagnose a workload from its recent logs", long_about = None)]
struct Cli {
    /// Workload label (matched as app=<label>); defaults to TARGET_APP
    #[arg(short, long)]
    app: Option<String>,

    /// Backend to use (cloud, local); defaults to LLM_PROVIDER
    #[arg(short, long, value_parser = parse_backend)]
    provider: Option<BackendKind>,

    /// Model override for the selected backend
    #[arg(short, long)]
    model: Option<String>,

    /// Number of log lines to fetch
    #[arg(short, long)]
    tail: Option<usize>,

    /// Namespace to read logs from
    #[arg(short, long)]
    namespace: Option<String>,

    /// Log level (debug, info, warn, error)
    #[arg(short, long, default_value = "warn")]
    log_level: String,

    /// Use a canned diagnosis instead of calling a backend
    #[arg(long)]
    dry_run: bool,
}

fn parse_backend(value: &str) -> std::result::Result<BackendKind, String> {
    value.parse::<BackendKind>().map_err(|e| e.to_string())
}

impl Cli {
    fn apply(&self, config: &mut Config) {
        if let Some(app) = &self.app {
            config.target_app = app.clone();
        }
        if let Some(provider) = self.provider {
            config.provider = provider;
        }
        if let Some(model) = &self.model {
            match config.provider {
                BackendKind::Cloud => config.cloud.model = model.clone(),
                BackendKind::Local => config.local.model = model.clone(),
            }
        }
        if let Some(tail) = self.tail {
            config.logs.tail_lines = tail;
        }
        if let Some(namespace) = &self.namespace {
            config.logs.namespace = Some(namespace.clone());
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // stdout carries the report, so logs go to stderr
    let log_filter = format!("sre_agent={},info", cli.log_level);
    tracing_subscriber::fmt()
        .with_env_filter(log_filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<Error>() {
                Some(Error::Config(message)) => {
                    eprintln!("❌ ERROR: {}", message);
                }
                _ => eprintln!("❌ ERROR: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let mut config = Config::load()?;
    cli.apply(&mut config);
    config.validate()?;
    info!("Loaded configuration: {:?}", config);

    let provider: Arc<dyn LLMProvider> = if cli.dry_run {
        Arc::new(MockProvider::default())
    } else {
        create_provider(&config)?
    };
    let log_source = Arc::new(KubectlLogSource::from_config(&config.logs));

    let runtime = AgentRuntime::new(log_source, provider, config.target_app.clone())
        .with_preview_chars(config.preview_chars);

    let mut stdout = std::io::stdout();
    let report = runtime.run(&mut stdout).await.map_err(|e| {
        error!("Diagnosis aborted: {}", e);
        e
    })?;

    info!(
        "Run for '{}' started at {} finished (errors detected: {})",
        report.app, report.started_at, report.errors_detected
    );
    Ok(())
}
