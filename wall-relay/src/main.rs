use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use wall_relay::{run_once, RelayConfig, RelayError};

/// Relay new wall posts to Discord webhooks, once.
#[derive(Debug, Parser)]
#[command(name = "wall-relay", version)]
struct Cli {
    /// Path to the JSON configuration
    #[arg(long, env = "WALL_RELAY_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// VK API token, used when the config file does not carry one
    #[arg(long, env = "VK_ACCESS_TOKEN", hide_env_values = true)]
    vk_token: Option<String>,

    /// Directory holding the seen ledger and translation cache
    #[arg(long, env = "WALL_RELAY_STATE_DIR")]
    state_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    info!("Starting wall relay with {}", cli.config.display());

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(2),
        Err(e) => {
            error!("Run aborted: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

/// Returns whether every attempted delivery succeeded.
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let mut config = RelayConfig::load(&cli.config)?.with_access_token(cli.vk_token);
    if let Some(dir) = cli.state_dir.as_deref() {
        config = config.with_state_dir(dir);
    }

    let report = match run_once(&config).await {
        Ok(report) => report,
        Err(e @ RelayError::Config(_)) => {
            return Err(anyhow::Error::new(e).context("configuration"));
        }
        Err(e @ RelayError::Fetch(_)) => {
            return Err(anyhow::Error::new(e).context("fetching the wall"));
        }
        Err(e) => return Err(e.into()),
    };

    info!(
        "Relayed {} of {} fetched posts ({} already seen, {} untranslated)",
        report.sent, report.fetched, report.skipped_seen, report.translation_fallbacks
    );
    if report.has_failures() {
        warn!("{} deliveries failed and will be retried next run", report.failed);
    }
    Ok(!report.has_failures())
}
