use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use pokeapi_client::utils::logger::{init_logger, DEFAULT_LOG_FILTER};
use pokeapi_client::{config::Config, PokeClient, RetryPolicy};

#[derive(Debug, Parser)]
#[command(name = "pokeapi", version, about = "Query the PokeAPI with automatic retries")]
struct Cli {
    /// Base URL of the pokemon resource (overrides POKEAPI_URL)
    #[arg(long, global = true)]
    url: Option<String>,

    /// Per-request timeout in seconds (overrides POKEAPI_TIMEOUT_SECS)
    #[arg(long, global = true)]
    timeout_secs: Option<u64>,

    /// Maximum attempts per lookup (overrides POKEAPI_MAX_ATTEMPTS)
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Fetch a single pokemon by name or id
    Get { name: String },
    /// Fetch the pokemon listing
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger(DEFAULT_LOG_FILTER);

    let cli = Cli::parse();

    // Load configuration, then apply CLI overrides
    let mut config = Config::from_env()?;
    if let Some(url) = cli.url {
        config.client.url = url;
    }
    if let Some(secs) = cli.timeout_secs {
        config.client.timeout = Duration::from_secs(secs);
    }
    if let Some(attempts) = cli.max_attempts {
        config.retry = RetryPolicy::builder()
            .max_attempts(attempts)
            .base_delay(config.retry.base_delay())
            .backoff_multiplier(config.retry.backoff_multiplier())
            .max_delay(config.retry.max_delay())
            .jitter(config.retry.jitter())
            .build()?;
    }
    info!(
        url = %config.client.url,
        max_attempts = config.retry.max_attempts(),
        "Configuration loaded"
    );

    let client = PokeClient::new(config.client)?.with_retry_policy(config.retry);

    // Ctrl-C cancels whatever attempt or backoff is in progress
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling request");
            on_signal.cancel();
        }
    });

    let output = match cli.command {
        Command::Get { name } => {
            let pokemon = client.fetch_by_identifier(&name, &cancel).await?;
            serde_json::to_string_pretty(&pokemon)?
        }
        Command::List => {
            let list = client.fetch_all(&cancel).await?;
            serde_json::to_string_pretty(&list)?
        }
    };

    println!("{}", output);
    Ok(())
}
