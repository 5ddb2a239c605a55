//! eip-binder CLI - claim an Elastic IP for this instance

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use eip_binder::error::{BindError, FixSuggestion};
use eip_binder::util::BIND_TIMEOUT;
use eip_binder::{resolve_target, BindResult, Binder, Ec2Directory, ImdsClient, MetadataConfig};

#[derive(Parser)]
#[command(name = "eip-binder")]
#[command(about = "Associate an Elastic IP with the EC2 instance running this command")]
#[command(version)]
struct Cli {
    /// Elastic IP to claim, or POD_NAME to read it from $<POD_NAME with - replaced by _>
    target: Option<String>,

    /// AWS region (defaults to the environment/profile region)
    #[arg(long)]
    region: Option<String>,

    /// Instance metadata base URL (overrides EIP_METADATA_ENDPOINT)
    #[arg(long)]
    metadata_endpoint: Option<String>,

    /// Cancel outstanding EC2 calls after this many seconds
    #[arg(long, default_value_t = BIND_TIMEOUT.as_secs())]
    timeout: u64,

    /// Print the result as JSON on stdout
    #[arg(long)]
    json: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report<'a> {
    target: &'a str,
    #[serde(flatten)]
    result: &'a BindResult,
}

#[tokio::main]
async fn main() {
    // Load .env file (ignore if not present)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    // Logs go to stderr; stdout carries only the result
    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("{} {}", "Error:".red().bold(), e);
        if let Some(association_id) = e.detached_association() {
            eprintln!(
                "  {} the EIP was detached from {} and is not attached anywhere; re-run to recover",
                "Warning:".yellow().bold(),
                association_id
            );
        }
        if let Some(suggestion) = e.fix_suggestion() {
            eprintln!("  {} {}", "Fix:".yellow(), suggestion);
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), BindError> {
    // Input is fully validated before any remote call
    let target = resolve_target(cli.target.as_deref(), |k| std::env::var(k).ok())?.to_string();

    let mut metadata_config = MetadataConfig::default().with_env()?;
    if let Some(endpoint) = cli.metadata_endpoint.as_deref() {
        metadata_config = metadata_config.with_endpoint(endpoint)?;
    }
    let metadata = ImdsClient::from_config(&metadata_config)?;
    let directory = Ec2Directory::from_env(cli.region).await;
    let binder = Binder::new(Arc::new(directory), Arc::new(metadata));

    let cancel = CancellationToken::new();
    cancel_on_timeout_or_interrupt(cancel.clone(), Duration::from_secs(cli.timeout));

    let result = binder.bind(&target, &cancel).await;
    cancel.cancel();
    let result = result?;

    if cli.json {
        let report = Report {
            target: &target,
            result: &result,
        };
        let json = serde_json::to_string_pretty(&report).map_err(|e| BindError::Config {
            reason: format!("Failed to serialize result: {}", e),
        })?;
        println!("{}", json);
    } else if result.already_bound {
        println!(
            "{} EIP {} is already associated with instance {}",
            "✓".green(),
            target.cyan().bold(),
            result.instance_id
        );
    } else {
        println!(
            "{} EIP {} associated with instance {} (association {})",
            "✓".green(),
            target.cyan().bold(),
            result.instance_id,
            result.association_id.as_deref().unwrap_or("-")
        );
    }

    Ok(())
}

/// Cancel the bind scope on timeout or Ctrl-C; exits quietly once the bind ends
fn cancel_on_timeout_or_interrupt(cancel: CancellationToken, timeout: Duration) {
    tokio::spawn(async move {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(timeout) => {
                warn!(timeout_secs = timeout.as_secs(), "bind timed out, cancelling");
            }
            _ = tokio::signal::ctrl_c() => {
                warn!("interrupted, cancelling");
            }
        }
        cancel.cancel();
    });
}
