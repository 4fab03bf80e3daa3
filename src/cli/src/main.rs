//! OCI Policy Analyzer - Main Binary
//!
//! Lists every policy statement that applies to a user through their group
//! memberships, across all compartments of the tenancy.
//!
//! # Usage
//!
//! ```bash
//! oci-policy-analyzer ocid1.user.oc1..aaaaaaaa...
//!
//! # Named profile, JSON output, progress logging
//! oci-policy-analyzer --profile AUDIT --format json -v ocid1.user.oc1..aaaaaaaa...
//! ```
//!
//! # Environment Variables
//!
//! - `RUST_LOG`: Logging filter (overrides `-v`)
//! - `OCI_CONFIG_FILE`: Provider configuration file (default: ~/.oci/config)
//! - `OCI_CLI_PROFILE`: Profile name (default: DEFAULT)
//! - `OCI_REGION`: Region override
//! - `OCIPA_SETTINGS`: Analyzer settings file

use anyhow::{Context, Result};
use clap::Parser;
use ocipa_cli::{execute, Cli};
use ocipa_identity::{OciIdentityClient, ProviderProfile};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::debug;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so stdout carries only the report
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_filter().into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            debug!("Analysis failed: {:?}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let user_id = cli.validated_user_id()?;
    let settings = cli.resolve_settings()?;

    let profile = ProviderProfile::load(&cli.config_file, &cli.profile)
        .with_context(|| format!("Failed to load profile '{}'", cli.profile))?;
    let client = OciIdentityClient::from_profile(
        &profile,
        settings.client_options(cli.endpoint.clone(), cli.region.clone()),
    )
    .context("Failed to initialize identity client")?;

    let stdout = std::io::stdout();
    let stderr = std::io::stderr();
    execute(
        Arc::new(client),
        user_id,
        settings.analyzer_options(),
        cli.format,
        &mut stdout.lock(),
        &mut stderr.lock(),
    )
    .await
}
