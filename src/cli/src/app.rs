//! Argument model and report output

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use ocipa_analyzer::{validate_user_id, AnalysisError, AnalyzerOptions, MatchMode, PolicyAnalyzer};
use ocipa_core::{DirectoryError, IdentityDirectory};
use ocipa_identity::{DEFAULT_CONFIG_PATH, DEFAULT_PROFILE};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::AnalyzerSettings;

/// Report rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// OCI user policy analyzer
#[derive(Parser, Debug)]
#[command(
    name = "oci-policy-analyzer",
    version,
    about = "List the policy statements that apply to an OCI user through their groups",
    long_about = None
)]
pub struct Cli {
    /// User OCID to analyze (ocid1.user....)
    pub user_id: String,

    /// Provider configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH, env = "OCI_CONFIG_FILE")]
    pub config_file: PathBuf,

    /// Profile within the configuration file
    #[arg(long, default_value = DEFAULT_PROFILE, env = "OCI_CLI_PROFILE")]
    pub profile: String,

    /// Override the profile's region
    #[arg(long, env = "OCI_REGION")]
    pub region: Option<String>,

    /// Override the identity endpoint URL
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Analyzer settings file (TOML)
    #[arg(long, env = "OCIPA_SETTINGS")]
    pub settings: Option<PathBuf>,

    /// Compartments scanned concurrently (overrides settings)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Only match `group <name>` clauses, case-insensitively
    #[arg(long)]
    pub strict_groups: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Default log filter for the requested verbosity
    pub fn log_filter(&self) -> String {
        let level = match self.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        };
        format!("{},hyper=warn,reqwest=warn", level)
    }

    /// Target user identifier, checked before any credentials are loaded
    pub fn validated_user_id(&self) -> Result<&str> {
        validate_user_id(&self.user_id)?;
        Ok(&self.user_id)
    }

    /// Settings file (or defaults) with command-line overrides applied
    pub fn resolve_settings(&self) -> Result<AnalyzerSettings> {
        let mut settings = match &self.settings {
            Some(path) => AnalyzerSettings::load(path)?,
            None => AnalyzerSettings::default(),
        };
        if let Some(concurrency) = self.concurrency {
            settings.concurrency = concurrency;
        }
        if self.strict_groups {
            settings.match_mode = MatchMode::GroupClause;
        }
        settings.validate()?;
        Ok(settings)
    }
}

/// Run one analysis and write the report
///
/// The report goes to `out`; warnings about skipped compartments go to
/// `err` after it. Only unrecoverable failures return `Err`.
pub async fn execute<O: Write, E: Write>(
    directory: Arc<dyn IdentityDirectory>,
    user_id: &str,
    options: AnalyzerOptions,
    format: OutputFormat,
    out: &mut O,
    err: &mut E,
) -> Result<()> {
    let mut analyzer = PolicyAnalyzer::new(directory, options);
    let report = match analyzer.analyze(user_id).await {
        Ok(report) => report,
        Err(e) => {
            let hint = match e.directory_error() {
                Some(DirectoryError::Auth(_)) => {
                    Some("Credentials were rejected; check user, fingerprint and key_file in the provider profile")
                }
                Some(DirectoryError::NotFound(_)) if matches!(e, AnalysisError::ResolveUser { .. }) => {
                    Some("The user does not exist in this tenancy")
                }
                _ => None,
            };
            return Err(match hint {
                Some(hint) => anyhow::Error::new(e).context(hint),
                None => e.into(),
            });
        }
    };

    match format {
        OutputFormat::Text => write!(out, "{}", report)?,
        OutputFormat::Json => writeln!(
            out,
            "{}",
            report.to_json().context("Failed to serialize report")?
        )?,
    }
    out.flush()?;

    for warning in &report.warnings {
        writeln!(err, "Warning: {}", warning)?;
    }
    Ok(())
}
