//! Analyzer settings loading and validation

use anyhow::{Context, Result};
use ocipa_analyzer::{AnalyzerOptions, MatchMode};
use ocipa_identity::{ClientOptions, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Optional settings file; every field has a default
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnalyzerSettings {
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default)]
    pub match_mode: MatchMode,
    #[serde(default)]
    pub include_deleted_compartments: bool,
    #[serde(default)]
    pub transport: TransportSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct TransportSection {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_concurrency() -> usize { 8 }
fn default_max_attempts() -> u32 { 3 }
fn default_base_delay_ms() -> u64 { 250 }
fn default_request_timeout() -> u64 { 30 }

impl Default for TransportSection {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            match_mode: MatchMode::default(),
            include_deleted_compartments: false,
            transport: TransportSection::default(),
        }
    }
}

impl AnalyzerSettings {
    /// Load settings from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;
        Self::parse(&contents).with_context(|| format!("Invalid settings file {:?}", path))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let settings: Self = toml::from_str(contents).context("Failed to parse settings")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Validate settings
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            anyhow::bail!("concurrency must be at least 1");
        }
        if self.transport.max_attempts == 0 {
            anyhow::bail!("transport.max_attempts must be at least 1");
        }
        if self.transport.request_timeout_secs == 0 {
            anyhow::bail!("transport.request_timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            concurrency: self.concurrency,
            match_mode: self.match_mode,
            include_deleted_compartments: self.include_deleted_compartments,
        }
    }

    pub fn client_options(&self, endpoint: Option<String>, region: Option<String>) -> ClientOptions {
        ClientOptions {
            endpoint,
            region,
            request_timeout: Duration::from_secs(self.transport.request_timeout_secs),
            retry: RetryPolicy::new(
                self.transport.max_attempts,
                Duration::from_millis(self.transport.base_delay_ms),
            ),
        }
    }
}
