//! Provider profile loading
//!
//! The provider's configuration file is INI formatted. Named profiles inherit
//! any key they do not set from the `[DEFAULT]` section.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::error::{IdentityError, Result};

/// Default location of the provider configuration file
pub const DEFAULT_CONFIG_PATH: &str = "~/.oci/config";

/// Profile read when none is requested
pub const DEFAULT_PROFILE: &str = "DEFAULT";

/// Credentials and placement for one profile
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderProfile {
    pub name: String,
    pub user: String,
    pub fingerprint: String,
    pub key_file: PathBuf,
    pub tenancy: String,
    pub region: String,
    pub pass_phrase: Option<String>,
}

impl ProviderProfile {
    /// Load `profile` from the configuration file at `path` (`~` is expanded)
    pub fn load<P: AsRef<Path>>(path: P, profile: &str) -> Result<Self> {
        let path = expand_home(path.as_ref());
        let contents = std::fs::read_to_string(&path).map_err(|source| IdentityError::Read {
            path: path.clone(),
            source,
        })?;

        let profile = Self::parse(&contents, profile)?;
        tracing::debug!(
            "Loaded profile '{}' from {:?} (region {})",
            profile.name,
            path,
            profile.region
        );
        Ok(profile)
    }

    /// Parse configuration text and extract `profile`
    pub fn parse(contents: &str, profile: &str) -> Result<Self> {
        let sections = parse_sections(contents)?;

        let defaults = sections.get(DEFAULT_PROFILE);
        let section = match sections.get(profile) {
            Some(section) => section,
            None => return Err(IdentityError::ProfileNotFound(profile.to_string())),
        };

        let lookup = |key: &str| -> Option<String> {
            section
                .get(key)
                .or_else(|| defaults.and_then(|d| d.get(key)))
                .cloned()
        };
        let require = |key: &str| -> Result<String> {
            lookup(key).ok_or_else(|| IdentityError::MissingKey {
                profile: profile.to_string(),
                key: key.to_string(),
            })
        };

        let config = Self {
            name: profile.to_string(),
            user: require("user")?,
            fingerprint: require("fingerprint")?,
            key_file: expand_home(Path::new(&require("key_file")?)),
            tenancy: require("tenancy")?,
            region: require("region")?,
            pass_phrase: lookup("pass_phrase").filter(|p| !p.is_empty()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would only fail later at signing time
    pub fn validate(&self) -> Result<()> {
        for (key, value) in [
            ("user", &self.user),
            ("fingerprint", &self.fingerprint),
            ("tenancy", &self.tenancy),
            ("region", &self.region),
        ] {
            if value.trim().is_empty() {
                return Err(IdentityError::MissingKey {
                    profile: self.name.clone(),
                    key: key.to_string(),
                });
            }
        }
        Ok(())
    }

    /// Key identifier used in the `Authorization` header
    pub fn key_id(&self) -> String {
        format!("{}/{}/{}", self.tenancy, self.user, self.fingerprint)
    }

    /// Identity endpoint for the profile's region
    pub fn identity_endpoint(&self) -> String {
        endpoint_for_region(&self.region)
    }
}

/// Identity endpoint for a region identifier such as `us-ashburn-1`
pub fn endpoint_for_region(region: &str) -> String {
    format!("https://identity.{}.oci.oraclecloud.com", region)
}

fn parse_sections(contents: &str) -> Result<HashMap<String, HashMap<String, String>>> {
    let mut sections: HashMap<String, HashMap<String, String>> = HashMap::new();
    let mut current: Option<String> = None;

    for (index, raw) in contents.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            let name = rest.strip_suffix(']').ok_or_else(|| IdentityError::Parse {
                line: index + 1,
                message: format!("unterminated section header '{}'", line),
            })?;
            let name = name.trim().to_string();
            sections.entry(name.clone()).or_default();
            current = Some(name);
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| IdentityError::Parse {
            line: index + 1,
            message: format!("expected key=value, found '{}'", line),
        })?;
        let section = current.as_ref().ok_or_else(|| IdentityError::Parse {
            line: index + 1,
            message: "key outside of a profile section".to_string(),
        })?;

        sections
            .entry(section.clone())
            .or_default()
            .insert(key.trim().to_string(), value.trim().to_string());
    }

    Ok(sections)
}

/// Expand a leading `~` to the current user's home directory
pub fn expand_home(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
