//! # OCI Identity Client
//!
//! Adapter between the analyzer and the provider's identity REST API.
//!
//! - **Profile loading** from the provider's INI configuration file
//! - **HTTP signatures** (`rsa-sha256`) over `date`, `(request-target)` and `host`
//! - **Pagination** via the `opc-next-page` response header
//! - **Bounded retry** with exponential backoff for transient failures
//!
//! ## Example
//!
//! ```rust,no_run
//! use ocipa_identity::{ClientOptions, OciIdentityClient, ProviderProfile};
//! use ocipa_core::IdentityDirectory;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let profile = ProviderProfile::load("~/.oci/config", "DEFAULT")?;
//! let client = OciIdentityClient::from_profile(&profile, ClientOptions::default())?;
//!
//! let user = client.get_user("ocid1.user.oc1..example").await?;
//! println!("{}", user.display_name());
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod config;
pub mod signer;
pub mod models;
pub mod transport;
pub mod client;

// Re-export commonly used types
pub use client::{ClientOptions, OciIdentityClient};
pub use config::{ProviderProfile, DEFAULT_CONFIG_PATH, DEFAULT_PROFILE};
pub use error::{IdentityError, Result};
pub use signer::RequestSigner;
pub use transport::RetryPolicy;

/// Identity API version segment prepended to every request path
pub const API_VERSION: &str = "20160918";
