//! HTTP request signing
//!
//! Implements the provider's draft-cavage HTTP signature profile for body-less
//! requests: the signing string covers `date`, `(request-target)` and `host`,
//! signed with RSASSA-PKCS1-v1_5 over SHA-256.

use base64::Engine as _;
use ring::rand::SystemRandom;
use ring::signature::{RsaKeyPair, RSA_PKCS1_SHA256};
use std::fmt;

use crate::config::ProviderProfile;
use crate::error::{IdentityError, Result};

/// Headers covered by the signature, in signing order
pub const SIGNED_HEADERS: &str = "date (request-target) host";

/// Signs outgoing requests with the profile's API key
pub struct RequestSigner {
    key_id: String,
    key_pair: RsaKeyPair,
    rng: SystemRandom,
}

impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

impl RequestSigner {
    /// Build a signer from a PEM encoded RSA private key (PKCS#8 or PKCS#1)
    pub fn from_pem(key_id: impl Into<String>, pem_text: &str) -> Result<Self> {
        let block = pem::parse(pem_text)
            .map_err(|e| IdentityError::InvalidKey(format!("PEM decode failed: {}", e)))?;

        if block.headers().get("Proc-Type").is_some_and(|v| v.contains("ENCRYPTED")) {
            return Err(IdentityError::InvalidKey(
                "encrypted private keys are not supported".to_string(),
            ));
        }

        let key_pair = match block.tag() {
            "PRIVATE KEY" => RsaKeyPair::from_pkcs8(block.contents()),
            "RSA PRIVATE KEY" => RsaKeyPair::from_der(block.contents()),
            "ENCRYPTED PRIVATE KEY" => {
                return Err(IdentityError::InvalidKey(
                    "encrypted private keys are not supported".to_string(),
                ))
            }
            other => {
                return Err(IdentityError::InvalidKey(format!(
                    "unsupported PEM block '{}'",
                    other
                )))
            }
        }
        .map_err(|e| IdentityError::InvalidKey(e.to_string()))?;

        Ok(Self {
            key_id: key_id.into(),
            key_pair,
            rng: SystemRandom::new(),
        })
    }

    /// Build a signer from the key file named by a profile
    pub fn from_profile(profile: &ProviderProfile) -> Result<Self> {
        if profile.pass_phrase.is_some() {
            return Err(IdentityError::InvalidKey(
                "pass_phrase is set but encrypted private keys are not supported".to_string(),
            ));
        }
        let pem_text =
            std::fs::read_to_string(&profile.key_file).map_err(|source| IdentityError::Read {
                path: profile.key_file.clone(),
                source,
            })?;
        Self::from_pem(profile.key_id(), &pem_text)
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Text that gets signed for a request
    pub fn signing_string(method: &str, path_and_query: &str, host: &str, date: &str) -> String {
        format!(
            "date: {}\n(request-target): {} {}\nhost: {}",
            date,
            method.to_lowercase(),
            path_and_query,
            host
        )
    }

    /// Value of the `Authorization` header for a request
    pub fn authorization(
        &self,
        method: &str,
        path_and_query: &str,
        host: &str,
        date: &str,
    ) -> Result<String> {
        let message = Self::signing_string(method, path_and_query, host, date);
        let mut signature = vec![0u8; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&RSA_PKCS1_SHA256, &self.rng, message.as_bytes(), &mut signature)
            .map_err(|e| IdentityError::Signing(e.to_string()))?;

        Ok(format!(
            "Signature version=\"1\",keyId=\"{}\",algorithm=\"rsa-sha256\",headers=\"{}\",signature=\"{}\"",
            self.key_id,
            SIGNED_HEADERS,
            base64::engine::general_purpose::STANDARD.encode(signature)
        ))
    }
}

/// Current time formatted for the `date` header
pub fn http_date() -> String {
    chrono::Utc::now()
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string()
}
