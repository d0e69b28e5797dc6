//! API Authentication
//!
//! Credential material and the places it is read from: environment
//! variables and the shared credentials file (`~/.spotinst/credentials`).

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub const ENV_TOKEN: &str = "SPOTINST_TOKEN";
pub const ENV_ACCOUNT: &str = "SPOTINST_ACCOUNT";
pub const ENV_PROFILE: &str = "SPOTINST_PROFILE";
pub const ENV_CREDENTIALS_FILE: &str = "SPOTINST_SHARED_CREDENTIALS_FILE";

/// Profile used when `SPOTINST_PROFILE` is not set
pub const DEFAULT_PROFILE: &str = "default";

/// Resolved credentials: a bearer token plus an optional account id
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub token: String,
    pub account: Option<String>,
}

impl Credentials {
    pub fn new(token: impl Into<String>, account: Option<String>) -> Self {
        Self {
            token: token.into(),
            account,
        }
    }

    /// `Authorization` header value
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token)
    }
}

impl std::fmt::Debug for Credentials {
    // Security: never print the token
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"<redacted>")
            .field("account", &self.account)
            .finish()
    }
}

/// One profile section of the credentials file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct FileProfile {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
}

/// Get the shared credentials file path
pub fn credentials_file_path(lookup: &dyn Fn(&str) -> Option<String>) -> Option<PathBuf> {
    // Check SPOTINST_SHARED_CREDENTIALS_FILE first
    if let Some(path) = lookup(ENV_CREDENTIALS_FILE).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }

    dirs::home_dir().map(|p| p.join(".spotinst").join("credentials"))
}

/// Validate an account id: `act-` followed by lowercase letters and digits
pub fn validate_account_id(account: &str) -> bool {
    let Some(rest) = account.strip_prefix("act-") else {
        return false;
    };
    !rest.is_empty() && rest.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
}

/// Read one profile from a YAML credentials file:
///
/// ```yaml
/// default:
///   token: abc
///   account: act-12345678
/// staging:
///   token: def
/// ```
///
/// A missing file or profile yields `Ok(None)`; a file that exists but
/// cannot be parsed is a configuration error.
pub fn read_credentials_file(path: &Path, profile: &str) -> Result<Option<FileProfile>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(Error::Configuration(format!(
                "cannot read credentials file {}: {e}",
                path.display()
            )))
        }
    };

    if content.trim().is_empty() {
        return Ok(None);
    }

    let mut profiles: HashMap<String, FileProfile> = serde_yaml::from_str(&content).map_err(|e| {
        Error::Configuration(format!("malformed credentials file {}: {e}", path.display()))
    })?;

    let found = profiles.remove(profile);
    if found.is_none() {
        tracing::debug!("Profile {:?} not found in {}", profile, path.display());
    }
    Ok(found)
}
