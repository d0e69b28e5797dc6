//! Configuration Management
//!
//! Configuration is layered. Each [`Config`] layer holds [`Field`] values; a
//! higher layer's explicit value (including an explicit null) replaces the
//! lower one, an absent value leaves it alone. In increasing priority:
//!
//! 1. [`Config::defaults`] - compiled-in constants
//! 2. session - credentials file, then environment ([`Session`])
//! 3. client-construction overrides (a caller-built [`Config`])
//! 4. per-call overrides ([`CallOptions`])
//!
//! Layers 1-3 are resolved once into an immutable [`EffectiveConfig`];
//! layer 4 refines a copy of it per call.

use crate::api::auth::{self, Credentials};
use crate::api::retry::RetryPolicy;
use crate::error::{Error, Result};
use crate::field::Field;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.spotinst.io";
pub const ENV_BASE_URL: &str = "SPOTINST_BASE_URL";
pub const ENV_USER_AGENT: &str = "SPOTINST_USER_AGENT";

/// Per-attempt HTTP timeout used when nothing else is configured
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Retry settings layer
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_attempts: Field<u32>,
    pub initial_backoff: Field<Duration>,
    pub max_backoff: Field<Duration>,
    pub max_elapsed: Field<Duration>,
    pub jitter: Field<bool>,
}

impl RetryConfig {
    #[must_use]
    pub fn merge(&self, higher: &RetryConfig) -> RetryConfig {
        RetryConfig {
            max_attempts: self.max_attempts.merged(&higher.max_attempts),
            initial_backoff: self.initial_backoff.merged(&higher.initial_backoff),
            max_backoff: self.max_backoff.merged(&higher.max_backoff),
            max_elapsed: self.max_elapsed.merged(&higher.max_elapsed),
            jitter: self.jitter.merged(&higher.jitter),
        }
    }

    fn from_policy(policy: &RetryPolicy) -> Self {
        Self {
            max_attempts: Field::Set(policy.max_attempts),
            initial_backoff: Field::Set(policy.initial_backoff),
            max_backoff: Field::Set(policy.max_backoff),
            max_elapsed: Field::Set(policy.max_elapsed),
            jitter: Field::Set(policy.jitter),
        }
    }

    fn resolve(&self) -> Result<RetryPolicy> {
        let fallback = RetryPolicy::default();
        let policy = RetryPolicy {
            max_attempts: self.max_attempts.value().copied().unwrap_or(fallback.max_attempts),
            initial_backoff: self
                .initial_backoff
                .value()
                .copied()
                .unwrap_or(fallback.initial_backoff),
            max_backoff: self.max_backoff.value().copied().unwrap_or(fallback.max_backoff),
            max_elapsed: self.max_elapsed.value().copied().unwrap_or(fallback.max_elapsed),
            jitter: self.jitter.value().copied().unwrap_or(fallback.jitter),
        };

        if policy.max_attempts == 0 {
            return Err(Error::Configuration("max_attempts must be at least 1".to_string()));
        }
        if policy.max_backoff < policy.initial_backoff {
            return Err(Error::Configuration(
                "max_backoff must not be smaller than initial_backoff".to_string(),
            ));
        }
        Ok(policy)
    }
}

/// One configuration layer
#[derive(Clone, Default, PartialEq)]
pub struct Config {
    pub token: Field<String>,
    pub account_id: Field<String>,
    pub base_url: Field<String>,
    pub user_agent: Field<String>,
    /// Per-attempt HTTP timeout
    pub timeout: Field<Duration>,
    /// Log sanitized request/response bodies at trace level
    pub log_http_bodies: Field<bool>,
    pub retry: RetryConfig,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let token = match &self.token {
            Field::Set(_) => "<redacted>",
            Field::Null => "null",
            Field::Absent => "absent",
        };
        f.debug_struct("Config")
            .field("token", &token)
            .field("account_id", &self.account_id)
            .field("base_url", &self.base_url)
            .field("user_agent", &self.user_agent)
            .field("timeout", &self.timeout)
            .field("log_http_bodies", &self.log_http_bodies)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Config {
    /// Empty layer: every field absent
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiled-in library defaults
    pub fn defaults() -> Self {
        Self {
            token: Field::Absent,
            account_id: Field::Absent,
            base_url: Field::Set(DEFAULT_BASE_URL.to_string()),
            user_agent: Field::Set(format!("spotkit/{}", crate::VERSION)),
            timeout: Field::Set(DEFAULT_TIMEOUT),
            log_http_bodies: Field::Set(false),
            retry: RetryConfig::from_policy(&RetryPolicy::default()),
        }
    }

    /// Environment layer read from the process environment
    pub fn from_env() -> Self {
        Self::from_env_with(&|key| std::env::var(key).ok())
    }

    /// Environment layer read through `lookup`. Empty values count as unset.
    pub fn from_env_with(lookup: &dyn Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            token: get(auth::ENV_TOKEN).map_or(Field::Absent, Field::Set),
            account_id: get(auth::ENV_ACCOUNT).map_or(Field::Absent, Field::Set),
            base_url: get(ENV_BASE_URL).map_or(Field::Absent, Field::Set),
            user_agent: get(ENV_USER_AGENT).map_or(Field::Absent, Field::Set),
            ..Self::default()
        }
    }

    /// Credentials-file layer for `profile`; a missing file or profile gives
    /// an empty layer
    pub fn from_credentials_file(path: &std::path::Path, profile: &str) -> Result<Self> {
        let Some(section) = auth::read_credentials_file(path, profile)? else {
            return Ok(Self::default());
        };
        Ok(Self {
            token: section.token.map_or(Field::Absent, Field::Set),
            account_id: section.account.map_or(Field::Absent, Field::Set),
            ..Self::default()
        })
    }

    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Field::Set(token.into());
        self
    }

    #[must_use]
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Field::Set(account_id.into());
        self
    }

    /// Explicitly drop any account id inherited from lower layers
    #[must_use]
    pub fn without_account(mut self) -> Self {
        self.account_id = Field::Null;
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Field::Set(base_url.into());
        self
    }

    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Field::Set(user_agent.into());
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Field::Set(timeout);
        self
    }

    #[must_use]
    pub fn with_log_http_bodies(mut self, enabled: bool) -> Self {
        self.log_http_bodies = Field::Set(enabled);
        self
    }

    /// Replace every retry setting with `policy`
    #[must_use]
    pub fn with_retry(mut self, policy: &RetryPolicy) -> Self {
        self.retry = RetryConfig::from_policy(policy);
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.retry.max_attempts = Field::Set(max_attempts);
        self
    }

    /// Layer `higher` over `self`
    #[must_use]
    pub fn merge(&self, higher: &Config) -> Config {
        Config {
            token: self.token.merged(&higher.token),
            account_id: self.account_id.merged(&higher.account_id),
            base_url: self.base_url.merged(&higher.base_url),
            user_agent: self.user_agent.merged(&higher.user_agent),
            timeout: self.timeout.merged(&higher.timeout),
            log_http_bodies: self.log_http_bodies.merged(&higher.log_http_bodies),
            retry: self.retry.merge(&higher.retry),
        }
    }
}

/// Session: the environment- and file-derived configuration layer
#[derive(Debug, Clone, Default)]
pub struct Session {
    config: Config,
}

impl Session {
    /// Build from the process environment and the shared credentials file
    pub fn new() -> Result<Self> {
        Self::from_env_with(&|key| std::env::var(key).ok())
    }

    /// Build through `lookup` instead of the process environment.
    ///
    /// Environment values win over the credentials file, field by field.
    pub fn from_env_with(lookup: &dyn Fn(&str) -> Option<String>) -> Result<Self> {
        let profile = lookup(auth::ENV_PROFILE)
            .filter(|p| !p.is_empty())
            .unwrap_or_else(|| auth::DEFAULT_PROFILE.to_string());

        let file = match auth::credentials_file_path(lookup) {
            Some(path) => Config::from_credentials_file(&path, &profile)?,
            None => Config::default(),
        };
        let env = Config::from_env_with(lookup);

        Ok(Self {
            config: file.merge(&env),
        })
    }

    /// Session from an explicit layer, bypassing environment and files
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Resolve defaults, this session, and client overrides
    pub fn resolve(&self, overrides: &Config) -> Result<EffectiveConfig> {
        resolve(&[&self.config, overrides])
    }
}

/// Fully merged configuration. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct EffectiveConfig {
    pub credentials: Credentials,
    pub base_url: Url,
    pub user_agent: String,
    pub timeout: Duration,
    pub log_http_bodies: bool,
    pub retry: RetryPolicy,
}

impl EffectiveConfig {
    pub fn account_id(&self) -> Option<&str> {
        self.credentials.account.as_deref()
    }

    /// Apply per-call overrides to a copy
    pub fn refine(&self, options: &CallOptions) -> Result<EffectiveConfig> {
        let mut refined = self.clone();

        match &options.account_id {
            Field::Absent => {}
            Field::Null => refined.credentials.account = None,
            Field::Set(account) => {
                check_account_id(account)?;
                refined.credentials.account = Some(account.clone());
            }
        }

        if let Some(&max_attempts) = options.max_attempts.value() {
            if max_attempts == 0 {
                return Err(Error::Configuration("max_attempts must be at least 1".to_string()));
            }
            refined.retry.max_attempts = max_attempts;
        }

        Ok(refined)
    }
}

/// Merge `layers` (lowest priority first) over the library defaults.
///
/// Pure: the same inputs always produce an equal result.
pub fn resolve(layers: &[&Config]) -> Result<EffectiveConfig> {
    let merged = layers
        .iter()
        .fold(Config::defaults(), |acc, layer| acc.merge(layer));

    let token = match merged.token.value() {
        Some(token) if !token.trim().is_empty() => token.clone(),
        _ => {
            return Err(Error::Configuration(format!(
                "no API token configured (set {} or a credentials file)",
                auth::ENV_TOKEN
            )))
        }
    };

    let base_url = merged
        .base_url
        .value()
        .map_or(DEFAULT_BASE_URL, String::as_str);
    let base_url = Url::parse(base_url)
        .map_err(|e| Error::Configuration(format!("invalid base URL {base_url:?}: {e}")))?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(Error::Configuration(format!(
            "base URL scheme {:?} not supported",
            base_url.scheme()
        )));
    }

    let account = merged.account_id.into_option().filter(|a| !a.is_empty());
    if let Some(account) = &account {
        check_account_id(account)?;
    }

    Ok(EffectiveConfig {
        credentials: Credentials::new(token, account),
        base_url,
        user_agent: merged
            .user_agent
            .into_option()
            .unwrap_or_else(|| format!("spotkit/{}", crate::VERSION)),
        timeout: merged.timeout.into_option().unwrap_or(DEFAULT_TIMEOUT),
        log_http_bodies: merged.log_http_bodies.into_option().unwrap_or(false),
        retry: merged.retry.resolve()?,
    })
}

fn check_account_id(account: &str) -> Result<()> {
    if auth::validate_account_id(account) {
        return Ok(());
    }
    Err(Error::Configuration(format!(
        "invalid account id {account:?} (expected act-<id>)"
    )))
}

/// Get the directory for spotkit's own files (logs)
pub fn data_dir() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("spotkit");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".spotkit");
    }
    PathBuf::from(".")
}

/// Per-call overrides and the call's cancellation signal
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub account_id: Field<String>,
    pub max_attempts: Field<u32>,
    /// Deadline for the whole call, retries and backoff included
    pub timeout: Option<Duration>,
    pub cancel: CancellationToken,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_account(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Field::Set(account_id.into());
        self
    }

    /// Send this call without an account id
    #[must_use]
    pub fn without_account(mut self) -> Self {
        self.account_id = Field::Null;
        self
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Field::Set(max_attempts);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}
