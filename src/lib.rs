//! spotkit: client core for the Spot cloud-infrastructure API
//!
//! - [`field`] - three-state optional values (absent, null, set)
//! - [`selective`] - request-body encoding that honours those states
//! - [`config`] - layered configuration and per-call overrides
//! - [`api`] - the request pipeline (auth, retry, cancellation, decoding)
//! - [`resource`] - typed operations and the account service

pub mod api;
pub mod config;
pub mod error;
pub mod field;
pub mod resource;
pub mod selective;

/// Version injected at compile time via SPOTKIT_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("SPOTKIT_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

pub use api::{Client, Envelope, Request};
pub use config::{CallOptions, Config, EffectiveConfig, Session};
pub use error::{format_api_error, Error, Result};
pub use field::Field;
pub use selective::{Directives, ObjectWriter, Resource};
