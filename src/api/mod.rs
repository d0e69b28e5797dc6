//! API interaction module
//!
//! This module provides the request pipeline shared by every service binding:
//! credentials, request building, transport, retry and response decoding.
//!
//! # Module Structure
//!
//! - [`auth`] - Credentials from the environment and the shared credentials file
//! - [`client`] - Main client that runs calls through the pipeline
//! - [`envelope`] - Response envelope decoding and structured API errors
//! - [`http`] - Transport seam and the default `reqwest` transport
//! - [`request`] - Path templates, query parameters and bodies
//! - [`retry`] - Backoff policy and retry classification
//!
//! # Example
//!
//! ```ignore
//! use spotkit::api::{Client, Request};
//! use spotkit::config::{CallOptions, Session};
//!
//! async fn example() -> spotkit::Result<()> {
//!     let client = Client::new(&Session::new()?)?;
//!     let envelope = client
//!         .execute(Request::new(reqwest::Method::GET, "/setup/account"), &CallOptions::new())
//!         .await?;
//!     println!("{} accounts", envelope.items().len());
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod envelope;
pub mod http;
pub mod request;
pub mod retry;

pub use client::Client;
pub use envelope::Envelope;
pub use http::{HttpRequest, RawResponse, ReqwestTransport, Transport};
pub use request::{Query, Request};
pub use retry::RetryPolicy;
