//! Resource abstraction layer
//!
//! Service bindings are declared as [`Operation`] constants; the pipeline
//! does the rest.
//!
//! # Architecture
//!
//! - [`operation`] - Operation definitions and the `call_*` client methods
//! - [`fetcher`] - Pagination unwinding for list operations
//! - [`account`] - Account service bindings
//!
//! # Example
//!
//! ```ignore
//! use spotkit::resource::account::AccountService;
//!
//! async fn list(client: spotkit::Client) -> spotkit::Result<()> {
//!     let accounts = AccountService::new(client)
//!         .list_accounts(&spotkit::CallOptions::new())
//!         .await?;
//!     println!("{} accounts", accounts.len());
//!     Ok(())
//! }
//! ```

pub mod account;
pub mod fetcher;
pub mod operation;

pub use fetcher::{fetch_all, fetch_page, Page, PAGE_TOKEN_PARAM};
pub use operation::Operation;
