//! drive_md - Browse Google Drive files through the conversion backend
//! and turn text files into Markdown.
//!
//! This library provides:
//! - Session providers that supply bearer tokens for the backend
//! - A client for the backend's Drive listing, conversion and processing routes
//! - Grouping of listed files by extension
//! - A listing view model with selection, toasts and unmount-safe updates
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use drive_md::{BackendClient, DriveView, StaticTokenSession};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let session = Arc::new(StaticTokenSession::new("access-token"));
//!     let view = DriveView::new(BackendClient::new("http://localhost:3000", session));
//!
//!     view.mount().await;
//!     for group in view.render() {
//!         println!(".{}", group.extension);
//!         for row in group.rows {
//!             println!("  {}", row.file);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod grouping;
pub mod links;
pub mod logging;
pub mod logout;
pub mod models;
pub mod view;

// Re-exports for convenience
pub use auth::{OidcSession, SessionProvider, StaticTokenSession};
pub use client::BackendClient;
pub use config::Config;
pub use error::{DriveError, Result};
pub use grouping::{group_by_extension, Grouping};
pub use links::file_id_from_link;
pub use logout::LogoutControl;
pub use models::DriveFile;
pub use view::{ActionOutcome, DriveView, ViewState};
