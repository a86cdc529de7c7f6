//! book-heaven: backend core of a digital library with a used-book marketplace.
//!
//! Two services sit on top of a SQLite store:
//!
//! - **Marketplace**: listings and buyer/seller offer negotiation
//!   (offer, accept, reject, counter, withdraw).
//! - **Reading**: per-book progress reports with completion detection,
//!   an append-only session history, and derived charts (daily/weekly
//!   pages, heatmap levels, totals).
//!
//! Both are exposed over a JSON HTTP API with bearer-token sessions.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Authentication, roles and user management.
pub mod auth;
/// Configuration and CLI.
pub mod config;
/// Database operations.
pub mod db;
/// Error types.
pub mod error;
/// Listings and offer negotiation.
pub mod marketplace;
/// Reading progress and statistics.
pub mod reading;
/// HTTP server.
pub mod server;


pub use config::{Cli, Command, Config};
pub use db::Database;
pub use error::{AppError, Result};
pub use server::AppState;
