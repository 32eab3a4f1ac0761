//! Finsheet Common Library
//!
//! Shared code for the Finsheet services including:
//! - Database entities, repository and unit of work
//! - Error types and the uniform API envelope
//! - Configuration management
//! - Metrics descriptions

pub mod config;
pub mod db;
pub mod errors;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Repository, UnitOfWork};
pub use errors::{ApiResponse, AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Sheet read by the rich statement schema when none is configured
pub const DEFAULT_SHEET_NAME: &str = "Snapshot";

/// Leading rows skipped by the flat statement schema when none is configured
pub const DEFAULT_SKIP_ROWS: usize = 5;
