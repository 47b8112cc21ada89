//! confstore Common - Shared types and utilities
//!
//! This crate provides the foundational types used across all confstore components:
//! - Error taxonomy
//! - Utility functions (fingerprints, wildcard translation, tag parsing)
//! - Common constants

pub mod error;
pub mod utils;

// Re-exports for convenience
pub use error::{ConfStoreError, Result};
pub use utils::{
    blank_to_empty, generate_like_argument, is_blank, is_valid, md5_hex, split_tags,
};

/// Default group name
pub const DEFAULT_GROUP: &str = "DEFAULT_GROUP";

/// Upper bound on values bound into a single `IN (...)` clause
pub const QUERY_LIMIT_SIZE: usize = 50;

/// Page size used by full-table maintenance scans
pub const MAINTENANCE_PAGE_SIZE: u64 = 1000;

/// Fallback config type when none is declared or inferable
pub const DEFAULT_CONFIG_TYPE: &str = "text";
