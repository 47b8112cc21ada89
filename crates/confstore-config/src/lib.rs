//! confstore Config - Services built on the persistence traits
//!
//! This crate provides:
//! - Batch import with conflict policies
//! - Content fingerprint repair
//! - History retention sweep

pub mod model;
pub mod service;

// Re-export commonly used types
pub use model::*;
