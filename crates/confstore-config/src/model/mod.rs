//! Service-level data models

pub mod import;

pub use import::{BatchItem, BatchResult, ConfigChangeEvent, SameConfigMeta, SameConfigPolicy};
