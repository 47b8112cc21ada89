//! confstore server - maintenance daemon and command line front end
//!
//! Loads configuration, initializes logging, connects the store, and runs
//! one of the `serve`, `repair`, `import`, or `export` commands.

pub mod command; // Command implementations
pub mod model; // CLI and configuration
pub mod startup; // Logging, database, and shutdown helpers
