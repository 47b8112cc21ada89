//! Configuration service layer
//!
//! - Batch import with conflict policies
//! - Fingerprint repair pass
//! - History retention sweep

pub mod history;
pub mod import;
pub mod integrity;

pub use history::{HistoryCleaner, sweep_history, sweep_history_before};
pub use import::{ChangeNotifier, batch_insert_or_update, infer_config_type, load_batch_items};
pub use integrity::{RepairReport, repair_fingerprints, repair_fingerprints_paged};
