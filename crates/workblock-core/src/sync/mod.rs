//! Calendar synchronization layer.
//!
//! A pass fetches active tasks, skips the ones already on the calendar
//! (fixing drifted titles on the way), and hands the rest to the scheduler.

pub mod cleanup;
pub mod reconciler;
pub mod sync_engine;
pub mod types;

pub use cleanup::cleanup_synced_entries;
pub use reconciler::SyncReconciler;
pub use sync_engine::SyncEngine;
pub use types::{CleanupSummary, ReconcileDecision, SkipReason, SkippedTask, SyncSummary};
