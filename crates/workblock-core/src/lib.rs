//! # workblock Core Library
//!
//! Places tasks with deadlines into "Work Block" windows on a calendar.
//! All operations are exposed through a standalone CLI binary; this crate
//! holds the engine and the adapters it runs against.
//!
//! ## Architecture
//!
//! - **Scheduler**: discretizes work windows into candidate slots, filters
//!   them against existing commitments, scores them and greedily commits
//!   tasks earliest-deadline-first
//! - **Sync**: one-shot pass tying a task source to a calendar store, with
//!   reconciliation of tasks that are already placed
//! - **Calendar**: the [`CalendarStore`] seam plus in-memory and dry-run stores
//! - **Integrations**: Todoist task source and Google Calendar store
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`SyncEngine`]: runs a sync pass
//! - [`GreedyEdfScheduler`]: the slot-allocation loop
//! - [`Config`]: Application configuration management

pub mod calendar;
pub mod error;
pub mod integrations;
pub mod scheduler;
pub mod storage;
pub mod sync;
pub mod task;

pub use calendar::{CalendarEntry, CalendarStore, DryRunCalendar, InMemoryCalendar, NewEntry, Participation};
pub use error::{ConfigError, CoreError, SyncError};
pub use integrations::{GoogleAuth, GoogleCalendarStore, Integration, TodoistAuth, TodoistSource};
pub use scheduler::{
    ConflictMode, GreedyEdfScheduler, Placement, PlacementPolicy, SchedulerConfig, ScoringWeights,
    TaskReport, TaskResult, UnschedulableReason,
};
pub use storage::Config;
pub use sync::{cleanup_synced_entries, CleanupSummary, SkipReason, SyncEngine, SyncSummary};
pub use task::{DurationResolver, DurationTier, Task, TaskSource};
