//! # shared_scheduler
//!
//! Task scheduling and availability engine with group task-list sync.
//!
//! ## Modules
//!
//! - [`interval`] — half-open time-of-day intervals: merge, subtract, overlap
//! - [`recurrence`] — recurring task → concrete dated occurrences
//! - [`logic`] — per-day occurrences, free gaps, conflicts, summaries
//! - [`availability`] — free minutes → load level
//! - [`sync`] — group coordinator with last-write-wins list replacement
//! - [`planner`] — local task list, settings and month notes with write-through persistence
//! - [`store`] — key-value document store (JSON files or memory)
//! - [`server`] and `routes_*` — axum HTTP / WebSocket surface

pub mod availability;
pub mod config;
pub mod error;
pub mod interval;
pub mod logic;
pub mod models;
pub mod planner;
pub mod recurrence;
pub mod routes_day;
pub mod routes_sync;
pub mod routes_tasks;
pub mod server;
pub mod store;
pub mod sync;

pub use availability::{classify, AvailabilityLevel};
pub use error::{ApiError, ApiJson, ImportError, PlannerError, StoreError, ValidationError};
pub use interval::{merge, overlaps, subtract, TimeInterval};
pub use logic::{detect_conflict, gaps_for_day, occurrences_for_day, DaySummary, FreeTime};
pub use models::{Backup, MonthNotes, Occurrence, Recurrence, RecurringTask, Settings, SingleTask, Task, TaskInfo, TaskRecord};
pub use planner::Planner;
pub use recurrence::expand;
pub use server::{create_app, AppState};
pub use store::{JsonDirStore, KeyValueStore, MemoryStore};
pub use sync::{ClientMessage, GroupHub, ServerMessage};
