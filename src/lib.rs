//! Stride Planner - checkpoint schedules for a daily step goal
//!
//! Given a step target, a deadline, a walking pace and the steps taken so far,
//! Stride computes the checkpoints (time → cumulative steps) needed to reach
//! the goal, plus the required pace and rest-to-walk metrics.
//!
//! ## Modules
//!
//! - **Planner**: the pure calculation (`compute_plan`, `interval_label`)
//! - **History**: the day-scoped sample log (`record_sample`)
//! - **Session**: inputs, log and store owned by one presentation layer

pub mod clock;
pub mod error;
pub mod history;
pub mod interval;
mod merge;
pub mod metrics;
pub mod planner;
pub mod report;
pub mod session;
pub mod store;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use error::PlanError;
pub use history::{record_sample, HistoricalLog};
pub use interval::{interval_label, STANDARD_INTERVALS};
pub use planner::compute_plan;
pub use report::{PlanEncoder, PlanReport};
pub use session::PlannerSession;
pub use store::{JsonFileStore, MemoryStore, SampleStore, STORAGE_KEY};
pub use types::{
    Checkpoint, CheckpointKind, CheckpointStatus, Metrics, Plan, PlanInput, PlanStatus, Sample,
};

/// Library version embedded in plan reports
pub const STRIDE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for plan reports
pub const PRODUCER_NAME: &str = "stride-planner";
