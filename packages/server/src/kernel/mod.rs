//! Service wiring and background machinery.

pub mod deps;
pub mod oci;
pub mod run_lock;
pub mod scheduled_tasks;

pub use deps::ServerDeps;
pub use run_lock::{RunLockGuard, RunLockRegistry};
pub use scheduled_tasks::SchedulerState;
