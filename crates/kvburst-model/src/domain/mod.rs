mod error_policy;
pub use error_policy::ErrorPolicy;

mod failure_record;
pub use failure_record::FailureRecord;

mod outcome;
pub use outcome::Outcome;

mod run_phase;
pub use run_phase::RunPhase;

mod run_report;
pub use run_report::RunReport;

mod run_state;
pub use run_state::RunState;

mod stop_reason;
pub use stop_reason::StopReason;

mod task_error;
pub use task_error::TaskError;

/// Position of a task inside a run (`0..total`).
///
/// Tasks carry no state beyond their index.
pub type TaskIndex = usize;

/// Success value of a task: an HTTP status code.
pub type StatusCode = u16;

/// Result produced by a single task.
pub type TaskResult = Result<StatusCode, TaskError>;
