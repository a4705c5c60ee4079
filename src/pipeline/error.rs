//! Pipeline-specific error types.

use thiserror::Error;

/// Errors that can occur while building or running a pipeline.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// A stage label with no registered constructor.
    #[error("unknown stage label '{0}': not registered in the stage catalog")]
    UnknownStage(String),

    #[error("stage '{stage}' requires a '{requirement}' stage earlier in the pipeline")]
    DependencyUnsatisfied {
        stage: &'static str,
        requirement: &'static str,
    },

    #[error("stage '{stage}' conflicts with the earlier '{conflict}' stage")]
    ConflictDetected {
        stage: &'static str,
        conflict: &'static str,
    },

    #[error("nesting of parallel regions is not allowed")]
    ParallelNesting,

    #[error("unbalanced parallel markers: {forks} ParallelFork vs {joins} ParallelJoin")]
    ParallelCountMismatch { forks: usize, joins: usize },

    #[error("invalid pipeline specification: {0}")]
    Spec(String),

    #[error("parameter '{key}' expects {expected}")]
    Parameter {
        key: String,
        expected: &'static str,
    },

    #[error("stage '{stage}' does not support {operation}")]
    UnsupportedOperation {
        stage: &'static str,
        operation: &'static str,
    },

    #[error("channel {0} disconnected before the stream finished")]
    ChannelDisconnected(&'static str),

    /// A blocking channel operation observed the emergency-shutdown flag.
    #[error("pipeline aborted by emergency shutdown")]
    Aborted,

    #[error("worker '{worker_id}' failed; emergency shutdown performed (details in {log_file})")]
    WorkerFailed { worker_id: String, log_file: String },

    #[error("terminal segment failed: {0}")]
    MasterFailed(Box<PipelineError>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
