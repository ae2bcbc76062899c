//! Error type for the task engine.

use thiserror::Error;

/// Errors raised while scheduling or running a request task.
#[derive(Debug, Error)]
pub enum TaskError {
    /// A batch sub-request index was out of range for its accumulator.
    #[error("batch sub-request index {index} out of range (expected < {len})")]
    BatchIndexOutOfRange {
        /// The offending index.
        index: usize,
        /// Number of sub-requests in the batch.
        len: usize,
    },

    /// The engine was asked to run a task after shutdown had started.
    #[error("task engine is shutting down")]
    ShuttingDown,

    /// The resolver returned an error while running a task.
    #[error("resolver operation failed")]
    Resolver(#[from] settingsd_resolver::ResolverError),

    /// The underlying document store returned an error.
    #[error("document store operation failed")]
    Db(#[from] settingsd_db::DbError),
}

/// Convenience alias for fallible task-engine operations.
pub type TaskResult<T> = Result<T, TaskError>;
