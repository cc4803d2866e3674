//! Job errors.

use crate::key::{JobId, JobKey};
use tankobon_fetch::StatusCode;
use thiserror::Error;

/// Errors reported by [`JobBoss`](crate::JobBoss) and job executions.
#[derive(Error, Debug)]
pub enum JobError {
    /// An equivalent job is already standing by or running.
    #[error("Job {key} is already active as {id}")]
    AlreadyActive {
        /// Id of the active job.
        id: JobId,
        /// The shared dedup key.
        key: JobKey,
    },

    /// The registry was shut down and accepts no new jobs.
    #[error("Job registry is shut down")]
    ShutDown,

    /// No connector is registered under the manga's connector name.
    #[error("Unknown connector: {0}")]
    UnknownConnector(String),

    /// A chapter download finished with a non-success status.
    #[error("Download of {chapter} failed with status {status}")]
    Download {
        /// The chapter that failed.
        chapter: String,
        /// Status reported by the connector.
        status: StatusCode,
    },

    /// The execution observed a cancellation request.
    #[error("Job was cancelled")]
    Cancelled,
}

impl From<tankobon_types::Cancelled> for JobError {
    fn from(_: tankobon_types::Cancelled) -> Self {
        Self::Cancelled
    }
}

/// Result type for job operations.
pub type Result<T> = std::result::Result<T, JobError>;
