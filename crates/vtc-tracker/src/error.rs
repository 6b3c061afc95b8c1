//! Tracker error types.

use thiserror::Error;
use vtc_models::JobId;
use vtc_transport::TransportError;

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// The id was never recorded, or the job was removed.
    #[error("unknown job: {0}")]
    NotFound(JobId),

    /// Submission failed. The job is still recorded, in `Failed`, under
    /// `job_id`, so the reason remains inspectable.
    #[error("submission failed for job {job_id}: {source}")]
    Submit {
        job_id: JobId,
        source: TransportError,
    },
}
