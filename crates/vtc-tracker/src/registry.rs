//! Job registry: submission entry point and job lookup.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use vtc_models::{ConvertOptions, JobId, JobSnapshot};
use vtc_transport::{HttpTransport, TranscoderApi, TransportResult, VideoUpload};

use crate::config::TrackerConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::handle::JobHandle;
use crate::scheduler::spawn_poll_loop;

/// Tracks conversion jobs from submission to a terminal phase.
///
/// Every recorded job id maps to exactly one handle with at most one
/// live poll loop. Distinct jobs share no mutable state; each polls
/// independently.
pub struct JobTracker<T: TranscoderApi + ?Sized> {
    transport: Arc<T>,
    config: TrackerConfig,
    jobs: RwLock<HashMap<JobId, Arc<JobHandle>>>,
}

impl JobTracker<HttpTransport> {
    /// Create a tracker over the HTTP transport, both configured from
    /// environment variables.
    pub fn from_env() -> TransportResult<Self> {
        Ok(Self::new(
            Arc::new(HttpTransport::from_env()?),
            TrackerConfig::from_env(),
        ))
    }
}

impl<T> JobTracker<T>
where
    T: TranscoderApi + ?Sized + 'static,
{
    /// Create a tracker over the given transport.
    pub fn new(transport: Arc<T>, config: TrackerConfig) -> Self {
        Self {
            transport,
            config,
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Submit a video for conversion and start tracking it.
    ///
    /// The job is recorded before the upload is issued, so it passes
    /// through `Submitting` observably. On success the poll scheduler is
    /// attached and the job id is returned. On failure the job is still
    /// recorded, in `Failed`, and the returned error carries its id so
    /// the reason stays inspectable.
    pub async fn start_job(
        &self,
        upload: VideoUpload,
        options: ConvertOptions,
    ) -> TrackerResult<JobId> {
        let job_id = JobId::new();
        let handle = Arc::new(JobHandle::new(job_id.clone()));
        self.jobs
            .write()
            .await
            .insert(job_id.clone(), handle.clone());

        info!(
            job_id = %job_id,
            format = %options.output_format,
            quality = %options.video_quality,
            "Submitting conversion job"
        );

        match self.transport.submit(&upload, &options).await {
            Ok(video_id) => {
                let token = CancellationToken::new();
                handle.begin_processing(video_id.clone(), token.clone()).await;
                spawn_poll_loop(
                    self.transport.clone(),
                    handle,
                    video_id,
                    token,
                    self.config.clone(),
                );
                Ok(job_id)
            }
            Err(e) => {
                warn!(job_id = %job_id, "Submission failed: {}", e);
                handle
                    .fail_submission(format!("submission failed: {}", e))
                    .await;
                Err(TrackerError::Submit { job_id, source: e })
            }
        }
    }

    /// Read-only copy of a job's current state.
    pub async fn get_job(&self, job_id: &JobId) -> TrackerResult<JobSnapshot> {
        let handle = self.lookup(job_id).await?;
        Ok(handle.snapshot().await)
    }

    /// Subscribe to a job's snapshot updates.
    ///
    /// The receiver is seeded with the current snapshot; presentation
    /// layers can consume it at their own cadence, independent of the
    /// poll interval.
    pub async fn subscribe(&self, job_id: &JobId) -> TrackerResult<watch::Receiver<JobSnapshot>> {
        let handle = self.lookup(job_id).await?;
        Ok(handle.subscribe())
    }

    /// Stop polling a job. Idempotent; no-op on terminal or already
    /// cancelled jobs. The observed phase is not reverted.
    pub async fn cancel_job(&self, job_id: &JobId) -> TrackerResult<()> {
        let handle = self.lookup(job_id).await?;
        handle.cancel().await;
        Ok(())
    }

    /// Snapshots of every tracked job, including settled ones.
    pub async fn jobs(&self) -> Vec<JobSnapshot> {
        let handles: Vec<Arc<JobHandle>> = self.jobs.read().await.values().cloned().collect();

        let mut snapshots = Vec::with_capacity(handles.len());
        for handle in handles {
            snapshots.push(handle.snapshot().await);
        }
        snapshots
    }

    /// Stop tracking a job and return its final snapshot.
    ///
    /// Settled jobs are never dropped implicitly; this is the only way a
    /// job leaves the registry.
    pub async fn remove_job(&self, job_id: &JobId) -> TrackerResult<JobSnapshot> {
        let handle = self
            .jobs
            .write()
            .await
            .remove(job_id)
            .ok_or_else(|| TrackerError::NotFound(job_id.clone()))?;

        handle.cancel().await;
        Ok(handle.snapshot().await)
    }

    async fn lookup(&self, job_id: &JobId) -> TrackerResult<Arc<JobHandle>> {
        self.jobs
            .read()
            .await
            .get(job_id)
            .cloned()
            .ok_or_else(|| TrackerError::NotFound(job_id.clone()))
    }
}
