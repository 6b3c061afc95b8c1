//! Job handle and state machine.
//!
//! A [`JobHandle`] owns one job's lifecycle: phase, progress, result and
//! failure references, and the cancellation token for its poll loop. All
//! mutation goes through the transition methods below; each publishes a
//! fresh snapshot on the handle's watch channel.

use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use vtc_models::{JobId, JobPhase, JobSnapshot, VideoId};
use vtc_transport::{RemoteStatus, StatusReport};

/// Reason recorded when the service reports a failed conversion; the
/// status contract carries no further detail.
pub(crate) const REMOTE_FAILURE_REASON: &str = "conversion failed";

/// Mutable state of one tracked job.
#[derive(Debug)]
struct JobState {
    video_id: Option<VideoId>,
    phase: JobPhase,
    progress: u8,
    result_url: Option<String>,
    failure_reason: Option<String>,
    submitted_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Ownership token for the active poll loop; present iff the job is
    /// in `Processing` with a live scheduler.
    poll_token: Option<CancellationToken>,
}

/// Handle owning one job's lifecycle.
pub(crate) struct JobHandle {
    job_id: JobId,
    state: RwLock<JobState>,
    snapshot_tx: watch::Sender<JobSnapshot>,
}

impl JobHandle {
    /// Create a handle for a job whose submission was just requested.
    pub(crate) fn new(job_id: JobId) -> Self {
        let now = Utc::now();
        let state = JobState {
            video_id: None,
            phase: JobPhase::Submitting,
            progress: 0,
            result_url: None,
            failure_reason: None,
            submitted_at: now,
            updated_at: now,
            poll_token: None,
        };
        let (snapshot_tx, _) = watch::channel(Self::snapshot_of(&job_id, &state));

        Self {
            job_id,
            state: RwLock::new(state),
            snapshot_tx,
        }
    }

    pub(crate) fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Subscribe to snapshot updates.
    pub(crate) fn subscribe(&self) -> watch::Receiver<JobSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Read-only copy of the current state.
    pub(crate) async fn snapshot(&self) -> JobSnapshot {
        let state = self.state.read().await;
        Self::snapshot_of(&self.job_id, &state)
    }

    /// `Submitting → Processing`: the service accepted the upload and
    /// assigned an id; the poll scheduler takes ownership of `poll_token`.
    pub(crate) async fn begin_processing(&self, video_id: VideoId, poll_token: CancellationToken) {
        let mut state = self.state.write().await;
        if state.phase != JobPhase::Submitting {
            return;
        }

        info!(job_id = %self.job_id, video_id = %video_id, "Conversion started");

        state.video_id = Some(video_id);
        state.phase = JobPhase::Processing;
        state.poll_token = Some(poll_token);
        state.updated_at = Utc::now();
        self.publish(&state);
    }

    /// Apply one status report from the poll loop.
    ///
    /// Returns `false` when polling should stop. The token check under
    /// the state lock is what guarantees a response settling after
    /// cancellation never mutates the job.
    pub(crate) async fn apply_status(&self, report: &StatusReport) -> bool {
        let mut state = self.state.write().await;
        match &state.poll_token {
            Some(token) if !token.is_cancelled() => {}
            _ => return false,
        }

        match report.status {
            RemoteStatus::Processing => {
                // An out-of-order response can carry a lower value than
                // the one already recorded; keep the recorded one.
                let incoming = report.progress.unwrap_or(state.progress).min(100);
                state.progress = state.progress.max(incoming);
                state.updated_at = Utc::now();
                debug!(job_id = %self.job_id, progress = state.progress, "Conversion progress");
                self.publish(&state);
                true
            }
            RemoteStatus::Completed => {
                state.phase = JobPhase::Completed;
                state.progress = 100;
                state.result_url = report.transcoded_video_url.clone();
                state.updated_at = Utc::now();
                Self::release_poll(&mut state);
                info!(job_id = %self.job_id, "Conversion completed");
                self.publish(&state);
                false
            }
            RemoteStatus::Failed => {
                Self::fail_locked(&mut state, REMOTE_FAILURE_REASON.to_string());
                error!(job_id = %self.job_id, "Conversion failed");
                self.publish(&state);
                false
            }
        }
    }

    /// Force a failure from the poll loop (status-check ceiling reached).
    /// Discarded if the job already settled or was cancelled.
    pub(crate) async fn fail_polling(&self, reason: String) {
        let mut state = self.state.write().await;
        match &state.poll_token {
            Some(token) if !token.is_cancelled() => {}
            _ => return,
        }

        error!(job_id = %self.job_id, "Job failed: {}", reason);
        Self::fail_locked(&mut state, reason);
        self.publish(&state);
    }

    /// Record a submission-time failure (no poll loop attached yet).
    pub(crate) async fn fail_submission(&self, reason: String) {
        let mut state = self.state.write().await;
        if state.phase.is_terminal() {
            return;
        }

        error!(job_id = %self.job_id, "Job failed: {}", reason);
        Self::fail_locked(&mut state, reason);
        self.publish(&state);
    }

    /// Stop polling without touching the observed phase. Idempotent;
    /// no-op on terminal jobs.
    pub(crate) async fn cancel(&self) {
        let mut state = self.state.write().await;
        if state.phase.is_terminal() || state.poll_token.is_none() {
            return;
        }

        info!(job_id = %self.job_id, "Polling cancelled");
        Self::release_poll(&mut state);
        state.updated_at = Utc::now();
        self.publish(&state);
    }

    /// The single release path for the poll timer's ownership token.
    /// Every terminal transition and every cancellation funnels through
    /// here.
    fn release_poll(state: &mut JobState) {
        if let Some(token) = state.poll_token.take() {
            token.cancel();
        }
    }

    fn fail_locked(state: &mut JobState, reason: String) {
        state.phase = JobPhase::Failed;
        state.failure_reason = Some(reason);
        state.updated_at = Utc::now();
        Self::release_poll(state);
    }

    fn snapshot_of(job_id: &JobId, state: &JobState) -> JobSnapshot {
        JobSnapshot {
            job_id: job_id.clone(),
            video_id: state.video_id.clone(),
            phase: state.phase,
            progress: state.progress,
            result_url: state.result_url.clone(),
            failure_reason: state.failure_reason.clone(),
            submitted_at: state.submitted_at,
            updated_at: state.updated_at,
        }
    }

    fn publish(&self, state: &JobState) {
        self.snapshot_tx
            .send_replace(Self::snapshot_of(&self.job_id, state));
    }
}
