//! End-to-end tracker tests against a scripted transport.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use vtc_models::{ConvertOptions, JobId, JobPhase, VideoId};
use vtc_tracker::{JobTracker, TrackerConfig, TrackerError};
use vtc_transport::{
    RemoteStatus, StatusReport, TranscoderApi, TransportError, TransportResult, VideoUpload,
};

/// One scripted status reply from the fake service.
enum ScriptedStatus {
    Report(StatusReport),
    Unavailable,
}

fn processing(progress: u8) -> ScriptedStatus {
    ScriptedStatus::Report(StatusReport {
        progress: Some(progress),
        status: RemoteStatus::Processing,
        transcoded_video_url: None,
    })
}

fn completed(url: &str) -> ScriptedStatus {
    ScriptedStatus::Report(StatusReport {
        progress: Some(100),
        status: RemoteStatus::Completed,
        transcoded_video_url: Some(url.to_string()),
    })
}

fn failed() -> ScriptedStatus {
    ScriptedStatus::Report(StatusReport {
        progress: None,
        status: RemoteStatus::Failed,
        transcoded_video_url: None,
    })
}

/// Scripted transport double. Status replies are consumed front to
/// back; an exhausted script keeps reporting processing at 50.
struct FakeTransport {
    reject_submit: bool,
    submit_delay: Duration,
    statuses: Mutex<VecDeque<ScriptedStatus>>,
    status_delay: Duration,
    status_calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTransport {
    fn new(statuses: Vec<ScriptedStatus>) -> Arc<Self> {
        Arc::new(Self::build(statuses))
    }

    fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            reject_submit: true,
            ..Self::build(Vec::new())
        })
    }

    fn with_status_delay(statuses: Vec<ScriptedStatus>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            status_delay: delay,
            ..Self::build(statuses)
        })
    }

    fn with_submit_delay(statuses: Vec<ScriptedStatus>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            submit_delay: delay,
            ..Self::build(statuses)
        })
    }

    fn build(statuses: Vec<ScriptedStatus>) -> Self {
        Self {
            reject_submit: false,
            submit_delay: Duration::ZERO,
            statuses: Mutex::new(statuses.into()),
            status_delay: Duration::ZERO,
            status_calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn status_calls(&self) -> usize {
        self.status_calls.load(Ordering::SeqCst)
    }

    fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscoderApi for FakeTransport {
    async fn submit(
        &self,
        upload: &VideoUpload,
        _options: &ConvertOptions,
    ) -> TransportResult<VideoId> {
        if !self.submit_delay.is_zero() {
            tokio::time::sleep(self.submit_delay).await;
        }
        if upload.bytes.is_empty() {
            return Err(TransportError::Validation("empty video payload".into()));
        }
        if self.reject_submit {
            return Err(TransportError::Rejected {
                status: 422,
                message: "bad payload".into(),
            });
        }
        Ok(VideoId::from_string("vid-1"))
    }

    async fn status(&self, _id: &VideoId) -> TransportResult<StatusReport> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.status_delay.is_zero() {
            tokio::time::sleep(self.status_delay).await;
        }

        let next = self.statuses.lock().unwrap().pop_front();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        match next {
            Some(ScriptedStatus::Report(report)) => Ok(report),
            Some(ScriptedStatus::Unavailable) => {
                Err(TransportError::Unavailable { status: 503 })
            }
            None => Ok(StatusReport {
                progress: Some(50),
                status: RemoteStatus::Processing,
                transcoded_video_url: None,
            }),
        }
    }
}

fn upload() -> VideoUpload {
    VideoUpload::new("clip.mp4", b"payload".to_vec())
}

fn options() -> ConvertOptions {
    ConvertOptions::parse("mp4", "720p").unwrap()
}

fn config(poll_ms: u64, ceiling: Option<u32>) -> TrackerConfig {
    TrackerConfig {
        poll_interval: Duration::from_millis(poll_ms),
        max_consecutive_poll_failures: ceiling,
    }
}

async fn wait_until(what: &str, condition: impl Fn() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("timed out waiting for {}", what));
}

#[tokio::test]
async fn tracks_job_to_completion() {
    let fake = FakeTransport::new(vec![
        processing(40),
        processing(70),
        completed("http://x/y.mp4"),
    ]);
    let tracker = JobTracker::new(fake.clone(), config(20, None));

    let job_id = tracker.start_job(upload(), options()).await.unwrap();

    let mut rx = tracker.subscribe(&job_id).await.unwrap();
    let snapshot = rx.wait_for(|s| s.is_terminal()).await.unwrap().clone();

    assert_eq!(snapshot.phase, JobPhase::Completed);
    assert_eq!(snapshot.progress, 100);
    assert_eq!(snapshot.result_url.as_deref(), Some("http://x/y.mp4"));
    assert_eq!(snapshot.video_id, Some(VideoId::from_string("vid-1")));
    assert!(snapshot.failure_reason.is_none());

    // Polling stops once the job settles.
    let calls = fake.status_calls();
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(fake.status_calls(), calls);
}

#[tokio::test]
async fn job_passes_through_submitting() {
    let fake = FakeTransport::with_submit_delay(
        vec![completed("http://x/y.mp4")],
        Duration::from_millis(250),
    );
    let tracker = Arc::new(JobTracker::new(fake, config(200, None)));

    let submitting = tracker.clone();
    let pending = tokio::spawn(async move { submitting.start_job(upload(), options()).await });

    tokio::time::sleep(Duration::from_millis(50)).await;
    let jobs = tracker.jobs().await;
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].phase, JobPhase::Submitting);
    assert!(jobs[0].video_id.is_none());

    let job_id = pending.await.unwrap().unwrap();
    let snapshot = tracker.get_job(&job_id).await.unwrap();
    assert_eq!(snapshot.phase, JobPhase::Processing);
    assert_eq!(snapshot.video_id, Some(VideoId::from_string("vid-1")));
}

#[tokio::test]
async fn progress_never_regresses() {
    let fake = FakeTransport::with_status_delay(
        vec![processing(40), processing(30), completed("http://x/y.mp4")],
        Duration::from_millis(50),
    );
    let tracker = JobTracker::new(fake.clone(), config(20, None));

    let job_id = tracker.start_job(upload(), options()).await.unwrap();

    // By the time the third request is issued, the stale 30 has been
    // applied; the snapshot must still show 40.
    wait_until("third status call", || fake.status_calls() >= 3).await;
    let snapshot = tracker.get_job(&job_id).await.unwrap();
    assert_eq!(snapshot.phase, JobPhase::Processing);
    assert_eq!(snapshot.progress, 40);

    let mut rx = tracker.subscribe(&job_id).await.unwrap();
    let done = rx.wait_for(|s| s.is_terminal()).await.unwrap().clone();
    assert_eq!(done.phase, JobPhase::Completed);
    assert_eq!(done.progress, 100);
}

#[tokio::test]
async fn submission_failure_is_recorded() {
    let fake = FakeTransport::rejecting();
    let tracker = JobTracker::new(fake.clone(), config(20, None));

    let err = tracker.start_job(upload(), options()).await.unwrap_err();
    let (job_id, source) = match err {
        TrackerError::Submit { job_id, source } => (job_id, source),
        other => panic!("expected Submit error, got {:?}", other),
    };
    assert!(matches!(source, TransportError::Rejected { status: 422, .. }));

    let snapshot = tracker.get_job(&job_id).await.unwrap();
    assert_eq!(snapshot.phase, JobPhase::Failed);
    assert!(snapshot
        .failure_reason
        .unwrap()
        .contains("submission failed"));

    // Nothing to poll for a job that never got an id.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(fake.status_calls(), 0);
}

#[tokio::test]
async fn invalid_payload_fails_before_any_status_call() {
    let fake = FakeTransport::new(Vec::new());
    let tracker = JobTracker::new(fake.clone(), config(20, None));

    let err = tracker
        .start_job(VideoUpload::new("clip.mp4", Vec::new()), options())
        .await
        .unwrap_err();

    let job_id = match err {
        TrackerError::Submit { job_id, source } => {
            assert!(matches!(source, TransportError::Validation(_)));
            job_id
        }
        other => panic!("expected Submit error, got {:?}", other),
    };

    let snapshot = tracker.get_job(&job_id).await.unwrap();
    assert_eq!(snapshot.phase, JobPhase::Failed);
    assert_eq!(fake.status_calls(), 0);
}

#[tokio::test]
async fn poll_failure_ceiling_fails_the_job() {
    let fake = FakeTransport::new(vec![
        ScriptedStatus::Unavailable,
        ScriptedStatus::Unavailable,
        ScriptedStatus::Unavailable,
    ]);
    let tracker = JobTracker::new(fake.clone(), config(20, Some(3)));

    let job_id = tracker.start_job(upload(), options()).await.unwrap();

    let mut rx = tracker.subscribe(&job_id).await.unwrap();
    let snapshot = rx.wait_for(|s| s.is_terminal()).await.unwrap().clone();

    assert_eq!(snapshot.phase, JobPhase::Failed);
    assert!(snapshot
        .failure_reason
        .unwrap()
        .contains("status check unavailable"));

    // The loop stops at the ceiling.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert_eq!(fake.status_calls(), 3);
}

#[tokio::test]
async fn poll_success_resets_the_failure_count() {
    let fake = FakeTransport::new(vec![
        ScriptedStatus::Unavailable,
        ScriptedStatus::Unavailable,
        processing(10),
        ScriptedStatus::Unavailable,
        ScriptedStatus::Unavailable,
        completed("http://x/y.mp4"),
    ]);
    let tracker = JobTracker::new(fake.clone(), config(20, Some(3)));

    let job_id = tracker.start_job(upload(), options()).await.unwrap();

    let mut rx = tracker.subscribe(&job_id).await.unwrap();
    let snapshot = rx.wait_for(|s| s.is_terminal()).await.unwrap().clone();

    // Two failures, a success, two more failures: the ceiling of three
    // consecutive failures is never reached.
    assert_eq!(snapshot.phase, JobPhase::Completed);
    assert_eq!(fake.status_calls(), 6);
}

#[tokio::test]
async fn cancel_discards_the_in_flight_response() {
    let fake = FakeTransport::with_status_delay(
        vec![processing(40)],
        Duration::from_millis(100),
    );
    let tracker = JobTracker::new(fake.clone(), config(10, None));

    let job_id = tracker.start_job(upload(), options()).await.unwrap();

    wait_until("first poll in flight", || fake.in_flight() == 1).await;
    tracker.cancel_job(&job_id).await.unwrap();

    // Let the in-flight response settle; it must not be applied, and no
    // further polls may be issued.
    tokio::time::sleep(Duration::from_millis(200)).await;
    let snapshot = tracker.get_job(&job_id).await.unwrap();
    assert_eq!(snapshot.phase, JobPhase::Processing);
    assert_eq!(snapshot.progress, 0);
    assert_eq!(fake.status_calls(), 1);

    // Cancelling again is a no-op.
    tracker.cancel_job(&job_id).await.unwrap();
}

#[tokio::test]
async fn at_most_one_status_call_in_flight() {
    let fake = FakeTransport::with_status_delay(Vec::new(), Duration::from_millis(50));
    let tracker = JobTracker::new(fake.clone(), config(10, None));

    let job_id = tracker.start_job(upload(), options()).await.unwrap();

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(fake.status_calls() >= 3);
    assert_eq!(fake.max_in_flight(), 1);

    tracker.cancel_job(&job_id).await.unwrap();
}

#[tokio::test]
async fn terminal_jobs_are_not_cancellable() {
    let fake = FakeTransport::new(vec![completed("http://x/y.mp4")]);
    let tracker = JobTracker::new(fake, config(10, None));

    let job_id = tracker.start_job(upload(), options()).await.unwrap();
    let mut rx = tracker.subscribe(&job_id).await.unwrap();
    rx.wait_for(|s| s.is_terminal()).await.unwrap();

    tracker.cancel_job(&job_id).await.unwrap();

    let snapshot = tracker.get_job(&job_id).await.unwrap();
    assert_eq!(snapshot.phase, JobPhase::Completed);
    assert_eq!(snapshot.result_url.as_deref(), Some("http://x/y.mp4"));
}

#[tokio::test]
async fn remote_failure_reports_distinct_reason() {
    let fake = FakeTransport::new(vec![processing(10), failed()]);
    let tracker = JobTracker::new(fake, config(10, None));

    let job_id = tracker.start_job(upload(), options()).await.unwrap();
    let mut rx = tracker.subscribe(&job_id).await.unwrap();
    let snapshot = rx.wait_for(|s| s.is_terminal()).await.unwrap().clone();

    assert_eq!(snapshot.phase, JobPhase::Failed);
    assert_eq!(snapshot.failure_reason.as_deref(), Some("conversion failed"));
}

#[tokio::test]
async fn jobs_are_tracked_independently() {
    let fake = FakeTransport::new(Vec::new());
    let tracker = JobTracker::new(fake.clone(), config(10, None));

    let first = tracker.start_job(upload(), options()).await.unwrap();
    let second = tracker.start_job(upload(), options()).await.unwrap();
    assert_ne!(first, second);
    assert_eq!(tracker.jobs().await.len(), 2);

    tracker.cancel_job(&first).await.unwrap();
    let calls = fake.status_calls();

    // The second job keeps polling after the first was cancelled.
    wait_until("second job still polling", || fake.status_calls() > calls).await;

    assert_eq!(
        tracker.get_job(&first).await.unwrap().phase,
        JobPhase::Processing
    );
    tracker.cancel_job(&second).await.unwrap();
}

#[tokio::test]
async fn removed_jobs_are_gone() {
    let fake = FakeTransport::new(vec![completed("http://x/y.mp4")]);
    let tracker = JobTracker::new(fake, config(10, None));

    let job_id = tracker.start_job(upload(), options()).await.unwrap();
    let mut rx = tracker.subscribe(&job_id).await.unwrap();
    rx.wait_for(|s| s.is_terminal()).await.unwrap();

    let snapshot = tracker.remove_job(&job_id).await.unwrap();
    assert_eq!(snapshot.phase, JobPhase::Completed);

    assert!(matches!(
        tracker.get_job(&job_id).await,
        Err(TrackerError::NotFound(_))
    ));
    assert!(matches!(
        tracker.cancel_job(&job_id).await,
        Err(TrackerError::NotFound(_))
    ));
    assert!(matches!(
        tracker.remove_job(&job_id).await,
        Err(TrackerError::NotFound(_))
    ));
}

#[tokio::test]
async fn unknown_job_is_not_found() {
    let fake = FakeTransport::new(Vec::new());
    let tracker = JobTracker::new(fake, config(10, None));

    let ghost = JobId::from_string("ghost");
    assert!(matches!(
        tracker.get_job(&ghost).await,
        Err(TrackerError::NotFound(id)) if id == ghost
    ));
}
