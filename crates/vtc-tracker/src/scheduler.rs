//! Poll loop driving status checks for one job.

use std::sync::Arc;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use vtc_models::VideoId;
use vtc_transport::TranscoderApi;

use crate::config::TrackerConfig;
use crate::handle::JobHandle;

/// Reason prefix recorded when the status endpoint stays unreachable.
pub(crate) const STATUS_UNAVAILABLE_REASON: &str = "status check unavailable";

/// Spawn the poll loop for a job that just entered `Processing`.
///
/// One status request is issued per tick and awaited before the next
/// tick is taken, so at most one request is in flight per job and
/// responses apply in request-issue order. The loop ends on the first
/// terminal transition or when `token` is cancelled, releasing the
/// interval timer with it.
pub(crate) fn spawn_poll_loop<T>(
    transport: Arc<T>,
    handle: Arc<JobHandle>,
    video_id: VideoId,
    token: CancellationToken,
    config: TrackerConfig,
) where
    T: TranscoderApi + ?Sized + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + config.poll_interval, config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut consecutive_failures = 0u32;

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    debug!(job_id = %handle.job_id(), "Poll loop stopped");
                    return;
                }
                _ = ticker.tick() => {}
            }

            let result = transport.status(&video_id).await;

            // Re-checked here and again under the handle's lock, so a
            // response that settled after cancellation is discarded.
            if token.is_cancelled() {
                debug!(job_id = %handle.job_id(), "Poll loop stopped");
                return;
            }

            match result {
                Ok(report) => {
                    consecutive_failures = 0;
                    if !handle.apply_status(&report).await {
                        return;
                    }
                }
                Err(e) => {
                    consecutive_failures += 1;
                    warn!(
                        job_id = %handle.job_id(),
                        video_id = %video_id,
                        consecutive_failures,
                        "Status check failed: {}", e
                    );

                    if let Some(ceiling) = config.max_consecutive_poll_failures {
                        if consecutive_failures >= ceiling {
                            handle
                                .fail_polling(format!("{}: {}", STATUS_UNAVAILABLE_REASON, e))
                                .await;
                            return;
                        }
                    }
                }
            }
        }
    });
}
