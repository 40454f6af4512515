use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use engine_logging::{engine_debug, engine_warn};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::StudyApi;
use crate::types::{is_terminal_phase, EngineEvent, JobId};

#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Time between status probes.
    pub cadence: Duration,
    /// Slower probe cadence used while the job sits in one of the
    /// `slow_phases`. `None` keeps a single cadence throughout.
    pub slow_cadence: Option<Duration>,
    /// Phase tags known to run long enough that probing at the base cadence
    /// is wasted effort.
    pub slow_phases: Vec<String>,
    /// Hard limit on how long a job is watched before giving up. `None`
    /// keeps polling until a terminal phase or cancellation.
    pub max_watch: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            cadence: Duration::from_millis(1200),
            slow_cadence: None,
            slow_phases: Vec::new(),
            max_watch: None,
        }
    }
}

impl PollPolicy {
    /// Cadence to use after a report of `phase`.
    pub fn cadence_for(&self, phase: &str) -> Duration {
        match self.slow_cadence {
            Some(slow) if self.slow_phases.iter().any(|tag| tag == phase) => slow,
            _ => self.cadence,
        }
    }
}

/// Handle to the single status poller of one job.
///
/// At most one poller exists per job; starting a new job goes through
/// `stop` on the previous handle first. Stopping is idempotent and dropping
/// the handle stops the loop as well.
pub struct StatusPoller {
    job_id: JobId,
    cancel: CancellationToken,
}

impl StatusPoller {
    /// Spawns the poll loop onto the current tokio runtime.
    pub fn spawn(
        api: Arc<dyn StudyApi>,
        job_id: JobId,
        policy: PollPolicy,
        events: mpsc::Sender<EngineEvent>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let loop_job = job_id.clone();
        tokio::spawn(async move {
            run_poll_loop(api, loop_job, policy, events, loop_cancel).await;
        });
        Self { job_id, cancel }
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_poll_loop(
    api: Arc<dyn StudyApi>,
    job_id: JobId,
    policy: PollPolicy,
    events: mpsc::Sender<EngineEvent>,
    cancel: CancellationToken,
) {
    let deadline = policy.max_watch.map(|limit| tokio::time::Instant::now() + limit);
    let mut current_cadence = policy.cadence;
    let mut ticks = tokio::time::interval(current_cadence);
    // A probe slower than the cadence must swallow the missed ticks instead
    // of replaying them as a burst.
    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first interval tick completes immediately; consume it so the
    // first probe happens one full cadence after the job starts.
    ticks.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                engine_debug!("status polling cancelled for job {}", job_id);
                return;
            }
            _ = ticks.tick() => {}
        }

        if let Some(deadline) = deadline {
            if tokio::time::Instant::now() >= deadline {
                engine_warn!("gave up watching job {} after {:?}", job_id, policy.max_watch);
                let _ = events.send(EngineEvent::WatchExpired {
                    job_id: job_id.clone(),
                });
                return;
            }
        }

        // The probe is awaited inside the loop, so only one request is ever
        // in flight for this job.
        match api.fetch_status(&job_id).await {
            Ok(phase) => {
                let terminal = is_terminal_phase(&phase);
                let wanted = policy.cadence_for(&phase);
                let _ = events.send(EngineEvent::StatusReported {
                    job_id: job_id.clone(),
                    phase,
                });
                if terminal {
                    engine_debug!("job {} reached a terminal phase, polling stops", job_id);
                    return;
                }
                if wanted != current_cadence {
                    // Changing cadence means a fresh interval; eat its
                    // immediate first tick like the one above.
                    current_cadence = wanted;
                    ticks = tokio::time::interval(current_cadence);
                    ticks.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    ticks.tick().await;
                }
            }
            Err(error) => {
                // A failed probe is not fatal; the next tick tries again.
                engine_warn!("status probe failed for job {}: {}", job_id, error);
                let _ = events.send(EngineEvent::StatusPollFailed {
                    job_id: job_id.clone(),
                    error,
                });
            }
        }
    }
}
