//! Completion tracking: poll the status endpoint until the job reaches a terminal state.
//!
//! One query is outstanding at a time; the next is scheduled only after the
//! previous one resolved. While the job is processing the delay is the fixed
//! poll interval. Failed queries back off exponentially (capped) and tracking
//! is abandoned after too many consecutive failures, or at once when the
//! backend reports an error that retrying cannot fix.

use std::time::Duration;

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use upscale_core::models::JobId;
use upscale_core::{Applied, SessionView, Ticket, UpscaleConfig, UpscaleError, UpscaleSession};

use crate::backend::UpscaleBackend;
use crate::runner::RunOutcome;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_backoff: Duration,
    pub max_consecutive_failures: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&UpscaleConfig::default())
    }
}

impl From<&UpscaleConfig> for RetryPolicy {
    fn from(config: &UpscaleConfig) -> Self {
        Self {
            interval: config.poll_interval(),
            max_backoff: config.poll_max_backoff(),
            max_consecutive_failures: config.poll_max_consecutive_failures,
        }
    }
}

impl RetryPolicy {
    /// Delay after the `consecutive_failures`-th failed query in a row (1-based):
    /// `interval * 2^(n-1)`, capped at `max_backoff`.
    pub fn failure_delay(&self, consecutive_failures: u32) -> Duration {
        let exponent = consecutive_failures.saturating_sub(1).min(16);
        self.interval
            .saturating_mul(2_u32.pow(exponent))
            .min(self.max_backoff)
    }

    pub fn gives_up_after(&self, consecutive_failures: u32) -> bool {
        consecutive_failures >= self.max_consecutive_failures
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) async fn track_job<B, F>(
    backend: &B,
    policy: &RetryPolicy,
    session: &mut UpscaleSession,
    ticket: Ticket,
    job_id: JobId,
    cancel: &CancellationToken,
    shutdown: &CancellationToken,
    on_update: &mut F,
) -> RunOutcome
where
    B: UpscaleBackend + ?Sized,
    F: FnMut(&SessionView),
{
    let mut consecutive_failures = 0u32;
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled(session, on_update),
            _ = shutdown.cancelled() => return cancelled(session, on_update),
            result = backend.job_status(&job_id) => result,
        };

        let (applied, delay) = match result {
            Ok(status) => {
                consecutive_failures = 0;
                tracing::debug!(job_id = %job_id, attempt, status = %status.status, "Status received");
                (
                    session.apply_status(ticket, &job_id, &status),
                    policy.interval,
                )
            }
            Err(err) if !err.is_recoverable() => (
                session.abandon_tracking(ticket, &job_id, &err),
                Duration::ZERO,
            ),
            Err(err) => {
                consecutive_failures += 1;
                if policy.gives_up_after(consecutive_failures) {
                    let abandoned = UpscaleError::TrackingAbandoned {
                        attempts: consecutive_failures,
                        last_error: err.to_string(),
                    };
                    (
                        session.abandon_tracking(ticket, &job_id, &abandoned),
                        Duration::ZERO,
                    )
                } else {
                    let delay = policy.failure_delay(consecutive_failures);
                    tracing::warn!(
                        job_id = %job_id,
                        attempt,
                        consecutive_failures,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "Status query failed"
                    );
                    (session.record_status_error(ticket, &job_id, &err), delay)
                }
            }
        };

        on_update(&session.view());

        match applied {
            Applied::Continue => {}
            Applied::Completed(url) => return RunOutcome::Completed(url),
            Applied::Failed(message) => return RunOutcome::Failed(message),
            Applied::Tracking(_) | Applied::Stale => return RunOutcome::Cancelled,
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return cancelled(session, on_update),
            _ = shutdown.cancelled() => return cancelled(session, on_update),
            _ = sleep(delay) => {}
        }
    }
}

pub(crate) fn cancelled<F>(session: &mut UpscaleSession, on_update: &mut F) -> RunOutcome
where
    F: FnMut(&SessionView),
{
    session.cancel();
    on_update(&session.view());
    RunOutcome::Cancelled
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> RetryPolicy {
        RetryPolicy {
            interval: Duration::from_millis(3000),
            max_backoff: Duration::from_millis(30_000),
            max_consecutive_failures: 5,
        }
    }

    #[test]
    fn failure_delay_exponential_then_capped() {
        let policy = policy();
        assert_eq!(policy.failure_delay(1), Duration::from_millis(3000));
        assert_eq!(policy.failure_delay(2), Duration::from_millis(6000));
        assert_eq!(policy.failure_delay(3), Duration::from_millis(12_000));
        assert_eq!(policy.failure_delay(4), Duration::from_millis(24_000));
        assert_eq!(policy.failure_delay(5), Duration::from_millis(30_000));
        assert_eq!(policy.failure_delay(500), Duration::from_millis(30_000));
    }

    #[test]
    fn zero_failures_uses_interval() {
        assert_eq!(policy().failure_delay(0), Duration::from_millis(3000));
    }

    #[test]
    fn gives_up_at_limit() {
        let policy = policy();
        assert!(!policy.gives_up_after(4));
        assert!(policy.gives_up_after(5));
    }

    #[test]
    fn policy_from_config() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.interval, Duration::from_millis(3000));
        assert_eq!(policy.max_consecutive_failures, 10);
    }
}
