//! Async driver for an [`UpscaleSession`]: transfer, then completion tracking.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use upscale_core::models::JobId;
use upscale_core::{Applied, SessionView, UpscaleConfig, UpscaleError, UpscaleSession};

use crate::backend::{ProgressFn, UpscaleBackend};
use crate::tracker::{cancelled, track_job, RetryPolicy};

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed(String),
    Failed(String),
    Cancelled,
}

pub struct UpscaleRunner<B> {
    backend: B,
    policy: RetryPolicy,
    shutdown: CancellationToken,
}

impl<B: UpscaleBackend> UpscaleRunner<B> {
    pub fn new(backend: B, policy: RetryPolicy) -> Self {
        Self {
            backend,
            policy,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn from_config(backend: B, config: &UpscaleConfig) -> Self {
        Self::new(backend, RetryPolicy::from(config))
    }

    /// Token that stops any run of this runner (e.g. on Ctrl-C). The session keeps its selection.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Upload the selected file and follow the job to a terminal state.
    ///
    /// `on_update` receives a fresh view after every observable change.
    /// Errors are returned only when the run cannot start (nothing selected,
    /// transfer already running); every other failure ends up in the session
    /// and in [`RunOutcome::Failed`].
    pub async fn submit<F>(
        &self,
        session: &mut UpscaleSession,
        mut on_update: F,
    ) -> Result<RunOutcome, UpscaleError>
    where
        F: FnMut(&SessionView),
    {
        let request = session.begin_transfer()?;
        let ticket = request.ticket;
        on_update(&session.view());

        let (progress_tx, mut progress_rx) = watch::channel((0u64, 0u64));
        let on_progress: ProgressFn = Arc::new(move |sent, total| {
            let _ = progress_tx.send((sent, total));
        });

        let mut upload = self.backend.upload(&request, on_progress);
        let mut progress_open = true;

        let result = loop {
            tokio::select! {
                biased;
                _ = request.cancel.cancelled() => {
                    return Ok(cancelled(session, &mut on_update));
                }
                _ = self.shutdown.cancelled() => {
                    return Ok(cancelled(session, &mut on_update));
                }
                result = &mut upload => break result,
                changed = progress_rx.changed(), if progress_open => {
                    match changed {
                        Ok(()) => {
                            let (sent, total) = *progress_rx.borrow_and_update();
                            if session.record_transfer_progress(ticket, sent, total).is_some() {
                                on_update(&session.view());
                            }
                        }
                        Err(_) => progress_open = false,
                    }
                }
            }
        };
        drop(upload);

        let (sent, total) = *progress_rx.borrow();
        if session.record_transfer_progress(ticket, sent, total).is_some() {
            on_update(&session.view());
        }

        let applied = match result {
            Ok(response) => session.complete_transfer(ticket, &response),
            Err(err) => session.fail_transfer(ticket, &err),
        };
        on_update(&session.view());

        let outcome = match applied {
            Applied::Tracking(job_id) => {
                track_job(
                    &self.backend,
                    &self.policy,
                    session,
                    ticket,
                    job_id,
                    &request.cancel,
                    &self.shutdown,
                    &mut on_update,
                )
                .await
            }
            Applied::Completed(url) => RunOutcome::Completed(url),
            Applied::Failed(message) => RunOutcome::Failed(message),
            Applied::Continue | Applied::Stale => RunOutcome::Cancelled,
        };

        Ok(outcome)
    }

    /// Follow an existing job without uploading anything.
    pub async fn resume<F>(
        &self,
        session: &mut UpscaleSession,
        job_id: JobId,
        mut on_update: F,
    ) -> Result<RunOutcome, UpscaleError>
    where
        F: FnMut(&SessionView),
    {
        let request = session.begin_tracking(job_id)?;
        on_update(&session.view());

        Ok(track_job(
            &self.backend,
            &self.policy,
            session,
            request.ticket,
            request.job_id,
            &request.cancel,
            &self.shutdown,
            &mut on_update,
        )
        .await)
    }
}
