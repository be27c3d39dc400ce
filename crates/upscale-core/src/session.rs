//! Upscale session state machine.
//!
//! [`UpscaleSession`] is the single owner of everything the flow tracks: the
//! selected file and its preview, transfer and processing progress, the active
//! job, and the current outcome (result URL or error). It performs no I/O; an
//! async driver asks it for a [`TransferRequest`], performs the requests, and
//! feeds the responses back in.
//!
//! Every transfer attempt (and every resumed job) gets a fresh [`Ticket`], so
//! responses that arrive late are rejected as [`Applied::Stale`] instead of
//! overwriting newer state. The [`CancellationToken`] is handed out before an
//! attempt starts and carried into it; cancel, reset and drop fire it and
//! replace it with a new one.

use chrono::Utc;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::config::UpscaleConfig;
use crate::error::{LogLevel, UpscaleError};
use crate::intake::IntakeValidator;
use crate::models::{
    CandidateFile, EndpointKind, Job, JobId, JobStatus, Percent, SelectedFile, StatusResponse,
    UploadAcceptance, UploadResponse, UpscaleParams,
};
use crate::preview::{LocalPreviewStore, PreviewHandle, PreviewStore};
use crate::view::SessionView;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    #[default]
    Idle,
    Selected,
    Uploading,
    Polling,
    Completed,
    Failed,
}

/// Identifies one transfer or tracking attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Everything a driver needs to perform an upload.
#[derive(Debug, Clone)]
pub struct TransferRequest {
    pub ticket: Ticket,
    pub file: SelectedFile,
    pub endpoint: EndpointKind,
    pub params: UpscaleParams,
    pub cancel: CancellationToken,
}

/// Handle for tracking a job that is already known (resumed without upload).
#[derive(Debug, Clone)]
pub struct TrackingRequest {
    pub ticket: Ticket,
    pub job_id: JobId,
    pub cancel: CancellationToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    Selected,
    /// The candidate list was empty.
    NoFile,
}

/// Result of feeding a response into the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Applied {
    /// Upload accepted; poll this job next.
    Tracking(JobId),
    /// Job still running; poll again after the interval.
    Continue,
    /// Terminal: result available.
    Completed(String),
    /// Terminal: user-visible error recorded.
    Failed(String),
    /// Response belongs to a retired attempt and was ignored.
    Stale,
}

impl Applied {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Applied::Completed(_) | Applied::Failed(_))
    }
}

pub struct UpscaleSession {
    validator: IntakeValidator,
    params: UpscaleParams,
    previews: Box<dyn PreviewStore>,
    phase: Phase,
    selected: Option<SelectedFile>,
    preview: Option<PreviewHandle>,
    transfer_progress: Percent,
    processing_progress: Option<Percent>,
    job: Option<Job>,
    result_url: Option<String>,
    error: Option<String>,
    notice: Option<String>,
    generation: u64,
    cancel: CancellationToken,
}

impl UpscaleSession {
    pub fn new(config: &UpscaleConfig, previews: Box<dyn PreviewStore>) -> Self {
        Self {
            validator: IntakeValidator::new(config.max_file_size_bytes),
            params: config.params(),
            previews,
            phase: Phase::Idle,
            selected: None,
            preview: None,
            transfer_progress: Percent::ZERO,
            processing_progress: None,
            job: None,
            result_url: None,
            error: None,
            notice: None,
            generation: 0,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_local_previews(config: &UpscaleConfig) -> Self {
        Self::new(config, Box::new(LocalPreviewStore::new()))
    }

    /// Override the auxiliary upload parameters for subsequent transfers.
    pub fn set_params(&mut self, params: UpscaleParams) {
        self.params = params;
    }

    pub fn params(&self) -> &UpscaleParams {
        &self.params
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn selected(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }

    pub fn transfer_progress(&self) -> Percent {
        self.transfer_progress
    }

    pub fn processing_progress(&self) -> Option<Percent> {
        self.processing_progress
    }

    /// True while an upload or job is in flight.
    pub fn is_processing(&self) -> bool {
        matches!(self.phase, Phase::Uploading | Phase::Polling)
    }

    pub fn job_id(&self) -> Option<&JobId> {
        self.job.as_ref().map(|job| &job.id)
    }

    pub fn job(&self) -> Option<&Job> {
        self.job.as_ref()
    }

    pub fn result_url(&self) -> Option<&str> {
        self.result_url.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Transient message shown while polling keeps retrying.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Token of the running attempt, or of the next one while idle.
    ///
    /// Cancelling it stops a running driver, which then calls
    /// [`UpscaleSession::cancel`]. After a cancel or reset the session holds a
    /// new token; a token already cancelled when an attempt begins is replaced.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            phase: self.phase,
            file_name: self.selected.as_ref().map(|f| f.file_name.clone()),
            kind: self.selected.as_ref().map(|f| f.kind),
            size: self.selected.as_ref().map(|f| f.size),
            preview_url: self.preview.as_ref().map(|p| p.url.clone()),
            transfer_progress: self.transfer_progress.value(),
            processing_progress: self.processing_progress.map(|p| p.value()),
            processing: self.is_processing(),
            job_id: self.job.as_ref().map(|j| j.id.to_string()),
            result_url: self.result_url.clone(),
            error: self.error.clone(),
            notice: self.notice.clone(),
        }
    }

    /// Accept the first of `candidates`.
    ///
    /// An oversize file is rejected with a user-visible message and leaves the
    /// current selection and preview untouched. While a transfer or job is
    /// running the message goes to the notice; otherwise it replaces the
    /// previous outcome.
    pub fn select_files<I>(&mut self, candidates: I) -> Result<IntakeOutcome, UpscaleError>
    where
        I: IntoIterator<Item = CandidateFile>,
    {
        let selected = match self.validator.select_first(candidates) {
            Ok(Some(selected)) => selected,
            Ok(None) => return Ok(IntakeOutcome::NoFile),
            Err(err) => {
                tracing::debug!(error = %err, "File rejected at intake");
                if self.is_processing() {
                    self.notice = Some(err.user_message());
                } else {
                    self.clear_outcome();
                    self.error = Some(err.user_message());
                    self.phase = if self.selected.is_some() {
                        Phase::Selected
                    } else {
                        Phase::Idle
                    };
                }
                return Err(err);
            }
        };

        self.release_preview();
        let preview = self.previews.create(&selected);

        tracing::info!(
            file = %selected.file_name,
            kind = %selected.kind,
            size = selected.size,
            "File selected"
        );

        self.preview = Some(preview);
        self.selected = Some(selected);
        self.result_url = None;
        self.error = None;
        // a running job keeps its progress and phase; the new file is used on the next submit
        if !self.is_processing() {
            self.transfer_progress = Percent::ZERO;
            self.processing_progress = None;
            self.notice = None;
            self.phase = Phase::Selected;
        }

        Ok(IntakeOutcome::Selected)
    }

    /// Start a transfer of the selected file, clearing the previous outcome.
    pub fn begin_transfer(&mut self) -> Result<TransferRequest, UpscaleError> {
        if self.is_processing() {
            return Err(UpscaleError::TransferInProgress);
        }
        let file = self.selected.clone().ok_or(UpscaleError::NoFileSelected)?;

        let ticket = self.begin_attempt();
        self.clear_outcome();
        self.phase = Phase::Uploading;

        let endpoint = file.kind.endpoint_kind();
        tracing::info!(
            file = %file.file_name,
            kind = %file.kind,
            endpoint = ?endpoint,
            "Transfer started"
        );

        Ok(TransferRequest {
            ticket,
            file,
            endpoint,
            params: self.params.clone(),
            cancel: self.cancel.clone(),
        })
    }

    /// Track a job that was submitted elsewhere, skipping intake and transfer.
    pub fn begin_tracking(&mut self, job_id: JobId) -> Result<TrackingRequest, UpscaleError> {
        if self.is_processing() {
            return Err(UpscaleError::TransferInProgress);
        }

        let ticket = self.begin_attempt();
        self.clear_outcome();
        self.start_job(job_id.clone());

        Ok(TrackingRequest {
            ticket,
            job_id,
            cancel: self.cancel.clone(),
        })
    }

    /// Record a transfer progress event. Returns the new percentage when it advanced.
    pub fn record_transfer_progress(
        &mut self,
        ticket: Ticket,
        bytes_sent: u64,
        total_bytes: u64,
    ) -> Option<Percent> {
        if !self.is_current(ticket) || self.phase != Phase::Uploading {
            return None;
        }
        let observed = Percent::from_ratio(bytes_sent, total_bytes)?;
        self.transfer_progress
            .advance(observed)
            .then_some(self.transfer_progress)
    }

    /// Apply a successful upload response.
    pub fn complete_transfer(&mut self, ticket: Ticket, response: &UploadResponse) -> Applied {
        if !self.is_current(ticket) || self.phase != Phase::Uploading {
            return Applied::Stale;
        }

        match response.acceptance() {
            Some(UploadAcceptance::Job(job_id)) => {
                tracing::info!(job_id = %job_id, "Upload accepted, tracking job");
                self.start_job(job_id.clone());
                Applied::Tracking(job_id)
            }
            Some(UploadAcceptance::Result(url)) => {
                tracing::info!(result_url = %url, "Upload returned result directly");
                self.finish_with_result(url.clone());
                Applied::Completed(url)
            }
            None => {
                let err = UpscaleError::UnexpectedServerResponse(
                    "response contained neither a job id nor a result URL".to_string(),
                );
                self.finish_with_error(&err)
            }
        }
    }

    /// Record a failed upload (HTTP error status, network failure, unreadable body).
    pub fn fail_transfer(&mut self, ticket: Ticket, err: &UpscaleError) -> Applied {
        if !self.is_current(ticket) || self.phase != Phase::Uploading {
            return Applied::Stale;
        }
        self.finish_with_error(err)
    }

    /// Apply a status response for the active job.
    pub fn apply_status(
        &mut self,
        ticket: Ticket,
        job_id: &JobId,
        response: &StatusResponse,
    ) -> Applied {
        if !self.is_tracking(ticket, job_id) {
            return Applied::Stale;
        }

        self.notice = None;
        if !response.is_known_status() {
            tracing::warn!(
                job_id = %job_id,
                status = %response.status,
                "Unknown job status, treating as processing"
            );
        }

        match response.job_status() {
            JobStatus::Processing { progress } => {
                if let Some(progress) = progress {
                    self.processing_progress
                        .get_or_insert(Percent::ZERO)
                        .advance(Percent::from_value(progress));
                }
                tracing::debug!(
                    job_id = %job_id,
                    progress = ?self.processing_progress.map(|p| p.value()),
                    "Job still processing"
                );
                Applied::Continue
            }
            JobStatus::Done {
                result_url: Some(url),
            } => {
                tracing::info!(job_id = %job_id, result_url = %url, "Job completed");
                self.processing_progress = Some(Percent::COMPLETE);
                self.finish_with_result(url.clone());
                Applied::Completed(url)
            }
            JobStatus::Done { result_url: None } => {
                let err = UpscaleError::UnexpectedServerResponse(
                    "job finished without a result URL".to_string(),
                );
                self.finish_with_error(&err)
            }
            JobStatus::Failed { error } => {
                self.finish_with_error(&UpscaleError::JobFailed(error))
            }
        }
    }

    /// Record a failed status query. The job stays in polling.
    pub fn record_status_error(
        &mut self,
        ticket: Ticket,
        job_id: &JobId,
        err: &UpscaleError,
    ) -> Applied {
        if !self.is_tracking(ticket, job_id) {
            return Applied::Stale;
        }
        tracing::warn!(job_id = %job_id, error = %err, "Status check failed, will retry");
        self.notice = Some(format!("{} Retrying...", err.user_message()));
        Applied::Continue
    }

    /// Give up on the active job after repeated status failures.
    pub fn abandon_tracking(
        &mut self,
        ticket: Ticket,
        job_id: &JobId,
        err: &UpscaleError,
    ) -> Applied {
        if !self.is_tracking(ticket, job_id) {
            return Applied::Stale;
        }
        self.finish_with_error(err)
    }

    /// Stop any in-flight transfer or tracking but keep the selection.
    pub fn cancel(&mut self) {
        if !self.is_processing() {
            return;
        }
        tracing::info!(job_id = ?self.job.as_ref().map(|j| j.id.as_str()), "Cancelled");
        self.retire_attempt();
        self.job = None;
        self.notice = None;
        self.phase = if self.selected.is_some() {
            Phase::Selected
        } else {
            Phase::Idle
        };
    }

    /// Return to the initial state, releasing the preview and cancelling pending work.
    pub fn reset(&mut self) {
        self.retire_attempt();
        self.release_preview();
        self.selected = None;
        self.clear_outcome();
        self.phase = Phase::Idle;
        tracing::debug!("Session reset");
    }

    /// Tear the session down explicitly.
    pub fn dispose(mut self) {
        self.reset();
    }

    fn begin_attempt(&mut self) -> Ticket {
        if self.cancel.is_cancelled() {
            self.cancel = CancellationToken::new();
        }
        self.generation += 1;
        Ticket(self.generation)
    }

    fn retire_attempt(&mut self) {
        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        self.generation += 1;
    }

    fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }

    fn is_tracking(&self, ticket: Ticket, job_id: &JobId) -> bool {
        self.is_current(ticket)
            && self.phase == Phase::Polling
            && self.job.as_ref().is_some_and(|job| &job.id == job_id)
    }

    fn start_job(&mut self, job_id: JobId) {
        self.job = Some(Job {
            id: job_id,
            submitted_at: Utc::now(),
        });
        self.processing_progress = Some(Percent::ZERO);
        self.phase = Phase::Polling;
    }

    fn clear_outcome(&mut self) {
        self.transfer_progress = Percent::ZERO;
        self.processing_progress = None;
        self.job = None;
        self.result_url = None;
        self.error = None;
        self.notice = None;
    }

    fn finish_with_result(&mut self, url: String) {
        self.job = None;
        self.notice = None;
        self.error = None;
        self.result_url = Some(url);
        self.phase = Phase::Completed;
    }

    fn finish_with_error(&mut self, err: &UpscaleError) -> Applied {
        let job_id = self.job.as_ref().map(|j| j.id.to_string());
        match err.log_level() {
            LogLevel::Debug => tracing::debug!(job_id = ?job_id, error = %err, "Upscale failed"),
            LogLevel::Warn => tracing::warn!(job_id = ?job_id, error = %err, "Upscale failed"),
            LogLevel::Error => tracing::error!(job_id = ?job_id, error = %err, "Upscale failed"),
        }
        let message = err.user_message();
        self.job = None;
        self.notice = None;
        self.result_url = None;
        self.error = Some(message.clone());
        self.phase = Phase::Failed;
        Applied::Failed(message)
    }

    fn release_preview(&mut self) {
        if let Some(handle) = self.preview.take() {
            self.previews.revoke(&handle);
        }
    }
}

impl Drop for UpscaleSession {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.release_preview();
    }
}
