use std::sync::Arc;

use async_trait::async_trait;
use upscale_core::models::{JobId, StatusResponse, UploadResponse};
use upscale_core::{TransferRequest, UpscaleError};

/// Transfer progress callback: `(bytes_sent, total_bytes)`.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// The remote collaborator the runner talks to.
///
/// Errors must already be classified: uploads fail with
/// [`UpscaleError::UploadFailure`] (or `Io` for local read errors), status
/// queries with [`UpscaleError::StatusQueryTransient`].
#[async_trait]
pub trait UpscaleBackend: Send + Sync {
    async fn upload(
        &self,
        request: &TransferRequest,
        on_progress: ProgressFn,
    ) -> Result<UploadResponse, UpscaleError>;

    async fn job_status(&self, job_id: &JobId) -> Result<StatusResponse, UpscaleError>;
}

#[async_trait]
impl<B: UpscaleBackend + ?Sized> UpscaleBackend for Arc<B> {
    async fn upload(
        &self,
        request: &TransferRequest,
        on_progress: ProgressFn,
    ) -> Result<UploadResponse, UpscaleError> {
        (**self).upload(request, on_progress).await
    }

    async fn job_status(&self, job_id: &JobId) -> Result<StatusResponse, UpscaleError> {
        (**self).job_status(job_id).await
    }
}
