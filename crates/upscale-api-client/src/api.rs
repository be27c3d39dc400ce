//! Domain methods for the upscale API client.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use upscale_core::models::{JobId, StatusResponse, UploadResponse};
use upscale_core::{TransferRequest, UpscaleError};

use crate::backend::{ProgressFn, UpscaleBackend};
use crate::progress::file_part_with_progress;
use crate::ApiClient;

impl ApiClient {
    /// Upload the file of `request` with its upscale parameters to the kind-specific endpoint.
    ///
    /// Local read errors come back as [`UpscaleError::Io`], anything on the
    /// wire as [`UpscaleError::UploadFailure`].
    pub async fn upload_media(
        &self,
        request: &TransferRequest,
        on_progress: ProgressFn,
    ) -> Result<UploadResponse, UpscaleError> {
        let file = &request.file;
        let part =
            file_part_with_progress(&file.path, &file.file_name, &file.content_type, on_progress)
                .await?;

        let form = request
            .params
            .form_fields()
            .into_iter()
            .fold(reqwest::multipart::Form::new().part("file", part), |form, (name, value)| {
                form.text(name, value)
            });

        let path = self.endpoints().upload(request.endpoint).to_string();
        tracing::debug!(
            file = %file.file_name,
            size = file.size,
            path = %path,
            "Uploading media"
        );
        self.post_multipart(&path, form)
            .await
            .map_err(|e| UpscaleError::UploadFailure(format!("{:#}", e)))
    }

    /// Query the status endpoint for one job.
    pub async fn get_job_status(&self, job_id: &JobId) -> Result<StatusResponse> {
        let path = format!(
            "{}/{}",
            self.endpoints().status,
            urlencoding::encode(job_id.as_str())
        );
        self.get(&path, &[]).await
    }

    /// Download a finished artifact to `destination`. Returns the number of bytes written.
    ///
    /// Relative result URLs are resolved against the API base URL.
    pub async fn download_result(&self, result_url: &str, destination: &Path) -> Result<u64> {
        let url = if result_url.starts_with("http://") || result_url.starts_with("https://") {
            result_url.to_string()
        } else {
            self.build_url(result_url)
        };

        let response = self
            .client()
            .get(&url)
            .timeout(self.upload_timeout())
            .send()
            .await
            .with_context(|| format!("Failed to download result from {}", url))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow::anyhow!(
                "Download failed with status {}: {}",
                status,
                url
            ));
        }

        let mut file = tokio::fs::File::create(destination)
            .await
            .with_context(|| format!("Failed to create file: {}", destination.display()))?;

        let mut written = 0u64;
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Failed to read download stream")?;
            file.write_all(&chunk)
                .await
                .with_context(|| format!("Failed to write file: {}", destination.display()))?;
            written += chunk.len() as u64;
        }
        file.flush().await.context("Failed to flush download")?;

        tracing::info!(
            url = %url,
            destination = %destination.display(),
            bytes = written,
            "Result downloaded"
        );
        Ok(written)
    }
}

#[async_trait]
impl UpscaleBackend for ApiClient {
    async fn upload(
        &self,
        request: &TransferRequest,
        on_progress: ProgressFn,
    ) -> Result<UploadResponse, UpscaleError> {
        self.upload_media(request, on_progress).await
    }

    async fn job_status(&self, job_id: &JobId) -> Result<StatusResponse, UpscaleError> {
        self.get_job_status(job_id)
            .await
            .map_err(|e| UpscaleError::StatusQueryTransient(format!("{:#}", e)))
    }
}
