//! Streaming upload bodies that report how many bytes have been handed to the transport.

use std::path::Path;

use futures::TryStreamExt;
use reqwest::multipart::Part;
use reqwest::Body;
use tokio_util::io::ReaderStream;
use upscale_core::UpscaleError;

use crate::backend::ProgressFn;

/// Build a multipart file part that streams `path` and calls `on_progress(sent, total)`
/// after every chunk.
///
/// Failing to open or stat the local file is an [`UpscaleError::Io`]; nothing has
/// been sent at that point.
pub async fn file_part_with_progress(
    path: &Path,
    file_name: &str,
    content_type: &str,
    on_progress: ProgressFn,
) -> Result<Part, UpscaleError> {
    let file = tokio::fs::File::open(path).await?;
    let total = file.metadata().await?.len();

    let mut sent = 0u64;
    let stream = ReaderStream::new(file).inspect_ok(move |chunk| {
        sent += chunk.len() as u64;
        on_progress(sent, total);
    });

    let part = Part::stream_with_length(Body::wrap_stream(stream), total)
        .file_name(file_name.to_string())
        .mime_str(content_type)
        .map_err(|e| {
            UpscaleError::UploadFailure(format!("Invalid content type {}: {}", content_type, e))
        })?;

    Ok(part)
}
