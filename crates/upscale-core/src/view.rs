use serde::Serialize;

use crate::error::format_bytes;
use crate::models::MediaKind;
use crate::session::Phase;

/// Snapshot of a session for rendering: drop zone, progress bars, error area and result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionView {
    pub phase: Phase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<MediaKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preview_url: Option<String>,
    pub transfer_progress: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_progress: Option<u8>,
    pub processing: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

impl SessionView {
    /// One-line human summary of the current state.
    pub fn status_line(&self) -> String {
        let file = self.file_name.as_deref().unwrap_or("file");
        match self.phase {
            Phase::Idle => match &self.error {
                Some(error) => error.clone(),
                None => "Drop a file or choose one to upscale".to_string(),
            },
            Phase::Selected => {
                let kind = self.kind.unwrap_or(MediaKind::Unsupported);
                let mut line = format!(
                    "Selected {} ({}, {})",
                    file,
                    kind,
                    format_bytes(self.size.unwrap_or(0))
                );
                if let Some(error) = &self.error {
                    line.push_str(&format!(": {}", error));
                }
                line
            }
            Phase::Uploading => {
                let mut line = format!("Uploading {}: {}%", file, self.transfer_progress);
                if let Some(notice) = &self.notice {
                    line.push_str(&format!(" ({})", notice));
                }
                line
            }
            Phase::Polling => {
                let job = self.job_id.as_deref().unwrap_or("?");
                let mut line = match self.processing_progress {
                    Some(progress) => format!("Processing job {}: {}%", job, progress),
                    None => format!("Processing job {}", job),
                };
                if let Some(notice) = &self.notice {
                    line.push_str(&format!(" ({})", notice));
                }
                line
            }
            Phase::Completed => format!(
                "Done: {}",
                self.result_url.as_deref().unwrap_or("(no result URL)")
            ),
            Phase::Failed => format!(
                "Error: {}",
                self.error.as_deref().unwrap_or("unknown error")
            ),
        }
    }
}
