use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Message recorded when the backend reports a failure without details.
pub const DEFAULT_FAILURE_MESSAGE: &str = "Processing failed";

/// Server-assigned identifier of an upscaling job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for JobId {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// A job being tracked by a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    pub id: JobId,
    pub submitted_at: DateTime<Utc>,
}

/// Fixed auxiliary fields sent alongside the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UpscaleParams {
    pub target_resolution: String,
    pub scale: String,
    pub preserve_audio: bool,
}

impl UpscaleParams {
    /// Multipart text fields in wire form.
    pub fn form_fields(&self) -> [(&'static str, String); 3] {
        [
            ("target_resolution", self.target_resolution.clone()),
            ("scale", self.scale.clone()),
            ("preserve_audio", self.preserve_audio.to_string()),
        ]
    }
}

/// Body returned by the upload endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
}

/// What an accepted upload turned into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadAcceptance {
    /// Asynchronous backend: track this job.
    Job(JobId),
    /// Synchronous backend: the artifact is ready.
    Result(String),
}

impl UploadResponse {
    /// Interpret the body. A job id takes precedence over a result URL; blank values count as absent.
    pub fn acceptance(&self) -> Option<UploadAcceptance> {
        if let Some(id) = non_blank(self.job_id.as_deref()) {
            return Some(UploadAcceptance::Job(JobId::new(id)));
        }
        non_blank(self.result_url.as_deref()).map(|url| UploadAcceptance::Result(url.to_string()))
    }
}

/// Body returned by the status endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Interpreted job status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Processing { progress: Option<u8> },
    Done { result_url: Option<String> },
    Failed { error: String },
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Processing { .. })
    }
}

impl StatusResponse {
    /// Interpret the body. Any status other than `done` or `failed` means the job is still running.
    pub fn job_status(&self) -> JobStatus {
        match self.status.trim().to_ascii_lowercase().as_str() {
            "done" => JobStatus::Done {
                result_url: non_blank(self.result_url.as_deref()).map(str::to_string),
            },
            "failed" => JobStatus::Failed {
                error: non_blank(self.error.as_deref())
                    .unwrap_or(DEFAULT_FAILURE_MESSAGE)
                    .to_string(),
            },
            _ => JobStatus::Processing {
                progress: self.progress.map(clamp_percent),
            },
        }
    }

    /// True for values the backend documents (`processing`, `done`, `failed`).
    pub fn is_known_status(&self) -> bool {
        matches!(
            self.status.trim().to_ascii_lowercase().as_str(),
            "processing" | "done" | "failed"
        )
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn clamp_percent(value: f64) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.clamp(0.0, 100.0).floor() as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_response_prefers_job_id() {
        let body: UploadResponse =
            serde_json::from_str(r#"{"jobId":"abc123","resultUrl":"https://x/out.mp4"}"#).unwrap();
        assert_eq!(
            body.acceptance(),
            Some(UploadAcceptance::Job(JobId::new("abc123")))
        );
    }

    #[test]
    fn upload_response_with_result_only() {
        let body: UploadResponse =
            serde_json::from_str(r#"{"resultUrl":"https://x/out.mp4"}"#).unwrap();
        assert_eq!(
            body.acceptance(),
            Some(UploadAcceptance::Result("https://x/out.mp4".to_string()))
        );
    }

    #[test]
    fn upload_response_without_fields() {
        let body: UploadResponse = serde_json::from_str(r#"{"jobId":"  ","other":1}"#).unwrap();
        assert_eq!(body.acceptance(), None);
    }

    #[test]
    fn status_done_and_failed() {
        let done: StatusResponse =
            serde_json::from_str(r#"{"status":"done","resultUrl":"https://x/u.png"}"#).unwrap();
        assert_eq!(
            done.job_status(),
            JobStatus::Done {
                result_url: Some("https://x/u.png".to_string())
            }
        );

        let failed: StatusResponse = serde_json::from_str(r#"{"status":"failed"}"#).unwrap();
        assert_eq!(
            failed.job_status(),
            JobStatus::Failed {
                error: DEFAULT_FAILURE_MESSAGE.to_string()
            }
        );
        assert!(failed.job_status().is_terminal());
    }

    #[test]
    fn unknown_status_is_still_processing() {
        let body: StatusResponse =
            serde_json::from_str(r#"{"status":"queued","progress":142.7}"#).unwrap();
        assert!(!body.is_known_status());
        assert_eq!(
            body.job_status(),
            JobStatus::Processing {
                progress: Some(100)
            }
        );
    }

    #[test]
    fn params_form_fields() {
        let params = UpscaleParams {
            target_resolution: "3840x2160".to_string(),
            scale: "4x".to_string(),
            preserve_audio: false,
        };
        let fields = params.form_fields();
        assert_eq!(fields[0], ("target_resolution", "3840x2160".to_string()));
        assert_eq!(fields[1], ("scale", "4x".to_string()));
        assert_eq!(fields[2], ("preserve_audio", "false".to_string()));
    }
}
