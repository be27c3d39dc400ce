//! Error types module
//!
//! Every failure the upscale flow can report is a variant of [`UpscaleError`].
//! None of them is fatal: each one is surfaced to the user as a message and the
//! session stays usable (a new selection or a reset always recovers).

use std::io;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like user input rejections
    Debug,
    /// Warning level - for recoverable issues like transient network failures
    Warn,
    /// Error level - for failures that end a transfer or a job
    Error,
}

#[derive(Debug, thiserror::Error)]
pub enum UpscaleError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    OversizeFile { size: u64, max: u64 },

    #[error("No file selected")]
    NoFileSelected,

    #[error("A transfer is already in progress")]
    TransferInProgress,

    #[error("Unexpected server response: {0}")]
    UnexpectedServerResponse(String),

    #[error("Upload failed: {0}")]
    UploadFailure(String),

    #[error("Status check failed: {0}")]
    StatusQueryTransient(String),

    #[error("Processing failed: {0}")]
    JobFailed(String),

    #[error("Lost contact with the processing service after {attempts} attempts: {last_error}")]
    TrackingAbandoned { attempts: u32, last_error: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl UpscaleError {
    /// Message shown in the error area of the UI.
    pub fn user_message(&self) -> String {
        match self {
            UpscaleError::OversizeFile { max, .. } => format!(
                "File is too large. Maximum allowed size is {}.",
                format_bytes(*max)
            ),
            UpscaleError::JobFailed(message) => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether the same request may succeed if simply issued again.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            UpscaleError::UploadFailure(_)
                | UpscaleError::StatusQueryTransient(_)
                | UpscaleError::TrackingAbandoned { .. }
                | UpscaleError::Io(_)
        )
    }

    pub fn log_level(&self) -> LogLevel {
        match self {
            UpscaleError::OversizeFile { .. }
            | UpscaleError::NoFileSelected
            | UpscaleError::TransferInProgress
            | UpscaleError::Cancelled => LogLevel::Debug,
            UpscaleError::StatusQueryTransient(_) => LogLevel::Warn,
            UpscaleError::UnexpectedServerResponse(_)
            | UpscaleError::UploadFailure(_)
            | UpscaleError::JobFailed(_)
            | UpscaleError::TrackingAbandoned { .. }
            | UpscaleError::Io(_) => LogLevel::Error,
        }
    }
}

/// Human-readable byte size using binary units.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else if value.fract() == 0.0 {
        format!("{} {}", value as u64, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oversize_message_mentions_limit() {
        let err = UpscaleError::OversizeFile {
            size: 2 * 1024 * 1024 * 1024,
            max: 1024 * 1024 * 1024,
        };
        assert_eq!(
            err.user_message(),
            "File is too large. Maximum allowed size is 1 GiB."
        );
        assert_eq!(err.log_level(), LogLevel::Debug);
        assert!(!err.is_recoverable());
    }

    #[test]
    fn job_failed_message_is_passed_through() {
        let err = UpscaleError::JobFailed("boom".to_string());
        assert_eq!(err.user_message(), "boom");
        assert_eq!(err.log_level(), LogLevel::Error);
    }

    #[test]
    fn transient_errors_are_recoverable() {
        assert!(UpscaleError::StatusQueryTransient("timeout".into()).is_recoverable());
        assert!(UpscaleError::UploadFailure("500".into()).is_recoverable());
        assert!(!UpscaleError::UnexpectedServerResponse("{}".into()).is_recoverable());
    }

    #[test]
    fn format_bytes_units() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(1536), "1.5 KiB");
        assert_eq!(format_bytes(10 * 1024 * 1024), "10 MiB");
    }
}
