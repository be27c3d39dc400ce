use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};

/// Fallback content type for files whose extension is not recognised.
pub const OCTET_STREAM: &str = "application/octet-stream";

/// Coarse media kind derived from the declared content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
    Unsupported,
}

impl MediaKind {
    /// Classify by content-type prefix: `image/*`, `video/*`, anything else is unsupported.
    pub fn from_content_type(content_type: &str) -> Self {
        let normalized = content_type.trim().to_ascii_lowercase();
        if normalized.starts_with("image/") {
            MediaKind::Image
        } else if normalized.starts_with("video/") {
            MediaKind::Video
        } else {
            MediaKind::Unsupported
        }
    }

    /// Backend route for this kind. Only images go to the image endpoint.
    pub fn endpoint_kind(&self) -> EndpointKind {
        match self {
            MediaKind::Image => EndpointKind::Image,
            MediaKind::Video | MediaKind::Unsupported => EndpointKind::Video,
        }
    }
}

impl Display for MediaKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            MediaKind::Image => write!(f, "image"),
            MediaKind::Video => write!(f, "video"),
            MediaKind::Unsupported => write!(f, "unsupported"),
        }
    }
}

/// Which upload endpoint a transfer targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    Image,
    Video,
}

/// Map a file extension to the content type a browser would declare for it.
pub fn content_type_for_extension(extension: &str) -> Option<&'static str> {
    let content_type = match extension.to_ascii_lowercase().as_str() {
        // Images
        "jpg" | "jpeg" => "image/jpeg",
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "bmp" => "image/bmp",
        "tif" | "tiff" => "image/tiff",
        "heic" => "image/heic",
        // Videos
        "mp4" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mkv" => "video/x-matroska",
        "m4v" => "video/x-m4v",
        _ => return None,
    };
    Some(content_type)
}

/// A file offered for intake (one entry of a drop or picker selection).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateFile {
    pub path: PathBuf,
    pub file_name: String,
    pub content_type: String,
    pub size: u64,
}

impl CandidateFile {
    pub fn new(
        path: impl Into<PathBuf>,
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
    ) -> Self {
        Self {
            path: path.into(),
            file_name: file_name.into(),
            content_type: content_type.into(),
            size,
        }
    }

    /// Build a candidate from a file on disk, deriving the content type from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = std::fs::metadata(path)?;
        if !metadata.is_file() {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("Not a regular file: {}", path.display()),
            ));
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload.bin".to_string());

        let content_type = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(content_type_for_extension)
            .unwrap_or(OCTET_STREAM);

        Ok(Self::new(path, file_name, content_type, metadata.len()))
    }
}

/// The file currently held by a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelectedFile {
    pub path: PathBuf,
    pub file_name: String,
    pub kind: MediaKind,
    pub size: u64,
    pub content_type: String,
}

impl From<CandidateFile> for SelectedFile {
    fn from(candidate: CandidateFile) -> Self {
        Self {
            kind: MediaKind::from_content_type(&candidate.content_type),
            path: candidate.path,
            file_name: candidate.file_name,
            size: candidate.size,
            content_type: candidate.content_type,
        }
    }
}
