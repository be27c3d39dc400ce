pub mod job;
pub mod media;
pub mod progress;

pub use job::{
    Job, JobId, JobStatus, StatusResponse, UploadAcceptance, UploadResponse, UpscaleParams,
    DEFAULT_FAILURE_MESSAGE,
};
pub use media::{
    content_type_for_extension, CandidateFile, EndpointKind, MediaKind, SelectedFile, OCTET_STREAM,
};
pub use progress::Percent;
