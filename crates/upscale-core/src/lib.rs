//! Upscale Core Library
//!
//! Domain models, error types, configuration and the session state machine for
//! submitting an image or video to a remote upscaling service and following the
//! job to completion. This crate does no network I/O; see `upscale-api-client`
//! for the HTTP side and the async driver.

pub mod config;
pub mod error;
pub mod intake;
pub mod models;
pub mod preview;
pub mod session;
pub mod view;

// Re-export commonly used types
pub use config::UpscaleConfig;
pub use error::{format_bytes, LogLevel, UpscaleError};
pub use intake::IntakeValidator;
pub use preview::{LocalPreviewStore, PreviewHandle, PreviewStore};
pub use session::{
    Applied, IntakeOutcome, Phase, Ticket, TrackingRequest, TransferRequest, UpscaleSession,
};
pub use view::SessionView;
