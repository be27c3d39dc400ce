//! Configuration module
//!
//! Backend location, upload parameters, size limits and polling policy for the
//! upscale client. Values come from the environment (optionally a `.env` file)
//! and fall back to the defaults below.

use std::env;
use std::time::Duration;

use crate::models::UpscaleParams;

const API_URL: &str = "http://localhost:8000";
const IMAGE_ENDPOINT: &str = "/api/upscale/image";
const VIDEO_ENDPOINT: &str = "/api/upscale/video";
const STATUS_ENDPOINT: &str = "/api/upscale/status";
const MAX_FILE_SIZE_MB: u64 = 1024;
const TARGET_RESOLUTION: &str = "3840x2160";
const SCALE: &str = "4x";
const PRESERVE_AUDIO: bool = true;
const POLL_INTERVAL_MS: u64 = 3000;
const POLL_MAX_BACKOFF_MS: u64 = 30_000;
const POLL_MAX_CONSECUTIVE_FAILURES: u32 = 10;
const REQUEST_TIMEOUT_SECS: u64 = 60;
const UPLOAD_TIMEOUT_SECS: u64 = 3600;

/// Upscale client configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UpscaleConfig {
    pub api_url: String,
    pub image_endpoint: String,
    pub video_endpoint: String,
    pub status_endpoint: String,
    pub max_file_size_bytes: u64,
    pub target_resolution: String,
    pub scale: String,
    pub preserve_audio: bool,
    /// Fixed delay between status queries while a job is processing.
    pub poll_interval_ms: u64,
    /// Upper bound for the delay after consecutive failed status queries.
    pub poll_max_backoff_ms: u64,
    /// Tracking is abandoned after this many failed status queries in a row.
    pub poll_max_consecutive_failures: u32,
    pub request_timeout_secs: u64,
    pub upload_timeout_secs: u64,
}

impl Default for UpscaleConfig {
    fn default() -> Self {
        Self {
            api_url: API_URL.to_string(),
            image_endpoint: IMAGE_ENDPOINT.to_string(),
            video_endpoint: VIDEO_ENDPOINT.to_string(),
            status_endpoint: STATUS_ENDPOINT.to_string(),
            max_file_size_bytes: MAX_FILE_SIZE_MB * 1024 * 1024,
            target_resolution: TARGET_RESOLUTION.to_string(),
            scale: SCALE.to_string(),
            preserve_audio: PRESERVE_AUDIO,
            poll_interval_ms: POLL_INTERVAL_MS,
            poll_max_backoff_ms: POLL_MAX_BACKOFF_MS,
            poll_max_consecutive_failures: POLL_MAX_CONSECUTIVE_FAILURES,
            request_timeout_secs: REQUEST_TIMEOUT_SECS,
            upload_timeout_secs: UPLOAD_TIMEOUT_SECS,
        }
    }
}

impl UpscaleConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Unset or unparsable numeric values use defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let preserve_audio = match lookup("UPSCALE_PRESERVE_AUDIO") {
            Some(raw) => parse_bool(&raw).ok_or_else(|| {
                anyhow::anyhow!("UPSCALE_PRESERVE_AUDIO must be true or false, got '{}'", raw)
            })?,
            None => defaults.preserve_audio,
        };

        let max_file_size_mb = lookup("UPSCALE_MAX_FILE_SIZE_MB")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .unwrap_or(MAX_FILE_SIZE_MB);

        let config = Self {
            api_url: lookup("UPSCALE_API_URL")
                .or_else(|| lookup("API_URL"))
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .unwrap_or(defaults.api_url),
            image_endpoint: lookup("UPSCALE_IMAGE_ENDPOINT").unwrap_or(defaults.image_endpoint),
            video_endpoint: lookup("UPSCALE_VIDEO_ENDPOINT").unwrap_or(defaults.video_endpoint),
            status_endpoint: lookup("UPSCALE_STATUS_ENDPOINT")
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or(defaults.status_endpoint),
            max_file_size_bytes: max_file_size_mb.saturating_mul(1024 * 1024),
            target_resolution: lookup("UPSCALE_TARGET_RESOLUTION")
                .unwrap_or(defaults.target_resolution),
            scale: lookup("UPSCALE_SCALE").unwrap_or(defaults.scale),
            preserve_audio,
            poll_interval_ms: lookup("UPSCALE_POLL_INTERVAL_MS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(POLL_INTERVAL_MS),
            poll_max_backoff_ms: lookup("UPSCALE_POLL_MAX_BACKOFF_MS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(POLL_MAX_BACKOFF_MS),
            poll_max_consecutive_failures: lookup("UPSCALE_POLL_MAX_FAILURES")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(POLL_MAX_CONSECUTIVE_FAILURES),
            request_timeout_secs: lookup("UPSCALE_REQUEST_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(REQUEST_TIMEOUT_SECS),
            upload_timeout_secs: lookup("UPSCALE_UPLOAD_TIMEOUT_SECS")
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(UPLOAD_TIMEOUT_SECS),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "UPSCALE_API_URL must be an http(s) URL, got '{}'",
                self.api_url
            ));
        }

        for (name, value) in [
            ("UPSCALE_IMAGE_ENDPOINT", &self.image_endpoint),
            ("UPSCALE_VIDEO_ENDPOINT", &self.video_endpoint),
            ("UPSCALE_STATUS_ENDPOINT", &self.status_endpoint),
        ] {
            if !value.starts_with('/') {
                return Err(anyhow::anyhow!(
                    "{} must be an absolute path starting with '/', got '{}'",
                    name,
                    value
                ));
            }
        }

        if self.max_file_size_bytes == 0 {
            return Err(anyhow::anyhow!("UPSCALE_MAX_FILE_SIZE_MB must be positive"));
        }

        validate_resolution(&self.target_resolution)?;
        validate_scale(&self.scale)?;

        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("UPSCALE_POLL_INTERVAL_MS must be positive"));
        }

        if self.poll_max_backoff_ms < self.poll_interval_ms {
            return Err(anyhow::anyhow!(
                "UPSCALE_POLL_MAX_BACKOFF_MS ({}) must not be lower than UPSCALE_POLL_INTERVAL_MS ({})",
                self.poll_max_backoff_ms,
                self.poll_interval_ms
            ));
        }

        if self.poll_max_consecutive_failures == 0 {
            return Err(anyhow::anyhow!("UPSCALE_POLL_MAX_FAILURES must be at least 1"));
        }

        Ok(())
    }

    pub fn params(&self) -> UpscaleParams {
        UpscaleParams {
            target_resolution: self.target_resolution.clone(),
            scale: self.scale.clone(),
            preserve_audio: self.preserve_audio,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_max_backoff(&self) -> Duration {
        Duration::from_millis(self.poll_max_backoff_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

/// `<width>x<height>` with positive integers, e.g. `3840x2160`.
pub fn validate_resolution(value: &str) -> Result<(), anyhow::Error> {
    let valid = value
        .split_once('x')
        .map(|(w, h)| is_positive_int(w) && is_positive_int(h))
        .unwrap_or(false);
    if !valid {
        return Err(anyhow::anyhow!(
            "Target resolution must look like 3840x2160, got '{}'",
            value
        ));
    }
    Ok(())
}

/// `<factor>x` with a positive integer factor, e.g. `4x`.
pub fn validate_scale(value: &str) -> Result<(), anyhow::Error> {
    let valid = value
        .strip_suffix('x')
        .map(is_positive_int)
        .unwrap_or(false);
    if !valid {
        return Err(anyhow::anyhow!(
            "Scale must look like 4x, got '{}'",
            value
        ));
    }
    Ok(())
}

fn is_positive_int(value: &str) -> bool {
    value.parse::<u32>().map(|n| n > 0).unwrap_or(false)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
