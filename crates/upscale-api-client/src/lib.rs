//! HTTP client and async driver for the upscale service.
//!
//! [`ApiClient`] wraps reqwest with generic GET/multipart helpers and domain
//! methods (upload with progress, job status, result download). The
//! [`UpscaleRunner`] drives an [`upscale_core::UpscaleSession`] through
//! transfer and completion tracking against any [`UpscaleBackend`].

pub mod api;
pub mod backend;
pub mod progress;
pub mod runner;
pub mod tracker;

use anyhow::{Context, Result};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use upscale_core::models::EndpointKind;
use upscale_core::UpscaleConfig;

/// Paths of the backend endpoints, relative to the base URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoints {
    pub image: String,
    pub video: String,
    pub status: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        let config = UpscaleConfig::default();
        Self::from(&config)
    }
}

impl From<&UpscaleConfig> for Endpoints {
    fn from(config: &UpscaleConfig) -> Self {
        Self {
            image: config.image_endpoint.clone(),
            video: config.video_endpoint.clone(),
            status: config.status_endpoint.trim_end_matches('/').to_string(),
        }
    }
}

impl Endpoints {
    pub fn upload(&self, kind: EndpointKind) -> &str {
        match kind {
            EndpointKind::Image => &self.image,
            EndpointKind::Video => &self.video,
        }
    }
}

/// HTTP client for the upscale service.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    endpoints: Endpoints,
    upload_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: String, endpoints: Endpoints, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            endpoints,
            upload_timeout: Duration::from_secs(3600),
        })
    }

    pub fn from_config(config: &UpscaleConfig) -> Result<Self> {
        let mut client = Self::new(
            config.api_url.clone(),
            Endpoints::from(config),
            config.request_timeout(),
        )?;
        client.upload_timeout = config.upload_timeout();
        Ok(client)
    }

    /// Create client from environment (see [`UpscaleConfig::from_env`]).
    pub fn from_env() -> Result<Self> {
        let config = UpscaleConfig::from_env()?;
        Self::from_config(&config)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn upload_timeout(&self) -> Duration {
        self.upload_timeout
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// GET request with optional query parameters. Deserializes JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = self.build_url(path);
        let mut request = self.client.get(&url);

        if !query.is_empty() {
            request = request.query(query);
        }

        let response = request.send().await.context("Failed to send request")?;
        let response = ensure_success(response).await?;

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// POST multipart form and deserialize response.
    pub async fn post_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T> {
        let url = self.build_url(path);
        let request = self
            .client
            .post(&url)
            .timeout(self.upload_timeout)
            .multipart(form);

        let response = request.send().await.context("Failed to send request")?;
        let response = ensure_success(response).await?;

        let body: T = response
            .json()
            .await
            .context("Failed to parse response as JSON")?;

        Ok(body)
    }

    /// Raw client for custom requests.
    pub fn client(&self) -> &Client {
        &self.client
    }
}

/// Turn a non-2xx response into an error carrying the status and body text.
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(anyhow::anyhow!(
            "API request failed with status {}: {}",
            status,
            error_text
        ));
    }
    Ok(response)
}

pub use backend::{ProgressFn, UpscaleBackend};
pub use runner::{RunOutcome, UpscaleRunner};
pub use tracker::RetryPolicy;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_route_by_kind() {
        let endpoints = Endpoints::default();
        assert_eq!(endpoints.upload(EndpointKind::Image), "/api/upscale/image");
        assert_eq!(endpoints.upload(EndpointKind::Video), "/api/upscale/video");
        assert_eq!(endpoints.status, "/api/upscale/status");
    }

    #[test]
    fn build_url_trims_base() {
        let client = ApiClient::new(
            "http://localhost:8000/".to_string(),
            Endpoints::default(),
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(
            client.build_url("/api/upscale/image"),
            "http://localhost:8000/api/upscale/image"
        );
    }
}
