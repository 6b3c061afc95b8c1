//! Transcoder service HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use vtc_models::{ConvertOptions, VideoId};

use crate::error::{TransportError, TransportResult};
use crate::types::{RemoteStatus, StatusReport, SubmitResponse};

/// Configuration for the transcoder client.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Base URL of the transcoder service
    pub base_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            base_url: std::env::var("TRANSCODER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8000".to_string()),
            timeout: Duration::from_secs(
                std::env::var("TRANSCODER_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

/// A video payload to submit for conversion.
///
/// The original file name is forwarded so the service can derive the
/// input format from its extension.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl VideoUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            bytes,
        }
    }
}

/// The two requests the tracker issues against the remote service.
///
/// The tracker is generic over this seam so its state machine can be
/// driven by a scripted double in tests.
#[async_trait]
pub trait TranscoderApi: Send + Sync {
    /// Upload a video and start a conversion.
    async fn submit(
        &self,
        upload: &VideoUpload,
        options: &ConvertOptions,
    ) -> TransportResult<VideoId>;

    /// Fetch the current conversion status.
    async fn status(&self, id: &VideoId) -> TransportResult<StatusReport>;
}

/// reqwest-backed transcoder client.
pub struct HttpTransport {
    http: Client,
    config: TransportConfig,
}

impl HttpTransport {
    /// Create a new client.
    pub fn new(config: TransportConfig) -> TransportResult<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(TransportError::Network)?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> TransportResult<Self> {
        Self::new(TransportConfig::from_env())
    }
}

#[async_trait]
impl TranscoderApi for HttpTransport {
    async fn submit(
        &self,
        upload: &VideoUpload,
        options: &ConvertOptions,
    ) -> TransportResult<VideoId> {
        if upload.bytes.is_empty() {
            return Err(TransportError::Validation("empty video payload".into()));
        }

        let url = format!("{}/upload_video/", self.config.base_url);

        debug!(file_name = %upload.file_name, "Submitting video to {}", url);

        let part = Part::bytes(upload.bytes.clone()).file_name(upload.file_name.clone());
        let form = Form::new()
            .part("file", part)
            .text("output_format", options.output_format.as_str())
            .text("video_quality", options.video_quality.as_str());

        let response = self.http.post(&url).multipart(form).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            warn!(status, "Transcoder rejected submission: {}", message);
            return Err(TransportError::Rejected { status, message });
        }

        let submit: SubmitResponse = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        Ok(submit.video_id)
    }

    async fn status(&self, id: &VideoId) -> TransportResult<StatusReport> {
        let url = format!("{}/video_status/{}", self.config.base_url, id);

        debug!(video_id = %id, "Fetching conversion status");

        let response = self.http.get(&url).send().await?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(TransportError::NotFound(id.clone())),
            status if !status.is_success() => {
                return Err(TransportError::Unavailable {
                    status: status.as_u16(),
                })
            }
            _ => {}
        }

        let report: StatusReport = response
            .json()
            .await
            .map_err(|e| TransportError::InvalidResponse(e.to_string()))?;

        // A processing report without a progress value is malformed;
        // surface it as a transient fault instead of guessing a value.
        if report.status == RemoteStatus::Processing && report.progress.is_none() {
            return Err(TransportError::InvalidResponse(
                "progress missing while processing".into(),
            ));
        }

        Ok(report)
    }
}
