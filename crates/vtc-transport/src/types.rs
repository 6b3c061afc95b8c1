//! Wire types for the transcoder service.

use serde::{Deserialize, Serialize};
use vtc_models::VideoId;

/// Response to a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitResponse {
    /// Id to track the conversion by.
    pub video_id: VideoId,
    /// Informational message, not load-bearing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Conversion state as reported by the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteStatus {
    Processing,
    Completed,
    Failed,
}

/// One status poll result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    /// Progress 0-100; expected while processing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
    pub status: RemoteStatus,
    /// Location of the converted artifact, on completion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transcoded_video_url: Option<String>,
}
