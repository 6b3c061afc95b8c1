//! Output format and quality selection.
//!
//! The variants mirror the remote service's fixed enumerations; their
//! serde names are the exact wire strings. Anything else is rejected at
//! parse time, before a request is built.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Container format the conversion should produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Mkv,
    Mov,
    Avi,
}

impl OutputFormat {
    /// All accepted formats.
    pub const ALL: &'static [OutputFormat] = &[
        OutputFormat::Mp4,
        OutputFormat::Mkv,
        OutputFormat::Mov,
        OutputFormat::Avi,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Mkv => "mkv",
            OutputFormat::Mov => "mov",
            OutputFormat::Avi => "avi",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = FormatParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mp4" => Ok(OutputFormat::Mp4),
            "mkv" => Ok(OutputFormat::Mkv),
            "mov" => Ok(OutputFormat::Mov),
            "avi" => Ok(OutputFormat::Avi),
            _ => Err(FormatParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown output format: {0}")]
pub struct FormatParseError(String);

/// Target resolution for the converted video.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum VideoQuality {
    #[serde(rename = "360p")]
    Q360p,
    #[serde(rename = "480p")]
    Q480p,
    #[default]
    #[serde(rename = "720p")]
    Q720p,
    #[serde(rename = "1080p")]
    Q1080p,
}

impl VideoQuality {
    /// All accepted qualities.
    pub const ALL: &'static [VideoQuality] = &[
        VideoQuality::Q360p,
        VideoQuality::Q480p,
        VideoQuality::Q720p,
        VideoQuality::Q1080p,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            VideoQuality::Q360p => "360p",
            VideoQuality::Q480p => "480p",
            VideoQuality::Q720p => "720p",
            VideoQuality::Q1080p => "1080p",
        }
    }
}

impl fmt::Display for VideoQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for VideoQuality {
    type Err = QualityParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "360p" => Ok(VideoQuality::Q360p),
            "480p" => Ok(VideoQuality::Q480p),
            "720p" => Ok(VideoQuality::Q720p),
            "1080p" => Ok(VideoQuality::Q1080p),
            _ => Err(QualityParseError(s.to_string())),
        }
    }
}

#[derive(Debug, Error)]
#[error("Unknown video quality: {0}")]
pub struct QualityParseError(String);

/// Options for one conversion submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ConvertOptions {
    pub output_format: OutputFormat,
    pub video_quality: VideoQuality,
}

impl ConvertOptions {
    pub fn new(output_format: OutputFormat, video_quality: VideoQuality) -> Self {
        Self {
            output_format,
            video_quality,
        }
    }

    /// Parse untyped format/quality strings at the boundary.
    ///
    /// This is the single place a `"wmv"`-style value is refused; typed
    /// options cannot hold one.
    pub fn parse(format: &str, quality: &str) -> Result<Self, OptionsParseError> {
        Ok(Self {
            output_format: format.parse()?,
            video_quality: quality.parse()?,
        })
    }
}

#[derive(Debug, Error)]
pub enum OptionsParseError {
    #[error(transparent)]
    Format(#[from] FormatParseError),
    #[error(transparent)]
    Quality(#[from] QualityParseError),
}
