//! HTTP client for the remote transcoder service.
//!
//! The service exposes two endpoints the client depends on: a multipart
//! upload that starts a conversion and returns the id to track it by,
//! and a status endpoint polled until the conversion settles. The client
//! keeps no state between calls.

pub mod client;
pub mod error;
pub mod types;

pub use client::{HttpTransport, TranscoderApi, TransportConfig, VideoUpload};
pub use error::{TransportError, TransportResult};
pub use types::{RemoteStatus, StatusReport, SubmitResponse};
