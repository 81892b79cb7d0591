//! Image Service Boundary
//!
//! Request/response contract of the remote image-generation service and the HTTP
//! client that speaks it. The service is opaque: one synchronous round trip that
//! returns an embedded image, or a submit / poll / fetch job lifecycle.

use crate::config::ServiceConfig;
use crate::error::{ApiError, GenerationError};
use crate::request::ImageRequest;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one asynchronous generation job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// State of a submitted job as reported by one poll call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Completed { download_location: String },
    Failed { reason: String },
}

/// Image carried in a synchronous response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodedImage {
    Base64(String),
    Binary(Vec<u8>),
}

impl EncodedImage {
    pub fn decode(self) -> Result<Vec<u8>, GenerationError> {
        match self {
            EncodedImage::Binary(bytes) => Ok(bytes),
            EncodedImage::Base64(text) => {
                // Data URLs carry a "data:image/png;base64," prefix.
                let payload = match text.split_once(";base64,") {
                    Some((_, rest)) => rest,
                    None => text.as_str(),
                };
                BASE64.decode(payload.trim()).map_err(|e| {
                    GenerationError::Protocol(format!("image payload is not valid base64: {}", e))
                })
            }
        }
    }
}

/// Synchronous generation response. `image` is absent when the service broke its
/// contract.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ImageResponse {
    pub image: Option<EncodedImage>,
}

/// Remote image-generation service
#[async_trait]
pub trait ImageService: Send + Sync {
    /// One round trip returning the final image.
    async fn generate(&self, request: &ImageRequest) -> Result<ImageResponse, GenerationError>;

    /// Start an asynchronous job.
    async fn submit(&self, request: &ImageRequest) -> Result<JobHandle, GenerationError>;

    /// Report the state of a submitted job.
    async fn poll(&self, job: &JobHandle) -> Result<JobStatus, GenerationError>;

    /// Download finished image bytes.
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, GenerationError>;

    fn service_name(&self) -> &str;
}

/// Classify a non-success HTTP status.
///
/// 408, 425, 429 and 5xx are worth retrying; every other status means the request
/// itself is wrong and resending it cannot help.
pub fn classify_status(status: StatusCode, body: &str) -> GenerationError {
    let detail = if body.trim().is_empty() {
        format!("status {}", status)
    } else {
        format!("status {}: {}", status, body.trim())
    };
    match status.as_u16() {
        408 | 425 | 429 => GenerationError::Transport(detail),
        code if code >= 500 => GenerationError::Transport(detail),
        401 | 403 => GenerationError::Rejected(format!("authentication failed ({})", detail)),
        _ => GenerationError::Rejected(detail),
    }
}

fn map_http_error(error: reqwest::Error) -> GenerationError {
    if let Some(status) = error.status() {
        classify_status(status, &error.to_string())
    } else if error.is_timeout() {
        GenerationError::Transport(format!("request timeout: {}", error))
    } else if error.is_connect() {
        GenerationError::Transport(format!("connection error: {}", error))
    } else if error.is_decode() {
        GenerationError::Protocol(format!("undecodable response: {}", error))
    } else if error.is_builder() {
        GenerationError::Rejected(format!("malformed request: {}", error))
    } else {
        GenerationError::Transport(format!("HTTP error: {}", error))
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, GenerationError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(classify_status(status, &body))
}

#[derive(Deserialize)]
struct GenerateResponseBody {
    image: Option<ImageField>,
}

#[derive(Deserialize)]
struct ImageField {
    base64: Option<String>,
}

#[derive(Deserialize)]
struct SubmitResponseBody {
    #[serde(alias = "object_id", alias = "id")]
    job_id: Option<String>,
}

#[derive(Deserialize)]
struct PollResponseBody {
    status: String,
    #[serde(default, alias = "download_url")]
    download_location: Option<String>,
    #[serde(default, alias = "error")]
    reason: Option<String>,
}

impl PollResponseBody {
    fn into_status(self, job: &JobHandle) -> Result<JobStatus, GenerationError> {
        match self.status.to_ascii_lowercase().as_str() {
            "pending" | "queued" | "processing" | "running" => Ok(JobStatus::Pending),
            "completed" | "complete" | "succeeded" => match self.download_location {
                Some(location) if !location.trim().is_empty() => Ok(JobStatus::Completed {
                    download_location: location,
                }),
                _ => Err(GenerationError::Protocol(format!(
                    "job {} completed without a download location",
                    job
                ))),
            },
            "failed" | "error" | "cancelled" => Ok(JobStatus::Failed {
                reason: self
                    .reason
                    .unwrap_or_else(|| "service reported failure".to_string()),
            }),
            other => Err(GenerationError::Protocol(format!(
                "job {} reported unknown status '{}'",
                job, other
            ))),
        }
    }
}

/// HTTP client for the PixelLab API.
pub struct PixelLabClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl PixelLabClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ApiError::ServiceError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.resolved_api_key(),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Absolute URLs are used as-is; anything else is resolved against the base URL.
    fn resolve_location(&self, location: &str) -> String {
        if location.starts_with("http://") || location.starts_with("https://") {
            location.to_string()
        } else {
            self.endpoint(location)
        }
    }

    fn authorized(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(key) => builder.bearer_auth(key),
            None => builder,
        }
    }
}

#[async_trait]
impl ImageService for PixelLabClient {
    async fn generate(&self, request: &ImageRequest) -> Result<ImageResponse, GenerationError> {
        let url = self.endpoint("generate-image-pixflux");
        let response = self
            .authorized(self.client.post(&url))
            .json(request)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;

        let is_binary = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("image/"))
            .unwrap_or(false);
        if is_binary {
            let bytes = response.bytes().await.map_err(map_http_error)?;
            return Ok(ImageResponse {
                image: Some(EncodedImage::Binary(bytes.to_vec())),
            });
        }

        let body: GenerateResponseBody = response.json().await.map_err(|e| {
            GenerationError::Protocol(format!("Failed to parse generate response: {}", e))
        })?;
        Ok(ImageResponse {
            image: body
                .image
                .and_then(|image| image.base64)
                .map(EncodedImage::Base64),
        })
    }

    async fn submit(&self, request: &ImageRequest) -> Result<JobHandle, GenerationError> {
        let url = self.endpoint("map-objects");
        let response = self
            .authorized(self.client.post(&url))
            .json(request)
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;

        let body: SubmitResponseBody = response.json().await.map_err(|e| {
            GenerationError::Protocol(format!("Failed to parse submit response: {}", e))
        })?;
        body.job_id
            .filter(|id| !id.trim().is_empty())
            .map(JobHandle::new)
            .ok_or_else(|| GenerationError::Protocol("submit response carried no job id".into()))
    }

    async fn poll(&self, job: &JobHandle) -> Result<JobStatus, GenerationError> {
        let url = self.endpoint(&format!("map-objects/{}", job));
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;

        let body: PollResponseBody = response.json().await.map_err(|e| {
            GenerationError::Protocol(format!("Failed to parse poll response: {}", e))
        })?;
        body.into_status(job)
    }

    async fn fetch(&self, location: &str) -> Result<Vec<u8>, GenerationError> {
        let url = self.resolve_location(location);
        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(map_http_error)?;
        let response = ensure_success(response).await?;
        let bytes = response.bytes().await.map_err(map_http_error)?;
        Ok(bytes.to_vec())
    }

    fn service_name(&self) -> &str {
        "pixellab"
    }
}
