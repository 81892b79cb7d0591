//! Shared test utilities for integration tests
//!
//! A scripted in-memory image service, a sleeper that records every requested
//! pause, and builders for sessions rooted in a temporary directory.

use async_trait::async_trait;
use parking_lot::Mutex;
use pixbatch::config::BatchConfig;
use pixbatch::error::GenerationError;
use pixbatch::request::{GenerationGroup, GenerationParams, ImageRequest};
use pixbatch::service::{EncodedImage, ImageResponse, ImageService, JobHandle, JobStatus};
use pixbatch::timing::Sleeper;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

/// Serializes tests that set `PIXBATCH_*` environment variables.
pub static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Bytes returned whenever a script runs out of explicit answers.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\nfake-image-data";

/// How many times each service operation was called.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CallCounts {
    pub generate: usize,
    pub submit: usize,
    pub poll: usize,
    pub fetch: usize,
}

/// In-memory [`ImageService`] answering from per-operation queues.
///
/// Empty queues fall back to success: an image for `generate` and `fetch`, a fresh
/// job for `submit`, and `Pending` for `poll`.
#[derive(Default)]
pub struct ScriptedService {
    generate: Mutex<VecDeque<Result<ImageResponse, GenerationError>>>,
    submit: Mutex<VecDeque<Result<JobHandle, GenerationError>>>,
    poll: Mutex<VecDeque<Result<JobStatus, GenerationError>>>,
    fetch: Mutex<VecDeque<Result<Vec<u8>, GenerationError>>>,
    poll_delay: Option<Duration>,
    counts: Mutex<CallCounts>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate_returns(self, result: Result<ImageResponse, GenerationError>) -> Self {
        self.generate.lock().push_back(result);
        self
    }

    pub fn generate_fails(self, error: GenerationError) -> Self {
        self.generate_returns(Err(error))
    }

    pub fn submit_returns(self, result: Result<JobHandle, GenerationError>) -> Self {
        self.submit.lock().push_back(result);
        self
    }

    pub fn poll_returns(self, result: Result<JobStatus, GenerationError>) -> Self {
        self.poll.lock().push_back(result);
        self
    }

    pub fn fetch_returns(self, result: Result<Vec<u8>, GenerationError>) -> Self {
        self.fetch.lock().push_back(result);
        self
    }

    /// Every poll call takes this long before answering.
    pub fn poll_takes(mut self, delay: Duration) -> Self {
        self.poll_delay = Some(delay);
        self
    }

    pub fn counts(&self) -> CallCounts {
        *self.counts.lock()
    }

    /// Prompts seen by `generate` and `submit`, in call order.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }
}

pub fn image_response(bytes: &[u8]) -> ImageResponse {
    ImageResponse {
        image: Some(EncodedImage::Binary(bytes.to_vec())),
    }
}

pub fn completed(location: &str) -> JobStatus {
    JobStatus::Completed {
        download_location: location.to_string(),
    }
}

#[async_trait]
impl ImageService for ScriptedService {
    async fn generate(&self, request: &ImageRequest) -> Result<ImageResponse, GenerationError> {
        self.counts.lock().generate += 1;
        self.prompts.lock().push(request.description.clone());
        let next = self.generate.lock().pop_front();
        next.unwrap_or_else(|| Ok(image_response(PNG_BYTES)))
    }

    async fn submit(&self, request: &ImageRequest) -> Result<JobHandle, GenerationError> {
        let count = {
            let mut counts = self.counts.lock();
            counts.submit += 1;
            counts.submit
        };
        self.prompts.lock().push(request.description.clone());
        let next = self.submit.lock().pop_front();
        next.unwrap_or_else(|| Ok(JobHandle::new(format!("job-{}", count))))
    }

    async fn poll(&self, _job: &JobHandle) -> Result<JobStatus, GenerationError> {
        self.counts.lock().poll += 1;
        if let Some(delay) = self.poll_delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.poll.lock().pop_front();
        next.unwrap_or(Ok(JobStatus::Pending))
    }

    async fn fetch(&self, _location: &str) -> Result<Vec<u8>, GenerationError> {
        self.counts.lock().fetch += 1;
        let next = self.fetch.lock().pop_front();
        next.unwrap_or_else(|| Ok(PNG_BYTES.to_vec()))
    }

    fn service_name(&self) -> &str {
        "scripted"
    }
}

/// Records each requested pause, then actually waits on the tokio clock so paused
/// test time advances with it.
#[derive(Default)]
pub struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().clone()
    }

    pub fn count_of(&self, duration: Duration) -> usize {
        self.slept.lock().iter().filter(|d| **d == duration).count()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().push(duration);
        tokio::time::sleep(duration).await;
    }
}

/// Default configuration with the session record written under `records_dir`.
pub fn config_in(records_dir: &Path) -> BatchConfig {
    let mut config = BatchConfig::default();
    config.output.records_dir = records_dir.to_path_buf();
    config
}

/// A group under `root` with one item per `(id, prompt)` pair.
pub fn group(root: &Path, name: &str, items: &[(&str, &str)]) -> GenerationGroup {
    let defaults = GenerationParams::new().with("width", 32).with("height", 32);
    let mut group = GenerationGroup::new(name, root.join(name), defaults);
    for (id, prompt) in items {
        group.push(*id, *prompt, None, "");
    }
    group
}
