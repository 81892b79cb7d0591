//! Generation strategies: how image bytes are obtained from the service.

use crate::error::GenerationError;
use crate::generation::retry::RetryingTransport;
use crate::request::{GenerationRequest, ImageRequest};
use crate::service::{ImageService, JobHandle, JobStatus};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Strategy selector used in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    #[default]
    Synchronous,
    AsyncPolled,
}

impl StrategyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StrategyKind::Synchronous => "synchronous",
            StrategyKind::AsyncPolled => "async_polled",
        }
    }
}

impl std::str::FromStr for StrategyKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "synchronous" | "sync" => Ok(StrategyKind::Synchronous),
            "async_polled" | "async-polled" | "async" => Ok(StrategyKind::AsyncPolled),
            other => Err(format!(
                "unknown strategy '{}' (expected 'synchronous' or 'async_polled')",
                other
            )),
        }
    }
}

/// Poll cadence and overall budget for asynchronous jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollPolicy {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

fn default_interval_ms() -> u64 {
    5_000
}

fn default_timeout_ms() -> u64 {
    300_000
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            timeout_ms: default_timeout_ms(),
        }
    }
}

impl PollPolicy {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Raw image bytes plus how long it took to obtain them.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    pub bytes: Vec<u8>,
    pub elapsed: Duration,
    /// Set by the asynchronous strategy only
    pub job_id: Option<JobHandle>,
}

/// How a session obtains images. Chosen once per session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationStrategy {
    /// One round trip returns the final image.
    Synchronous,
    /// Submit a job, poll it to completion, then fetch the result.
    AsyncPolled(PollPolicy),
}

impl GenerationStrategy {
    pub fn new(kind: StrategyKind, polling: PollPolicy) -> Self {
        match kind {
            StrategyKind::Synchronous => GenerationStrategy::Synchronous,
            StrategyKind::AsyncPolled => GenerationStrategy::AsyncPolled(polling),
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            GenerationStrategy::Synchronous => StrategyKind::Synchronous,
            GenerationStrategy::AsyncPolled(_) => StrategyKind::AsyncPolled,
        }
    }

    /// Obtain image bytes for one request.
    ///
    /// The transport retries only the step that returns bytes: the single call of
    /// the synchronous variant, the fetch of the polled one. Submit and poll are
    /// attempted once; a failed poll means the job is lost.
    pub async fn generate(
        &self,
        service: &dyn ImageService,
        transport: &RetryingTransport,
        request: &GenerationRequest,
    ) -> Result<GeneratedImage, GenerationError> {
        let started = Instant::now();
        let payload = ImageRequest::from_request(request);

        match self {
            GenerationStrategy::Synchronous => {
                debug!(item = %request.id, "Requesting image");
                let response = transport
                    .run("generate", |_| service.generate(&payload))
                    .await?;
                let image = response.image.ok_or_else(|| {
                    GenerationError::Protocol("response carried no image payload".to_string())
                })?;
                let bytes = image.decode()?;
                Ok(GeneratedImage {
                    bytes,
                    elapsed: started.elapsed(),
                    job_id: None,
                })
            }
            GenerationStrategy::AsyncPolled(policy) => {
                let job = service.submit(&payload).await?;
                info!(item = %request.id, job_id = %job, "Job submitted");

                let location = poll_until_complete(service, transport, &job, policy).await?;

                let bytes = transport
                    .run("fetch", |_| service.fetch(&location))
                    .await?;
                Ok(GeneratedImage {
                    bytes,
                    elapsed: started.elapsed(),
                    job_id: Some(job),
                })
            }
        }
    }
}

/// Poll `job` until it completes, fails, or the policy's deadline passes.
///
/// Every poll call is itself bounded by the time left before the deadline.
async fn poll_until_complete(
    service: &dyn ImageService,
    transport: &RetryingTransport,
    job: &JobHandle,
    policy: &PollPolicy,
) -> Result<String, GenerationError> {
    let started = Instant::now();
    let deadline = started + policy.timeout();
    let mut polls = 0u32;

    loop {
        let now = Instant::now();
        if now >= deadline {
            warn!(job_id = %job, polls, "Polling timed out");
            return Err(GenerationError::Timeout(policy.timeout()));
        }

        polls += 1;
        let status = match tokio::time::timeout(deadline - now, service.poll(job)).await {
            Ok(status) => status?,
            Err(_) => {
                warn!(job_id = %job, polls, "Poll call outlived the polling budget");
                return Err(GenerationError::Timeout(policy.timeout()));
            }
        };

        match status {
            JobStatus::Completed { download_location } => {
                info!(
                    job_id = %job,
                    polls,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job completed"
                );
                return Ok(download_location);
            }
            JobStatus::Failed { reason } => {
                warn!(job_id = %job, %reason, "Job failed");
                return Err(GenerationError::PollFailed {
                    job_id: job.to_string(),
                    reason,
                });
            }
            JobStatus::Pending => {
                debug!(
                    job_id = %job,
                    polls,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Job pending"
                );
                let pause = policy
                    .interval()
                    .min(deadline.saturating_duration_since(Instant::now()));
                transport.sleeper().sleep(pause).await;
            }
        }
    }
}
