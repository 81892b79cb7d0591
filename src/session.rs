//! Session orchestrator
//!
//! Walks every group and item in input order, processes items one at a time with a
//! courtesy pause between consecutive service calls, accumulates outcomes and
//! persists the session record once at the end.

use crate::config::BatchConfig;
use crate::error::{ApiError, FailureKind};
use crate::generation::{GenerationStrategy, RetryingTransport};
use crate::processor::ItemProcessor;
use crate::record::{FailedItem, ItemOutcome, SessionRecord, SessionStatus};
use crate::request::GenerationGroup;
use crate::service::ImageService;
use crate::store::SessionRecordStore;
use crate::timing::Sleeper;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Failure reason recorded for every item of a group whose output location could
/// not be created.
pub const OUTPUT_UNAVAILABLE: &str = "output location unavailable";

/// A finished (or cancelled) session and where its record was written.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub record: SessionRecord,
    pub record_path: PathBuf,
}

pub struct BatchSession {
    processor: ItemProcessor,
    service_name: String,
    sleeper: Arc<dyn Sleeper>,
    pacing: Duration,
    store: SessionRecordStore,
}

impl BatchSession {
    pub fn new(
        config: &BatchConfig,
        service: Arc<dyn ImageService>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        let strategy = GenerationStrategy::new(config.service.strategy, config.polling);
        let transport = RetryingTransport::new(config.retry, sleeper.clone());
        let service_name = service.service_name().to_string();
        let processor =
            ItemProcessor::new(service, strategy, transport, config.output.extension.clone());

        Self {
            processor,
            service_name,
            sleeper,
            pacing: config.pacing.delay(),
            store: SessionRecordStore::new(&config.output.records_dir),
        }
    }

    pub fn store(&self) -> &SessionRecordStore {
        &self.store
    }

    /// Name of the image service this session talks to.
    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    /// Run a session over validated groups.
    ///
    /// Item failures never abort the run. The only error returned is failing to
    /// persist the session record itself.
    pub async fn run(
        &self,
        session_name: &str,
        groups: &[GenerationGroup],
        cancel: &CancellationToken,
    ) -> Result<SessionOutcome, ApiError> {
        let total: usize = groups.iter().map(|g| g.requests.len()).sum();
        let strategy = self.processor.strategy().kind();
        let mut record = SessionRecord::start(session_name, strategy, total);

        info!(
            session = %session_name,
            groups = groups.len(),
            total_items = total,
            strategy = strategy.as_str(),
            service = %self.service_name,
            "Session started"
        );

        let mut position = 0usize;
        let mut service_calls = 0usize;
        let mut cancelled = false;

        'groups: for group in groups {
            info!(
                group = %group.name,
                output = %group.output_location.display(),
                items = group.requests.len(),
                "Processing group"
            );

            if let Err(e) = tokio::fs::create_dir_all(&group.output_location).await {
                error!(
                    group = %group.name,
                    output = %group.output_location.display(),
                    error = %e,
                    "Output location unavailable; skipping group"
                );
                for request in &group.requests {
                    position += 1;
                    record.record(ItemOutcome::Failed(FailedItem::with_reason(
                        request,
                        OUTPUT_UNAVAILABLE,
                        FailureKind::Configuration,
                    )));
                }
                continue;
            }

            for request in &group.requests {
                if cancel.is_cancelled() {
                    cancelled = true;
                    break 'groups;
                }

                if service_calls > 0 && !self.pace(cancel).await {
                    cancelled = true;
                    break 'groups;
                }

                position += 1;
                info!(item = %request.id, "[{}/{}] {}", position, total, request.id);

                let outcome = self.processor.process(request, group).await;
                service_calls += 1;
                record.record(outcome);
            }
        }

        let status = if cancelled {
            warn!(
                session = %session_name,
                processed = record.processed(),
                total_items = total,
                "Session cancelled; saving partial record"
            );
            SessionStatus::Cancelled
        } else {
            SessionStatus::Completed
        };
        record.finish(status);

        info!(
            session = %session_name,
            status = status.as_str(),
            generated = record.generated.len(),
            failed = record.failed.len(),
            "Session finished"
        );

        let record_path = self.store.save(&record).await?;
        Ok(SessionOutcome {
            record,
            record_path,
        })
    }

    /// Courtesy delay before the next service call. Returns `false` if the session
    /// was cancelled while waiting.
    async fn pace(&self, cancel: &CancellationToken) -> bool {
        if self.pacing.is_zero() {
            return !cancel.is_cancelled();
        }
        info!(delay_ms = self.pacing.as_millis() as u64, "Pacing before next item");
        tokio::select! {
            _ = self.sleeper.sleep(self.pacing) => true,
            _ = cancel.cancelled() => false,
        }
    }
}
