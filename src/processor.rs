//! Item processor: one request in, one outcome out.

use crate::error::GenerationError;
use crate::generation::{GeneratedImage, GenerationStrategy, RetryingTransport};
use crate::record::{FailedItem, GeneratedAsset, ItemOutcome};
use crate::request::{GenerationGroup, GenerationRequest};
use crate::service::ImageService;
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

pub struct ItemProcessor {
    service: Arc<dyn ImageService>,
    strategy: GenerationStrategy,
    transport: RetryingTransport,
    extension: String,
}

impl ItemProcessor {
    pub fn new(
        service: Arc<dyn ImageService>,
        strategy: GenerationStrategy,
        transport: RetryingTransport,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            service,
            strategy,
            transport,
            extension: extension.into(),
        }
    }

    pub fn strategy(&self) -> GenerationStrategy {
        self.strategy
    }

    /// Generate and persist one request.
    ///
    /// Never fails: every error becomes a [`ItemOutcome::Failed`].
    pub async fn process(&self, request: &GenerationRequest, group: &GenerationGroup) -> ItemOutcome {
        match self.try_process(request, group).await {
            Ok(asset) => {
                info!(
                    item = %asset.id,
                    path = %asset.file_path.display(),
                    bytes = asset.file_size_bytes,
                    elapsed_ms = asset.generation_time_ms,
                    "Item generated"
                );
                ItemOutcome::Success(asset)
            }
            Err(err) => {
                warn!(item = %request.id, group = %group.name, kind = ?err.kind(), error = %err, "Item failed");
                ItemOutcome::Failed(FailedItem::from_error(request, &err))
            }
        }
    }

    async fn try_process(
        &self,
        request: &GenerationRequest,
        group: &GenerationGroup,
    ) -> Result<GeneratedAsset, GenerationError> {
        let output_path = request.output_path(&group.output_location, &self.extension);

        let GeneratedImage {
            bytes,
            elapsed,
            job_id,
        } = self
            .strategy
            .generate(self.service.as_ref(), &self.transport, request)
            .await?;

        let file_size_bytes = persist_image(&output_path, &bytes).await?;

        Ok(GeneratedAsset {
            id: request.id.clone(),
            job_id: job_id.map(|job| job.to_string()),
            file_path: output_path,
            prompt: request.prompt.clone(),
            params: request.params.clone(),
            generated_at: Utc::now(),
            generation_time_seconds: elapsed.as_secs(),
            generation_time_ms: elapsed.as_millis() as u64,
            size: request.params.size_label(),
            file_size_bytes,
            content_hash: blake3::hash(&bytes).to_hex().to_string(),
            review_flags: Vec::new(),
        })
    }
}

/// Write `bytes` to `path` and verify the result is a non-empty file.
///
/// The bytes go to a temporary sibling that is renamed into place, so a failed
/// write never leaves a partial artifact at `path`.
pub async fn persist_image(path: &Path, bytes: &[u8]) -> Result<u64, GenerationError> {
    if bytes.is_empty() {
        return Err(GenerationError::Persistence(format!(
            "refusing to write empty image to {}",
            path.display()
        )));
    }

    let temp_path = path.with_extension("part");
    if let Err(e) = fs::write(&temp_path, bytes).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(GenerationError::Persistence(format!(
            "failed to write {}: {}",
            temp_path.display(),
            e
        )));
    }
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(GenerationError::Persistence(format!(
            "failed to move image into {}: {}",
            path.display(),
            e
        )));
    }

    let written = fs::metadata(path)
        .await
        .map(|meta| meta.len())
        .map_err(|e| {
            GenerationError::Persistence(format!("failed to verify {}: {}", path.display(), e))
        })?;
    if written == 0 {
        let _ = fs::remove_file(path).await;
        return Err(GenerationError::Persistence(format!(
            "{} is empty after write",
            path.display()
        )));
    }

    debug!(path = %path.display(), bytes = written, "Image persisted");
    Ok(written)
}
