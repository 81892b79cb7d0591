//! Session records: per-item outcomes and the accumulated result of one run.

use crate::error::{FailureKind, GenerationError};
use crate::generation::StrategyKind;
use crate::request::{GenerationParams, GenerationRequest};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Metadata for one successfully generated file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedAsset {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    pub file_path: PathBuf,
    pub prompt: String,
    pub params: GenerationParams,
    pub generated_at: DateTime<Utc>,
    pub generation_time_seconds: u64,
    pub generation_time_ms: u64,
    /// `WxH` taken from the parameters
    pub size: String,
    pub file_size_bytes: u64,
    /// blake3 digest of the written bytes
    pub content_hash: String,
    /// Filled in later by manual review
    #[serde(default)]
    pub review_flags: Vec<String>,
}

/// Why one item produced no file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedItem {
    pub id: String,
    pub prompt: String,
    pub error: String,
    pub kind: FailureKind,
}

impl FailedItem {
    pub fn from_error(request: &GenerationRequest, error: &GenerationError) -> Self {
        Self::with_reason(request, error.to_string(), error.kind())
    }

    pub fn with_reason(request: &GenerationRequest, reason: impl Into<String>, kind: FailureKind) -> Self {
        Self {
            id: request.id.clone(),
            prompt: request.prompt.clone(),
            error: reason.into(),
            kind,
        }
    }
}

/// Result of processing one request. Exactly one payload exists per outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemOutcome {
    Success(GeneratedAsset),
    Failed(FailedItem),
}

impl ItemOutcome {
    pub fn id(&self) -> &str {
        match self {
            ItemOutcome::Success(asset) => &asset.id,
            ItemOutcome::Failed(failed) => &failed.id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ItemOutcome::Success(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Running,
    Completed,
    Cancelled,
}

impl SessionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Running => "running",
            SessionStatus::Completed => "completed",
            SessionStatus::Cancelled => "cancelled",
        }
    }
}

/// Everything a session produced.
///
/// `generated.len() + failed.len()` never exceeds `total_items`, and equals it once
/// the session completes without cancellation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub session_name: String,
    pub strategy: StrategyKind,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    pub total_items: usize,
    /// Each entry is written with `"status": "success"`.
    #[serde(with = "success_entries")]
    pub generated: Vec<GeneratedAsset>,
    pub failed: Vec<FailedItem>,
}

impl SessionRecord {
    pub fn start(session_name: impl Into<String>, strategy: StrategyKind, total_items: usize) -> Self {
        Self {
            session_name: session_name.into(),
            strategy,
            status: SessionStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            total_items,
            generated: Vec::new(),
            failed: Vec::new(),
        }
    }

    pub fn record(&mut self, outcome: ItemOutcome) {
        debug_assert!(self.processed() < self.total_items);
        match outcome {
            ItemOutcome::Success(asset) => self.generated.push(asset),
            ItemOutcome::Failed(failed) => self.failed.push(failed),
        }
    }

    pub fn finish(&mut self, status: SessionStatus) {
        self.status = status;
        self.completed_at = Some(Utc::now());
    }

    pub fn processed(&self) -> usize {
        self.generated.len() + self.failed.len()
    }

    pub fn is_complete(&self) -> bool {
        self.status == SessionStatus::Completed && self.processed() == self.total_items
    }
}

mod success_entries {
    use super::GeneratedAsset;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize)]
    #[serde(tag = "status", rename_all = "snake_case")]
    enum EntryRef<'a> {
        Success(&'a GeneratedAsset),
    }

    #[derive(Deserialize)]
    #[serde(tag = "status", rename_all = "snake_case")]
    enum Entry {
        Success(GeneratedAsset),
    }

    pub fn serialize<S: Serializer>(assets: &[GeneratedAsset], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(assets.iter().map(EntryRef::Success))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<GeneratedAsset>, D::Error> {
        let entries = Vec::<Entry>::deserialize(deserializer)?;
        Ok(entries.into_iter().map(|Entry::Success(asset)| asset).collect())
    }
}
