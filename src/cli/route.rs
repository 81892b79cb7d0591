//! CLI route: single route table and run context. Dispatches to the session services
//! and presentation.

use crate::config::{BatchConfig, ConfigLoader, StrategyKind};
use crate::error::ApiError;
use crate::input::SessionInput;
use crate::service::{ImageService, PixelLabClient};
use crate::session::BatchSession;
use crate::timing::{Sleeper, TokioSleeper};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::parse::Commands;
use crate::cli::presentation::{format_plan_text, format_session_summary, format_validation_summary};

/// Runtime context for CLI execution: workspace and the loaded configuration.
pub struct RunContext {
    workspace_root: PathBuf,
    config: BatchConfig,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, ApiError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(&workspace_root, cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Ok(Self::with_config(workspace_root, config))
    }

    pub fn with_config(workspace_root: PathBuf, config: BatchConfig) -> Self {
        Self {
            workspace_root,
            config,
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        match command {
            Commands::Run {
                input,
                strategy,
                records_dir,
                pacing_ms,
                format,
            } => {
                let config = self.run_config(strategy.as_deref(), records_dir.as_deref(), *pacing_ms)?;
                self.handle_run(input, config, format)
            }
            Commands::Validate { input } => {
                let plan = SessionInput::load(input)?.validate()?;
                Ok(format_validation_summary(&plan))
            }
            Commands::Plan {
                input,
                output,
                format,
            } => self.handle_plan(input, output.as_deref(), format),
            Commands::Config => {
                self.config.ensure_valid()?;
                self.config.to_toml()
            }
        }
    }

    /// Effective configuration for one run: loaded config plus command-line overrides.
    fn run_config(
        &self,
        strategy: Option<&str>,
        records_dir: Option<&Path>,
        pacing_ms: Option<u64>,
    ) -> Result<BatchConfig, ApiError> {
        let mut config = self.config.clone();
        if let Some(strategy) = strategy {
            config.service.strategy = strategy
                .parse::<StrategyKind>()
                .map_err(ApiError::ConfigError)?;
        }
        if let Some(dir) = records_dir {
            config.output.records_dir = dir.to_path_buf();
        }
        if let Some(ms) = pacing_ms {
            config.pacing.delay_ms = ms;
        }
        if config.output.records_dir.is_relative() {
            config.output.records_dir = self.workspace_root.join(&config.output.records_dir);
        }
        config.ensure_valid()?;
        Ok(config)
    }

    fn handle_run(&self, input: &Path, config: BatchConfig, format: &str) -> Result<String, ApiError> {
        let plan = SessionInput::load(input)?.validate()?;

        if config.service.resolved_api_key().is_none() {
            warn!("No API key configured; requests are sent unauthenticated");
        }

        let service: Arc<dyn ImageService> = Arc::new(PixelLabClient::new(&config.service)?);
        let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
        let session = BatchSession::new(&config, service, sleeper);

        if tokio::runtime::Handle::try_current().is_ok() {
            return Err(ApiError::ServiceError(
                "Cannot run a session from within an async runtime context".to_string(),
            ));
        }
        let rt = tokio::runtime::Runtime::new()
            .map_err(|e| ApiError::ServiceError(format!("Failed to create runtime: {}", e)))?;

        let outcome = rt.block_on(async {
            let cancel = CancellationToken::new();
            let interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received; finishing current item and stopping");
                    interrupt.cancel();
                }
            });
            session.run(&plan.session_name, &plan.groups, &cancel).await
        })?;

        info!(
            record = %outcome.record_path.display(),
            generated = outcome.record.generated.len(),
            failed = outcome.record.failed.len(),
            "Run finished"
        );

        if format == "json" {
            serde_json::to_string_pretty(&outcome.record).map_err(|e| {
                ApiError::StorageError(crate::error::StorageError::InvalidData(e.to_string()))
            })
        } else {
            Ok(format_session_summary(&outcome, std::io::stdout().is_terminal()))
        }
    }

    fn handle_plan(&self, input: &Path, output: Option<&Path>, format: &str) -> Result<String, ApiError> {
        let plan = SessionInput::load(input)?.validate()?;
        let list = plan.task_list(&self.config.output.extension);

        let rendered = if format == "json" || output.is_some() {
            serde_json::to_string_pretty(&list).map_err(|e| {
                ApiError::StorageError(crate::error::StorageError::InvalidData(e.to_string()))
            })?
        } else {
            format_plan_text(&list)
        };

        match output {
            Some(path) => {
                std::fs::write(path, &rendered).map_err(|source| {
                    ApiError::StorageError(crate::error::StorageError::Write {
                        path: path.to_path_buf(),
                        source,
                    })
                })?;
                Ok(format!(
                    "Wrote {} tasks to {}",
                    list.total_sprites,
                    path.display()
                ))
            }
            None => Ok(rendered),
        }
    }
}
