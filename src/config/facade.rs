//! Loader facade: assembles every configuration source in precedence order.

use super::merge::merge_policy;
use super::sources::{environment, global_file, workspace_file};
use super::BatchConfig;
use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Entry point for building a [`BatchConfig`].
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace.
    ///
    /// Precedence (lowest to highest): defaults, global file, workspace files,
    /// `PIXBATCH_*` environment variables.
    pub fn load(workspace_root: &Path) -> Result<BatchConfig, ConfigError> {
        let config: BatchConfig = Self::layered(workspace_root)?.build()?.try_deserialize()?;
        debug!(workspace = %workspace_root.display(), "Configuration loaded");
        Ok(config)
    }

    /// Load configuration for a workspace with an explicit file layered on top.
    ///
    /// The explicit file must exist and overrides every other source, environment
    /// variables included.
    pub fn load_from_file(workspace_root: &Path, path: &Path) -> Result<BatchConfig, ConfigError> {
        let builder = Self::layered(workspace_root)?
            .add_source(File::from(path.to_path_buf()).required(true));

        let config: BatchConfig = builder.build()?.try_deserialize()?;
        debug!(
            workspace = %workspace_root.display(),
            config_path = %path.display(),
            "Configuration loaded with explicit file"
        );
        Ok(config)
    }

    fn layered(workspace_root: &Path) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        let builder = merge_policy::builder_with_defaults()?;
        let builder = global_file::add_to_builder(builder)?;
        let builder = workspace_file::add_to_builder(builder, workspace_root)?;
        Ok(environment::add_to_builder(builder))
    }

    /// Built-in defaults only.
    pub fn default() -> BatchConfig {
        BatchConfig::default()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        global_file::global_config_path()
    }
}
