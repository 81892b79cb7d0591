//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
///
/// Section structs also carry serde defaults; these keep the merged tree complete
/// so partially specified files deserialize the same way as full ones.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("service.base_url", crate::config::DEFAULT_BASE_URL)?
        .set_default("service.strategy", "synchronous")?
        .set_default("retry.max_attempts", 3)?
        .set_default("retry.initial_delay_ms", 5_000)?
        .set_default("retry.multiplier", 2)?
        .set_default("polling.interval_ms", 5_000)?
        .set_default("polling.timeout_ms", 300_000)?
        .set_default("pacing.delay_ms", 2_000)?
        .set_default("output.records_dir", ".")?
        .set_default("output.extension", "png")
}
