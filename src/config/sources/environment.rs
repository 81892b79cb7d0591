//! Environment source: PIXBATCH_<SECTION>__<KEY>, e.g. PIXBATCH_RETRY__MAX_ATTEMPTS=5

use config::builder::DefaultState;
use config::{ConfigBuilder, Environment};

pub fn add_to_builder(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    builder.add_source(
        Environment::with_prefix("PIXBATCH")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}
