//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::ApiError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::InvalidInput(problems) => {
            let mut out = format!("Invalid session input ({} problems):", problems.len());
            for problem in problems {
                out.push_str(&format!("\n  - {}", problem));
            }
            out
        }
        ApiError::ConfigError(msg) => format!("Configuration error: {}", msg),
        other => other.to_string(),
    }
}
