//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; single route table dispatches to the session services.

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{format_plan_text, format_session_summary, format_validation_summary};
pub use route::RunContext;
