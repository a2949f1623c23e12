//! CLI domain: parse, route, output, and presentation only.
//! No domain orchestration; the route table dispatches to [`crate::api::GeometryService`].

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands};
pub use presentation::{
    format_commit_result, format_import_result, format_jobs_json, format_jobs_text,
    format_regeneration_json, format_regeneration_text, format_revision_json,
    format_revision_text,
};
pub use route::{CommandOutput, RunContext};
