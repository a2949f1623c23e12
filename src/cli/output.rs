//! CLI output: error mapping from domain errors to stable CLI surface.

use crate::error::RegenError;

/// Map domain/service errors to a string for CLI output.
pub fn map_error(e: &RegenError) -> String {
    if e.is_retryable() {
        format!("{} (the store changed concurrently; run the command again)", e)
    } else {
        e.to_string()
    }
}
