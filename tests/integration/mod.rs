//! Integration tests for revision geometry regeneration

mod concurrency;
mod config_integration;
mod job_status;
mod regeneration_scenarios;
mod test_utils;

pub use test_utils::*;
