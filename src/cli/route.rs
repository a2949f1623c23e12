//! CLI route: single route table and run context. Dispatches to the geometry service and presentation.

use crate::api::{GeometryService, RegenerationRequest, TargetObject};
use crate::cli::parse::Commands;
use crate::cli::presentation::{
    format_commit_result, format_import_result, format_jobs_json, format_jobs_text,
    format_regeneration_json, format_regeneration_text, format_revision_json,
    format_revision_text,
};
use crate::config::ConfigLoader;
use crate::error::RegenError;
use crate::geometry::RenderEngineSelector;
use crate::history::{ModelFile, ShapeChange};
use crate::progress::PrunePolicy;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Rendered result of one command
///
/// `failed` is set when the command ran to completion but reports a failure, such as a
/// regeneration whose engine failed; the binary prints `text` and exits non-zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub failed: bool,
}

impl CommandOutput {
    fn success(text: String) -> Self {
        Self {
            text,
            failed: false,
        }
    }
}

/// Runtime context for CLI execution: workspace and the geometry service.
/// Built from workspace path and optional config path using ConfigLoader only.
pub struct RunContext {
    service: GeometryService,
    workspace_root: PathBuf,
}

impl RunContext {
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, RegenError> {
        let config = ConfigLoader::load_with_override(&workspace_root, config_path.as_deref())?;
        config.validate().map_err(|errors| {
            RegenError::Config(
                errors
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join("; "),
            )
        })?;

        let service = GeometryService::open(&workspace_root, config)?;
        let (interrupted, pruned) = service.recover_jobs(PrunePolicy::default())?;
        if interrupted > 0 || pruned > 0 {
            info!(interrupted, pruned, "Job store recovered");
        }

        Ok(Self {
            service,
            workspace_root,
        })
    }

    pub fn service(&self) -> &GeometryService {
        &self.service
    }

    pub fn workspace_root(&self) -> &Path {
        &self.workspace_root
    }

    /// Execute a CLI command via the single route table.
    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, RegenError> {
        let started = Instant::now();
        let result = self.execute_inner(command);
        debug!(
            duration_ms = started.elapsed().as_millis() as u64,
            ok = matches!(result, Ok(CommandOutput { failed: false, .. })),
            "Command finished"
        );
        result
    }

    fn execute_inner(&self, command: &Commands) -> Result<CommandOutput, RegenError> {
        match command {
            Commands::Import { model, user } => {
                let model: ModelFile = read_json(model)?;
                let (project, revision) = self.service.import_model(model, *user)?;
                Ok(CommandOutput::success(format_import_result(&project, &revision)))
            }
            Commands::Commit {
                project,
                comment,
                changes,
                user,
            } => {
                let changes: Vec<ShapeChange> = match changes {
                    Some(path) => read_json(path)?,
                    None => Vec::new(),
                };
                let revision = self.service.checkin(*project, comment, *user, changes)?;
                Ok(CommandOutput::success(format_commit_result(&revision)))
            }
            Commands::Regenerate {
                revision,
                object,
                engine,
                user,
                format,
            } => {
                let request = RegenerationRequest {
                    roid: *revision,
                    acting_user: *user,
                    engine: RenderEngineSelector::from_option(engine.clone()),
                    target: TargetObject::from_raw(*object).oid(),
                };
                let outcome = self.service.regenerate_revision_geometry(request)?;
                let text = match format.as_str() {
                    "json" => format_regeneration_json(&outcome)?,
                    _ => format_regeneration_text(&outcome),
                };
                Ok(CommandOutput {
                    text,
                    failed: !outcome.is_success(),
                })
            }
            Commands::Show { revision, format } => {
                let view = self.service.revision(*revision)?;
                let text = match format.as_str() {
                    "json" => format_revision_json(&view)?,
                    _ => format_revision_text(&view),
                };
                Ok(CommandOutput::success(text))
            }
            Commands::Jobs { format, events } => {
                let jobs = self.service.jobs()?;
                let events = match events {
                    Some(job_id) => Some(self.service.job_events(job_id)?),
                    None => None,
                };
                let text = match format.as_str() {
                    "json" => format_jobs_json(&jobs, events.as_deref())?,
                    _ => format_jobs_text(&jobs, events.as_deref()),
                };
                Ok(CommandOutput::success(text))
            }
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, RegenError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        RegenError::Precondition(format!("cannot read {}: {}", path.display(), e))
    })?;
    serde_json::from_str(&text)
        .map_err(|e| RegenError::Precondition(format!("invalid JSON in {}: {}", path.display(), e)))
}
