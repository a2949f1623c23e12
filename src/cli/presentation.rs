//! CLI presentation: text and json formatters per command.

use crate::api::{RegenerationOutcome, RevisionView};
use crate::error::{RegenError, StorageError};
use crate::model::{Bounds, Project, Revision};
use crate::progress::{JobRecord, ProgressEvent};
use comfy_table::presets::UTF8_FULL;
use comfy_table::Table;
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;

fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, RegenError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| RegenError::Store(StorageError::Serialization(e.to_string())))
}

fn format_bounds(bounds: &Bounds) -> String {
    if bounds.is_empty() {
        return "-".to_string();
    }
    format!(
        "({}, {}, {}) - ({}, {}, {})",
        bounds.min.x, bounds.min.y, bounds.min.z, bounds.max.x, bounds.max.y, bounds.max.z
    )
}

fn format_millis(ms: u64) -> String {
    chrono::DateTime::from_timestamp_millis(ms as i64)
        .map(|ts| ts.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

pub fn format_import_result(project: &Project, revision: &Revision) -> String {
    format!(
        "Imported project '{}'\n  Project: {}\n  Revision: {} (id {})\n  Snapshot: {}",
        project.name, project.oid, revision.oid, revision.id, revision.concrete_revision
    )
}

pub fn format_commit_result(revision: &Revision) -> String {
    format!(
        "Committed revision {} (id {})\n  Project: {}\n  Snapshot: {}\n  Has geometry: {}",
        revision.oid, revision.id, revision.project, revision.concrete_revision, revision.has_geometry
    )
}

pub fn format_regeneration_text(outcome: &RegenerationOutcome) -> String {
    let summary = match &outcome.status {
        Ok(summary) => summary,
        Err(err) => {
            return format!(
                "{} Geometry generation failed using {}: {}\n  Job: {}",
                "✗".red(),
                outcome.engine_name,
                err,
                outcome.job_id
            )
        }
    };
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Value"]);
    let target = summary
        .target
        .map_or_else(|| "whole model".to_string(), |oid| oid.to_string());
    let revisions = summary
        .updated_revisions
        .iter()
        .map(|roid| roid.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    table.add_row(vec!["Revision".to_string(), summary.roid.to_string()]);
    table.add_row(vec![
        "Snapshot".to_string(),
        summary.concrete_revision.to_string(),
    ]);
    table.add_row(vec![
        "Highest stop id".to_string(),
        summary.highest_stop_id.to_string(),
    ]);
    table.add_row(vec!["Target".to_string(), target]);
    table.add_row(vec!["Bounds".to_string(), format_bounds(&summary.bounds)]);
    table.add_row(vec![
        "Bounds (untransformed)".to_string(),
        format_bounds(&summary.bounds_untransformed),
    ]);
    table.add_row(vec![
        "Primitives".to_string(),
        summary.nr_primitives.to_string(),
    ]);
    table.add_row(vec![
        "Regenerated objects".to_string(),
        summary.regenerated_objects.to_string(),
    ]);
    table.add_row(vec!["Updated revisions".to_string(), revisions]);
    table.add_row(vec![
        "Attachments".to_string(),
        summary.extended_data.len().to_string(),
    ]);
    table.add_row(vec![
        "Time to generate".to_string(),
        format!("{} ms", summary.time_to_generate_ms),
    ]);
    format!(
        "{} {}\n  Job: {}\n{}",
        "✓".green(),
        outcome.done_message(),
        outcome.job_id,
        table
    )
}

pub fn format_regeneration_json(outcome: &RegenerationOutcome) -> Result<String, RegenError> {
    let value = match &outcome.status {
        Ok(summary) => json!({
            "engine": outcome.engine_name,
            "job_id": outcome.job_id,
            "success": true,
            "message": outcome.done_message(),
            "summary": summary,
        }),
        Err(err) => json!({
            "engine": outcome.engine_name,
            "job_id": outcome.job_id,
            "success": false,
            "error": err.message,
            "product_oid": err.product_oid,
        }),
    };
    to_json(&value)
}

pub fn format_revision_text(view: &RevisionView) -> String {
    let revision = &view.revision;
    let concrete = &view.concrete_revision;
    let siblings = concrete
        .revisions
        .iter()
        .map(|roid| roid.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec![
        "Revision".to_string(),
        format!("{} (id {})", revision.oid, revision.id),
    ]);
    table.add_row(vec!["Project".to_string(), revision.project.to_string()]);
    table.add_row(vec!["Comment".to_string(), revision.comment.clone()]);
    table.add_row(vec!["User".to_string(), revision.user.to_string()]);
    table.add_row(vec!["Date".to_string(), revision.date.to_rfc3339()]);
    table.add_row(vec![
        "Snapshot".to_string(),
        format!("{} (id {})", concrete.oid, concrete.id),
    ]);
    table.add_row(vec!["Shared with".to_string(), siblings]);
    table.add_row(vec![
        "Highest stop id".to_string(),
        view.highest_stop_id.to_string(),
    ]);
    table.add_row(vec![
        "Has geometry".to_string(),
        revision.has_geometry.to_string(),
    ]);
    table.add_row(vec![
        "Primitives".to_string(),
        revision.nr_primitives.to_string(),
    ]);
    table.add_row(vec!["Bounds".to_string(), format_bounds(&revision.bounds)]);
    table.add_row(vec![
        "Bounds (untransformed)".to_string(),
        format_bounds(&revision.bounds_untransformed),
    ]);
    table.add_row(vec![
        "Multiplier to mm".to_string(),
        concrete.multiplier_to_mm.to_string(),
    ]);

    let mut out = table.to_string();
    if view.attachments.is_empty() {
        out.push_str("\n\nNo attachments.");
    } else {
        let mut attachments = Table::new();
        attachments.load_preset(UTF8_FULL);
        attachments.set_header(vec!["Oid", "Title", "Mime", "Size", "Added"]);
        for data in &view.attachments {
            attachments.add_row(vec![
                data.oid.to_string(),
                data.title.clone(),
                data.mime.clone(),
                data.size.to_string(),
                data.added.format("%Y-%m-%d %H:%M:%S").to_string(),
            ]);
        }
        out.push_str(&format!("\n\nAttachments ({}):\n{}", view.attachments.len(), attachments));
    }
    out
}

pub fn format_revision_json(view: &RevisionView) -> Result<String, RegenError> {
    to_json(view)
}

pub fn format_jobs_text(jobs: &[JobRecord], events: Option<&[ProgressEvent]>) -> String {
    if jobs.is_empty() {
        return "No jobs recorded.".to_string();
    }
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec![
        "Job", "Revision", "Engine", "Status", "Started", "Ended", "Message",
    ]);
    for job in jobs {
        let message = job
            .error
            .clone()
            .or_else(|| job.message.clone())
            .unwrap_or_else(|| "-".to_string());
        table.add_row(vec![
            job.job_id.clone(),
            job.roid.to_string(),
            job.engine.clone(),
            job.status.as_str().to_string(),
            format_millis(job.started_at_ms),
            job.ended_at_ms.map_or_else(|| "-".to_string(), format_millis),
            message,
        ]);
    }
    let mut out = table.to_string();
    if let Some(events) = events {
        out.push_str(&format!("\n\nEvents ({}):", events.len()));
        for event in events {
            out.push_str(&format!(
                "\n  {:>4} {} {} {}",
                event.seq,
                event
                    .ts
                    .parse()
                    .map_or_else(|_| event.ts.clone(), format_millis),
                event.event_type,
                event.data
            ));
        }
    }
    out
}

pub fn format_jobs_json(
    jobs: &[JobRecord],
    events: Option<&[ProgressEvent]>,
) -> Result<String, RegenError> {
    match events {
        Some(events) => to_json(&json!({ "jobs": jobs, "events": events })),
        None => to_json(&json!({ "jobs": jobs })),
    }
}
