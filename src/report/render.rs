//! Report encodings.

use crate::error::{RegenError, StorageError};
use crate::report::GenerationReport;
use std::fmt::Write as _;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportEncoding {
    Json,
    Html,
}

impl ReportEncoding {
    pub fn mime(self) -> &'static str {
        match self {
            ReportEncoding::Json => "application/json",
            ReportEncoding::Html => "text/html",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ReportEncoding::Json => "json",
            ReportEncoding::Html => "html",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedReport {
    pub encoding: ReportEncoding,
    pub bytes: Vec<u8>,
}

impl RenderedReport {
    pub fn mime(&self) -> &'static str {
        self.encoding.mime()
    }

    pub fn extension(&self) -> &'static str {
        self.encoding.extension()
    }
}

/// Turns a report into attachable documents
pub trait ReportRenderer: Send + Sync {
    fn render(&self, report: &GenerationReport) -> Result<Vec<RenderedReport>, RegenError>;
}

/// Renders every report as JSON and as HTML
#[derive(Debug, Default, Clone, Copy)]
pub struct StandardReportRenderer;

impl StandardReportRenderer {
    pub fn new() -> Self {
        Self
    }

    fn render_json(report: &GenerationReport) -> Result<Vec<u8>, RegenError> {
        serde_json::to_vec_pretty(report)
            .map_err(|e| RegenError::Store(StorageError::Serialization(e.to_string())))
    }

    fn render_html(report: &GenerationReport) -> Vec<u8> {
        let mut html = String::new();
        html.push_str("<!DOCTYPE html>\n<html>\n<head><meta charset=\"utf-8\"><title>Geometry generation report</title></head>\n<body>\n");
        html.push_str("<h1>Geometry generation report</h1>\n<table>\n");
        let target = report
            .target_object
            .map_or_else(|| "whole model".to_string(), |oid| oid.to_string());
        let bounds = report.bounds.map_or_else(
            || "none".to_string(),
            |b| {
                format!(
                    "({}, {}, {}) - ({}, {}, {})",
                    b.min.x, b.min.y, b.min.z, b.max.x, b.max.y, b.max.z
                )
            },
        );
        let rows = [
            ("Original file", report.original_file_name.clone()),
            ("Original size", report.original_file_size.to_string()),
            ("Deserializer", report.original_deserializer.clone()),
            ("Engine", report.engine.clone()),
            ("Revision", report.roid.to_string()),
            ("Target", target),
            ("Started", report.started_at.to_rfc3339()),
            ("Finished", report.finished_at.to_rfc3339()),
            ("Time to generate (ms)", report.time_to_generate_ms.to_string()),
            ("Success", report.success.to_string()),
            ("Primitives", report.total_primitives.to_string()),
            ("Bounds", bounds),
        ];
        for (label, value) in rows {
            let _ = writeln!(
                html,
                "<tr><th>{}</th><td>{}</td></tr>",
                escape_html(label),
                escape_html(&value)
            );
        }
        html.push_str("</table>\n<h2>Objects</h2>\n<table>\n<tr><th>Oid</th><th>Name</th><th>Primitives</th></tr>\n");
        for object in &report.objects {
            let _ = writeln!(
                html,
                "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
                object.product_oid,
                escape_html(&object.name),
                object.primitives
            );
        }
        html.push_str("</table>\n</body>\n</html>\n");
        html.into_bytes()
    }
}

impl ReportRenderer for StandardReportRenderer {
    fn render(&self, report: &GenerationReport) -> Result<Vec<RenderedReport>, RegenError> {
        Ok(vec![
            RenderedReport {
                encoding: ReportEncoding::Html,
                bytes: Self::render_html(report),
            },
            RenderedReport {
                encoding: ReportEncoding::Json,
                bytes: Self::render_json(report)?,
            },
        ])
    }
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
