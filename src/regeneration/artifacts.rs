//! Report attachments.

use crate::config::ReportSchemaConfig;
use crate::error::RegenError;
use crate::model::{ExtendedData, FileRecord, Revision};
use crate::report::{GenerationReport, ReportRenderer};
use crate::schema::SchemaRegistry;
use crate::store::DatabaseSession;
use crate::types::Uoid;
use chrono::Utc;
use tracing::debug;

pub const REPORT_FILE_STEM: &str = "geometrygenerationreport";

/// Renders a report and attaches every encoding to a revision
pub struct ArtifactRecorder<'a> {
    renderer: &'a dyn ReportRenderer,
    schemas: &'a dyn SchemaRegistry,
    schema_names: &'a ReportSchemaConfig,
}

impl<'a> ArtifactRecorder<'a> {
    pub fn new(
        renderer: &'a dyn ReportRenderer,
        schemas: &'a dyn SchemaRegistry,
        schema_names: &'a ReportSchemaConfig,
    ) -> Self {
        Self {
            renderer,
            schemas,
            schema_names,
        }
    }

    /// Store one File + ExtendedData pair per encoding and append them to `revision`
    ///
    /// The revision is stored again with its extended attachment list.
    pub fn record(
        &self,
        session: &mut DatabaseSession<'_>,
        revision: &mut Revision,
        report: &GenerationReport,
        acting_user: Uoid,
    ) -> Result<Vec<ExtendedData>, RegenError> {
        let rendered = self.renderer.render(report)?;
        let mut recorded = Vec::with_capacity(rendered.len());

        for document in rendered {
            let handle = self
                .schemas
                .lookup(session, self.schema_names.name_for(document.encoding))?;
            if !handle.persisted {
                session.store_schema(&handle.schema)?;
            }

            let size = document.bytes.len() as u64;
            let file = FileRecord {
                oid: session.allocate_oid()?,
                filename: format!("{}.{}", REPORT_FILE_STEM, document.extension()),
                mime: document.mime().to_string(),
                size,
                data: document.bytes,
            };
            let extended_data = ExtendedData {
                oid: session.allocate_oid()?,
                title: format!("Geometry generation report ({})", document.encoding.mime()),
                mime: file.mime.clone(),
                size,
                added: Utc::now(),
                file: file.oid,
                schema: Some(handle.schema.oid),
                time_to_generate_ms: report.time_to_generate_ms,
                user: acting_user,
                project: revision.project,
                revision: revision.oid,
            };
            session.store(&file)?;
            session.store(&extended_data)?;
            revision.extended_data.push(extended_data.oid);
            debug!(
                roid = revision.oid,
                extended_data = extended_data.oid,
                mime = %extended_data.mime,
                size,
                "Report attached"
            );
            recorded.push(extended_data);
        }

        session.store(revision)?;
        Ok(recorded)
    }
}
