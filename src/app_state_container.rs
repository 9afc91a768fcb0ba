//! Application state container
//!
//! Single source of truth for the workflow. Front-ends feed `AppEvent`s into
//! `dispatch` and execute the returned `Command`s; completions come back as
//! events. Nothing here performs I/O.

use std::time::Instant;
use tracing::{debug, info, warn};

use crate::api_client::GeneratedQuery;
use crate::config::Config;
use crate::data_exporter::DataExporter;
use crate::schema_file::{FileSource, SchemaFileFilter, SelectedFile};
use crate::state::events::{AppEvent, Command, Section};
use crate::state::query_state::{QueryEffect, QueryEvent, QueryState};
use crate::state::results_state::{ResultsEffect, ResultsEvent, ResultsState};
use crate::state::schema_upload::{SchemaUpload, UploadEffect, UploadEvent};
use crate::utils::feedback_timer::FeedbackTimer;

/// Workflow progress shown by the step indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowStep {
    UploadSchema,
    GenerateQuery,
}

impl WorkflowStep {
    pub fn number(&self) -> usize {
        match self {
            WorkflowStep::UploadSchema => 1,
            WorkflowStep::GenerateQuery => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendHealth {
    Unknown,
    Reachable,
    Unreachable,
}

/// Busy flags for the three network operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BusyFlags {
    pub uploading: bool,
    pub generating: bool,
    pub running: bool,
}

impl BusyFlags {
    pub fn any(&self) -> bool {
        self.uploading || self.generating || self.running
    }
}

pub struct AppStateContainer {
    upload: SchemaUpload,
    query: QueryState,
    results: ResultsState,
    generated: Option<GeneratedQuery>,

    active_section: Option<Section>,
    step: WorkflowStep,
    has_uploaded_schema: bool,
    copied: FeedbackTimer,
    health: BackendHealth,
    status_message: Option<String>,
    report_rejected_files: bool,
}

impl AppStateContainer {
    pub fn new(config: &Config) -> Self {
        let filter = SchemaFileFilter::new(&config.upload.schema_suffix);
        Self {
            upload: SchemaUpload::new(filter, &config.upload.default_database_name),
            query: QueryState::new(),
            results: ResultsState::new(),
            generated: None,
            active_section: config.behavior.start_section(),
            step: WorkflowStep::UploadSchema,
            has_uploaded_schema: false,
            copied: FeedbackTimer::new(config.behavior.copy_feedback_ms),
            health: BackendHealth::Unknown,
            status_message: None,
            report_rejected_files: config.upload.report_rejected_files,
        }
    }

    pub fn upload(&self) -> &SchemaUpload {
        &self.upload
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    pub fn results(&self) -> &ResultsState {
        &self.results
    }

    pub fn generated(&self) -> Option<&GeneratedQuery> {
        self.generated.as_ref()
    }

    pub fn active_section(&self) -> Option<Section> {
        self.active_section
    }

    pub fn step(&self) -> WorkflowStep {
        self.step
    }

    pub fn has_uploaded_schema(&self) -> bool {
        self.has_uploaded_schema
    }

    pub fn is_copied(&self) -> bool {
        self.copied.is_active()
    }

    pub fn health(&self) -> BackendHealth {
        self.health
    }

    pub fn status_message(&self) -> Option<&str> {
        self.status_message.as_deref()
    }

    pub fn busy(&self) -> BusyFlags {
        BusyFlags {
            uploading: self.upload.is_uploading(),
            generating: self.query.is_submitting(),
            running: self.results.is_running(),
        }
    }

    /// Apply one event and return the side effects it requests
    pub fn dispatch(&mut self, event: AppEvent) -> Vec<Command> {
        match event {
            AppEvent::SelectSection(section) => {
                self.active_section = section;
                Vec::new()
            }

            AppEvent::FilesDropped(files) => self.offer_files(files, FileSource::Dropped),
            AppEvent::FilePicked(file) => self.offer_files(vec![file], FileSource::Picker),
            AppEvent::DatabaseNameEdited(name) => {
                self.on_upload(UploadEvent::DatabaseNameEdited(name))
            }
            AppEvent::RemoveFile => self.on_upload(UploadEvent::RemoveFile),
            AppEvent::UploadFinished { token, result } => {
                self.on_upload(UploadEvent::Finished { token, result })
            }

            AppEvent::QuestionEdited(text) => self.on_query(QueryEvent::QuestionEdited(text)),
            AppEvent::TemplateSelected(index) => {
                self.on_query(QueryEvent::TemplateSelected(index))
            }
            AppEvent::SubmitQuestion => self.on_query(QueryEvent::Submit),
            AppEvent::SqlGenerated {
                token,
                question,
                result,
            } => self.on_query(QueryEvent::Finished {
                token,
                question,
                result,
            }),

            AppEvent::RunQuery => self.on_results(ResultsEvent::Run),
            AppEvent::RunFinished { token, result } => {
                self.on_results(ResultsEvent::Finished { token, result })
            }
            AppEvent::CloseResults => self.on_results(ResultsEvent::CloseModal),
            AppEvent::DismissAlert => self.on_results(ResultsEvent::DismissAlert),

            AppEvent::ExportCsv { today } => {
                let Some(results) = self.results.result_set() else {
                    return Vec::new();
                };
                match DataExporter::export_to_csv(results, today) {
                    Ok(Some(export)) => vec![Command::SaveExport {
                        file_name: export.file_name,
                        contents: export.contents,
                    }],
                    Ok(None) => Vec::new(),
                    Err(e) => {
                        warn!(target: "export", "Could not build CSV: {}", e);
                        self.status_message = Some(format!("Export failed: {}", e));
                        Vec::new()
                    }
                }
            }
            AppEvent::ExportSaved(path) => {
                info!(target: "export", "Exported results to {}", path.display());
                self.status_message = Some(format!("Exported results to {}", path.display()));
                Vec::new()
            }
            AppEvent::ExportFailed(error) => {
                warn!(target: "export", "{}", error);
                self.status_message = Some(format!("Export failed: {}", error));
                Vec::new()
            }

            AppEvent::CopySql => match &self.generated {
                Some(generated) => vec![Command::CopyToClipboard(generated.sql_query.clone())],
                None => Vec::new(),
            },
            AppEvent::CopyFinished { result, at } => {
                match result {
                    Ok(()) => self.copied.trigger(at),
                    Err(e) => warn!(target: "clipboard", "Failed to copy text: {}", e),
                }
                Vec::new()
            }

            AppEvent::HealthChecked(result) => {
                self.health = match result {
                    Ok(()) => BackendHealth::Reachable,
                    Err(e) => {
                        warn!(target: "api", "Backend health check failed: {}", e);
                        BackendHealth::Unreachable
                    }
                };
                Vec::new()
            }

            AppEvent::Tick(now) => {
                if self.copied.tick(now) {
                    debug!(target: "clipboard", "Copy confirmation cleared");
                }
                Vec::new()
            }
        }
    }

    /// Cancel timed state; called when the front-end shuts down
    pub fn teardown(&mut self) {
        self.copied.reset();
    }

    /// Time until the next timed state change, for sizing the poll timeout
    pub fn next_deadline(&self, now: Instant) -> Option<std::time::Duration> {
        self.copied.time_remaining(now)
    }

    fn offer_files(&mut self, files: Vec<SelectedFile>, source: FileSource) -> Vec<Command> {
        self.active_section = Some(Section::Upload);
        self.on_upload(UploadEvent::FilesOffered { files, source })
    }

    fn on_upload(&mut self, event: UploadEvent) -> Vec<Command> {
        match self.upload.update(event) {
            UploadEffect::None => Vec::new(),
            UploadEffect::Start {
                token,
                file,
                database_name,
            } => {
                self.status_message = None;
                vec![Command::UploadSchema {
                    token,
                    file,
                    database_name,
                }]
            }
            UploadEffect::Rejected(reason) => {
                if self.report_rejected_files {
                    self.status_message = Some(format!("File ignored: {}", reason));
                }
                Vec::new()
            }
            UploadEffect::Uploaded(file) => {
                info!(target: "upload", "File uploaded successfully: {}", file.name);
                self.has_uploaded_schema = true;
                self.step = WorkflowStep::GenerateQuery;
                Vec::new()
            }
        }
    }

    fn on_query(&mut self, event: QueryEvent) -> Vec<Command> {
        match self.query.update(event) {
            QueryEffect::None => Vec::new(),
            QueryEffect::Generate { token, question } => {
                vec![Command::GenerateSql { token, question }]
            }
            QueryEffect::Analyzed {
                question,
                generated,
            } => {
                debug!(target: "query", "Schema analysis finished for: {}", question);
                if let Some(generated) = generated {
                    // A new query invalidates the copy confirmation of the old one
                    self.copied.reset();
                    self.generated = Some(generated);
                }
                Vec::new()
            }
        }
    }

    fn on_results(&mut self, event: ResultsEvent) -> Vec<Command> {
        match self.results.update(event, self.generated.as_ref()) {
            ResultsEffect::None => Vec::new(),
            ResultsEffect::Execute { token, sql } => vec![Command::RunSql { token, sql }],
        }
    }
}
