//! Events fed into the application state and the commands it emits

use chrono::NaiveDate;
use std::path::PathBuf;
use std::time::Instant;

use crate::api_client::{GeneratedQuery, RequestError, Row};
use crate::schema_file::SelectedFile;
use crate::state::request_token::RequestToken;

/// Which panel has focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Upload,
    Query,
}

/// Everything that can change application state
#[derive(Debug, Clone)]
pub enum AppEvent {
    SelectSection(Option<Section>),

    // Upload panel
    FilesDropped(Vec<SelectedFile>),
    FilePicked(SelectedFile),
    DatabaseNameEdited(String),
    RemoveFile,
    UploadFinished {
        token: RequestToken,
        result: Result<String, RequestError>,
    },

    // Query panel
    QuestionEdited(String),
    TemplateSelected(usize),
    SubmitQuestion,
    SqlGenerated {
        token: RequestToken,
        question: String,
        result: Result<GeneratedQuery, RequestError>,
    },

    // Generated SQL and results
    RunQuery,
    RunFinished {
        token: RequestToken,
        result: Result<Vec<Row>, RequestError>,
    },
    CloseResults,
    DismissAlert,
    ExportCsv { today: NaiveDate },
    ExportSaved(PathBuf),
    ExportFailed(String),
    CopySql,
    CopyFinished {
        result: Result<(), String>,
        at: Instant,
    },

    /// Backend reachability probe result
    HealthChecked(Result<(), RequestError>),

    /// Clock tick for timed state
    Tick(Instant),
}

/// Side effects requested by a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    UploadSchema {
        token: RequestToken,
        file: SelectedFile,
        database_name: String,
    },
    GenerateSql {
        token: RequestToken,
        question: String,
    },
    RunSql {
        token: RequestToken,
        sql: String,
    },
    CopyToClipboard(String),
    SaveExport {
        file_name: String,
        contents: String,
    },
}
