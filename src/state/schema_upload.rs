//! File upload controller
//!
//! `NoFile -> Uploading -> Succeeded | Failed`, with `RemoveFile` returning
//! to `NoFile` from any file-selected state.

use tracing::{debug, info, warn};

use crate::api_client::RequestError;
use crate::schema_file::{FileDecision, FileSource, RejectReason, SchemaFileFilter, SelectedFile};
use crate::state::request_token::{RequestSequencer, RequestToken};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadStatus {
    Idle,
    Uploading,
    Succeeded(String),
    Failed(String),
}

#[derive(Debug, Clone)]
pub enum UploadEvent {
    /// One or more files offered at once; the first acceptable one is taken
    FilesOffered {
        files: Vec<SelectedFile>,
        source: FileSource,
    },
    DatabaseNameEdited(String),
    RemoveFile,
    Finished {
        token: RequestToken,
        result: Result<String, RequestError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum UploadEffect {
    None,
    /// Start the upload request
    Start {
        token: RequestToken,
        file: SelectedFile,
        database_name: String,
    },
    /// Every offered file was refused
    Rejected(RejectReason),
    /// An upload finished successfully; fired once per upload
    Uploaded(SelectedFile),
}

#[derive(Debug, Clone)]
pub struct SchemaUpload {
    filter: SchemaFileFilter,
    selected_file: Option<SelectedFile>,
    database_name: String,
    status: UploadStatus,
    requests: RequestSequencer,
}

impl SchemaUpload {
    pub fn new(filter: SchemaFileFilter, default_database_name: &str) -> Self {
        Self {
            filter,
            selected_file: None,
            database_name: default_database_name.to_string(),
            status: UploadStatus::Idle,
            requests: RequestSequencer::new(),
        }
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected_file.as_ref()
    }

    pub fn database_name(&self) -> &str {
        &self.database_name
    }

    pub fn status(&self) -> &UploadStatus {
        &self.status
    }

    pub fn is_uploading(&self) -> bool {
        self.status == UploadStatus::Uploading
    }

    /// The database name can only be typed before a file is attached
    pub fn can_edit_database_name(&self) -> bool {
        self.selected_file.is_none()
    }

    pub fn filter(&self) -> &SchemaFileFilter {
        &self.filter
    }

    pub fn update(&mut self, event: UploadEvent) -> UploadEffect {
        match event {
            UploadEvent::FilesOffered { files, source } => self.offer(files, source),
            UploadEvent::DatabaseNameEdited(name) => {
                if self.can_edit_database_name() {
                    self.database_name = name;
                }
                UploadEffect::None
            }
            UploadEvent::RemoveFile => {
                if let Some(file) = self.selected_file.take() {
                    info!(target: "upload", "Removed {}", file.name);
                }
                if let Some(token) = self.requests.abandon() {
                    debug!(target: "upload", "Upload {} abandoned", token);
                }
                self.status = UploadStatus::Idle;
                UploadEffect::None
            }
            UploadEvent::Finished { token, result } => self.finish(token, result),
        }
    }

    fn offer(&mut self, files: Vec<SelectedFile>, source: FileSource) -> UploadEffect {
        let mut last_reason = None;
        for file in files {
            match self.filter.check(&file.name, self.selected_file.is_some()) {
                FileDecision::Accept => {
                    self.database_name = self.filter.database_name(&file.name);
                    self.status = UploadStatus::Uploading;
                    let token = self.requests.issue();
                    info!(
                        target: "upload",
                        "Accepted {} via {:?}, uploading as '{}' ({})",
                        file.name, source, self.database_name, token
                    );
                    self.selected_file = Some(file.clone());
                    return UploadEffect::Start {
                        token,
                        file,
                        database_name: self.database_name.clone(),
                    };
                }
                FileDecision::Reject(reason) => {
                    debug!(target: "upload", "Ignored {} via {:?}: {}", file.name, source, reason);
                    if reason == RejectReason::FileAlreadyAttached {
                        return UploadEffect::Rejected(reason);
                    }
                    last_reason = Some(reason);
                }
            }
        }
        last_reason.map_or(UploadEffect::None, UploadEffect::Rejected)
    }

    fn finish(&mut self, token: RequestToken, result: Result<String, RequestError>) -> UploadEffect {
        if !self.requests.complete(token) {
            debug!(target: "upload", "Discarding stale upload result {}", token);
            return UploadEffect::None;
        }

        match result {
            Ok(message) => {
                info!(target: "upload", "Upload succeeded: {}", message);
                self.status = UploadStatus::Succeeded(message);
                match &self.selected_file {
                    Some(file) => UploadEffect::Uploaded(file.clone()),
                    None => UploadEffect::None,
                }
            }
            Err(err) => {
                warn!(target: "upload", "Upload failed: {}", err);
                self.status = UploadStatus::Failed(err.to_string());
                UploadEffect::None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller() -> SchemaUpload {
        SchemaUpload::new(SchemaFileFilter::default(), "my_database")
    }

    fn offer(upload: &mut SchemaUpload, name: &str, source: FileSource) -> UploadEffect {
        upload.update(UploadEvent::FilesOffered {
            files: vec![SelectedFile::new(format!("/tmp/{}", name), 10)],
            source,
        })
    }

    fn started_token(effect: &UploadEffect) -> RequestToken {
        match effect {
            UploadEffect::Start { token, .. } => *token,
            other => panic!("expected Start, got {:?}", other),
        }
    }

    #[test]
    fn test_wrong_suffix_leaves_state_unchanged() {
        for source in [FileSource::Dropped, FileSource::Picker] {
            let mut upload = controller();
            let effect = offer(&mut upload, "data.csv", source);
            assert_eq!(effect, UploadEffect::Rejected(RejectReason::WrongSuffix));
            assert!(upload.selected_file().is_none());
            assert_eq!(upload.status(), &UploadStatus::Idle);
            assert_eq!(upload.database_name(), "my_database");
        }
    }

    #[test]
    fn test_accept_derives_name_and_starts_upload() {
        let mut upload = controller();
        let effect = offer(&mut upload, "Sales.sql", FileSource::Picker);
        match effect {
            UploadEffect::Start {
                file,
                database_name,
                ..
            } => {
                assert_eq!(file.name, "Sales.sql");
                assert_eq!(database_name, "sales");
            }
            other => panic!("unexpected effect {:?}", other),
        }
        assert_eq!(upload.database_name(), "sales");
        assert!(upload.is_uploading());
    }

    #[test]
    fn test_drop_picks_first_schema_file() {
        let mut upload = controller();
        let effect = upload.update(UploadEvent::FilesOffered {
            files: vec![
                SelectedFile::new("/tmp/readme.md", 1),
                SelectedFile::new("/tmp/northwind.sql", 1),
                SelectedFile::new("/tmp/other.sql", 1),
            ],
            source: FileSource::Dropped,
        });
        assert!(matches!(effect, UploadEffect::Start { .. }));
        assert_eq!(upload.selected_file().unwrap().name, "northwind.sql");
    }

    #[test]
    fn test_success_fires_callback_once() {
        let mut upload = controller();
        let token = started_token(&offer(&mut upload, "sales.sql", FileSource::Dropped));
        let effect = upload.update(UploadEvent::Finished {
            token,
            result: Ok("Schema loaded".to_string()),
        });
        assert!(matches!(effect, UploadEffect::Uploaded(ref f) if f.name == "sales.sql"));
        assert_eq!(
            upload.status(),
            &UploadStatus::Succeeded("Schema loaded".to_string())
        );

        let again = upload.update(UploadEvent::Finished {
            token,
            result: Ok("Schema loaded".to_string()),
        });
        assert_eq!(again, UploadEffect::None);
    }

    #[test]
    fn test_failure_keeps_file_attached() {
        let mut upload = controller();
        let token = started_token(&offer(&mut upload, "sales.sql", FileSource::Dropped));
        upload.update(UploadEvent::Finished {
            token,
            result: Err(RequestError::Server {
                status: 400,
                message: "bad schema".to_string(),
            }),
        });
        assert_eq!(upload.status(), &UploadStatus::Failed("bad schema".to_string()));
        assert!(upload.selected_file().is_some());

        let effect = offer(&mut upload, "fixed.sql", FileSource::Picker);
        assert_eq!(
            effect,
            UploadEffect::Rejected(RejectReason::FileAlreadyAttached)
        );
    }

    #[test]
    fn test_remove_during_upload_discards_result() {
        let mut upload = controller();
        let token = started_token(&offer(&mut upload, "sales.sql", FileSource::Dropped));
        upload.update(UploadEvent::RemoveFile);
        assert!(upload.selected_file().is_none());
        assert_eq!(upload.status(), &UploadStatus::Idle);

        let effect = upload.update(UploadEvent::Finished {
            token,
            result: Ok("late".to_string()),
        });
        assert_eq!(effect, UploadEffect::None);
        assert_eq!(upload.status(), &UploadStatus::Idle);
    }

    #[test]
    fn test_database_name_locked_while_file_attached() {
        let mut upload = controller();
        upload.update(UploadEvent::DatabaseNameEdited("custom".to_string()));
        assert_eq!(upload.database_name(), "custom");

        offer(&mut upload, "sales.sql", FileSource::Picker);
        upload.update(UploadEvent::DatabaseNameEdited("other".to_string()));
        assert_eq!(upload.database_name(), "sales");

        upload.update(UploadEvent::RemoveFile);
        upload.update(UploadEvent::DatabaseNameEdited("other".to_string()));
        assert_eq!(upload.database_name(), "other");
    }
}
