use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use crate::app_state_container::AppStateContainer;
use crate::data_exporter::{CsvExport, DataExporter};
use crate::services::request_dispatcher::RequestDispatcher;
use crate::state::events::{AppEvent, Command};
use crate::yank_manager::ClipboardWriter;

/// Executes the commands emitted by `AppStateContainer::dispatch`.
///
/// Network commands complete asynchronously through the dispatcher's
/// channel. Clipboard and export commands run synchronously and return
/// their completion event straight away.
pub struct CommandRunner {
    dispatcher: RequestDispatcher,
    clipboard: Box<dyn ClipboardWriter>,
    export_dir: PathBuf,
}

impl CommandRunner {
    pub fn new(
        dispatcher: RequestDispatcher,
        clipboard: Box<dyn ClipboardWriter>,
        export_dir: PathBuf,
    ) -> Self {
        Self {
            dispatcher,
            clipboard,
            export_dir,
        }
    }

    pub fn dispatcher(&self) -> &RequestDispatcher {
        &self.dispatcher
    }

    pub fn run(&mut self, command: Command) -> Option<AppEvent> {
        match command {
            Command::UploadSchema {
                token,
                file,
                database_name,
            } => {
                self.dispatcher.upload_schema(token, file, database_name);
                None
            }
            Command::GenerateSql { token, question } => {
                self.dispatcher.generate_sql(token, question);
                None
            }
            Command::RunSql { token, sql } => {
                self.dispatcher.run_sql(token, sql);
                None
            }
            Command::CopyToClipboard(text) => {
                let result = self.clipboard.set_text(&text).map_err(|e| e.to_string());
                Some(AppEvent::CopyFinished {
                    result,
                    at: Instant::now(),
                })
            }
            Command::SaveExport {
                file_name,
                contents,
            } => {
                let export = CsvExport {
                    file_name,
                    contents,
                };
                match DataExporter::save(&export, &self.export_dir) {
                    Ok(path) => {
                        info!(target: "export", "Wrote {}", path.display());
                        Some(AppEvent::ExportSaved(path))
                    }
                    Err(e) => Some(AppEvent::ExportFailed(format!("{:#}", e))),
                }
            }
        }
    }

    /// Run a batch of commands, collecting their immediate follow-up events
    pub fn run_all(&mut self, commands: Vec<Command>) -> Vec<AppEvent> {
        commands
            .into_iter()
            .filter_map(|command| self.run(command))
            .collect()
    }

    /// Feed `event` into `app`, executing commands until no follow-up is left
    pub fn handle(&mut self, app: &mut AppStateContainer, event: AppEvent) {
        let mut pending = VecDeque::from([event]);
        while let Some(event) = pending.pop_front() {
            let commands = app.dispatch(event);
            pending.extend(self.run_all(commands));
        }
    }
}
