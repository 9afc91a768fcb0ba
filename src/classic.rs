//! Line-mode front-end
//!
//! A reedline prompt over the same `AppStateContainer` the TUI uses. Each
//! command blocks until its backend request completes.

use anyhow::Result;
use chrono::Utc;
use crossterm::style::Stylize;
use reedline::{
    FileBackedHistory, Prompt, PromptEditMode, PromptHistorySearch, PromptHistorySearchStatus,
    Reedline, Signal,
};
use std::borrow::Cow;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, info};

use crate::api_client::{ApiClient, SqlAssistantApi};
use crate::app_state_container::{AppStateContainer, BackendHealth};
use crate::config::Config;
use crate::query_templates::TEMPLATES;
use crate::schema_file::SelectedFile;
use crate::services::{CommandRunner, RequestDispatcher};
use crate::state::{AppEvent, UploadStatus};
use crate::table_display::{display_results, templates_table};
use crate::utils::app_paths::AppPaths;
use crate::yank_manager::YankManager;

struct NlsqlPrompt {
    database: String,
}

impl Prompt for NlsqlPrompt {
    fn render_prompt_left(&self) -> Cow<'_, str> {
        Cow::Owned(format!("nlsql:{}", self.database))
    }

    fn render_prompt_right(&self) -> Cow<'_, str> {
        Cow::Borrowed("")
    }

    fn render_prompt_indicator(&self, _edit_mode: PromptEditMode) -> Cow<'_, str> {
        Cow::Borrowed("> ")
    }

    fn render_prompt_multiline_indicator(&self) -> Cow<'_, str> {
        Cow::Borrowed("... ")
    }

    fn render_prompt_history_search_indicator(
        &self,
        history_search: PromptHistorySearch,
    ) -> Cow<'_, str> {
        let prefix = match history_search.status {
            PromptHistorySearchStatus::Passing => "",
            PromptHistorySearchStatus::Failing => "failing ",
        };
        Cow::Owned(format!(
            "({}reverse search: {})",
            prefix, history_search.term
        ))
    }
}

/// One backslash command or a question
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineCommand {
    Upload(String),
    Remove,
    Database(String),
    Templates,
    Template(usize),
    Run,
    Export,
    Copy,
    ShowSql,
    Help,
    Clear,
    Quit,
    Ask(String),
    Usage(&'static str),
    Unknown(String),
}

impl LineCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }
        if !trimmed.starts_with('\\') {
            return Some(LineCommand::Ask(trimmed.to_string()));
        }

        let (name, arg) = match trimmed.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (trimmed, ""),
        };
        let command = match name {
            "\\upload" if arg.is_empty() => LineCommand::Usage("\\upload <path>"),
            "\\upload" => LineCommand::Upload(arg.to_string()),
            "\\remove" => LineCommand::Remove,
            "\\db" if arg.is_empty() => LineCommand::Usage("\\db <name>"),
            "\\db" => LineCommand::Database(arg.to_string()),
            "\\templates" => LineCommand::Templates,
            "\\template" => match arg.parse::<usize>() {
                Ok(n) if n >= 1 => LineCommand::Template(n - 1),
                _ => LineCommand::Usage("\\template <number>"),
            },
            "\\run" => LineCommand::Run,
            "\\export" => LineCommand::Export,
            "\\copy" => LineCommand::Copy,
            "\\sql" => LineCommand::ShowSql,
            "\\help" => LineCommand::Help,
            "\\clear" => LineCommand::Clear,
            "\\quit" | "\\q" => LineCommand::Quit,
            other => LineCommand::Unknown(other.to_string()),
        };
        Some(command)
    }
}

pub fn print_help() {
    println!("{}", "nlsql-cli - ask your database questions in plain English".blue().bold());
    println!();
    println!("{}", "Workflow:".yellow());
    println!("  1. {} a schema file", "\\upload <path>".green());
    println!("  2. Type a question and press Enter to generate SQL");
    println!("  3. {} the generated SQL and inspect the results", "\\run".green());
    println!();
    println!("{}", "Commands:".yellow());
    println!("  {}  - Attach and upload a schema file", "\\upload <path>".green());
    println!("  {}         - Detach the current schema file", "\\remove".green());
    println!("  {}      - Set the database name", "\\db <name>".green());
    println!("  {}      - List question templates", "\\templates".green());
    println!("  {}   - Ask template question n", "\\template <n>".green());
    println!("  {}            - Run the generated SQL", "\\run".green());
    println!("  {}         - Export the last results to CSV", "\\export".green());
    println!("  {}           - Copy the generated SQL", "\\copy".green());
    println!("  {}            - Show the generated SQL again", "\\sql".green());
    println!("  {}          - Clear screen", "\\clear".green());
    println!("  {}           - Show this help", "\\help".green());
    println!("  {}           - Exit (or Ctrl+D)", "\\quit".green());
    println!();
}

struct ClassicSession {
    app: AppStateContainer,
    runner: CommandRunner,
    events: UnboundedReceiver<AppEvent>,
    last_health: BackendHealth,
}

impl ClassicSession {
    fn new(config: &Config, runner: CommandRunner, events: UnboundedReceiver<AppEvent>) -> Self {
        Self {
            app: AppStateContainer::new(config),
            runner,
            events,
            last_health: BackendHealth::Unknown,
        }
    }

    /// Apply an event and block until every request it started has completed
    fn apply(&mut self, event: AppEvent) {
        self.runner.handle(&mut self.app, AppEvent::Tick(Instant::now()));
        self.runner.handle(&mut self.app, event);
        while self.app.busy().any() {
            match self.events.blocking_recv() {
                Some(event) => self.runner.handle(&mut self.app, event),
                None => break,
            }
        }
    }

    fn drain_pending(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            self.runner.handle(&mut self.app, event);
        }
        let health = self.app.health();
        if health != self.last_health {
            match health {
                BackendHealth::Reachable => println!("{}", "Backend is reachable".green()),
                BackendHealth::Unreachable => {
                    println!("{}", "Backend is not reachable; requests may fail".red())
                }
                BackendHealth::Unknown => {}
            }
            self.last_health = health;
        }
    }

    fn upload(&mut self, raw: &str) {
        let path = Path::new(raw);
        let file = match SelectedFile::from_path(path) {
            Ok(file) => file,
            Err(e) => {
                eprintln!("{}", format!("Cannot open {}: {}", path.display(), e).red());
                return;
            }
        };

        let had_file = self.app.upload().selected_file().is_some();
        self.apply(AppEvent::FilePicked(file));

        if had_file || self.app.upload().selected_file().is_none() {
            if let Some(message) = self.rejection_message() {
                eprintln!("{}", message.red());
            }
            return;
        }
        self.print_upload_status();
    }

    /// Set only when `upload.report_rejected_files` is on
    fn rejection_message(&self) -> Option<&str> {
        self.app
            .status_message()
            .filter(|m| m.starts_with("File ignored"))
    }

    fn print_upload_status(&self) {
        match self.app.upload().status() {
            UploadStatus::Succeeded(message) => {
                println!(
                    "{}",
                    format!("{} (database: {})", message, self.app.upload().database_name())
                        .green()
                )
            }
            UploadStatus::Failed(message) => eprintln!("{}", message.as_str().red()),
            UploadStatus::Uploading | UploadStatus::Idle => {}
        }
    }

    fn set_database(&mut self, name: &str) {
        if !self.app.upload().can_edit_database_name() {
            eprintln!(
                "{}",
                "The database name follows the attached file. Use \\remove first.".red()
            );
            return;
        }
        self.apply(AppEvent::DatabaseNameEdited(name.to_string()));
        println!("Database name set to {}", self.app.upload().database_name().cyan());
    }

    fn ask(&mut self, question: &str) {
        self.apply(AppEvent::QuestionEdited(question.to_string()));
        self.submit();
    }

    fn ask_template(&mut self, index: usize) {
        match TEMPLATES.get(index) {
            Some(template) => {
                println!("{}", template.question.dim());
                self.apply(AppEvent::TemplateSelected(index));
                self.submit();
            }
            None => eprintln!(
                "{}",
                format!("No template {}; there are {}", index + 1, TEMPLATES.len()).red()
            ),
        }
    }

    fn submit(&mut self) {
        if !self.app.query().can_submit() {
            eprintln!("{}", "Type a question first.".red());
            return;
        }
        self.apply(AppEvent::SubmitQuestion);

        match self.app.query().error() {
            Some(error) => eprintln!("{}", error.red()),
            None => self.show_sql(),
        }
    }

    fn show_sql(&self) {
        match self.app.generated() {
            Some(generated) => {
                println!("{}", "Generated SQL:".yellow());
                println!("{}", generated.sql_query.as_str().cyan());
                if !generated.schema_text.is_empty() {
                    println!("{}", "Schema used:".yellow());
                    println!("{}", generated.schema_text.as_str().dim());
                }
                println!("{}", "Use \\run to execute, \\copy to copy".dim());
            }
            None => eprintln!("{}", "No SQL generated yet. Ask a question first.".red()),
        }
    }

    fn run(&mut self) {
        if self.app.generated().is_none() {
            eprintln!("{}", "No SQL generated yet. Ask a question first.".red());
            return;
        }
        self.apply(AppEvent::RunQuery);

        if let Some(alert) = self.app.results().alert().map(str::to_string) {
            eprintln!("{}", alert.red());
            self.apply(AppEvent::DismissAlert);
            return;
        }
        if let Some(results) = self.app.results().result_set() {
            display_results(results);
        }
        self.apply(AppEvent::CloseResults);
    }

    fn export(&mut self) {
        let has_rows = self
            .app
            .results()
            .result_set()
            .is_some_and(|r| !r.is_empty());
        if !has_rows {
            eprintln!("{}", "No results to export. Run a query first.".red());
            return;
        }
        self.apply(AppEvent::ExportCsv {
            today: Utc::now().date_naive(),
        });
        if let Some(status) = self.app.status_message() {
            println!("{}", status.cyan());
        }
    }

    /// Copy the generated SQL; failures are only logged
    fn copy(&mut self) -> bool {
        if self.app.generated().is_none() {
            eprintln!("{}", "Nothing to copy yet.".red());
            return false;
        }
        self.runner.handle(&mut self.app, AppEvent::Tick(Instant::now()));

        let mut copied = false;
        for command in self.app.dispatch(AppEvent::CopySql) {
            if let Some(event) = self.runner.run(command) {
                if let AppEvent::CopyFinished { result: Ok(()), .. } = &event {
                    copied = true;
                }
                self.runner.handle(&mut self.app, event);
            }
        }
        if copied {
            println!("{}", "Copied SQL to clipboard".green());
        }
        copied
    }
}

/// Run the reedline loop until the user quits
pub fn run_classic(config: Config) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let api: Arc<dyn SqlAssistantApi> =
        Arc::new(ApiClient::new(&config.api.base_url, config.api.timeout())?);
    let (tx, rx) = mpsc::unbounded_channel();
    let dispatcher = RequestDispatcher::new(api, runtime.handle().clone(), tx);
    dispatcher.check_health();
    let runner = CommandRunner::new(dispatcher, Box::new(YankManager::new()), config.export_dir());

    let mut session = ClassicSession::new(&config, runner, rx);

    print_help();
    println!("{}", format!("Backend: {}", config.api.base_url).cyan());

    let mut line_editor = Reedline::create();
    match AppPaths::history_file() {
        Ok(history_file) => match FileBackedHistory::with_file(50, history_file) {
            Ok(history) => line_editor = line_editor.with_history(Box::new(history)),
            Err(e) => debug!(target: "system", "History disabled: {}", e),
        },
        Err(e) => debug!(target: "system", "History disabled: {}", e),
    }

    loop {
        session.drain_pending();
        let prompt = NlsqlPrompt {
            database: session.app.upload().database_name().to_string(),
        };
        let sig = line_editor.read_line(&prompt)?;
        match sig {
            Signal::Success(buffer) => {
                let Some(command) = LineCommand::parse(&buffer) else {
                    continue;
                };
                match command {
                    LineCommand::Upload(path) => session.upload(&path),
                    LineCommand::Remove => {
                        session.apply(AppEvent::RemoveFile);
                        println!("Schema file removed");
                    }
                    LineCommand::Database(name) => session.set_database(&name),
                    LineCommand::Templates => println!("{}", templates_table()),
                    LineCommand::Template(index) => session.ask_template(index),
                    LineCommand::Run => session.run(),
                    LineCommand::Export => session.export(),
                    LineCommand::Copy => {
                        session.copy();
                    }
                    LineCommand::ShowSql => session.show_sql(),
                    LineCommand::Help => print_help(),
                    LineCommand::Clear => print!("{esc}[2J{esc}[1;1H", esc = 27 as char),
                    LineCommand::Quit => break,
                    LineCommand::Ask(question) => session.ask(&question),
                    LineCommand::Usage(usage) => {
                        eprintln!("{}", format!("Usage: {}", usage).red())
                    }
                    LineCommand::Unknown(name) => eprintln!(
                        "{}",
                        format!("Unknown command {}. Type \\help for commands.", name).red()
                    ),
                }
            }
            Signal::CtrlD | Signal::CtrlC => break,
        }
    }

    println!("\nGoodbye!");
    session.app.teardown();
    info!(target: "system", "Classic session ended");
    runtime.shutdown_background();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api_client::GeneratedQuery;
    use crate::state::Command;
    use crate::yank_manager::{ClipboardWriter, MemoryClipboard};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    /// Clipboard whose failure can be switched on mid-test
    struct SwitchableClipboard {
        fail: Arc<AtomicBool>,
    }

    impl ClipboardWriter for SwitchableClipboard {
        fn set_text(&mut self, _text: &str) -> anyhow::Result<()> {
            if self.fail.load(Ordering::SeqCst) {
                anyhow::bail!("clipboard unavailable");
            }
            Ok(())
        }
    }

    fn session(
        runtime: &tokio::runtime::Runtime,
        config: &Config,
        clipboard: Box<dyn ClipboardWriter>,
    ) -> ClassicSession {
        // Nothing in these tests reaches the network
        let api: Arc<dyn SqlAssistantApi> =
            Arc::new(ApiClient::new("http://127.0.0.1:9", Duration::from_secs(1)).unwrap());
        let (tx, rx) = mpsc::unbounded_channel();
        let dispatcher = RequestDispatcher::new(api, runtime.handle().clone(), tx);
        let runner = CommandRunner::new(dispatcher, clipboard, config.export_dir());
        ClassicSession::new(config, runner, rx)
    }

    fn with_generated_sql(session: &mut ClassicSession) {
        session
            .app
            .dispatch(AppEvent::QuestionEdited("Top 10 customers".to_string()));
        let commands = session.app.dispatch(AppEvent::SubmitQuestion);
        let Some(Command::GenerateSql { token, question }) = commands.into_iter().next() else {
            panic!("expected GenerateSql");
        };
        session.app.dispatch(AppEvent::SqlGenerated {
            token,
            question,
            result: Ok(GeneratedQuery {
                question: "Top 10 customers".to_string(),
                sql_query: "SELECT * FROM customers LIMIT 10".to_string(),
                schema_text: String::new(),
            }),
        });
    }

    #[test]
    fn test_copy_failure_is_not_reported_as_success() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let fail = Arc::new(AtomicBool::new(false));
        let clipboard = SwitchableClipboard {
            fail: Arc::clone(&fail),
        };
        let mut session = session(&runtime, &Config::default(), Box::new(clipboard));
        with_generated_sql(&mut session);

        assert!(session.copy());
        assert!(session.app.is_copied());

        // Confirmation from the first copy is still showing
        fail.store(true, Ordering::SeqCst);
        assert!(!session.copy());
        assert!(session.app.is_copied());
    }

    #[test]
    fn test_copy_with_broken_clipboard() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let clipboard = MemoryClipboard {
            contents: None,
            fail: true,
        };
        let mut session = session(&runtime, &Config::default(), Box::new(clipboard));
        with_generated_sql(&mut session);

        assert!(!session.copy());
        assert!(!session.app.is_copied());
    }

    #[test]
    fn test_rejected_file_follows_report_setting() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let notes = dir.path().join("notes.txt");
        std::fs::write(&notes, "hello").unwrap();
        let notes = notes.to_string_lossy().into_owned();

        let mut quiet = session(&runtime, &Config::default(), Box::new(MemoryClipboard::default()));
        quiet.upload(&notes);
        assert!(quiet.app.upload().selected_file().is_none());
        assert_eq!(quiet.rejection_message(), None);

        let mut config = Config::default();
        config.upload.report_rejected_files = true;
        let mut loud = session(&runtime, &config, Box::new(MemoryClipboard::default()));
        loud.upload(&notes);
        assert_eq!(
            loud.rejection_message(),
            Some("File ignored: not a schema file")
        );
    }

    #[test]
    fn test_parse_question_and_commands() {
        assert_eq!(LineCommand::parse("   "), None);
        assert_eq!(
            LineCommand::parse("Top 10 customers"),
            Some(LineCommand::Ask("Top 10 customers".to_string()))
        );
        assert_eq!(
            LineCommand::parse("\\upload ./schemas/sales db.sql"),
            Some(LineCommand::Upload("./schemas/sales db.sql".to_string()))
        );
        assert_eq!(LineCommand::parse("\\run"), Some(LineCommand::Run));
        assert_eq!(LineCommand::parse("\\q"), Some(LineCommand::Quit));
    }

    #[test]
    fn test_parse_template_index_is_one_based() {
        assert_eq!(LineCommand::parse("\\template 1"), Some(LineCommand::Template(0)));
        assert_eq!(
            LineCommand::parse("\\template 0"),
            Some(LineCommand::Usage("\\template <number>"))
        );
        assert_eq!(
            LineCommand::parse("\\template x"),
            Some(LineCommand::Usage("\\template <number>"))
        );
    }

    #[test]
    fn test_parse_missing_arguments_and_unknown() {
        assert_eq!(
            LineCommand::parse("\\upload"),
            Some(LineCommand::Usage("\\upload <path>"))
        );
        assert_eq!(LineCommand::parse("\\db"), Some(LineCommand::Usage("\\db <name>")));
        assert_eq!(
            LineCommand::parse("\\nope"),
            Some(LineCommand::Unknown("\\nope".to_string()))
        );
    }
}
