use anyhow::Result;
use chrono::Utc;
use crossterm::{
    event::{
        self, DisableBracketedPaste, EnableBracketedPaste, Event, KeyCode, KeyEvent,
        KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    widgets::TableState,
    Terminal,
};
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{info, warn};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::api_client::{ApiClient, SqlAssistantApi};
use crate::app_state_container::AppStateContainer;
use crate::config::Config;
use crate::schema_file::{paths_from_drop, SelectedFile};
use crate::services::{CommandRunner, RequestDispatcher};
use crate::sql_highlighter::SqlHighlighter;
use crate::state::events::{AppEvent, Section};
use crate::utils::logging::LogRingBuffer;
use crate::yank_manager::YankManager;

/// Longest the loop waits for input before servicing completions and timers
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Which input of the upload panel has the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadField {
    DatabaseName,
    FilePath,
}

pub struct TuiApp {
    pub(super) app: AppStateContainer,
    pub(super) config: Config,
    runner: CommandRunner,
    events: UnboundedReceiver<AppEvent>,
    pub(super) highlighter: SqlHighlighter,
    pub(super) log_buffer: Option<LogRingBuffer>,

    pub(super) database_input: Input,
    pub(super) path_input: Input,
    pub(super) question_input: Input,
    pub(super) upload_field: UploadField,
    pub(super) results_table: TableState,
    pub(super) show_logs: bool,
    /// UI-only message, e.g. a path that could not be opened
    pub(super) notice: Option<String>,
    should_quit: bool,
}

impl TuiApp {
    pub fn new(
        config: Config,
        runner: CommandRunner,
        events: UnboundedReceiver<AppEvent>,
        log_buffer: Option<LogRingBuffer>,
    ) -> Self {
        let app = AppStateContainer::new(&config);
        let database_input = Input::new(app.upload().database_name().to_string());
        Self {
            app,
            config,
            runner,
            events,
            highlighter: SqlHighlighter::new(),
            log_buffer,
            database_input,
            path_input: Input::default(),
            question_input: Input::default(),
            upload_field: UploadField::FilePath,
            results_table: TableState::default(),
            show_logs: false,
            notice: None,
            should_quit: false,
        }
    }

    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        self.runner.dispatcher().check_health();

        while !self.should_quit {
            terminal.draw(|f| self.render(f))?;

            let timeout = self
                .app
                .next_deadline(Instant::now())
                .map_or(POLL_INTERVAL, |d| d.min(POLL_INTERVAL));
            if event::poll(timeout)? {
                match event::read()? {
                    Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key),
                    Event::Paste(text) => self.handle_paste(&text),
                    _ => {}
                }
            }

            while let Ok(event) = self.events.try_recv() {
                self.apply(event);
            }
            self.apply(AppEvent::Tick(Instant::now()));
            self.sync_inputs();
        }

        self.app.teardown();
        Ok(())
    }

    fn apply(&mut self, event: AppEvent) {
        self.runner.handle(&mut self.app, event);
    }

    /// Bring input widgets in line with state changed elsewhere
    fn sync_inputs(&mut self) {
        let name = self.app.upload().database_name();
        if self.database_input.value() != name {
            self.database_input = Input::new(name.to_string());
        }
        let question = self.app.query().question();
        if self.question_input.value() != question {
            self.question_input = Input::new(question.to_string());
        }
        if self.app.upload().selected_file().is_some() && !self.path_input.value().is_empty() {
            self.path_input.reset();
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        if ctrl && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('q')) {
            self.should_quit = true;
            return;
        }

        // Blocking alert swallows everything until dismissed
        if self.app.results().alert().is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.apply(AppEvent::DismissAlert);
            }
            return;
        }

        if self.show_logs {
            if matches!(key.code, KeyCode::F(5) | KeyCode::Esc) {
                self.show_logs = false;
            }
            return;
        }

        if self.app.results().is_modal_open() {
            self.handle_results_key(key);
            return;
        }

        match key.code {
            KeyCode::F(5) => {
                self.show_logs = true;
                return;
            }
            KeyCode::Tab | KeyCode::BackTab => {
                let next = match self.app.active_section() {
                    Some(Section::Upload) => Section::Query,
                    Some(Section::Query) | None => Section::Upload,
                };
                self.apply(AppEvent::SelectSection(Some(next)));
                return;
            }
            KeyCode::Esc => {
                self.apply(AppEvent::SelectSection(None));
                return;
            }
            KeyCode::Char('r') if ctrl => {
                self.apply(AppEvent::RunQuery);
                return;
            }
            KeyCode::Char('y') if ctrl => {
                self.apply(AppEvent::CopySql);
                return;
            }
            KeyCode::Char('e') if ctrl => {
                self.export();
                return;
            }
            _ => {}
        }

        match self.app.active_section() {
            Some(Section::Upload) => self.handle_upload_key(key),
            Some(Section::Query) => self.handle_query_key(key),
            None => {}
        }
    }

    fn handle_results_key(&mut self, key: KeyEvent) {
        let row_count = self.app.results().result_set().map_or(0, |r| r.len());
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.apply(AppEvent::CloseResults);
                self.results_table = TableState::default();
            }
            KeyCode::Char('e') => self.export(),
            KeyCode::Char('y') => self.apply(AppEvent::CopySql),
            KeyCode::Down | KeyCode::Char('j') => self.move_selection(1, row_count),
            KeyCode::Up | KeyCode::Char('k') => self.move_selection(-1, row_count),
            KeyCode::PageDown => self.move_selection(20, row_count),
            KeyCode::PageUp => self.move_selection(-20, row_count),
            KeyCode::Home | KeyCode::Char('g') => self.results_table.select(Some(0)),
            KeyCode::End | KeyCode::Char('G') => {
                self.results_table.select(row_count.checked_sub(1))
            }
            _ => {}
        }
    }

    fn move_selection(&mut self, delta: isize, row_count: usize) {
        if row_count == 0 {
            return;
        }
        let current = self.results_table.selected().unwrap_or(0) as isize;
        let next = (current + delta).clamp(0, row_count as isize - 1);
        self.results_table.select(Some(next as usize));
    }

    fn export(&mut self) {
        self.apply(AppEvent::ExportCsv {
            today: Utc::now().date_naive(),
        });
    }

    fn handle_upload_key(&mut self, key: KeyEvent) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('x') if ctrl => {
                self.notice = None;
                self.apply(AppEvent::RemoveFile);
            }
            KeyCode::Up | KeyCode::Down => {
                self.upload_field = match self.upload_field {
                    UploadField::DatabaseName => UploadField::FilePath,
                    UploadField::FilePath => UploadField::DatabaseName,
                };
            }
            KeyCode::Enter if self.upload_field == UploadField::FilePath => self.pick_file(),
            _ => match self.upload_field {
                UploadField::DatabaseName => {
                    if !self.app.upload().can_edit_database_name() {
                        return;
                    }
                    if self.database_input.handle_event(&Event::Key(key)).is_some() {
                        let name = self.database_input.value().to_string();
                        self.apply(AppEvent::DatabaseNameEdited(name));
                    }
                }
                UploadField::FilePath => {
                    if self.app.upload().selected_file().is_none() {
                        self.path_input.handle_event(&Event::Key(key));
                    }
                }
            },
        }
    }

    /// The file-picker path: a typed path confirmed with Enter
    fn pick_file(&mut self) {
        let raw = self.path_input.value().trim().to_string();
        if raw.is_empty() {
            return;
        }
        let path = expand_home(&raw);
        match SelectedFile::from_path(&path) {
            Ok(file) => {
                self.notice = None;
                self.apply(AppEvent::FilePicked(file));
            }
            Err(e) => {
                warn!(target: "upload", "Cannot open {}: {}", path.display(), e);
                self.notice = Some(format!("Cannot open {}: {}", path.display(), e));
            }
        }
    }

    fn handle_query_key(&mut self, key: KeyEvent) {
        let alt = key.modifiers.contains(KeyModifiers::ALT);
        match key.code {
            KeyCode::Enter => self.apply(AppEvent::SubmitQuestion),
            KeyCode::Char(c) if alt && c.is_ascii_digit() => {
                if let Some(n) = c.to_digit(10).filter(|n| *n >= 1) {
                    self.apply(AppEvent::TemplateSelected(n as usize - 1));
                }
            }
            _ => {
                if self.app.query().is_submitting() {
                    return;
                }
                if self.question_input.handle_event(&Event::Key(key)).is_some() {
                    let text = self.question_input.value().to_string();
                    self.apply(AppEvent::QuestionEdited(text));
                }
            }
        }
    }

    /// Pasted text is a file drop unless the question input has focus
    fn handle_paste(&mut self, text: &str) {
        if self.app.active_section() == Some(Section::Query) {
            if self.app.query().is_submitting() {
                return;
            }
            let mut question = self.question_input.value().to_string();
            question.push_str(text.trim_end_matches(['\n', '\r']));
            self.apply(AppEvent::QuestionEdited(question));
            return;
        }

        let files: Vec<SelectedFile> = paths_from_drop(text)
            .iter()
            .filter_map(|path| match SelectedFile::from_path(path) {
                Ok(file) => Some(file),
                Err(e) => {
                    warn!(target: "upload", "Dropped path {} unusable: {}", path.display(), e);
                    None
                }
            })
            .collect();
        if !files.is_empty() {
            self.apply(AppEvent::FilesDropped(files));
        }
    }
}

fn expand_home(raw: &str) -> std::path::PathBuf {
    match raw.strip_prefix("~/") {
        Some(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| Path::new(raw).to_path_buf()),
        None => Path::new(raw).to_path_buf(),
    }
}

/// Set up the terminal, run the TUI until quit, and restore the terminal
pub fn run_tui(config: Config, log_buffer: Option<LogRingBuffer>) -> Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    let api: Arc<dyn SqlAssistantApi> =
        Arc::new(ApiClient::new(&config.api.base_url, config.api.timeout())?);
    info!(target: "system", "Using backend {}", config.api.base_url);

    let (tx, rx) = mpsc::unbounded_channel();
    let dispatcher = RequestDispatcher::new(api, runtime.handle().clone(), tx);
    let runner = CommandRunner::new(dispatcher, Box::new(YankManager::new()), config.export_dir());
    let mut tui = TuiApp::new(config, runner, rx, log_buffer);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = tui.run(&mut terminal);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    // In-flight requests are abandoned with the runtime
    runtime.shutdown_background();
    result
}
