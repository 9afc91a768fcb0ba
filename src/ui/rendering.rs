use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Wrap},
    Frame,
};
use tui_input::Input;

use super::tui_app::{TuiApp, UploadField};
use crate::app_state_container::{BackendHealth, WorkflowStep};
use crate::config::config::IconConfig;
use crate::data_exporter::DataExporter;
use crate::query_templates::TEMPLATES;
use crate::sql_highlighter::SqlHighlighter;
use crate::state::events::Section;
use crate::state::UploadStatus;

const MAX_COLUMN_WIDTH: usize = 40;
/// Rows sampled when sizing result columns
const WIDTH_SAMPLE_ROWS: usize = 200;
const LOG_OVERLAY_LINES: usize = 200;

impl TuiApp {
    fn icons(&self) -> &IconConfig {
        &self.config.display.icons
    }

    pub(super) fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Min(10),
                Constraint::Length(1),
            ])
            .split(f.area());

        self.render_header(f, chunks[0]);

        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
            .split(chunks[1]);
        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(9), Constraint::Min(8)])
            .split(columns[0]);

        self.render_upload_panel(f, left[0]);
        self.render_query_panel(f, left[1]);
        self.render_sql_panel(f, columns[1]);
        self.render_status_line(f, chunks[2]);

        if self.app.results().is_modal_open() {
            self.render_results_modal(f);
        }
        if self.show_logs {
            self.render_log_overlay(f);
        }
        if let Some(alert) = self.app.results().alert() {
            let alert = alert.to_string();
            self.render_alert(f, &alert);
        }
    }

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let icons = self.icons();
        let (health_text, health_color) = match self.app.health() {
            BackendHealth::Unknown => ("checking", Color::Gray),
            BackendHealth::Reachable => ("online", Color::Green),
            BackendHealth::Unreachable => ("unreachable", Color::Red),
        };

        let step = self.app.step();
        let step_style = |which: WorkflowStep| {
            if which == step {
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::DarkGray)
            }
        };
        let upload_mark = if self.app.has_uploaded_schema() {
            format!(" {}", icons.success)
        } else {
            String::new()
        };

        let line = Line::from(vec![
            Span::styled(
                format!("Step {} Upload Schema{}", WorkflowStep::UploadSchema.number(), upload_mark),
                step_style(WorkflowStep::UploadSchema),
            ),
            Span::raw("  >  "),
            Span::styled(
                format!("Step {} Generate Query", WorkflowStep::GenerateQuery.number()),
                step_style(WorkflowStep::GenerateQuery),
            ),
            Span::raw("    "),
            Span::raw(format!("{} {} ", icons.api, self.config.api.base_url)),
            Span::styled(health_text, Style::default().fg(health_color)),
        ]);

        let header = Paragraph::new(line).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Natural Language to SQL "),
        );
        f.render_widget(header, area);
    }

    fn section_block(&self, title: &str, section: Section) -> Block<'static> {
        let focused = self.app.active_section() == Some(section);
        let border = if focused {
            Style::default().fg(Color::Cyan)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        Block::default()
            .borders(Borders::ALL)
            .border_style(border)
            .title(format!(" {} ", title))
    }

    fn render_upload_panel(&self, f: &mut Frame, area: Rect) {
        let icons = self.icons();
        let block = self.section_block("Add Datasource", Section::Upload);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(1),
            ])
            .split(inner);

        let upload = self.app.upload();
        let focused = self.app.active_section() == Some(Section::Upload);

        f.render_widget(
            Paragraph::new(format!("{} Database name", icons.database))
                .style(Style::default().fg(Color::Gray)),
            rows[0],
        );
        let name_style = if upload.can_edit_database_name() {
            Style::default().fg(Color::White)
        } else {
            Style::default().fg(Color::DarkGray)
        };
        render_input(
            f,
            rows[1],
            &self.database_input,
            name_style,
            focused && self.upload_field == UploadField::DatabaseName,
        );

        match upload.selected_file() {
            Some(file) => {
                f.render_widget(
                    Paragraph::new(format!("{} Selected file", icons.file))
                        .style(Style::default().fg(Color::Gray)),
                    rows[2],
                );
                f.render_widget(
                    Paragraph::new(Line::from(vec![
                        Span::styled(file.name.clone(), Style::default().fg(Color::White)),
                        Span::styled(
                            format!(" ({})  Ctrl+X remove", file.size_display()),
                            Style::default().fg(Color::DarkGray),
                        ),
                    ])),
                    rows[3],
                );
            }
            None => {
                f.render_widget(
                    Paragraph::new(format!(
                        "{} Drop a {} file or type its path and press Enter",
                        icons.file,
                        upload.filter().suffix()
                    ))
                    .style(Style::default().fg(Color::Gray)),
                    rows[2],
                );
                render_input(
                    f,
                    rows[3],
                    &self.path_input,
                    Style::default().fg(Color::White),
                    focused && self.upload_field == UploadField::FilePath,
                );
            }
        }

        let banner = match (upload.status(), &self.notice) {
            (_, Some(notice)) => Some(Line::styled(
                format!("{} {}", icons.warning, notice),
                Style::default().fg(Color::Yellow),
            )),
            (UploadStatus::Idle, None) => None,
            (UploadStatus::Uploading, None) => Some(Line::styled(
                format!("{} Uploading...", icons.running),
                Style::default().fg(Color::Yellow),
            )),
            (UploadStatus::Succeeded(message), None) => Some(Line::styled(
                format!("{} {}", icons.success, message),
                Style::default().fg(Color::Green),
            )),
            (UploadStatus::Failed(message), None) => Some(Line::styled(
                format!("{} {}", icons.error, message),
                Style::default().fg(Color::Red),
            )),
        };
        if let Some(banner) = banner {
            f.render_widget(Paragraph::new(banner).wrap(Wrap { trim: true }), rows[4]);
        }
    }

    fn render_query_panel(&self, f: &mut Frame, area: Rect) {
        let icons = self.icons();
        let block = self.section_block("Generate Query", Section::Query);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(3),
            ])
            .split(inner);

        let query = self.app.query();
        let focused = self.app.active_section() == Some(Section::Query);

        let prompt = if query.is_submitting() {
            Line::styled(
                format!("{} Analyzing...", icons.running),
                Style::default().fg(Color::Yellow),
            )
        } else {
            Line::styled(
                "Ask a question about your data (Enter to analyze)",
                Style::default().fg(Color::Gray),
            )
        };
        f.render_widget(Paragraph::new(prompt), rows[0]);
        render_input(
            f,
            rows[1],
            &self.question_input,
            Style::default().fg(Color::White),
            focused && !query.is_submitting(),
        );

        if let Some(error) = query.error() {
            f.render_widget(
                Paragraph::new(format!("{} {}", icons.error, error))
                    .style(Style::default().fg(Color::Red)),
                rows[2],
            );
        }

        let mut lines = vec![Line::styled(
            "Templates (Alt+number):",
            Style::default().fg(Color::Gray),
        )];
        for (i, template) in TEMPLATES.iter().enumerate() {
            lines.push(Line::from(vec![
                Span::styled(format!(" {} ", i + 1), Style::default().fg(Color::Cyan)),
                Span::styled(
                    format!("[{}] ", template.category),
                    Style::default().fg(Color::Magenta),
                ),
                Span::styled(template.title, Style::default().fg(Color::White)),
                Span::styled(
                    format!("  {}", template.preview()),
                    Style::default().fg(Color::DarkGray),
                ),
            ]));
        }
        f.render_widget(Paragraph::new(lines), rows[3]);
    }

    fn render_sql_panel(&self, f: &mut Frame, area: Rect) {
        let icons = self.icons();
        let block = Block::default()
            .borders(Borders::ALL)
            .title(" Generated SQL ");

        let Some(generated) = self.app.generated() else {
            let placeholder = Paragraph::new("Generated SQL will appear here")
                .style(Style::default().fg(Color::DarkGray))
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(placeholder, area);
            return;
        };

        let mut lines = vec![Line::from(vec![
            Span::styled("Question: ", Style::default().fg(Color::Gray)),
            Span::styled(generated.question.clone(), Style::default().fg(Color::White)),
        ])];
        lines.push(Line::raw(""));
        if self.config.display.syntax_highlighting {
            lines.extend(self.highlighter.highlight_sql_multiline(&generated.sql_query));
        } else {
            lines.extend(SqlHighlighter::plain(&generated.sql_query));
        }
        lines.push(Line::raw(""));

        let mut actions = vec![Span::styled(
            if self.app.results().is_running() {
                format!("{} Running...", icons.running)
            } else {
                "Ctrl+R Run".to_string()
            },
            Style::default().fg(Color::Green),
        )];
        actions.push(Span::raw("   "));
        if self.app.is_copied() {
            actions.push(Span::styled(
                format!("{} Copied", icons.copied),
                Style::default().fg(Color::Green),
            ));
        } else {
            actions.push(Span::styled("Ctrl+Y Copy", Style::default().fg(Color::Cyan)));
        }
        if self.app.results().result_set().is_some() {
            actions.push(Span::raw("   "));
            actions.push(Span::styled("Ctrl+E Export", Style::default().fg(Color::Cyan)));
        }
        lines.push(Line::from(actions));

        if !generated.schema_text.is_empty() {
            lines.push(Line::raw(""));
            lines.push(Line::styled(
                "Schema used:",
                Style::default().fg(Color::Gray),
            ));
            lines.extend(
                generated
                    .schema_text
                    .lines()
                    .map(|l| Line::styled(l.to_string(), Style::default().fg(Color::DarkGray))),
            );
        }

        let paragraph = Paragraph::new(Text::from(lines))
            .block(block)
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn render_status_line(&self, f: &mut Frame, area: Rect) {
        let text = match self.app.status_message() {
            Some(message) => message.to_string(),
            None => {
                "Tab switch panel | Ctrl+R run | Ctrl+Y copy | Ctrl+E export | F5 logs | Ctrl+Q quit"
                    .to_string()
            }
        };
        let status =
            Paragraph::new(text).style(Style::default().fg(Color::White).bg(Color::DarkGray));
        f.render_widget(status, area);
    }

    fn render_results_modal(&mut self, f: &mut Frame) {
        let area = centered_rect(90, 80, f.area());
        f.render_widget(Clear, area);

        let Some(results) = self.app.results().result_set() else {
            return;
        };

        let title = format!(
            " Query Results: {} | e export, y copy SQL, Esc close ",
            results.summary()
        );
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .title(title);

        if results.is_empty() {
            let empty = Paragraph::new("No results to display")
                .style(Style::default().fg(Color::Gray))
                .alignment(Alignment::Center)
                .block(block);
            f.render_widget(empty, area);
            return;
        }

        let columns = results.columns();
        let widths: Vec<Constraint> = columns
            .iter()
            .map(|column| {
                let widest = results
                    .rows()
                    .iter()
                    .take(WIDTH_SAMPLE_ROWS)
                    .map(|row| DataExporter::cell_text(row.get(column)).chars().count())
                    .chain(std::iter::once(column.chars().count()))
                    .max()
                    .unwrap_or(0);
                Constraint::Length(widest.clamp(4, MAX_COLUMN_WIDTH) as u16)
            })
            .collect();

        let header = Row::new(columns.iter().map(|c| {
            Cell::from(c.clone()).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            )
        }));
        let rows: Vec<Row> = results
            .rows()
            .iter()
            .map(|row| {
                Row::new(
                    columns
                        .iter()
                        .map(|column| Cell::from(DataExporter::cell_text(row.get(column)))),
                )
            })
            .collect();

        let table = Table::new(rows, widths)
            .header(header)
            .block(block)
            .column_spacing(2)
            .row_highlight_style(Style::default().add_modifier(Modifier::REVERSED));

        if self.results_table.selected().is_none() {
            self.results_table.select(Some(0));
        }
        f.render_stateful_widget(table, area, &mut self.results_table);
    }

    fn render_alert(&self, f: &mut Frame, message: &str) {
        let icons = self.icons();
        let area = centered_rect(60, 20, f.area());
        f.render_widget(Clear, area);
        let text = Text::from(vec![
            Line::raw(""),
            Line::styled(
                format!("{} {}", icons.error, message),
                Style::default().fg(Color::Red),
            ),
            Line::raw(""),
            Line::styled("Press Enter to dismiss", Style::default().fg(Color::DarkGray)),
        ]);
        let alert = Paragraph::new(text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Red))
                    .title(" Error "),
            );
        f.render_widget(alert, area);
    }

    fn render_log_overlay(&self, f: &mut Frame) {
        let area = centered_rect(90, 85, f.area());
        f.render_widget(Clear, area);

        let entries = self
            .log_buffer
            .as_ref()
            .map(|buffer| buffer.get_recent(LOG_OVERLAY_LINES))
            .unwrap_or_default();
        let visible = area.height.saturating_sub(2) as usize;
        let skip = entries.len().saturating_sub(visible);
        let lines: Vec<Line> = entries
            .iter()
            .skip(skip)
            .map(|entry| Line::raw(entry.format_for_display()))
            .collect();

        let logs = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Yellow))
                .title(format!(" Logs ({} entries) | F5/Esc close ", entries.len())),
        );
        f.render_widget(logs, area);
    }
}

/// Single-line input with horizontal scrolling and a cursor when focused
fn render_input(f: &mut Frame, area: Rect, input: &Input, style: Style, focused: bool) {
    let width = area.width.max(1) as usize;
    let scroll = input.visual_scroll(width);
    let paragraph = Paragraph::new(input.value())
        .style(style)
        .scroll((0, scroll as u16));
    f.render_widget(paragraph, area);
    if focused {
        let cursor = input.visual_cursor().saturating_sub(scroll) as u16;
        f.set_cursor_position((area.x + cursor, area.y));
    }
}

fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);
    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(vertical[1])[1]
}
