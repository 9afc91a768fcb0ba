use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use syntect::easy::HighlightLines;
use syntect::highlighting::{Style as SyntectStyle, Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

const THEME_NAME: &str = "base16-ocean.dark";

/// Syntax highlighting for the generated SQL panel
pub struct SqlHighlighter {
    syntax_set: SyntaxSet,
    theme: Option<Theme>,
}

impl Default for SqlHighlighter {
    fn default() -> Self {
        Self::new()
    }
}

impl SqlHighlighter {
    pub fn new() -> Self {
        // Loading the default sets is slow; do it once per session
        let syntax_set = SyntaxSet::load_defaults_newlines();
        let theme = ThemeSet::load_defaults().themes.remove(THEME_NAME);
        Self { syntax_set, theme }
    }

    /// Highlight SQL into owned lines, falling back to plain text per line
    pub fn highlight_sql_multiline(&self, text: &str) -> Vec<Line<'static>> {
        let Some(theme) = &self.theme else {
            return Self::plain(text);
        };

        let syntax = self
            .syntax_set
            .find_syntax_by_extension("sql")
            .unwrap_or_else(|| self.syntax_set.find_syntax_plain_text());
        let mut highlighter = HighlightLines::new(syntax, theme);

        let mut lines = Vec::new();
        for line in LinesWithEndings::from(text) {
            match highlighter.highlight_line(line, &self.syntax_set) {
                Ok(ranges) => {
                    let spans: Vec<Span<'static>> = ranges
                        .into_iter()
                        .map(|(style, piece)| {
                            Span::styled(
                                piece.trim_end_matches(['\n', '\r']).to_string(),
                                Self::syntect_to_ratatui_style(style),
                            )
                        })
                        .collect();
                    lines.push(Line::from(spans));
                }
                Err(_) => lines.push(Line::from(line.trim_end().to_string())),
            }
        }
        lines
    }

    /// Unstyled lines
    pub fn plain(text: &str) -> Vec<Line<'static>> {
        text.lines().map(|l| Line::from(l.to_string())).collect()
    }

    fn syntect_to_ratatui_style(syntect_style: SyntectStyle) -> Style {
        let fg = syntect_style.foreground;
        Style::default().fg(Color::Rgb(fg.r, fg.g, fg.b))
    }
}
