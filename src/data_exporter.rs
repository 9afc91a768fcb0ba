use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{QuoteStyle, Terminator, WriterBuilder};
use serde_json::{Number, Value};
use std::fs;
use std::path::{Path, PathBuf};

use crate::state::results_state::QueryResultSet;

/// 2^53, the largest float with exact integer neighbours
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_992.0;

/// CSV text and the file name it should be saved under
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvExport {
    pub file_name: String,
    pub contents: String,
}

/// Handles exporting result sets to CSV
pub struct DataExporter;

impl DataExporter {
    /// Build the CSV export for `results`, or `None` when there is nothing to export
    pub fn export_to_csv(results: &QueryResultSet, today: NaiveDate) -> Result<Option<CsvExport>> {
        if results.is_empty() {
            return Ok(None);
        }

        Ok(Some(CsvExport {
            file_name: Self::export_file_name(today),
            contents: Self::csv_text(results)?,
        }))
    }

    /// `query_results_YYYY-MM-DD.csv`
    pub fn export_file_name(today: NaiveDate) -> String {
        format!("query_results_{}.csv", today.format("%Y-%m-%d"))
    }

    /// Header line as bare column names, then every value quoted.
    /// Lines are joined by `\n` without a trailing newline.
    pub fn csv_text(results: &QueryResultSet) -> Result<String> {
        let mut out = Vec::new();

        {
            let mut header = WriterBuilder::new()
                .quote_style(QuoteStyle::Necessary)
                .terminator(Terminator::Any(b'\n'))
                .from_writer(&mut out);
            header.write_record(results.columns())?;
            header.flush()?;
        }

        {
            let mut body = WriterBuilder::new()
                .quote_style(QuoteStyle::Always)
                .terminator(Terminator::Any(b'\n'))
                .from_writer(&mut out);
            for row in results.rows() {
                let record: Vec<String> = results
                    .columns()
                    .iter()
                    .map(|column| Self::cell_text(row.get(column)))
                    .collect();
                body.write_record(&record)?;
            }
            body.flush()?;
        }

        let mut text = String::from_utf8(out).context("CSV output was not valid UTF-8")?;
        if text.ends_with('\n') {
            text.pop();
        }
        Ok(text)
    }

    /// Stringify a cell for export and display
    pub fn cell_text(value: Option<&Value>) -> String {
        match value {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => Self::number_text(n),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Null) => "null".to_string(),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    /// Whole-valued floats print without a fraction (`1200.0` as `1200`)
    fn number_text(n: &Number) -> String {
        match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() <= MAX_SAFE_INTEGER => {
                format!("{}", f as i64)
            }
            _ => n.to_string(),
        }
    }

    /// Write an export into `dir`, returning the full path
    pub fn save(export: &CsvExport, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Could not create export directory {}", dir.display()))?;
        let path = dir.join(&export.file_name);
        fs::write(&path, export.contents.as_bytes())
            .with_context(|| format!("Could not write {}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn result_set(value: Value) -> QueryResultSet {
        let rows = value
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r.as_object().unwrap().clone())
            .collect();
        QueryResultSet::new(rows)
    }

    #[test]
    fn test_quotes_and_escapes_values() {
        let results = result_set(json!([
            {"a": 1, "b": "x,y"},
            {"a": 2, "b": "He said \"hi\""}
        ]));
        let text = DataExporter::csv_text(&results).unwrap();
        let lines: Vec<&str> = text.split('\n').collect();
        assert_eq!(lines, vec!["a,b", "\"1\",\"x,y\"", "\"2\",\"He said \"\"hi\"\"\""]);
    }

    #[test]
    fn test_whole_floats_drop_fraction() {
        let results = result_set(json!([
            {"total": 1200.0, "avg": 0.1, "neg": -3.0, "count": 7}
        ]));
        let text = DataExporter::csv_text(&results).unwrap();
        assert_eq!(text, "total,avg,neg,count\n\"1200\",\"0.1\",\"-3\",\"7\"");
        assert_eq!(DataExporter::cell_text(Some(&json!(1e21))), json!(1e21).to_string());
    }

    #[test]
    fn test_null_bool_and_missing_values() {
        let results = result_set(json!([
            {"id": 1, "active": true, "note": null},
            {"id": 2, "active": false}
        ]));
        let text = DataExporter::csv_text(&results).unwrap();
        assert_eq!(
            text,
            "id,active,note\n\"1\",\"true\",\"null\"\n\"2\",\"false\",\"\""
        );
    }

    #[test]
    fn test_empty_result_set_is_not_exported() {
        let results = QueryResultSet::new(Vec::new());
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert!(DataExporter::export_to_csv(&results, date).unwrap().is_none());
    }

    #[test]
    fn test_file_name_uses_calendar_date() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            DataExporter::export_file_name(date),
            "query_results_2024-03-09.csv"
        );
    }

    #[test]
    fn test_save_writes_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let export = CsvExport {
            file_name: "query_results_2024-03-09.csv".to_string(),
            contents: "a\n\"1\"".to_string(),
        };
        let path = DataExporter::save(&export, dir.path()).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "a\n\"1\"");
    }
}
