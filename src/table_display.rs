use comfy_table::{Attribute, Cell, ContentArrangement, Table};
use crossterm::style::Stylize;

use crate::data_exporter::DataExporter;
use crate::query_templates::TEMPLATES;
use crate::state::QueryResultSet;

/// Build the results table for the line-mode front-end
pub fn results_table(results: &QueryResultSet) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(
        results
            .columns()
            .iter()
            .map(|c| Cell::new(c).add_attribute(Attribute::Bold)),
    );

    for row in results.rows() {
        table.add_row(
            results
                .columns()
                .iter()
                .map(|column| DataExporter::cell_text(row.get(column))),
        );
    }

    table
}

pub fn display_results(results: &QueryResultSet) {
    if results.is_empty() {
        println!("{}", "No results found.".yellow());
        return;
    }

    println!("{}", results_table(results));
    println!("\n{}", results.summary().green());
}

pub fn templates_table() -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("#").add_attribute(Attribute::Bold),
        Cell::new("Title").add_attribute(Attribute::Bold),
        Cell::new("Category").add_attribute(Attribute::Bold),
        Cell::new("Question").add_attribute(Attribute::Bold),
    ]);
    for (i, template) in TEMPLATES.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            template.title.to_string(),
            template.category.to_string(),
            template.preview(),
        ]);
    }
    table
}
