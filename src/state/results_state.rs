//! Results controller: running generated SQL and holding the result set

use tracing::{debug, info, warn};

use crate::api_client::{GeneratedQuery, RequestError, Row};
use crate::state::request_token::{RequestSequencer, RequestToken};

/// Rows returned by a run, with their column order fixed at creation.
///
/// Columns are the first row's keys in order, followed by any key that only
/// appears in later rows, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResultSet {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl QueryResultSet {
    pub fn new(rows: Vec<Row>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for key in row.keys() {
                if !columns.iter().any(|c| c == key) {
                    columns.push(key.clone());
                }
            }
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// `1 row returned` / `N rows returned`
    pub fn summary(&self) -> String {
        let n = self.rows.len();
        format!("{} row{} returned", n, if n == 1 { "" } else { "s" })
    }
}

#[derive(Debug, Clone)]
pub enum ResultsEvent {
    Run,
    Finished {
        token: RequestToken,
        result: Result<Vec<Row>, RequestError>,
    },
    CloseModal,
    DismissAlert,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ResultsEffect {
    None,
    Execute { token: RequestToken, sql: String },
}

#[derive(Debug, Clone, Default)]
pub struct ResultsState {
    result_set: Option<QueryResultSet>,
    running: bool,
    modal_open: bool,
    alert: Option<String>,
    requests: RequestSequencer,
}

impl ResultsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn result_set(&self) -> Option<&QueryResultSet> {
        self.result_set.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal_open
    }

    /// Blocking error message awaiting acknowledgement
    pub fn alert(&self) -> Option<&str> {
        self.alert.as_deref()
    }

    /// `generated` is the orchestrator's current query, if any
    pub fn update(&mut self, event: ResultsEvent, generated: Option<&GeneratedQuery>) -> ResultsEffect {
        match event {
            ResultsEvent::Run => {
                let Some(generated) = generated else {
                    debug!(target: "results", "Run ignored: no generated query");
                    return ResultsEffect::None;
                };
                if self.running {
                    return ResultsEffect::None;
                }
                self.running = true;
                let token = self.requests.issue();
                info!(target: "results", "Running query ({}): {}", token, generated.sql_query);
                ResultsEffect::Execute {
                    token,
                    sql: generated.sql_query.clone(),
                }
            }
            ResultsEvent::Finished { token, result } => {
                if !self.requests.complete(token) {
                    debug!(target: "results", "Discarding stale run result {}", token);
                    return ResultsEffect::None;
                }
                self.running = false;
                match result {
                    Ok(rows) => {
                        let result_set = QueryResultSet::new(rows);
                        info!(target: "results", "Query returned {}", result_set.summary());
                        self.result_set = Some(result_set);
                        self.modal_open = true;
                    }
                    Err(err) => {
                        warn!(target: "results", "Error running query: {}", err);
                        self.alert = Some(format!("Error running query: {}", err));
                    }
                }
                ResultsEffect::None
            }
            ResultsEvent::CloseModal => {
                self.modal_open = false;
                ResultsEffect::None
            }
            ResultsEvent::DismissAlert => {
                self.alert = None;
                ResultsEffect::None
            }
        }
    }
}
