//! Query controller: question input, submission and generation errors

use tracing::{debug, info, warn};

use crate::api_client::{GeneratedQuery, RequestError};
use crate::query_templates;
use crate::state::request_token::{RequestSequencer, RequestToken};

#[derive(Debug, Clone)]
pub enum QueryEvent {
    QuestionEdited(String),
    TemplateSelected(usize),
    Submit,
    Finished {
        token: RequestToken,
        question: String,
        result: Result<GeneratedQuery, RequestError>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum QueryEffect {
    None,
    /// Call the generation endpoint
    Generate { token: RequestToken, question: String },
    /// A generation finished; `generated` is `None` on failure
    Analyzed {
        question: String,
        generated: Option<GeneratedQuery>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct QueryState {
    question: String,
    submitting: bool,
    error: Option<String>,
    requests: RequestSequencer,
}

impl QueryState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// Whether a submit would reach the network
    pub fn can_submit(&self) -> bool {
        !self.submitting && !self.question.trim().is_empty()
    }

    pub fn update(&mut self, event: QueryEvent) -> QueryEffect {
        match event {
            QueryEvent::QuestionEdited(text) => {
                if !self.submitting {
                    self.question = text;
                }
                QueryEffect::None
            }
            QueryEvent::TemplateSelected(index) => {
                if self.submitting {
                    return QueryEffect::None;
                }
                if let Some(template) = query_templates::template(index) {
                    debug!(target: "query", "Loaded template '{}'", template.title);
                    self.question = template.question.to_string();
                }
                QueryEffect::None
            }
            QueryEvent::Submit => {
                if !self.can_submit() {
                    return QueryEffect::None;
                }
                self.submitting = true;
                self.error = None;
                let token = self.requests.issue();
                info!(target: "query", "Generating SQL ({}): {}", token, self.question);
                QueryEffect::Generate {
                    token,
                    question: self.question.clone(),
                }
            }
            QueryEvent::Finished {
                token,
                question,
                result,
            } => {
                if !self.requests.complete(token) {
                    debug!(target: "query", "Discarding stale generation {}", token);
                    return QueryEffect::None;
                }
                self.submitting = false;
                match result {
                    Ok(generated) => {
                        self.error = None;
                        QueryEffect::Analyzed {
                            question,
                            generated: Some(generated),
                        }
                    }
                    Err(err) => {
                        warn!(target: "query", "Generation failed: {}", err);
                        self.error = Some(err.to_string());
                        QueryEffect::Analyzed {
                            question,
                            generated: None,
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generated(sql: &str) -> GeneratedQuery {
        GeneratedQuery {
            question: "q".to_string(),
            sql_query: sql.to_string(),
            schema_text: "CREATE TABLE t (id int);".to_string(),
        }
    }

    fn submit(state: &mut QueryState, text: &str) -> QueryEffect {
        state.update(QueryEvent::QuestionEdited(text.to_string()));
        state.update(QueryEvent::Submit)
    }

    #[test]
    fn test_blank_question_never_submits() {
        let mut state = QueryState::new();
        for text in ["", "   ", "\n\t "] {
            assert_eq!(submit(&mut state, text), QueryEffect::None);
            assert!(!state.is_submitting());
        }
    }

    #[test]
    fn test_submit_while_submitting_is_ignored() {
        let mut state = QueryState::new();
        assert!(matches!(
            submit(&mut state, "Top 10 customers"),
            QueryEffect::Generate { .. }
        ));
        assert_eq!(state.update(QueryEvent::Submit), QueryEffect::None);
    }

    #[test]
    fn test_success_clears_error() {
        let mut state = QueryState::new();
        let QueryEffect::Generate { token, question } = submit(&mut state, "first") else {
            panic!("expected generate");
        };
        state.update(QueryEvent::Finished {
            token,
            question,
            result: Err(RequestError::Transport("connection refused".to_string())),
        });
        assert_eq!(state.error(), Some("connection refused"));

        let QueryEffect::Generate { token, question } = state.update(QueryEvent::Submit) else {
            panic!("expected generate");
        };
        assert!(state.error().is_none());
        let effect = state.update(QueryEvent::Finished {
            token,
            question,
            result: Ok(generated("SELECT 1")),
        });
        assert_eq!(
            effect,
            QueryEffect::Analyzed {
                question: "first".to_string(),
                generated: Some(generated("SELECT 1")),
            }
        );
        assert!(!state.is_submitting());
    }

    #[test]
    fn test_failure_reports_question_without_result() {
        let mut state = QueryState::new();
        let QueryEffect::Generate { token, question } = submit(&mut state, "revenue?") else {
            panic!("expected generate");
        };
        let effect = state.update(QueryEvent::Finished {
            token,
            question,
            result: Err(RequestError::Server {
                status: 500,
                message: "model unavailable".to_string(),
            }),
        });
        assert_eq!(
            effect,
            QueryEffect::Analyzed {
                question: "revenue?".to_string(),
                generated: None,
            }
        );
        assert_eq!(state.error(), Some("model unavailable"));
    }

    #[test]
    fn test_template_overwrites_without_submitting() {
        let mut state = QueryState::new();
        state.update(QueryEvent::QuestionEdited("draft".to_string()));
        let effect = state.update(QueryEvent::TemplateSelected(2));
        assert_eq!(effect, QueryEffect::None);
        assert_eq!(state.question(), query_templates::TEMPLATES[2].question);
        assert!(!state.is_submitting());
    }
}
