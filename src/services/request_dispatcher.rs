use std::future::Future;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::api_client::SqlAssistantApi;
use crate::schema_file::SelectedFile;
use crate::state::events::AppEvent;
use crate::state::request_token::RequestToken;

/// Runs backend requests on the tokio runtime and reports completions as events.
///
/// Requests are never cancelled; a completion whose receiver is gone is
/// dropped.
#[derive(Clone)]
pub struct RequestDispatcher {
    api: Arc<dyn SqlAssistantApi>,
    runtime: Handle,
    events: UnboundedSender<AppEvent>,
}

impl RequestDispatcher {
    pub fn new(
        api: Arc<dyn SqlAssistantApi>,
        runtime: Handle,
        events: UnboundedSender<AppEvent>,
    ) -> Self {
        Self {
            api,
            runtime,
            events,
        }
    }

    fn spawn<F>(&self, request: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let events = self.events.clone();
        self.runtime.spawn(async move {
            let event = request.await;
            if events.send(event).is_err() {
                debug!(target: "api", "Completion dropped: event loop has shut down");
            }
        });
    }

    pub fn check_health(&self) {
        let api = Arc::clone(&self.api);
        self.spawn(async move { AppEvent::HealthChecked(api.health().await) });
    }

    pub fn upload_schema(&self, token: RequestToken, file: SelectedFile, database_name: String) {
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.upload_schema(&file, &database_name).await;
            AppEvent::UploadFinished { token, result }
        });
    }

    pub fn generate_sql(&self, token: RequestToken, question: String) {
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.generate_sql(&question).await;
            AppEvent::SqlGenerated {
                token,
                question,
                result,
            }
        });
    }

    pub fn run_sql(&self, token: RequestToken, sql: String) {
        let api = Arc::clone(&self.api);
        self.spawn(async move {
            let result = api.run_sql(&sql).await;
            AppEvent::RunFinished { token, result }
        });
    }
}
