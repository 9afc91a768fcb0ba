//! State management components
//!
//! Each controller exposes an `update(event) -> effect` transition and holds
//! no I/O. They are orchestrated by the `AppStateContainer`.

pub mod events;
pub mod query_state;
pub mod request_token;
pub mod results_state;
pub mod schema_upload;

pub use events::{AppEvent, Command, Section};
pub use query_state::QueryState;
pub use request_token::{RequestSequencer, RequestToken};
pub use results_state::{QueryResultSet, ResultsState};
pub use schema_upload::{SchemaUpload, UploadStatus};
