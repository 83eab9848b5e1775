//! Collaborators for [`intent_annotator`]: the classifier, label, and
//! persistence services, and the async loop that drives a session through
//! them.
//!
//! ## Modules
//!
//! - [`backend`] - Collaborator traits
//! - [`http`] - `reqwest` implementation
//! - [`mock`] - Scripted in-memory implementation for tests
//! - [`workflow`] - Classify / save loop with failures caught at the boundary
//! - [`error`] - Client error type

pub mod backend;
pub mod error;
pub mod http;
pub mod mock;
pub mod workflow;

pub use backend::{Classifier, LabelSource, RecordSink};
pub use error::{ClientError, ClientResult};
pub use http::HttpBackend;
pub use mock::{MockBackend, MockCall};
pub use workflow::{CorrectionWorkflow, SaveOutcome, ANALYSIS_FAILED_MESSAGE, SAVE_FAILED_MESSAGE};
