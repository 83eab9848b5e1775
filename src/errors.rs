//! Error types for the annotation engine.
//!
//! Each concern gets its own enum so callers can match on what they can
//! recover from. [`AnnotatorError`] collects them for code that just wants
//! to propagate with `?`.

use thiserror::Error;

use crate::annotation::Annotation;
use crate::session::SessionState;

/// A candidate annotation overlaps one that is already committed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "'{}' {}..{} overlaps existing '{}' {}..{}",
    .candidate.label, .candidate.start, .candidate.end,
    .conflicting.label, .conflicting.start, .conflicting.end
)]
pub struct OverlapRejected {
    /// The first committed annotation that overlaps the candidate.
    pub conflicting: Annotation,
    /// The annotation that was refused.
    pub candidate: Annotation,
}

/// An action id that is not part of the taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no such action: {action_id}")]
pub struct NotFound {
    pub action_id: String,
}

/// A user-derived range that cannot be annotated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid span {start}..{end} for text of length {len}")]
pub struct InvalidSpan {
    pub start: usize,
    pub end: usize,
    pub len: usize,
}

/// Errors raised while building or loading an [`ActionTaxonomy`](crate::ActionTaxonomy).
#[derive(Debug, Error)]
pub enum TaxonomyError {
    #[error("failed to read taxonomy {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse taxonomy: {0}")]
    Parse(String),

    #[error("action id must not be empty")]
    EmptyActionId,

    #[error("action '{action_id}' has an empty route")]
    EmptyRoute { action_id: String },

    #[error("action '{action_id}' has an empty label name")]
    EmptyLabel { action_id: String },

    #[error("action '{action_id}' declares sub-action '{sub_action_id}' more than once")]
    DuplicateSubAction {
        action_id: String,
        sub_action_id: String,
    },
}

/// Errors raised by [`AnnotationSession`](crate::AnnotationSession) operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("'{operation}' is not allowed while {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    #[error("cannot start a new analysis while editing annotations; save first")]
    AnalysisWhileEditing,

    #[error("no text range selected")]
    NoSelection,

    #[error("no label selected")]
    NoLabel,

    #[error("label index {index} out of range for {available} labels")]
    LabelOutOfRange { index: usize, available: usize },

    #[error("no action selected")]
    NoAction,

    #[error(transparent)]
    NotFound(#[from] NotFound),

    #[error(transparent)]
    InvalidSpan(#[from] InvalidSpan),

    #[error(transparent)]
    Overlap(#[from] OverlapRejected),
}

/// Errors raised while loading [`AnnotatorConfig`](crate::AnnotatorConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config {path}: {message}")]
    Parse { path: String, message: String },

    #[error("invalid config value for {field}: {message}")]
    Invalid {
        field: &'static str,
        message: String,
    },
}

/// Crate-level error for callers that propagate everything.
#[derive(Debug, Error)]
pub enum AnnotatorError {
    #[error(transparent)]
    Taxonomy(#[from] TaxonomyError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("history I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for AnnotatorError {
    fn from(e: serde_json::Error) -> Self {
        AnnotatorError::Serialization(e.to_string())
    }
}

/// Result type for annotator operations.
pub type AnnotatorResult<T> = Result<T, AnnotatorError>;
