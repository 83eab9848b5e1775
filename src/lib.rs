#![doc(
    html_root_url = "https://docs.rs/intent-annotator/0.1.0",
    issue_tracker_base_url = "https://github.com/intent-annotator/intent-annotator/issues/"
)]

//! Span-annotation engine for correcting intent-classifier predictions.
//!
//! A user types or dictates a sentence, a classifier predicts an action and
//! its entities, and the user corrects the prediction by marking spans of the
//! text with labels offered by the chosen action. The corrected example is
//! then sent back as a training record.
//!
//! ```
//! use std::sync::Arc;
//! use intent_annotator::{
//!     ActionEntry, ActionTaxonomy, AnnotationSession, ClassifierOutcome, PredictionResult,
//! };
//!
//! let taxonomy = ActionTaxonomy::from_entries([(
//!     "greet",
//!     ActionEntry::new("greet").with_label("greeting").with_label("time"),
//! )])
//! .unwrap();
//!
//! let mut session = AnnotationSession::with_text(Arc::new(taxonomy), "hola buenas tardes");
//! session.begin_analysis().unwrap();
//! session
//!     .complete_analysis(ClassifierOutcome::Prediction(PredictionResult {
//!         action: "greet".to_string(),
//!         probability: 0.91,
//!         entities_labels: Default::default(),
//!     }))
//!     .unwrap();
//!
//! session.start_edit().unwrap();
//! session.select_action("greet").unwrap();
//! session.select_range(0, 4).unwrap();
//! session.select_label(0).unwrap();
//! session.set_label().unwrap();
//!
//! let record = session.take_record().unwrap();
//! assert_eq!(record.entities[0].label, "greeting");
//! ```
//!
//! ## Modules
//!
//! - [`text`] - UTF-16 addressed text buffer, spans and edits
//! - [`taxonomy`] - Actions, their routes, labels and sub-actions
//! - [`catalog`] - Label and route resolution for an action
//! - [`annotation`] - The non-overlapping annotation store
//! - [`display`] - Underline rendering of annotations for terminals and tests
//! - [`record`] - Classifier wire types and the training record
//! - [`session`] - The review / edit / save state machine
//! - [`speech`] - Continuous speech capture state machine
//! - [`history`] - Completed actions and message history per user
//! - [`config`] - File and environment configuration
//! - [`errors`] - Error types

pub mod annotation;
pub mod catalog;
pub mod config;
pub mod display;
pub mod errors;
pub mod history;
pub mod record;
pub mod session;
pub mod speech;
pub mod taxonomy;
pub mod text;

pub use annotation::{Annotation, AnnotationSet, RenderedAnnotation};
pub use catalog::{resolve_labels, resolve_route, LabelCatalog};
pub use config::AnnotatorConfig;
pub use display::AnnotationDisplay;
pub use errors::{
    AnnotatorError, AnnotatorResult, ConfigError, InvalidSpan, NotFound, OverlapRejected,
    SessionError, TaxonomyError,
};
pub use history::{CompletedAction, Message, UserContext};
pub use record::{ClassifierOutcome, ClassifierResponse, PredictionResult, TrainingRecord};
pub use session::{AnnotationSession, Selection, SessionState};
pub use speech::{CaptureState, SpeechCapture, SpeechCommand, SpeechEvent};
pub use taxonomy::{ActionEntry, ActionTaxonomy, LabelMetadata, SubAction};
pub use text::{Span, TextBuffer, TextEdit};
