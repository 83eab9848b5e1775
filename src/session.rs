//! The correction session: one text, one action, one annotation set.
//!
//! [`AnnotationSession`] drives the review flow as an explicit state machine:
//!
//! ```text
//! Idle ──complete_analysis(prediction)──▶ Reviewing ──start_edit──▶ Editing
//!  ▲                                                                  │
//!  └──────────────────────────── take_record ◀────────────────────────┘
//! ```
//!
//! All annotation mutations go through the session's exclusively owned
//! [`AnnotationSet`]; the taxonomy is shared read-only.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::annotation::{Annotation, AnnotationSet, RenderedAnnotation};
use crate::catalog::LabelCatalog;
use crate::display::AnnotationDisplay;
use crate::errors::{NotFound, SessionError};
use crate::record::{ClassifierOutcome, PredictionResult, TrainingRecord};
use crate::taxonomy::ActionTaxonomy;
use crate::text::{Span, TextBuffer};

/// Which operations are currently legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// No prediction shown.
    Idle,
    /// Prediction shown, annotations not yet editable.
    Reviewing,
    /// Label catalog loaded, annotations editable.
    Editing,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Idle => write!(f, "idle"),
            SessionState::Reviewing => write!(f, "reviewing"),
            SessionState::Editing => write!(f, "editing"),
        }
    }
}

/// A highlighted range of the text, consumed by [`AnnotationSession::set_label`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Selection {
    pub fn span(&self) -> Span {
        Span::new(self.start, self.end)
    }
}

#[derive(Debug)]
pub struct AnnotationSession {
    taxonomy: Arc<ActionTaxonomy>,
    state: SessionState,
    text: TextBuffer,
    outcome: Option<ClassifierOutcome>,
    analysis_pending: bool,
    selected_action: Option<String>,
    catalog: LabelCatalog,
    selection: Option<Selection>,
    pending_label: Option<usize>,
    annotations: AnnotationSet,
}

impl AnnotationSession {
    pub fn new(taxonomy: Arc<ActionTaxonomy>) -> Self {
        Self {
            taxonomy,
            state: SessionState::Idle,
            text: TextBuffer::default(),
            outcome: None,
            analysis_pending: false,
            selected_action: None,
            catalog: LabelCatalog::default(),
            selection: None,
            pending_label: None,
            annotations: AnnotationSet::new(),
        }
    }

    pub fn with_text(taxonomy: Arc<ActionTaxonomy>, text: impl Into<String>) -> Self {
        let mut session = Self::new(taxonomy);
        session.text = TextBuffer::new(text);
        session
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn taxonomy(&self) -> &ActionTaxonomy {
        &self.taxonomy
    }

    pub fn text(&self) -> &TextBuffer {
        &self.text
    }

    pub fn outcome(&self) -> Option<&ClassifierOutcome> {
        self.outcome.as_ref()
    }

    pub fn prediction(&self) -> Option<&PredictionResult> {
        self.outcome.as_ref().and_then(ClassifierOutcome::prediction)
    }

    pub fn error_message(&self) -> Option<&str> {
        self.outcome.as_ref().and_then(ClassifierOutcome::error_message)
    }

    pub fn is_analysis_pending(&self) -> bool {
        self.analysis_pending
    }

    pub fn selected_action(&self) -> Option<&str> {
        self.selected_action.as_deref()
    }

    pub fn catalog(&self) -> &LabelCatalog {
        &self.catalog
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn pending_label(&self) -> Option<&str> {
        self.pending_label.and_then(|i| self.catalog.label_at(i))
    }

    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    pub fn rendered(&self) -> Vec<RenderedAnnotation> {
        self.annotations.render_against(&self.text)
    }

    pub fn display(&self) -> AnnotationDisplay<'_> {
        AnnotationDisplay::new(&self.text, &self.annotations)
    }

    // ------------------------------------------------------------------
    // Text input
    // ------------------------------------------------------------------

    /// Replace the text being worked on.
    ///
    /// While editing, annotations are rebased onto the new text and the
    /// selection is dropped; returns the annotations the edit evicted.
    /// Outside editing, a changed text discards the shown outcome and the
    /// session returns to `Idle`.
    pub fn set_text(&mut self, text: impl Into<String>) -> Vec<Annotation> {
        let old_text = self.text.replace(text);
        if old_text == self.text {
            return Vec::new();
        }

        if self.state != SessionState::Editing {
            self.outcome = None;
            self.selected_action = None;
            self.transition(SessionState::Idle);
            return Vec::new();
        }

        self.selection = None;
        self.annotations.rebase(&old_text, &self.text)
    }

    // ------------------------------------------------------------------
    // Analysis
    // ------------------------------------------------------------------

    /// Mark an analysis as in flight and return the text to classify.
    ///
    /// Refused while editing so a new prediction cannot discard edits.
    pub fn begin_analysis(&mut self) -> Result<String, SessionError> {
        if self.state == SessionState::Editing {
            return Err(SessionError::AnalysisWhileEditing);
        }
        self.analysis_pending = true;
        debug!(state = %self.state, "analysis started");
        Ok(self.text.as_str().to_string())
    }

    /// Show the classifier's outcome.
    ///
    /// A prediction moves the session to `Reviewing` and pre-selects its
    /// action; a failure shows the message and returns to `Idle`. The last
    /// completed analysis wins.
    pub fn complete_analysis(&mut self, outcome: ClassifierOutcome) -> Result<(), SessionError> {
        if self.state == SessionState::Editing {
            return Err(SessionError::AnalysisWhileEditing);
        }
        self.analysis_pending = false;

        match &outcome {
            ClassifierOutcome::Prediction(prediction) => {
                self.selected_action = Some(prediction.action.clone());
                self.transition(SessionState::Reviewing);
            }
            ClassifierOutcome::Failed { message } => {
                debug!(message = %message, "analysis failed");
                self.selected_action = None;
                self.transition(SessionState::Idle);
            }
        }
        self.outcome = Some(outcome);
        Ok(())
    }

    /// Show an error raised outside the classifier, such as a failed save.
    ///
    /// Replaces any shown prediction and returns to `Idle`. Refused while
    /// editing.
    pub fn report_failure(&mut self, message: impl Into<String>) -> Result<(), SessionError> {
        if self.state == SessionState::Editing {
            return Err(SessionError::InvalidState {
                operation: "report_failure",
                state: self.state,
            });
        }
        let message = message.into();
        debug!(message = %message, "failure reported");

        self.selected_action = None;
        self.outcome = Some(ClassifierOutcome::Failed { message });
        self.transition(SessionState::Idle);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Editing
    // ------------------------------------------------------------------

    /// Open the annotation editor for the selected action.
    pub fn start_edit(&mut self) -> Result<(), SessionError> {
        self.require("start_edit", SessionState::Reviewing)?;
        let action_id = self.selected_action.clone().ok_or(SessionError::NoAction)?;

        self.catalog = LabelCatalog::resolve(&self.taxonomy, &action_id);
        self.annotations.clear();
        self.selection = None;
        self.pending_label = None;
        self.transition(SessionState::Editing);
        Ok(())
    }

    /// Switch the action being annotated.
    ///
    /// Reloads the label catalog and drops annotations whose label the new
    /// action does not offer. Returns the dropped annotations.
    pub fn select_action(&mut self, action_id: &str) -> Result<Vec<Annotation>, SessionError> {
        if self.state == SessionState::Idle {
            return Err(SessionError::InvalidState {
                operation: "select_action",
                state: self.state,
            });
        }
        if !self.taxonomy.contains(action_id) {
            return Err(NotFound {
                action_id: action_id.to_string(),
            }
            .into());
        }

        self.selected_action = Some(action_id.to_string());
        if self.state != SessionState::Editing {
            return Ok(Vec::new());
        }

        self.catalog = LabelCatalog::resolve(&self.taxonomy, action_id);
        self.pending_label = None;
        let catalog = &self.catalog;
        let dropped = self.annotations.retain_labels(|a| catalog.contains(&a.label));
        debug!(action_id, dropped = dropped.len(), "switched action");
        Ok(dropped)
    }

    /// Highlight a UTF-16 range of the text.
    pub fn select_range(&mut self, start: usize, end: usize) -> Result<&Selection, SessionError> {
        self.require("select_range", SessionState::Editing)?;
        let span = Span::checked(start, end, &self.text)?;
        let text = self.text.slice(span).unwrap_or_default();
        Ok(&*self.selection.insert(Selection { text, start, end }))
    }

    /// Pick a label by its index in the catalog.
    pub fn select_label(&mut self, index: usize) -> Result<&str, SessionError> {
        self.require("select_label", SessionState::Editing)?;
        match self.catalog.label_at(index) {
            Some(label) => {
                self.pending_label = Some(index);
                Ok(label)
            }
            None => Err(SessionError::LabelOutOfRange {
                index,
                available: self.catalog.len(),
            }),
        }
    }

    /// Commit the current selection under the pending label.
    pub fn set_label(&mut self) -> Result<&Annotation, SessionError> {
        self.require("set_label", SessionState::Editing)?;
        let span = self.selection.as_ref().ok_or(SessionError::NoSelection)?.span();
        let label = self
            .pending_label
            .and_then(|i| self.catalog.label_at(i))
            .ok_or(SessionError::NoLabel)?
            .to_string();

        Ok(self
            .annotations
            .try_add(&self.text, Annotation::from_span(label, span))?)
    }

    /// Remove every annotation without saving.
    pub fn clear_annotations(&mut self) -> Result<(), SessionError> {
        self.require("clear_annotations", SessionState::Editing)?;
        self.annotations.clear();
        Ok(())
    }

    /// Produce the record to persist and reset the session to `Idle`.
    ///
    /// Annotations, selection and pending label are discarded whatever the
    /// persistence collaborator later reports.
    pub fn take_record(&mut self) -> Result<TrainingRecord, SessionError> {
        self.require("save", SessionState::Editing)?;
        let action_id = self.selected_action.take().ok_or(SessionError::NoAction)?;

        let record = self.annotations.to_training_record(&self.text, &action_id);
        info!(
            action_id = %action_id,
            entities = record.entities.len(),
            "training record ready"
        );

        self.annotations.clear();
        self.selection = None;
        self.pending_label = None;
        self.catalog = LabelCatalog::default();
        self.outcome = None;
        self.transition(SessionState::Idle);
        Ok(record)
    }

    fn require(&self, operation: &'static str, state: SessionState) -> Result<(), SessionError> {
        if self.state == state {
            Ok(())
        } else {
            Err(SessionError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn transition(&mut self, to: SessionState) {
        if self.state != to {
            debug!(from = %self.state, to = %to, "session transition");
        }
        self.state = to;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::taxonomy::ActionEntry;
    use indexmap::IndexMap;

    fn taxonomy() -> Arc<ActionTaxonomy> {
        Arc::new(
            ActionTaxonomy::from_entries([
                (
                    "greet",
                    ActionEntry::new("greet")
                        .with_label("greeting")
                        .with_label("time"),
                ),
                (
                    "book_flight",
                    ActionEntry::new("book_flight")
                        .with_label("time")
                        .with_label("destination"),
                ),
            ])
            .unwrap(),
        )
    }

    fn prediction(action: &str) -> ClassifierOutcome {
        ClassifierOutcome::Prediction(PredictionResult {
            action: action.to_string(),
            probability: 0.9,
            entities_labels: IndexMap::new(),
        })
    }

    fn editing_session() -> AnnotationSession {
        let mut session = AnnotationSession::with_text(taxonomy(), "hola buenas tardes");
        session.begin_analysis().unwrap();
        session.complete_analysis(prediction("greet")).unwrap();
        session.start_edit().unwrap();
        session
    }

    #[test]
    fn test_full_flow() {
        let mut session = AnnotationSession::with_text(taxonomy(), "hola buenas tardes");
        assert_eq!(session.state(), SessionState::Idle);

        assert_eq!(session.begin_analysis().unwrap(), "hola buenas tardes");
        assert!(session.is_analysis_pending());
        session.complete_analysis(prediction("greet")).unwrap();
        assert_eq!(session.state(), SessionState::Reviewing);
        assert_eq!(session.selected_action(), Some("greet"));

        session.start_edit().unwrap();
        assert_eq!(session.state(), SessionState::Editing);
        assert_eq!(session.catalog().labels(), &["greeting", "time"]);

        session.select_range(0, 4).unwrap();
        session.select_label(0).unwrap();
        assert_eq!(session.set_label().unwrap(), &Annotation::new("greeting", 0, 4));

        let selection = session.select_range(12, 18).unwrap();
        assert_eq!(selection.text, "tardes");
        session.select_label(1).unwrap();
        session.set_label().unwrap();

        let record = session.take_record().unwrap();
        assert_eq!(record.action, "greet");
        assert_eq!(record.text, "hola buenas tardes");
        assert_eq!(
            record.entities,
            vec![Annotation::new("greeting", 0, 4), Annotation::new("time", 12, 18)]
        );

        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.annotations().is_empty());
        assert!(session.selection().is_none());
        assert!(session.pending_label().is_none());
    }

    #[test]
    fn test_overlap_surfaces_as_session_error() {
        let mut session = editing_session();
        session.select_range(0, 4).unwrap();
        session.select_label(0).unwrap();
        session.set_label().unwrap();

        session.select_range(2, 8).unwrap();
        session.select_label(1).unwrap();
        let err = session.set_label().unwrap_err();
        assert!(matches!(
            err,
            SessionError::Overlap(ref o) if o.conflicting.label == "greeting"
        ));
        assert_eq!(session.annotations().len(), 1);
    }

    #[test]
    fn test_set_label_requires_selection_and_label() {
        let mut session = editing_session();
        assert_eq!(session.set_label().unwrap_err(), SessionError::NoSelection);

        session.select_range(0, 4).unwrap();
        assert_eq!(session.set_label().unwrap_err(), SessionError::NoLabel);
    }

    #[test]
    fn test_invalid_selection_is_recoverable() {
        let mut session = editing_session();
        assert!(matches!(
            session.select_range(4, 4),
            Err(SessionError::InvalidSpan(_))
        ));
        assert!(matches!(
            session.select_range(0, 99),
            Err(SessionError::InvalidSpan(_))
        ));
        assert!(session.selection().is_none());
    }

    #[test]
    fn test_label_index_out_of_range() {
        let mut session = editing_session();
        assert_eq!(
            session.select_label(5).unwrap_err(),
            SessionError::LabelOutOfRange {
                index: 5,
                available: 2
            }
        );
    }

    #[test]
    fn test_analysis_refused_while_editing() {
        let mut session = editing_session();
        assert_eq!(
            session.begin_analysis().unwrap_err(),
            SessionError::AnalysisWhileEditing
        );
        assert_eq!(
            session.complete_analysis(prediction("book_flight")).unwrap_err(),
            SessionError::AnalysisWhileEditing
        );
        assert_eq!(session.selected_action(), Some("greet"));
    }

    #[test]
    fn test_failed_analysis_shows_message() {
        let mut session = AnnotationSession::with_text(taxonomy(), "hola");
        session.begin_analysis().unwrap();
        session
            .complete_analysis(ClassifierOutcome::Failed {
                message: "try again later".into(),
            })
            .unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.error_message(), Some("try again later"));
        assert!(!session.is_analysis_pending());

        assert!(matches!(
            session.start_edit(),
            Err(SessionError::InvalidState { state: SessionState::Idle, .. })
        ));
    }

    #[test]
    fn test_last_analysis_wins() {
        let mut session = AnnotationSession::with_text(taxonomy(), "hola");
        session.begin_analysis().unwrap();
        session.begin_analysis().unwrap();
        session.complete_analysis(prediction("greet")).unwrap();
        session.complete_analysis(prediction("book_flight")).unwrap();
        assert_eq!(session.selected_action(), Some("book_flight"));
        assert_eq!(session.state(), SessionState::Reviewing);
    }

    #[test]
    fn test_editing_operations_rejected_outside_editing() {
        let mut session = AnnotationSession::with_text(taxonomy(), "hola");
        assert!(matches!(
            session.select_range(0, 2),
            Err(SessionError::InvalidState { operation: "select_range", .. })
        ));
        assert!(session.clear_annotations().is_err());
        assert!(matches!(
            session.take_record(),
            Err(SessionError::InvalidState { operation: "save", .. })
        ));
    }

    #[test]
    fn test_select_action_keeps_shared_labels() {
        let mut session = editing_session();
        session.select_range(0, 4).unwrap();
        session.select_label(0).unwrap();
        session.set_label().unwrap();
        session.select_range(12, 18).unwrap();
        session.select_label(1).unwrap();
        session.set_label().unwrap();

        let dropped = session.select_action("book_flight").unwrap();
        assert_eq!(dropped, vec![Annotation::new("greeting", 0, 4)]);
        assert_eq!(session.annotations().as_slice(), &[Annotation::new("time", 12, 18)]);
        assert_eq!(session.catalog().labels(), &["time", "destination"]);
        assert!(session.pending_label().is_none());

        assert!(matches!(
            session.select_action("cancel"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_clear_then_add_again() {
        let mut session = editing_session();
        session.select_range(0, 4).unwrap();
        session.select_label(0).unwrap();
        session.set_label().unwrap();

        session.clear_annotations().unwrap();
        assert!(session.annotations().is_empty());
        session.set_label().unwrap();
        assert_eq!(session.annotations().len(), 1);
    }

    #[test]
    fn test_set_text_rebases_while_editing() {
        let mut session = editing_session();
        session.select_range(12, 18).unwrap();
        session.select_label(1).unwrap();
        session.set_label().unwrap();

        let evicted = session.set_text("hola muy buenas tardes");
        assert!(evicted.is_empty());
        assert!(session.selection().is_none());
        assert_eq!(session.rendered()[0].substring, "tardes");
        assert_eq!(session.annotations().as_slice()[0], Annotation::new("time", 16, 22));

        let evicted = session.set_text("hola muy buenas noches");
        assert_eq!(evicted, vec![Annotation::new("time", 16, 22)]);
        assert!(session.annotations().is_empty());
    }

    #[test]
    fn test_set_text_outside_editing_discards_prediction() {
        let mut session = AnnotationSession::with_text(taxonomy(), "hola buenas tardes");
        session.set_text("hola buenas tardes");
        assert_eq!(session.state(), SessionState::Idle);

        session.begin_analysis().unwrap();
        session.complete_analysis(prediction("greet")).unwrap();

        // Same text keeps the prediction on screen
        session.set_text("hola buenas tardes");
        assert_eq!(session.state(), SessionState::Reviewing);
        assert!(session.prediction().is_some());

        assert!(session.set_text("quiero un vuelo").is_empty());
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.outcome().is_none());
        assert!(session.selected_action().is_none());
        assert_eq!(
            session.start_edit().unwrap_err(),
            SessionError::InvalidState {
                operation: "start_edit",
                state: SessionState::Idle,
            }
        );
    }

    #[test]
    fn test_report_failure() {
        let mut session = editing_session();
        assert_eq!(
            session.report_failure("sin conexión").unwrap_err(),
            SessionError::InvalidState {
                operation: "report_failure",
                state: SessionState::Editing,
            }
        );
        assert!(session.error_message().is_none());

        session.take_record().unwrap();
        session.report_failure("sin conexión").unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.error_message(), Some("sin conexión"));

        session.begin_analysis().unwrap();
        session.complete_analysis(prediction("greet")).unwrap();
        session.report_failure("otra vez").unwrap();
        assert_eq!(session.state(), SessionState::Idle);
        assert!(session.prediction().is_none());
        assert!(session.selected_action().is_none());
        assert_eq!(session.error_message(), Some("otra vez"));
    }

    #[test]
    fn test_set_label_returns_committed_annotation() {
        let mut session = editing_session();
        session.select_range(12, 18).unwrap();
        session.select_label(1).unwrap();
        assert_eq!(session.set_label().unwrap(), &Annotation::new("time", 12, 18));

        session.select_range(0, 4).unwrap();
        session.select_label(0).unwrap();
        assert_eq!(session.set_label().unwrap(), &Annotation::new("greeting", 0, 4));
        assert_eq!(session.annotations().len(), 2);
    }

    #[test]
    fn test_display_shows_committed_annotations() {
        let mut session = editing_session();
        session.select_range(12, 18).unwrap();
        session.select_label(1).unwrap();
        session.set_label().unwrap();

        insta::assert_snapshot!(session.display(), @r###"
        hola buenas tardes
                    ╰────╯ time
        "###);
    }
}
