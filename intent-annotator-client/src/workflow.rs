//! The async correction loop: classify, review and edit, save.
//!
//! Network failures stop here. A failed classification becomes the message
//! the session shows. A failed save resets the session regardless, shows
//! [`SAVE_FAILED_MESSAGE`] and carries the error in [`SaveOutcome`].

use intent_annotator::{
    ActionTaxonomy, AnnotationSession, AnnotatorConfig, ClassifierOutcome, SessionError,
    TrainingRecord,
};
use tracing::warn;

use crate::backend::{Classifier, LabelSource, RecordSink};
use crate::error::{ClientError, ClientResult};

/// Shown when the classifier could not be reached or answered garbage.
pub const ANALYSIS_FAILED_MESSAGE: &str =
    "Se produjo un error al analizar el texto. Por favor, inténtelo de nuevo más tarde.";

/// Shown when a corrected record could not be persisted. Users see the same
/// wording as for a failed analysis.
pub const SAVE_FAILED_MESSAGE: &str = ANALYSIS_FAILED_MESSAGE;

#[derive(Debug)]
pub enum SaveOutcome {
    Saved(TrainingRecord),
    /// The record was built but the sink refused it.
    NotPersisted {
        record: TrainingRecord,
        error: ClientError,
    },
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }

    pub fn record(&self) -> &TrainingRecord {
        match self {
            SaveOutcome::Saved(record) | SaveOutcome::NotPersisted { record, .. } => record,
        }
    }

    pub fn error(&self) -> Option<&ClientError> {
        match self {
            SaveOutcome::Saved(_) => None,
            SaveOutcome::NotPersisted { error, .. } => Some(error),
        }
    }
}

pub struct CorrectionWorkflow<B> {
    backend: B,
}

impl<B> CorrectionWorkflow<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The configured taxonomy file if there is one, else the label service.
    pub async fn load_taxonomy(&self, config: &AnnotatorConfig) -> ClientResult<ActionTaxonomy>
    where
        B: LabelSource,
    {
        match &config.taxonomy_path {
            Some(path) => Ok(ActionTaxonomy::load(path)?),
            None => self.backend.fetch_labels().await,
        }
    }

    /// Classify the session's text and show the outcome.
    pub async fn analyze(&self, session: &mut AnnotationSession) -> Result<(), SessionError>
    where
        B: Classifier,
    {
        let text = session.begin_analysis()?;

        let outcome = match self.backend.classify(&text).await {
            Ok(prediction) => ClassifierOutcome::Prediction(prediction),
            Err(ClientError::Classifier(message)) => {
                warn!(error = %message, "classifier rejected text");
                ClassifierOutcome::Failed { message }
            }
            Err(e) => {
                warn!(error = %e, "classification failed");
                ClassifierOutcome::Failed {
                    message: ANALYSIS_FAILED_MESSAGE.to_string(),
                }
            }
        };

        session.complete_analysis(outcome)
    }

    /// Take the session's record and hand it to the sink.
    ///
    /// Errors only when the session is not in a state that can save.
    pub async fn save(&self, session: &mut AnnotationSession) -> Result<SaveOutcome, SessionError>
    where
        B: RecordSink,
    {
        let record = session.take_record()?;

        match self.backend.save(&record).await {
            Ok(()) => Ok(SaveOutcome::Saved(record)),
            Err(error) => {
                warn!(
                    action_id = %record.action,
                    error = %error,
                    "training record not persisted"
                );
                session.report_failure(SAVE_FAILED_MESSAGE)?;
                Ok(SaveOutcome::NotPersisted { record, error })
            }
        }
    }
}
