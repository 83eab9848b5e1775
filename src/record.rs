//! Wire types exchanged with the classifier and persistence services.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::annotation::Annotation;

/// The corrected example sent for persistence and retraining.
///
/// Serializes as `{"text": .., "action": .., "entities": [{label, start, end}]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub text: String,
    pub action: String,
    pub entities: Vec<Annotation>,
}

/// The classifier's raw prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub action: String,
    pub probability: f64,
    /// Entity key -> `(value, label)` pair, in the order the classifier sent them.
    #[serde(default)]
    pub entities_labels: IndexMap<String, (String, String)>,
}

impl PredictionResult {
    /// True if the probability is a number in `[0, 1]`.
    pub fn is_well_formed(&self) -> bool {
        (0.0..=1.0).contains(&self.probability) && !self.action.is_empty()
    }
}

/// Body returned by the classify endpoint: a prediction or an error message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClassifierResponse {
    Error { error: String },
    Prediction(PredictionResult),
}

/// What the session shows after an analysis: the prediction, or a
/// user-visible error message that replaces it.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassifierOutcome {
    Prediction(PredictionResult),
    Failed { message: String },
}

impl ClassifierOutcome {
    pub fn prediction(&self) -> Option<&PredictionResult> {
        match self {
            ClassifierOutcome::Prediction(p) => Some(p),
            ClassifierOutcome::Failed { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            ClassifierOutcome::Prediction(_) => None,
            ClassifierOutcome::Failed { message } => Some(message),
        }
    }
}
