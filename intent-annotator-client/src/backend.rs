//! Collaborator traits for the services behind the annotator.

use async_trait::async_trait;
use intent_annotator::{ActionTaxonomy, PredictionResult, TrainingRecord};

use crate::error::ClientResult;

/// Predicts an action and entities for a text.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> ClientResult<PredictionResult>;
}

/// Serves the label catalog of every action.
#[async_trait]
pub trait LabelSource: Send + Sync {
    async fn fetch_labels(&self) -> ClientResult<ActionTaxonomy>;
}

/// Persists corrected examples for retraining.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn save(&self, record: &TrainingRecord) -> ClientResult<()>;
}
