//! Scripted in-memory backend.
//!
//! Responses are queued per operation and consumed in order; every call is
//! logged so tests can assert on what the workflow sent.
//!
//! ```rust
//! use intent_annotator::PredictionResult;
//! use intent_annotator_client::{Classifier, MockBackend};
//!
//! # async fn demo() {
//! let backend = MockBackend::new().with_prediction(PredictionResult {
//!     action: "greet".to_string(),
//!     probability: 0.9,
//!     entities_labels: Default::default(),
//! });
//! let prediction = backend.classify("hola").await.unwrap();
//! assert_eq!(prediction.action, "greet");
//! # }
//! ```

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use intent_annotator::{ActionTaxonomy, PredictionResult, TrainingRecord};

use crate::backend::{Classifier, LabelSource, RecordSink};
use crate::error::{ClientError, ClientResult};

#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    Classify(String),
    FetchLabels,
    Save(TrainingRecord),
}

#[derive(Debug, Default)]
struct Script {
    predictions: VecDeque<ClientResult<PredictionResult>>,
    taxonomies: VecDeque<ClientResult<ActionTaxonomy>>,
    saves: VecDeque<ClientResult<()>>,
}

#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    script: Arc<Mutex<Script>>,
    call_log: Arc<Mutex<Vec<MockCall>>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_prediction(self, prediction: PredictionResult) -> Self {
        self.push_classify(Ok(prediction));
        self
    }

    pub fn with_classify_error(self, error: ClientError) -> Self {
        self.push_classify(Err(error));
        self
    }

    pub fn with_taxonomy(self, taxonomy: ActionTaxonomy) -> Self {
        self.lock_script().taxonomies.push_back(Ok(taxonomy));
        self
    }

    /// Queue a failure for the next `save`. Saves succeed when nothing is queued.
    pub fn with_save_error(self, error: ClientError) -> Self {
        self.lock_script().saves.push_back(Err(error));
        self
    }

    pub fn push_classify(&self, result: ClientResult<PredictionResult>) {
        self.lock_script().predictions.push_back(result);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.lock_log().clone()
    }

    /// Records handed to `save`, whether or not the save was scripted to fail.
    pub fn saved_records(&self) -> Vec<TrainingRecord> {
        self.lock_log()
            .iter()
            .filter_map(|call| match call {
                MockCall::Save(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: MockCall) {
        self.lock_log().push(call);
    }

    fn lock_script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn lock_log(&self) -> std::sync::MutexGuard<'_, Vec<MockCall>> {
        self.call_log.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Classifier for MockBackend {
    async fn classify(&self, text: &str) -> ClientResult<PredictionResult> {
        self.record(MockCall::Classify(text.to_string()));
        let next = self.lock_script().predictions.pop_front();
        next.unwrap_or_else(|| Err(ClientError::Classifier("no scripted prediction".to_string())))
    }
}

#[async_trait]
impl LabelSource for MockBackend {
    async fn fetch_labels(&self) -> ClientResult<ActionTaxonomy> {
        self.record(MockCall::FetchLabels);
        let next = self.lock_script().taxonomies.pop_front();
        next.unwrap_or_else(|| Ok(ActionTaxonomy::default()))
    }
}

#[async_trait]
impl RecordSink for MockBackend {
    async fn save(&self, record: &TrainingRecord) -> ClientResult<()> {
        self.record(MockCall::Save(record.clone()));
        let next = self.lock_script().saves.pop_front();
        next.unwrap_or(Ok(()))
    }
}
