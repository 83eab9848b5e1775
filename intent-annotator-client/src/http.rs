//! `reqwest` implementation of the collaborator traits.

use async_trait::async_trait;
use indexmap::IndexMap;
use intent_annotator::{
    ActionTaxonomy, AnnotatorConfig, ClassifierResponse, LabelMetadata, PredictionResult,
    TrainingRecord,
};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::backend::{Classifier, LabelSource, RecordSink};
use crate::error::{ClientError, ClientResult};

pub const ANALYZE_ENDPOINT: &str = "analyze";
pub const ACTIONS_ENDPOINT: &str = "getActions";
pub const SAVE_ENDPOINT: &str = "save_correct_data";

#[derive(Debug, Serialize)]
struct AnalyzeRequest<'a> {
    text: &'a str,
}

/// Talks to the classifier service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    config: AnnotatorConfig,
}

impl HttpBackend {
    pub fn new(config: AnnotatorConfig) -> ClientResult<Self> {
        config.validate()?;
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        info!(
            url = %config.api_base_url,
            timeout_secs = config.request_timeout_secs,
            "initializing HTTP backend"
        );

        Ok(Self { client, config })
    }

    /// Default config with `INTENT_*` environment overrides.
    pub fn from_env() -> ClientResult<Self> {
        Self::new(AnnotatorConfig::from_env()?)
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    async fn check_status(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

#[async_trait]
impl Classifier for HttpBackend {
    async fn classify(&self, text: &str) -> ClientResult<PredictionResult> {
        let url = self.config.endpoint(ANALYZE_ENDPOINT);
        debug!(url = %url, chars = text.chars().count(), "classifying");

        let response = self
            .client
            .post(&url)
            .json(&AnalyzeRequest { text })
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        match Self::decode::<ClassifierResponse>(response).await? {
            ClassifierResponse::Error { error } => Err(ClientError::Classifier(error)),
            ClassifierResponse::Prediction(prediction) if prediction.is_well_formed() => {
                Ok(prediction)
            }
            ClassifierResponse::Prediction(prediction) => Err(ClientError::Decode(format!(
                "malformed prediction: action '{}', probability {}",
                prediction.action, prediction.probability
            ))),
        }
    }
}

#[async_trait]
impl LabelSource for HttpBackend {
    async fn fetch_labels(&self) -> ClientResult<ActionTaxonomy> {
        let url = self.config.endpoint(ACTIONS_ENDPOINT);
        let response = self.client.get(&url).send().await?;
        let response = Self::check_status(response).await?;

        let catalog: IndexMap<String, IndexMap<String, LabelMetadata>> =
            Self::decode(response).await?;
        let taxonomy = ActionTaxonomy::from_label_catalog(catalog)?;
        info!(actions = taxonomy.len(), "fetched label catalog");
        Ok(taxonomy)
    }
}

#[async_trait]
impl RecordSink for HttpBackend {
    async fn save(&self, record: &TrainingRecord) -> ClientResult<()> {
        let url = self.config.endpoint(SAVE_ENDPOINT);
        let response = self.client.post(&url).json(record).send().await?;
        Self::check_status(response).await?;
        info!(
            action_id = %record.action,
            entities = record.entities.len(),
            "training record saved"
        );
        Ok(())
    }
}
