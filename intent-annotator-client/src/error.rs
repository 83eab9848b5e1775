use intent_annotator::{ConfigError, TaxonomyError};
use thiserror::Error;

/// Failures talking to the classifier, label, or persistence services.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Decode(String),

    /// The classifier answered with an `{"error": ..}` body.
    #[error("classifier error: {0}")]
    Classifier(String),

    #[error("invalid label catalog: {0}")]
    Taxonomy(#[from] TaxonomyError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl ClientError {
    /// True for failures worth retrying: transport errors and 5xx.
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Request(e) => e.is_timeout() || e.is_connect(),
            ClientError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = ClientError::Status {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert_eq!(err.to_string(), "service returned 503: unavailable");
        assert!(err.is_transient());

        let err = ClientError::Classifier("texto vacío".to_string());
        assert_eq!(err.to_string(), "classifier error: texto vacío");
        assert!(!err.is_transient());
    }
}
