use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

use crate::classification::{Classification, UnknownLabel};

/// Failure talking to the prediction service.
///
/// Kept distinct from a valid `productive` answer; callers decide how to
/// degrade.
#[derive(Debug, Error)]
pub enum PredictorError {
    #[error("predictor did not answer within {0:?}")]
    Timeout(Duration),
    #[error("predictor transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("predictor returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("malformed predictor response: {0}")]
    Malformed(String),
    #[error(transparent)]
    UnknownLabel(#[from] UnknownLabel),
}

impl PredictorError {
    /// Map a reqwest error, separating timeouts from other transport failures
    #[must_use]
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout)
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err)
        }
    }
}

/// Trait for the external activity predictor
#[async_trait]
pub trait Predictor: Send + Sync {
    /// Classify a window by process name and title
    async fn predict(
        &self,
        process_name: &str,
        window_title: &str,
    ) -> Result<Classification, PredictorError>;

    /// Where predictions come from (for logs)
    fn endpoint(&self) -> &str;
}
