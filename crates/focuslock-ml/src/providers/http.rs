use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

use crate::predictor::{Predictor, PredictorError};
use crate::Classification;

pub const DEFAULT_PREDICTOR_URL: &str = "http://127.0.0.1:5000";

/// Prediction service reached over HTTP.
///
/// `POST {base_url}/predict` with `{"text": "<process> <title>"}`, answered by
/// `{"prediction": "productive" | "distracting"}`.
pub struct HttpPredictor {
    client: Client,
    base_url: String,
    timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    prediction: String,
}

impl HttpPredictor {
    /// Create a client with a per-request timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (TLS backend init)
    pub fn new(base_url: Option<&str>, timeout: Duration) -> Result<Self, PredictorError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(PredictorError::Transport)?;

        Ok(Self {
            client,
            base_url: base_url
                .unwrap_or(DEFAULT_PREDICTOR_URL)
                .trim_end_matches('/')
                .to_string(),
            timeout,
        })
    }
}

/// Text the model was trained on: app name and window title joined by a space
#[must_use]
pub fn model_input(process_name: &str, window_title: &str) -> String {
    format!("{process_name} {window_title}")
}

/// Parse a `/predict` response body
///
/// # Errors
///
/// Returns `Malformed` for invalid JSON or a missing field and
/// `UnknownLabel` for labels other than productive/distracting
pub fn parse_prediction(body: &str) -> Result<Classification, PredictorError> {
    let response: PredictResponse =
        serde_json::from_str(body).map_err(|e| PredictorError::Malformed(e.to_string()))?;
    Ok(response.prediction.parse::<Classification>()?)
}

#[async_trait]
impl Predictor for HttpPredictor {
    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn predict(
        &self,
        process_name: &str,
        window_title: &str,
    ) -> Result<Classification, PredictorError> {
        let url = format!("{}/predict", self.base_url);
        let body = json!({ "text": model_input(process_name, window_title) });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| PredictorError::from_reqwest(e, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| PredictorError::from_reqwest(e, self.timeout))?;

        if !status.is_success() {
            return Err(PredictorError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        parse_prediction(&text)
    }
}
