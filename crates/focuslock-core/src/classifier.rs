use anyhow::Result;
use chrono::{DateTime, Utc};
use focuslock_ml::{Classification, HttpPredictor, Predictor, PredictorError, RuleEngine};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::monitor::ActiveWindow;

const DEFAULT_CACHE_SIZE: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(v) => v,
    None => unreachable!(),
};

/// One observation of the foreground window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySample {
    pub process_name: String,
    pub window_title: String,
    pub observed_at: DateTime<Utc>,
}

impl ActivitySample {
    #[must_use]
    pub fn from_window(window: &ActiveWindow, observed_at: DateTime<Utc>) -> Self {
        Self {
            process_name: window.process_name.clone(),
            window_title: window.title.clone(),
            observed_at,
        }
    }
}

/// Where the classification came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSource {
    /// Matched an override rule, predictor not consulted
    Override,
    /// Fresh answer from the predictor
    Predictor,
    /// Earlier predictor answer for the same window
    Cache,
    /// Predictor disabled or failed; safe default
    Fallback,
}

/// Classification result with metadata
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassificationResult {
    pub classification: Classification,
    pub source: ClassificationSource,
}

impl ClassificationResult {
    const fn fallback() -> Self {
        Self {
            classification: Classification::Productive,
            source: ClassificationSource::Fallback,
        }
    }
}

/// Classifies samples: override rules first, then the predictor, then the
/// fail-open default (`Productive`). Never returns an error.
pub struct ClassificationGateway {
    rules: RuleEngine,
    predictor: Option<Arc<dyn Predictor>>,
    timeout: Duration,
    cache: RwLock<LruCache<(String, String), Classification>>,
}

impl ClassificationGateway {
    #[must_use]
    pub fn new(
        rules: RuleEngine,
        predictor: Option<Arc<dyn Predictor>>,
        timeout: Duration,
        cache_size: usize,
    ) -> Self {
        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(DEFAULT_CACHE_SIZE);
        Self {
            rules,
            predictor,
            timeout,
            cache: RwLock::new(LruCache::new(cache_size)),
        }
    }

    /// Create the gateway described by the config
    ///
    /// # Errors
    ///
    /// Returns an error if an override rule is invalid or the HTTP client
    /// cannot be built
    pub fn from_config(config: &Config) -> Result<Self> {
        let rules = config.overrides.build_engine()?;
        let predictor: Option<Arc<dyn Predictor>> = if config.predictor.enabled {
            let client = HttpPredictor::new(Some(&config.predictor.url), config.predictor.timeout())?;
            log::info!("Using predictor at {}", client.endpoint());
            Some(Arc::new(client))
        } else {
            log::info!("Predictor disabled, unmatched windows count as productive");
            None
        };

        Ok(Self::new(
            rules,
            predictor,
            config.predictor.timeout(),
            config.predictor.cache_size,
        ))
    }

    /// Classify a sample
    pub async fn classify(&self, sample: &ActivitySample) -> Classification {
        self.classify_full(sample).await.classification
    }

    /// Classify with full result metadata
    pub async fn classify_full(&self, sample: &ActivitySample) -> ClassificationResult {
        // 1. Override rules bypass the predictor entirely
        if let Some(classification) = self
            .rules
            .classify(&sample.process_name, &sample.window_title)
        {
            return ClassificationResult {
                classification,
                source: ClassificationSource::Override,
            };
        }

        let Some(predictor) = &self.predictor else {
            return ClassificationResult::fallback();
        };

        // 2. Cached predictor answer
        let key = (sample.process_name.clone(), sample.window_title.clone());
        {
            let mut cache = self.cache.write().await;
            if let Some(classification) = cache.get(&key) {
                return ClassificationResult {
                    classification: *classification,
                    source: ClassificationSource::Cache,
                };
            }
        }

        // 3. Predictor, bounded by the timeout
        let outcome = match tokio::time::timeout(
            self.timeout,
            predictor.predict(&sample.process_name, &sample.window_title),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(PredictorError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(classification) => {
                self.cache.write().await.put(key, classification);
                ClassificationResult {
                    classification,
                    source: ClassificationSource::Predictor,
                }
            }
            Err(e) => {
                log::warn!(
                    "Prediction failed for '{}' ({}), treating as productive: {e}",
                    sample.process_name,
                    predictor.endpoint()
                );
                ClassificationResult::fallback()
            }
        }
    }
}
