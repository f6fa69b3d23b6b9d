/// One-shot classification for checking override rules and the predictor
use anyhow::Result;
use chrono::Utc;
use focuslock_core::{ActivitySample, ClassificationGateway, ClassificationSource, Config};
use std::path::Path;

fn describe_source(source: ClassificationSource) -> &'static str {
    match source {
        ClassificationSource::Override => "override rule",
        ClassificationSource::Predictor => "predictor",
        ClassificationSource::Cache => "cached prediction",
        ClassificationSource::Fallback => "fallback (predictor disabled or unavailable)",
    }
}

pub async fn classify_once(config_path: Option<&Path>, process: &str, title: &str) -> Result<()> {
    let config = Config::load(config_path)?;
    let gateway = ClassificationGateway::from_config(&config)?;

    let sample = ActivitySample {
        process_name: process.to_string(),
        window_title: title.to_string(),
        observed_at: Utc::now(),
    };
    let result = gateway.classify_full(&sample).await;

    println!("{}", result.classification);
    println!("  source: {}", describe_source(result.source));
    Ok(())
}
