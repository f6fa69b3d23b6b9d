pub mod classification;
pub mod predictor;
pub mod providers;
pub mod rules;

pub use classification::{Classification, UnknownLabel};
pub use predictor::{Predictor, PredictorError};
pub use providers::HttpPredictor;
pub use rules::{Rule, RuleEngine};
