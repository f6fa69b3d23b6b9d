pub mod http;

pub use http::HttpPredictor;
