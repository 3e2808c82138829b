pub mod extractor;
pub mod worker;

pub use extractor::{FeatureError, FeaturesConstructor};
pub use worker::run_feature_worker;
