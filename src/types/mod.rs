pub mod features;
pub mod results;
pub mod sample;
pub mod tasks;

pub use features::{AxisFeatures, SessionFeatures};
pub use results::FlushSummary;
pub use sample::Sample;
pub use tasks::{FeatureTask, TimestampSource};
