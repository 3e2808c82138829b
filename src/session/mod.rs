pub mod recorder;

pub use recorder::{RecorderError, SessionRecorder};
