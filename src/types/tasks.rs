/// Feature extraction task enumeration for the background worker
#[derive(Clone, Debug)]
pub enum FeatureTask {
    Construct {
        session_id: String,
        timestamp_source: TimestampSource,
    },
}

/// How the persisted rows of a session were timestamped.
///
/// The recorder stamps every row with the wall-clock time of the flush,
/// so downstream consumers must not treat `recorded_at` as capture time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimestampSource {
    /// Every row carries the wall-clock time of the flush transaction.
    FlushTime,
    /// Rows carry their original capture timestamps.
    CaptureTime,
}
