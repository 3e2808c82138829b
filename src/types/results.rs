/// Result of a session flush
#[derive(Debug, Clone, PartialEq)]
pub struct FlushSummary {
    pub session_id: String,
    pub rows_saved: usize,
    /// epoch millis assigned to every persisted row of the session
    pub recorded_at: i64,
}
