/// Summary features of one axis of a persisted session
#[derive(Debug, Clone, PartialEq)]
pub struct AxisFeatures {
    pub axis: String,
    pub sample_count: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min_value: f64,
    pub max_value: f64,
}

/// Per-axis summary features for one calibration session
#[derive(Debug, Clone, PartialEq)]
pub struct SessionFeatures {
    pub session_id: String,
    pub recorded_at: i64,
    pub axes: Vec<AxisFeatures>,
}
