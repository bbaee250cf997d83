use crate::analysis::source::WaveformRecord;
/// Threshold-crossing time of one waveform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RiseTime {
    Found(f64),
    NotFound,
}
impl RiseTime {
    pub fn found(self) -> Option<f64> {
        match self {
            RiseTime::Found(t) => Some(t),
            RiseTime::NotFound => None,
        }
    }
    pub fn is_found(self) -> bool {
        matches!(self, RiseTime::Found(_))
    }
}
/// Time (ns) of the first sample whose voltage is at or above `threshold_mv`.
pub fn rise_time(record: &WaveformRecord, threshold_mv: f64) -> RiseTime {
    record
        .samples()
        .iter()
        .find(|s| s.voltage_mv >= threshold_mv)
        .map_or(RiseTime::NotFound, |s| RiseTime::Found(s.time_ns))
}
#[derive(Clone, Copy, Debug)]
pub struct FeatureExtractor {
    threshold_mv: f64,
}
impl FeatureExtractor {
    pub fn new(threshold_mv: f64) -> Self {
        Self { threshold_mv }
    }
    pub fn threshold_mv(&self) -> f64 {
        self.threshold_mv
    }
    pub fn extract(&self, record: &WaveformRecord) -> RiseTime {
        rise_time(record, self.threshold_mv)
    }
}
