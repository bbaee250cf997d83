use ndarray::Array1;
use crate::analysis::error::AnalysisError;
use crate::analysis::source::WaveformRecord;
/// Element-wise mean of a batch of equal-length waveforms.
///
/// The time axis is the sample index; use [`AverageWaveform::time_axis`] when
/// the physical sample period is known.
#[derive(Clone, Debug, PartialEq)]
pub struct AverageWaveform {
    voltages_mv: Vec<f64>,
    waveform_count: usize,
}
impl AverageWaveform {
    pub fn voltages_mv(&self) -> &[f64] {
        &self.voltages_mv
    }
    pub fn len(&self) -> usize {
        self.voltages_mv.len()
    }
    pub fn is_empty(&self) -> bool {
        self.voltages_mv.is_empty()
    }
    pub fn waveform_count(&self) -> usize {
        self.waveform_count
    }
    pub fn index_axis(&self) -> Vec<f64> {
        (0..self.len()).map(|i| i as f64).collect()
    }
    pub fn time_axis(&self, sample_period_ns: f64) -> Vec<f64> {
        (0..self.len()).map(|i| i as f64 * sample_period_ns).collect()
    }
}
/// Running sum of voltage arrays. The first accepted record fixes the length.
#[derive(Clone, Debug, Default)]
pub struct WaveformAggregator {
    sum: Option<Array1<f64>>,
    count: usize,
}
impl WaveformAggregator {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn count(&self) -> usize {
        self.count
    }
    pub fn expected_len(&self) -> Option<usize> {
        self.sum.as_ref().map(|s| s.len())
    }
    /// Add one record. Nothing is changed when it is rejected.
    pub fn add(&mut self, record: &WaveformRecord) -> Result<(), AnalysisError> {
        if record.is_empty() {
            return Err(AnalysisError::EmptySource);
        }
        if let Some(expected) = self.expected_len() {
            if expected != record.len() {
                return Err(AnalysisError::ShapeMismatch {
                    expected,
                    actual: record.len(),
                });
            }
        }
        let voltages: Array1<f64> = record.voltages().collect();
        match self.sum.as_mut() {
            Some(sum) => *sum += &voltages,
            None => self.sum = Some(voltages),
        }
        self.count += 1;
        Ok(())
    }
    /// Fold a partial aggregate from another worker into this one.
    pub fn merge(&mut self, other: WaveformAggregator) -> Result<(), AnalysisError> {
        let Some(other_sum) = other.sum else {
            return Ok(());
        };
        match self.sum.as_mut() {
            Some(sum) if sum.len() != other_sum.len() => {
                return Err(AnalysisError::ShapeMismatch {
                    expected: sum.len(),
                    actual: other_sum.len(),
                });
            }
            Some(sum) => *sum += &other_sum,
            None => self.sum = Some(other_sum),
        }
        self.count += other.count;
        Ok(())
    }
    pub fn finalize(&self) -> Result<AverageWaveform, AnalysisError> {
        let sum = match self.sum.as_ref() {
            Some(sum) if self.count > 0 => sum,
            _ => return Err(AnalysisError::EmptyAggregate),
        };
        let n = self.count as f64;
        Ok(AverageWaveform {
            voltages_mv: sum.mapv(|v| v / n).to_vec(),
            waveform_count: self.count,
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::source::Sample;
    fn wf(volts: &[f64]) -> WaveformRecord {
        WaveformRecord::from_samples(
            volts
                .iter()
                .enumerate()
                .map(|(i, &v)| Sample {
                    time_ns: i as f64,
                    voltage_mv: v,
                })
                .collect(),
        )
    }
    #[test]
    fn identical_waveforms_average_to_themselves() {
        let base = [0.0, 1.5, -2.0, 4.25, 3.0];
        let mut agg = WaveformAggregator::new();
        for _ in 0..7 {
            agg.add(&wf(&base)).unwrap();
        }
        let avg = agg.finalize().unwrap();
        assert_eq!(avg.waveform_count(), 7);
        for (a, b) in avg.voltages_mv().iter().zip(base) {
            assert!((a - b).abs() < 1e-12);
        }
    }
    #[test]
    fn offset_pair_averages_to_half_offset() {
        let a = [1.0, 2.0, 3.0, 0.5];
        let k = 3.0;
        let b: Vec<f64> = a.iter().map(|v| v + k).collect();
        let mut agg = WaveformAggregator::new();
        agg.add(&wf(&a)).unwrap();
        agg.add(&wf(&b)).unwrap();
        let avg = agg.finalize().unwrap();
        for (m, v) in avg.voltages_mv().iter().zip(a) {
            assert!((m - (v + k / 2.0)).abs() < 1e-12);
        }
    }
    #[test]
    fn mismatched_length_is_rejected_without_touching_the_sum() {
        let mut agg = WaveformAggregator::new();
        agg.add(&wf(&[1.0, 2.0, 3.0])).unwrap();
        let before = agg.finalize().unwrap();
        let err = agg.add(&wf(&[1.0, 2.0])).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::ShapeMismatch {
                expected: 3,
                actual: 2
            }
        ));
        assert_eq!(agg.count(), 1);
        assert_eq!(agg.finalize().unwrap(), before);
    }
    #[test]
    fn empty_record_contributes_nothing() {
        let mut agg = WaveformAggregator::new();
        assert!(matches!(
            agg.add(&WaveformRecord::empty()),
            Err(AnalysisError::EmptySource)
        ));
        assert_eq!(agg.expected_len(), None);
        agg.add(&wf(&[2.0, 4.0])).unwrap();
        assert_eq!(agg.finalize().unwrap().voltages_mv(), &[2.0, 4.0]);
    }
    #[test]
    fn finalize_without_input_is_an_explicit_empty_result() {
        assert!(matches!(
            WaveformAggregator::new().finalize(),
            Err(AnalysisError::EmptyAggregate)
        ));
    }
    #[test]
    fn merged_partials_match_sequential_accumulation() {
        let inputs = [[1.0, 2.0], [3.0, 5.0], [0.0, -1.0], [8.0, 2.0]];
        let mut sequential = WaveformAggregator::new();
        for v in &inputs {
            sequential.add(&wf(v)).unwrap();
        }
        let mut left = WaveformAggregator::new();
        let mut right = WaveformAggregator::new();
        left.add(&wf(&inputs[0])).unwrap();
        left.add(&wf(&inputs[1])).unwrap();
        right.add(&wf(&inputs[2])).unwrap();
        right.add(&wf(&inputs[3])).unwrap();
        left.merge(right).unwrap();
        left.merge(WaveformAggregator::new()).unwrap();
        assert_eq!(left.finalize().unwrap(), sequential.finalize().unwrap());
        let mut other = WaveformAggregator::new();
        other.add(&wf(&[1.0])).unwrap();
        assert!(matches!(
            left.merge(other),
            Err(AnalysisError::ShapeMismatch { .. })
        ));
        assert_eq!(left.count(), 4);
    }
    #[test]
    fn time_axis_scales_the_index() {
        let mut agg = WaveformAggregator::new();
        agg.add(&wf(&[0.0, 0.0, 0.0])).unwrap();
        let avg = agg.finalize().unwrap();
        assert_eq!(avg.index_axis(), vec![0.0, 1.0, 2.0]);
        assert_eq!(avg.time_axis(0.25), vec![0.0, 0.25, 0.5]);
    }
}
