use log::{info, warn};
use serde::Serialize;
use crate::analysis::aggregate::{AverageWaveform, WaveformAggregator};
use crate::analysis::distribution::{Distribution, DistributionSummarizer};
use crate::analysis::error::AnalysisError;
use crate::analysis::feature::{FeatureExtractor, RiseTime};
use crate::analysis::ingest::WaveformIngestor;
use crate::analysis::metrics::PulseMetrics;
use crate::analysis::source::{WaveformRecord, WaveformSource};
/// Settings the pipeline needs; built by the entry point and passed in.
#[derive(Clone, Debug)]
pub struct PipelineConfig {
    pub threshold_mv: f64,
    pub preview_limit: usize,
    pub bin_count: usize,
    pub histogram_range: Option<(f64, f64)>,
    pub sample_period_ns: Option<f64>,
    pub termination_ohms: f64,
    pub edge_fractions: (f64, f64),
}
impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold_mv: 2.0,
            preview_limit: 10,
            bin_count: DistributionSummarizer::DEFAULT_BIN_COUNT,
            histogram_range: None,
            sample_period_ns: None,
            termination_ohms: 50.0,
            edge_fractions: (0.1, 0.9),
        }
    }
}
/// One of the first waveforms of the batch, kept for plotting.
#[derive(Clone, Debug)]
pub struct WaveformPreview {
    pub label: String,
    pub record: WaveformRecord,
    pub rise_time: RiseTime,
    pub threshold_mv: f64,
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchStats {
    pub processed: usize,
    pub unreadable: usize,
    pub empty: usize,
    pub shape_mismatches: usize,
    pub rise_time_not_found: usize,
}
/// Everything the batch produced. Missing results are explicit errors.
#[derive(Debug)]
pub struct BatchOutcome {
    pub previews: Vec<WaveformPreview>,
    /// Found rise times (ns), in processing order.
    pub rise_times: Vec<f64>,
    pub average: Result<AverageWaveform, AnalysisError>,
    pub sample_period_ns: Option<f64>,
    pub pulse: Option<PulseMetrics>,
    pub distribution: Result<Distribution, AnalysisError>,
    pub stats: BatchStats,
}
/// Drives sources through ingestion, feature extraction and aggregation.
pub struct BatchPipeline<S: WaveformSource> {
    source: S,
    config: PipelineConfig,
    ingestor: WaveformIngestor,
    extractor: FeatureExtractor,
    aggregator: WaveformAggregator,
    previews: Vec<WaveformPreview>,
    rise_times: Vec<f64>,
    observed_period_ns: Option<f64>,
    stats: BatchStats,
}
impl<S: WaveformSource> BatchPipeline<S> {
    pub fn new(source: S, config: PipelineConfig) -> Self {
        Self {
            source,
            ingestor: WaveformIngestor::default(),
            extractor: FeatureExtractor::new(config.threshold_mv),
            aggregator: WaveformAggregator::new(),
            previews: Vec::new(),
            rise_times: Vec::new(),
            observed_period_ns: None,
            stats: BatchStats::default(),
            config,
        }
    }
    pub fn with_ingestor(mut self, ingestor: WaveformIngestor) -> Self {
        self.ingestor = ingestor;
        self
    }
    pub fn stats(&self) -> BatchStats {
        self.stats
    }
    /// Process the next source. Returns `false` once the source is exhausted.
    pub fn pump_once(&mut self) -> bool {
        let Some(stream) = self.source.next_stream() else {
            return false;
        };
        let record = match stream.reader {
            Ok(reader) => self.ingestor.ingest(reader),
            Err(source) => {
                let err = AnalysisError::Source {
                    label: stream.label.clone(),
                    source,
                };
                warn!("{err}");
                self.stats.unreadable += 1;
                WaveformRecord::empty()
            }
        };
        self.absorb(stream.label, record);
        true
    }
    fn absorb(&mut self, label: String, record: WaveformRecord) {
        self.stats.processed += 1;
        let rise_time = self.extractor.extract(&record);
        match rise_time {
            RiseTime::Found(t) => self.rise_times.push(t),
            RiseTime::NotFound => self.stats.rise_time_not_found += 1,
        }
        if self.observed_period_ns.is_none() {
            self.observed_period_ns = record.sample_period_ns();
        }
        match self.aggregator.add(&record) {
            Ok(()) => {}
            Err(AnalysisError::EmptySource) => {
                self.stats.empty += 1;
                warn!("{label}: no valid samples, left out of the average");
            }
            Err(err @ AnalysisError::ShapeMismatch { .. }) => {
                self.stats.shape_mismatches += 1;
                warn!("{label}: {err}, left out of the average");
            }
            Err(err) => warn!("{label}: {err}"),
        }
        if self.previews.len() < self.config.preview_limit {
            self.previews.push(WaveformPreview {
                label,
                record,
                rise_time,
                threshold_mv: self.extractor.threshold_mv(),
            });
        }
    }
    pub fn finish(self) -> BatchOutcome {
        let average = self.aggregator.finalize();
        let sample_period_ns = self.config.sample_period_ns.or(self.observed_period_ns);
        let pulse = match (&average, sample_period_ns) {
            (Ok(avg), Some(period)) => Some(PulseMetrics::measure(
                avg,
                period,
                self.config.edge_fractions,
                self.config.termination_ohms,
            )),
            _ => None,
        };
        let distribution = DistributionSummarizer::new(self.config.bin_count)
            .with_range(self.config.histogram_range)
            .summarize(&self.rise_times);
        info!(
            "{} waveform(s): {} averaged, {} rise time(s) found",
            self.stats.processed,
            self.aggregator.count(),
            self.rise_times.len()
        );
        BatchOutcome {
            previews: self.previews,
            rise_times: self.rise_times,
            average,
            sample_period_ns,
            pulse,
            distribution,
            stats: self.stats,
        }
    }
    pub fn run(mut self) -> BatchOutcome {
        while self.pump_once() {}
        self.finish()
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::source::ManualSource;
    // seconds / volts as they appear on disk
    fn csv(volts_mv: &[f64]) -> String {
        volts_mv
            .iter()
            .enumerate()
            .map(|(i, v)| format!("{:e},{:e}\n", i as f64 * 1e-9, v * 1e-3))
            .collect()
    }
    #[test]
    fn three_identical_crossings_end_to_end() {
        let waves = [
            [0.0, 1.0, 2.0, 3.0, 4.0],
            [0.5, 1.5, 2.5, 3.5, 4.5],
            [-0.5, 0.5, 2.0, 2.0, 2.0],
        ];
        let source = ManualSource::new(
            waves
                .iter()
                .enumerate()
                .map(|(i, w)| (format!("wf{i}.csv"), csv(w))),
        );
        let outcome = BatchPipeline::new(source, PipelineConfig::default()).run();
        assert_eq!(outcome.rise_times.len(), 3);
        for t in &outcome.rise_times {
            assert!((t - 2.0).abs() < 1e-9);
        }
        let avg = outcome.average.unwrap();
        for (i, m) in avg.voltages_mv().iter().enumerate() {
            let expected = waves.iter().map(|w| w[i]).sum::<f64>() / 3.0;
            assert!((m - expected).abs() < 1e-9);
        }
        let dist = outcome.distribution.unwrap();
        let non_empty: Vec<u64> = dist
            .histogram
            .counts()
            .iter()
            .copied()
            .filter(|&c| c > 0)
            .collect();
        assert_eq!(non_empty, vec![3]);
        assert!(matches!(
            dist.fit,
            Err(AnalysisError::FitNonConvergence { .. })
        ));
        assert_eq!(outcome.stats.processed, 3);
        assert_eq!(outcome.previews.len(), 3);
        assert!((outcome.sample_period_ns.unwrap() - 1.0).abs() < 1e-9);
    }
    #[test]
    fn bad_sources_do_not_abort_the_batch() {
        let mut source = ManualSource::new(vec![
            ("ok1", csv(&[0.0, 5.0, 5.0])),
            ("empty", "garbage\n".to_string()),
            ("short", csv(&[0.0, 5.0])),
            ("quiet", csv(&[0.0, 0.1, 0.2])),
        ]);
        source.push_unreadable("gone");
        let outcome = BatchPipeline::new(source, PipelineConfig::default()).run();
        let stats = outcome.stats;
        assert_eq!(stats.processed, 5);
        assert_eq!(stats.unreadable, 1);
        assert_eq!(stats.empty, 2);
        assert_eq!(stats.shape_mismatches, 1);
        assert_eq!(stats.rise_time_not_found, 3);
        let avg = outcome.average.unwrap();
        assert_eq!(avg.waveform_count(), 2);
        assert_eq!(avg.len(), 3);
        assert_eq!(outcome.rise_times.len(), 2);
    }
    #[test]
    fn empty_batch_reports_both_results_missing() {
        let source = ManualSource::new(Vec::<(String, String)>::new());
        let outcome = BatchPipeline::new(source, PipelineConfig::default()).run();
        assert!(matches!(outcome.average, Err(AnalysisError::EmptyAggregate)));
        assert!(matches!(
            outcome.distribution,
            Err(AnalysisError::EmptyDistribution)
        ));
        assert!(outcome.pulse.is_none());
    }
    #[test]
    fn no_crossings_still_yield_an_average() {
        let source = ManualSource::new(vec![("a", csv(&[0.0, 1.0])), ("b", csv(&[1.0, 0.0]))]);
        let outcome = BatchPipeline::new(source, PipelineConfig::default()).run();
        assert!(outcome.average.is_ok());
        assert!(matches!(
            outcome.distribution,
            Err(AnalysisError::EmptyDistribution)
        ));
    }
    #[test]
    fn previews_are_capped_and_carry_the_threshold() {
        let source = ManualSource::new((0..25).map(|i| (format!("{i}"), csv(&[0.0, 3.0, 6.0]))));
        let config = PipelineConfig {
            preview_limit: 4,
            threshold_mv: 2.5,
            ..PipelineConfig::default()
        };
        let outcome = BatchPipeline::new(source, config).run();
        assert_eq!(outcome.previews.len(), 4);
        assert_eq!(outcome.previews[3].label, "3");
        assert_eq!(outcome.previews[0].threshold_mv, 2.5);
        assert!(outcome.previews[0].rise_time.is_found());
        assert_eq!(outcome.rise_times.len(), 25);
    }
    #[test]
    fn configured_sample_period_drives_pulse_metrics() {
        let source = ManualSource::new(vec![("a", csv(&[0.0, 1.0, 5.0, 9.0, 10.0]))]);
        let config = PipelineConfig {
            sample_period_ns: Some(0.5),
            ..PipelineConfig::default()
        };
        let outcome = BatchPipeline::new(source, config).run();
        let pulse = outcome.pulse.unwrap();
        assert_eq!(pulse.sample_period_ns, 0.5);
        // 10% of 10 mV at index 1, 90% at index 3
        assert!((pulse.edge_rise_time_ns.unwrap() - 1.0).abs() < 1e-9);
        assert!(pulse.charge_me.unwrap() > 0.0);
    }
    #[test]
    fn pump_once_processes_one_source_at_a_time() {
        let source = ManualSource::new(vec![("a", csv(&[3.0])), ("b", csv(&[3.0]))]);
        let mut pipeline = BatchPipeline::new(source, PipelineConfig::default());
        assert!(pipeline.pump_once());
        assert_eq!(pipeline.stats().processed, 1);
        assert!(pipeline.pump_once());
        assert!(!pipeline.pump_once());
        assert_eq!(pipeline.finish().rise_times.len(), 2);
    }
}
