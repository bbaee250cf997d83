// src/analysis/mod.rs
pub mod aggregate;
pub mod distribution;
pub mod error;
pub mod feature;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod source;
pub use aggregate::{AverageWaveform, WaveformAggregator};
pub use distribution::{Distribution, DistributionSummarizer, GaussianFit, GaussianFitter, Histogram};
pub use error::AnalysisError;
pub use feature::{rise_time, FeatureExtractor, RiseTime};
pub use ingest::WaveformIngestor;
pub use metrics::PulseMetrics;
pub use pipeline::{BatchOutcome, BatchPipeline, BatchStats, PipelineConfig, WaveformPreview};
pub use source::{FileListSource, ManualSource, Sample, SourceStream, WaveformRecord, WaveformSource};
