use std::fs;
use std::path::Path;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use crate::analysis::PipelineConfig;
/// Run configuration as read from a JSON file. Missing keys take defaults.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Rise-time threshold in mV.
    pub threshold_mv: f64,
    /// How many of the first waveforms get an individual plot.
    pub preview_limit: usize,
    pub bin_count: usize,
    /// Fixed `[lo, hi]` histogram range in ns; the data range when absent.
    pub histogram_range: Option<[f64; 2]>,
    /// Sampling interval of the captures; taken from the first waveform when absent.
    pub sample_period_ns: Option<f64>,
    pub termination_ohms: f64,
    /// File extension of waveform captures, without the dot.
    pub extension: String,
    pub edge_fractions: [f64; 2],
}
impl Default for AnalysisConfig {
    fn default() -> Self {
        let pipeline = PipelineConfig::default();
        Self {
            threshold_mv: pipeline.threshold_mv,
            preview_limit: pipeline.preview_limit,
            bin_count: pipeline.bin_count,
            histogram_range: None,
            sample_period_ns: None,
            termination_ohms: pipeline.termination_ohms,
            extension: "csv".to_owned(),
            edge_fractions: [pipeline.edge_fractions.0, pipeline.edge_fractions.1],
        }
    }
}
impl AnalysisConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).context("invalid configuration JSON")?;
        config.validate()?;
        Ok(config)
    }
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config {}", path.display()))?;
        Self::from_json(&text).with_context(|| format!("in {}", path.display()))
    }
    pub fn validate(&self) -> Result<()> {
        if !self.threshold_mv.is_finite() {
            bail!("threshold_mv must be a finite number");
        }
        if self.bin_count == 0 {
            bail!("bin_count must be at least 1");
        }
        if let Some([lo, hi]) = self.histogram_range {
            if !(lo.is_finite() && hi.is_finite() && hi > lo) {
                bail!("histogram_range must be [lo, hi] with lo < hi, got [{lo}, {hi}]");
            }
        }
        if let Some(period) = self.sample_period_ns {
            if !(period.is_finite() && period > 0.0) {
                bail!("sample_period_ns must be positive, got {period}");
            }
        }
        if self.termination_ohms.is_nan() || self.termination_ohms <= 0.0 {
            bail!("termination_ohms must be positive");
        }
        let [low, high] = self.edge_fractions;
        if !(0.0 < low && low < high && high <= 1.0) {
            bail!("edge_fractions must satisfy 0 < low < high <= 1, got [{low}, {high}]");
        }
        Ok(())
    }
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            threshold_mv: self.threshold_mv,
            preview_limit: self.preview_limit,
            bin_count: self.bin_count,
            histogram_range: self.histogram_range.map(|[lo, hi]| (lo, hi)),
            sample_period_ns: self.sample_period_ns,
            termination_ohms: self.termination_ohms,
            edge_fractions: (self.edge_fractions[0], self.edge_fractions[1]),
        }
    }
}
