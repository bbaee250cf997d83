use std::fs;
use std::path::Path;
use anyhow::{Context, Result};
use log::info;
use serde::Serialize;
use crate::analysis::{BatchOutcome, BatchStats, GaussianFit, PulseMetrics};
#[derive(Clone, Debug, Serialize)]
pub struct AverageSummary {
    pub samples: usize,
    pub waveform_count: usize,
    pub voltages_mv: Vec<f64>,
    pub pulse: Option<PulseMetrics>,
}
#[derive(Clone, Debug, Serialize)]
pub struct HistogramSummary {
    pub bin_edges: Vec<f64>,
    pub counts: Vec<u64>,
    pub underflow: u64,
    pub overflow: u64,
    pub fit: Option<GaussianFit>,
    pub fit_error: Option<String>,
}
/// Machine-readable result of one batch, written next to the plots.
#[derive(Clone, Debug, Serialize)]
pub struct BatchSummary {
    pub threshold_mv: f64,
    pub stats: BatchStats,
    pub rise_times_ns: Vec<f64>,
    pub sample_period_ns: Option<f64>,
    pub average: Option<AverageSummary>,
    pub average_error: Option<String>,
    pub histogram: Option<HistogramSummary>,
    pub histogram_error: Option<String>,
}
impl BatchSummary {
    pub fn from_outcome(outcome: &BatchOutcome, threshold_mv: f64) -> Self {
        let (average, average_error) = match &outcome.average {
            Ok(avg) => (
                Some(AverageSummary {
                    samples: avg.len(),
                    waveform_count: avg.waveform_count(),
                    voltages_mv: avg.voltages_mv().to_vec(),
                    pulse: outcome.pulse,
                }),
                None,
            ),
            Err(err) => (None, Some(err.to_string())),
        };
        let (histogram, histogram_error) = match &outcome.distribution {
            Ok(dist) => (
                Some(HistogramSummary {
                    bin_edges: dist.histogram.bin_edges(),
                    counts: dist.histogram.counts().to_vec(),
                    underflow: dist.histogram.underflow(),
                    overflow: dist.histogram.overflow(),
                    fit: dist.fit.as_ref().ok().copied(),
                    fit_error: dist.fit.as_ref().err().map(|e| e.to_string()),
                }),
                None,
            ),
            Err(err) => (None, Some(err.to_string())),
        };
        Self {
            threshold_mv,
            stats: outcome.stats,
            rise_times_ns: outcome.rise_times.clone(),
            sample_period_ns: outcome.sample_period_ns,
            average,
            average_error,
            histogram,
            histogram_error,
        }
    }
    pub fn log(&self) {
        let s = &self.stats;
        info!(
            "processed {} (unreadable {}, empty {}, shape mismatch {}), rise time not found in {}",
            s.processed, s.unreadable, s.empty, s.shape_mismatches, s.rise_time_not_found
        );
        if let Some(pulse) = self.average.as_ref().and_then(|a| a.pulse) {
            if let Some(rt) = pulse.edge_rise_time_ns {
                info!("average waveform rise time: {rt:.2} ns");
            }
            if let Some(q) = pulse.charge_me {
                info!("average waveform charge: {q:.2} Me");
            }
        }
        match self.histogram.as_ref() {
            Some(HistogramSummary { fit: Some(fit), .. }) => info!(
                "gaussian fit: mean {:.4} ns, sigma {:.4} ns, chi2/ndf {:.2}/{}",
                fit.mean, fit.sigma, fit.chi_square, fit.ndf
            ),
            Some(HistogramSummary {
                fit_error: Some(err),
                ..
            }) => info!("{err}"),
            _ => {}
        }
    }
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self).context("cannot serialize summary")?;
        fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))
    }
}
