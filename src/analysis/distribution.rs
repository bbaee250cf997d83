use log::{debug, warn};
use serde::Serialize;
use crate::analysis::error::AnalysisError;
/// Equal-width histogram over `[lo, hi]`. The upper edge belongs to the last bin.
///
/// A zero-width range (all values equal) collapses to a single bin.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Histogram {
    lo: f64,
    hi: f64,
    counts: Vec<u64>,
    underflow: u64,
    overflow: u64,
}
impl Histogram {
    pub fn with_range(bin_count: usize, lo: f64, hi: f64) -> Self {
        let bins = if hi > lo { bin_count.max(1) } else { 1 };
        Self {
            lo,
            hi: hi.max(lo),
            counts: vec![0; bins],
            underflow: 0,
            overflow: 0,
        }
    }
    pub fn from_counts(lo: f64, hi: f64, counts: Vec<u64>) -> Self {
        let mut hist = Self::with_range(counts.len(), lo, hi);
        if hist.counts.len() == counts.len() {
            hist.counts = counts;
        } else {
            hist.counts[0] = counts.iter().sum();
        }
        hist
    }
    /// Bin `values` over `range`, or over their own min/max when no usable
    /// range is given.
    pub fn from_values(
        values: &[f64],
        bin_count: usize,
        range: Option<(f64, f64)>,
    ) -> Result<Self, AnalysisError> {
        let (lo, hi) = match range {
            Some((lo, hi)) if lo.is_finite() && hi.is_finite() && hi > lo => (lo, hi),
            other => {
                if let Some(r) = other {
                    warn!("histogram range {r:?} is unusable, binning over the data range");
                }
                data_range(values).ok_or(AnalysisError::EmptyDistribution)?
            }
        };
        let mut hist = Self::with_range(bin_count, lo, hi);
        for &v in values {
            hist.fill(v);
        }
        Ok(hist)
    }
    pub fn fill(&mut self, value: f64) {
        if value.is_nan() || value > self.hi {
            self.overflow += 1;
            return;
        }
        if value < self.lo {
            self.underflow += 1;
            return;
        }
        let last = self.counts.len() - 1;
        let idx = if self.is_degenerate() {
            0
        } else {
            (((value - self.lo) / self.bin_width()) as usize).min(last)
        };
        self.counts[idx] += 1;
    }
    pub fn is_degenerate(&self) -> bool {
        self.hi == self.lo
    }
    pub fn lo(&self) -> f64 {
        self.lo
    }
    pub fn hi(&self) -> f64 {
        self.hi
    }
    pub fn range(&self) -> (f64, f64) {
        (self.lo, self.hi)
    }
    pub fn bin_count(&self) -> usize {
        self.counts.len()
    }
    pub fn bin_width(&self) -> f64 {
        (self.hi - self.lo) / self.counts.len() as f64
    }
    pub fn bin_center(&self, idx: usize) -> f64 {
        self.lo + (idx as f64 + 0.5) * self.bin_width()
    }
    pub fn bin_edges(&self) -> Vec<f64> {
        let width = self.bin_width();
        (0..=self.counts.len())
            .map(|i| self.lo + i as f64 * width)
            .collect()
    }
    pub fn counts(&self) -> &[u64] {
        &self.counts
    }
    pub fn underflow(&self) -> u64 {
        self.underflow
    }
    pub fn overflow(&self) -> u64 {
        self.overflow
    }
    /// Entries inside the binned range.
    pub fn entries(&self) -> u64 {
        self.counts.iter().sum()
    }
    pub fn total(&self) -> u64 {
        self.entries() + self.underflow + self.overflow
    }
    pub fn max_count(&self) -> u64 {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}
fn data_range(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
        })
}
/// `amplitude * exp(-(x - mean)^2 / (2 sigma^2))` fitted to histogram bins.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct GaussianFit {
    pub amplitude: f64,
    pub mean: f64,
    pub sigma: f64,
    pub chi_square: f64,
    pub ndf: usize,
    pub iterations: usize,
}
impl GaussianFit {
    pub fn evaluate(&self, x: f64) -> f64 {
        gaussian(&[self.amplitude, self.mean, self.sigma], x)
    }
}
fn gaussian(p: &[f64; 3], x: f64) -> f64 {
    let z = (x - p[1]) / p[2];
    p[0] * (-0.5 * z * z).exp()
}
#[derive(Clone, Copy, Debug)]
struct FitPoint {
    x: f64,
    y: f64,
    weight: f64,
}
/// Levenberg-Marquardt chi-square fit with Poisson bin errors.
#[derive(Clone, Copy, Debug)]
pub struct GaussianFitter {
    pub max_iterations: usize,
    pub tolerance: f64,
}
impl Default for GaussianFitter {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            tolerance: 1e-10,
        }
    }
}
impl GaussianFitter {
    /// Fit the non-empty bins whose centers fall inside `range`.
    pub fn fit(&self, hist: &Histogram, range: (f64, f64)) -> Result<GaussianFit, AnalysisError> {
        if hist.is_degenerate() {
            return Err(AnalysisError::fit("zero-width range, sigma is undefined"));
        }
        let points: Vec<FitPoint> = hist
            .counts()
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c > 0)
            .map(|(i, &c)| FitPoint {
                x: hist.bin_center(i),
                y: c as f64,
                weight: 1.0 / c as f64,
            })
            .filter(|p| p.x >= range.0 && p.x <= range.1)
            .collect();
        if points.len() < 3 {
            return Err(AnalysisError::fit(format!(
                "{} non-empty bin(s) in range, need at least 3",
                points.len()
            )));
        }
        let mut params = initial_guess(&points);
        let mut chi2 = chi_square(&points, &params);
        let mut lambda = 1e-3;
        for iteration in 1..=self.max_iterations {
            let (jtj, grad) = normal_equations(&points, &params);
            let mut damped = jtj;
            for i in 0..3 {
                damped[i][i] += lambda * jtj[i][i].max(1e-12);
            }
            let Some(step) = solve3(damped, grad) else {
                lambda *= 10.0;
                if lambda > 1e10 {
                    return Err(AnalysisError::fit("singular normal equations"));
                }
                continue;
            };
            let trial = [
                params[0] + step[0],
                params[1] + step[1],
                params[2] + step[2],
            ];
            let trial_chi2 = chi_square(&points, &trial);
            if trial_chi2.is_finite() && trial_chi2 <= chi2 {
                let improvement = chi2 - trial_chi2;
                let small_step = step
                    .iter()
                    .zip(&trial)
                    .all(|(d, p)| d.abs() <= self.tolerance * (p.abs() + self.tolerance));
                params = trial;
                chi2 = trial_chi2;
                lambda = (lambda / 10.0).max(1e-12);
                if small_step || improvement <= self.tolerance * (chi2 + self.tolerance) {
                    return finish(params, chi2, points.len(), iteration);
                }
            } else {
                lambda *= 10.0;
                // no downhill step left
                if lambda > 1e10 {
                    return finish(params, chi2, points.len(), iteration);
                }
            }
        }
        Err(AnalysisError::fit(format!(
            "no convergence after {} iterations",
            self.max_iterations
        )))
    }
}
fn initial_guess(points: &[FitPoint]) -> [f64; 3] {
    let total: f64 = points.iter().map(|p| p.y).sum();
    let mean = points.iter().map(|p| p.x * p.y).sum::<f64>() / total;
    let var = points
        .iter()
        .map(|p| p.y * (p.x - mean).powi(2))
        .sum::<f64>()
        / total;
    let amplitude = points.iter().map(|p| p.y).fold(0.0, f64::max);
    [amplitude, mean, var.sqrt()]
}
fn chi_square(points: &[FitPoint], params: &[f64; 3]) -> f64 {
    points
        .iter()
        .map(|p| {
            let r = p.y - gaussian(params, p.x);
            p.weight * r * r
        })
        .sum()
}
fn normal_equations(points: &[FitPoint], params: &[f64; 3]) -> ([[f64; 3]; 3], [f64; 3]) {
    let [amp, mean, sigma] = *params;
    let mut jtj = [[0.0; 3]; 3];
    let mut grad = [0.0; 3];
    for p in points {
        let z = (p.x - mean) / sigma;
        let e = (-0.5 * z * z).exp();
        let jac = [e, amp * e * z / sigma, amp * e * z * z / sigma];
        let r = p.y - amp * e;
        for a in 0..3 {
            grad[a] += p.weight * jac[a] * r;
            for b in 0..3 {
                jtj[a][b] += p.weight * jac[a] * jac[b];
            }
        }
    }
    (jtj, grad)
}
fn solve3(m: [[f64; 3]; 3], rhs: [f64; 3]) -> Option<[f64; 3]> {
    let mut a = [[0.0; 4]; 3];
    for i in 0..3 {
        a[i][..3].copy_from_slice(&m[i]);
        a[i][3] = rhs[i];
    }
    for col in 0..3 {
        let pivot = (col..3).max_by(|&r, &s| a[r][col].abs().total_cmp(&a[s][col].abs()))?;
        if a[pivot][col].abs() < 1e-300 {
            return None;
        }
        a.swap(col, pivot);
        for row in col + 1..3 {
            let factor = a[row][col] / a[col][col];
            for k in col..4 {
                a[row][k] -= factor * a[col][k];
            }
        }
    }
    let mut x = [0.0; 3];
    for i in (0..3).rev() {
        let tail: f64 = (i + 1..3).map(|k| a[i][k] * x[k]).sum();
        x[i] = (a[i][3] - tail) / a[i][i];
    }
    x.iter().all(|v| v.is_finite()).then_some(x)
}
fn finish(
    params: [f64; 3],
    chi_square: f64,
    n_points: usize,
    iterations: usize,
) -> Result<GaussianFit, AnalysisError> {
    let [amplitude, mean, sigma] = params;
    if !params.iter().all(|v| v.is_finite()) || sigma == 0.0 {
        return Err(AnalysisError::fit("parameters diverged"));
    }
    if amplitude <= 0.0 {
        return Err(AnalysisError::fit("non-positive amplitude"));
    }
    Ok(GaussianFit {
        amplitude,
        mean,
        sigma: sigma.abs(),
        chi_square,
        ndf: n_points - 3,
        iterations,
    })
}
/// Binned feature values plus the Gaussian fit over them.
///
/// A failed fit never invalidates the histogram.
#[derive(Debug)]
pub struct Distribution {
    pub histogram: Histogram,
    pub fit: Result<GaussianFit, AnalysisError>,
}
impl Distribution {
    pub fn fit_converged(&self) -> bool {
        self.fit.is_ok()
    }
}
#[derive(Clone, Debug)]
pub struct DistributionSummarizer {
    bin_count: usize,
    range: Option<(f64, f64)>,
    fitter: GaussianFitter,
}
impl Default for DistributionSummarizer {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BIN_COUNT)
    }
}
impl DistributionSummarizer {
    pub const DEFAULT_BIN_COUNT: usize = 100;
    pub fn new(bin_count: usize) -> Self {
        Self {
            bin_count,
            range: None,
            fitter: GaussianFitter::default(),
        }
    }
    /// Fix the binning (and fit) range instead of using the data's min/max.
    pub fn with_range(mut self, range: Option<(f64, f64)>) -> Self {
        self.range = range;
        self
    }
    pub fn with_fitter(mut self, fitter: GaussianFitter) -> Self {
        self.fitter = fitter;
        self
    }
    pub fn summarize(&self, features: &[f64]) -> Result<Distribution, AnalysisError> {
        if features.is_empty() {
            return Err(AnalysisError::EmptyDistribution);
        }
        let histogram = Histogram::from_values(features, self.bin_count, self.range)?;
        let fit = self.fitter.fit(&histogram, histogram.range());
        if let Err(err) = &fit {
            debug!("{err}");
        }
        Ok(Distribution { histogram, fit })
    }
}
