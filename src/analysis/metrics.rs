//! Pulse-shape figures computed on the averaged waveform.
//!
//! Both helpers take an explicit time axis in nanoseconds so they work on the
//! index axis as well as on a physical one.
use serde::Serialize;
use crate::analysis::aggregate::AverageWaveform;
/// Elementary charge (C).
pub const ELEMENTARY_CHARGE: f64 = 1.602_176_634e-19;
/// Delay between the first samples reaching `low_frac` and `high_frac` of the
/// waveform peak.
///
/// Returns `None` for an empty waveform, a non-positive peak, or a time axis
/// that does not match the voltages.
pub fn edge_rise_time(
    voltages_mv: &[f64],
    time_axis_ns: &[f64],
    low_frac: f64,
    high_frac: f64,
) -> Option<f64> {
    if voltages_mv.is_empty() || voltages_mv.len() != time_axis_ns.len() {
        return None;
    }
    let peak = voltages_mv.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if peak.is_nan() || peak <= 0.0 {
        return None;
    }
    let first_at = |frac: f64| voltages_mv.iter().position(|&v| v >= frac * peak);
    let low = first_at(low_frac)?;
    let high = first_at(high_frac)?;
    Some(time_axis_ns[high] - time_axis_ns[low])
}
/// Charge carried by the pulse into `termination_ohms`, in millions of
/// electrons, from a trapezoidal integral of the voltage.
pub fn integrated_charge(
    voltages_mv: &[f64],
    time_axis_ns: &[f64],
    termination_ohms: f64,
) -> Option<f64> {
    if voltages_mv.len() < 2 || voltages_mv.len() != time_axis_ns.len() || termination_ohms <= 0.0
    {
        return None;
    }
    // mV * ns
    let area: f64 = voltages_mv
        .windows(2)
        .zip(time_axis_ns.windows(2))
        .map(|(v, t)| 0.5 * (v[0] + v[1]) * (t[1] - t[0]))
        .sum();
    let coulombs = area * 1e-3 * 1e-9 / termination_ohms;
    Some(coulombs / ELEMENTARY_CHARGE * 1e-6)
}
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PulseMetrics {
    pub sample_period_ns: f64,
    pub edge_rise_time_ns: Option<f64>,
    pub charge_me: Option<f64>,
}
impl PulseMetrics {
    pub fn measure(
        average: &AverageWaveform,
        sample_period_ns: f64,
        edge_fractions: (f64, f64),
        termination_ohms: f64,
    ) -> Self {
        let axis = average.time_axis(sample_period_ns);
        let volts = average.voltages_mv();
        Self {
            sample_period_ns,
            edge_rise_time_ns: edge_rise_time(volts, &axis, edge_fractions.0, edge_fractions.1),
            charge_me: integrated_charge(volts, &axis, termination_ohms),
        }
    }
}
