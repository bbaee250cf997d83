use std::io::Cursor;
use image::{DynamicImage, ImageBuffer, ImageFormat, Rgb};
use plotters::prelude::LineSeries;
use plotters::prelude::*;
use crate::analysis::{AnalysisError, AverageWaveform, Distribution, RiseTime, WaveformPreview};
#[derive(Clone, Debug)]
pub struct PlotStyle {
    pub width: u32,
    pub height: u32,
    pub background: RGBColor,
    pub foreground: RGBColor,
    pub trace: RGBColor,
    pub threshold: RGBColor,
    pub marker: RGBColor,
}
impl Default for PlotStyle {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            background: RGBColor(10, 10, 10),
            foreground: WHITE,
            trace: BLUE,
            threshold: RED,
            marker: GREEN,
        }
    }
}
fn padded(lo: f64, hi: f64) -> (f64, f64) {
    if (hi - lo).abs() < f64::EPSILON {
        (lo - 0.5, hi + 0.5)
    } else {
        let pad = (hi - lo) * 0.05;
        (lo - pad, hi + pad)
    }
}
/// Single waveform with its threshold line and, if found, the crossing time.
pub fn render_waveform_png(
    preview: &WaveformPreview,
    style: &PlotStyle,
) -> Result<Vec<u8>, AnalysisError> {
    let record = &preview.record;
    let (Some((t0, t1)), Some((v_min, v_max))) = (record.time_bounds(), record.voltage_bounds())
    else {
        return Err(AnalysisError::Plot(format!(
            "{} has no samples to draw",
            preview.label
        )));
    };
    let (x_lo, x_hi) = padded(t0, t1);
    let (y_lo, y_hi) = padded(v_min.min(preview.threshold_mv), v_max.max(preview.threshold_mv));
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                &preview.label,
                ("sans-serif", 20).into_font().color(&style.foreground),
            )
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 45)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
        chart
            .configure_mesh()
            .x_desc("Time [ns]")
            .y_desc("Voltage [mV]")
            .label_style(("sans-serif", 12).into_font().color(&style.foreground))
            .axis_desc_style(("sans-serif", 14).into_font().color(&style.foreground))
            .light_line_style(&style.foreground.mix(0.1))
            .draw()?;
        let trace = style.trace;
        chart
            .draw_series(LineSeries::new(
                record.samples().iter().map(|s| (s.time_ns, s.voltage_mv)),
                &trace,
            ))?
            .label("Waveform")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &trace));
        let threshold = style.threshold;
        chart
            .draw_series(LineSeries::new(
                vec![(t0, preview.threshold_mv), (t1, preview.threshold_mv)],
                &threshold,
            ))?
            .label("Threshold")
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &threshold));
        if let RiseTime::Found(t) = preview.rise_time {
            let marker = style.marker;
            chart
                .draw_series(LineSeries::new(vec![(t, v_min), (t, v_max)], &marker))?
                .label("Rise time")
                .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &marker));
        }
        chart
            .configure_series_labels()
            .label_font(("sans-serif", 12).into_font().color(&style.foreground))
            .border_style(&style.foreground.mix(0.2))
            .background_style(&style.background)
            .draw()?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
/// Average waveform over `time_axis` (the index axis or a physical one).
pub fn render_average_png(
    average: &AverageWaveform,
    time_axis: &[f64],
    x_label: &str,
    style: &PlotStyle,
) -> Result<Vec<u8>, AnalysisError> {
    if average.is_empty() || time_axis.len() != average.len() {
        return Err(AnalysisError::Plot(
            "average waveform and time axis do not match".into(),
        ));
    }
    let volts = average.voltages_mv();
    let (x_lo, x_hi) = padded(time_axis[0], time_axis[time_axis.len() - 1]);
    let (y_lo, y_hi) = padded(
        volts.iter().copied().fold(f64::INFINITY, f64::min),
        volts.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    );
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                format!("Average Waveform ({} captures)", average.waveform_count()),
                ("sans-serif", 20).into_font().color(&style.foreground),
            )
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 45)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
        chart
            .configure_mesh()
            .x_desc(x_label)
            .y_desc("Voltage [mV]")
            .label_style(("sans-serif", 12).into_font().color(&style.foreground))
            .axis_desc_style(("sans-serif", 14).into_font().color(&style.foreground))
            .light_line_style(&style.foreground.mix(0.1))
            .draw()?;
        chart.draw_series(LineSeries::new(
            time_axis.iter().copied().zip(volts.iter().copied()),
            &style.trace,
        ))?;
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
/// Histogram bars with the fitted Gaussian on top when the fit converged.
pub fn render_histogram_png(
    distribution: &Distribution,
    style: &PlotStyle,
) -> Result<Vec<u8>, AnalysisError> {
    let hist = &distribution.histogram;
    let (x_lo, x_hi) = padded(hist.lo(), hist.hi());
    let fit_peak = distribution.fit.as_ref().map_or(0.0, |f| f.amplitude);
    let y_hi = (hist.max_count() as f64).max(fit_peak).max(1.0) * 1.1;
    let mut buffer = vec![0u8; (style.width * style.height * 3) as usize];
    {
        let root = BitMapBackend::with_buffer(&mut buffer, (style.width, style.height))
            .into_drawing_area();
        root.fill(&style.background)?;
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                "Histogram of Rise Times",
                ("sans-serif", 20).into_font().color(&style.foreground),
            )
            .set_label_area_size(LabelAreaPosition::Left, 55)
            .set_label_area_size(LabelAreaPosition::Bottom, 45)
            .build_cartesian_2d(x_lo..x_hi, 0f64..y_hi)?;
        chart
            .configure_mesh()
            .x_desc("TOA [ns]")
            .y_desc("Counts")
            .label_style(("sans-serif", 12).into_font().color(&style.foreground))
            .axis_desc_style(("sans-serif", 14).into_font().color(&style.foreground))
            .light_line_style(&style.foreground.mix(0.1))
            .draw()?;
        let edges = hist.bin_edges();
        let bar_style = style.trace.mix(0.7).filled();
        chart.draw_series(hist.counts().iter().enumerate().filter(|&(_, &c)| c > 0).map(
            |(i, &c)| {
                let (left, right) = if hist.is_degenerate() {
                    let half = (x_hi - x_lo) * 0.02;
                    (hist.lo() - half, hist.lo() + half)
                } else {
                    (edges[i], edges[i + 1])
                };
                Rectangle::new([(left, 0.0), (right, c as f64)], bar_style)
            },
        ))?;
        if let Ok(fit) = &distribution.fit {
            let steps = 1000;
            let width = hist.hi() - hist.lo();
            chart.draw_series(LineSeries::new(
                (0..=steps).map(|k| {
                    let x = hist.lo() + width * k as f64 / steps as f64;
                    (x, fit.evaluate(x))
                }),
                &style.threshold,
            ))?;
        }
        root.present()?;
    }
    encode_png(&buffer, style.width, style.height)
}
fn encode_png(buffer: &[u8], width: u32, height: u32) -> Result<Vec<u8>, AnalysisError> {
    let image = ImageBuffer::<Rgb<u8>, _>::from_raw(width, height, buffer.to_vec())
        .ok_or_else(|| AnalysisError::Plot("failed to allocate image buffer".into()))?;
    let mut output = Vec::new();
    let dynamic = DynamicImage::ImageRgb8(image);
    dynamic.write_to(&mut Cursor::new(&mut output), ImageFormat::Png)?;
    Ok(output)
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{
        DistributionSummarizer, ManualSource, BatchPipeline, PipelineConfig,
    };
    #[test]
    fn plotting_helpers_return_png() {
        let text: String = (0..50)
            .map(|i| format!("{:e},{:e}\n", i as f64 * 1e-10, (i as f64 * 0.2).min(5.0) * 1e-3))
            .collect();
        let source = ManualSource::new(vec![("wf", text.clone()), ("wf2", text)]);
        let outcome = BatchPipeline::new(source, PipelineConfig::default()).run();
        let style = PlotStyle::default();
        let preview = render_waveform_png(&outcome.previews[0], &style).unwrap();
        let average = outcome.average.unwrap();
        let avg_png = render_average_png(&average, &average.index_axis(), "Sample", &style).unwrap();
        let dist = DistributionSummarizer::new(20)
            .summarize(&[4.3, 4.35, 4.4, 4.4, 4.45, 4.5, 4.41, 4.39])
            .unwrap();
        let hist_png = render_histogram_png(&dist, &style).unwrap();
        for png in [preview, avg_png, hist_png] {
            assert_eq!(&png[1..4], b"PNG");
        }
    }
    #[test]
    fn empty_preview_is_a_plot_error() {
        let source = ManualSource::new(vec![("blank", "")]);
        let outcome = BatchPipeline::new(source, PipelineConfig::default()).run();
        assert!(matches!(
            render_waveform_png(&outcome.previews[0], &PlotStyle::default()),
            Err(AnalysisError::Plot(_))
        ));
    }
}
