// src/main.rs
use std::fs;
use std::path::{Path, PathBuf};
use anyhow::{bail, Context, Result};
use clap::Parser;
use log::{info, warn};
use toa_scope::analysis::{AnalysisError, BatchOutcome, BatchPipeline};
use toa_scope::config::AnalysisConfig;
use toa_scope::discover;
use toa_scope::plot::{render_average_png, render_histogram_png, render_waveform_png, PlotStyle};
use toa_scope::report::BatchSummary;

#[derive(Parser, Debug)]
#[command(
    name = "toa-scope",
    version,
    about = "Rise-time distribution and average pulse of a folder of scope captures"
)]
struct Args {
    /// Folder holding `<time_s>,<voltage_V>` capture files
    input_dir: PathBuf,
    /// Where plots and summary.json are written
    output_dir: PathBuf,
    /// JSON configuration file; flags below override it
    #[arg(long)]
    config: Option<PathBuf>,
    /// Rise-time threshold [mV]
    #[arg(long)]
    threshold: Option<f64>,
    /// Number of individual waveforms to plot
    #[arg(long)]
    previews: Option<usize>,
    /// Histogram bin count
    #[arg(long)]
    bins: Option<usize>,
    /// Sampling interval of the captures [ns]
    #[arg(long)]
    sample_period_ns: Option<f64>,
    /// Only write summary.json
    #[arg(long)]
    no_plots: bool,
}

fn load_config(args: &Args) -> Result<AnalysisConfig> {
    let mut config = match &args.config {
        Some(path) => AnalysisConfig::load(path)?,
        None => AnalysisConfig::default(),
    };
    if let Some(threshold) = args.threshold {
        config.threshold_mv = threshold;
    }
    if let Some(previews) = args.previews {
        config.preview_limit = previews;
    }
    if let Some(bins) = args.bins {
        config.bin_count = bins;
    }
    if let Some(period) = args.sample_period_ns {
        config.sample_period_ns = Some(period);
    }
    config.validate()?;
    Ok(config)
}

fn write_png(path: &Path, png: Result<Vec<u8>, AnalysisError>) -> Result<()> {
    match png {
        Ok(bytes) => {
            fs::write(path, bytes).with_context(|| format!("cannot write {}", path.display()))
        }
        Err(err) => {
            warn!("{}: {err}", path.display());
            Ok(())
        }
    }
}

fn write_plots(outcome: &BatchOutcome, output_dir: &Path) -> Result<()> {
    let style = PlotStyle::default();
    for (i, preview) in outcome.previews.iter().enumerate() {
        let path = output_dir.join(format!("waveform_{}.png", i + 1));
        write_png(&path, render_waveform_png(preview, &style))?;
    }
    if let Ok(average) = &outcome.average {
        let (axis, label) = match outcome.sample_period_ns {
            Some(period) => (average.time_axis(period), "Time [ns]"),
            None => (average.index_axis(), "Sample"),
        };
        write_png(
            &output_dir.join("average_waveform.png"),
            render_average_png(average, &axis, label, &style),
        )?;
    }
    if let Ok(distribution) = &outcome.distribution {
        write_png(
            &output_dir.join("rise_time_histogram.png"),
            render_histogram_png(distribution, &style),
        )?;
    }
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let source = discover::waveform_source(&args.input_dir, &config.extension)?;
    info!(
        "{} .{} file(s) in {}",
        source.remaining(),
        config.extension,
        args.input_dir.display()
    );
    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("cannot create {}", args.output_dir.display()))?;
    let outcome = BatchPipeline::new(source, config.pipeline_config()).run();
    let summary = BatchSummary::from_outcome(&outcome, config.threshold_mv);
    summary.log();
    summary.write_json(&args.output_dir.join("summary.json"))?;
    if !args.no_plots {
        write_plots(&outcome, &args.output_dir)?;
    }
    if outcome.average.is_err() && outcome.distribution.is_err() {
        bail!("no usable waveform in {}", args.input_dir.display());
    }
    info!("analysis complete, output in {}", args.output_dir.display());
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    run(Args::parse())
}
