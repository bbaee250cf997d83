use std::collections::VecDeque;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor};
use std::path::PathBuf;
/// One point of a capture: time in nanoseconds, voltage in millivolts.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    pub time_ns: f64,
    pub voltage_mv: f64,
}
/// A single captured waveform, already normalized to ns / mV.
///
/// Samples keep the order of the input stream; they are never re-sorted.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WaveformRecord {
    samples: Vec<Sample>,
}
impl WaveformRecord {
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }
    pub fn empty() -> Self {
        Self::default()
    }
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }
    pub fn len(&self) -> usize {
        self.samples.len()
    }
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
    pub fn times(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.time_ns)
    }
    pub fn voltages(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.voltage_mv)
    }
    pub fn time_bounds(&self) -> Option<(f64, f64)> {
        Some((self.samples.first()?.time_ns, self.samples.last()?.time_ns))
    }
    pub fn voltage_bounds(&self) -> Option<(f64, f64)> {
        if self.samples.is_empty() {
            return None;
        }
        let (min, max) = self
            .voltages()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        Some((min, max))
    }
    /// Mean spacing of the time axis, if it is strictly increasing overall.
    pub fn sample_period_ns(&self) -> Option<f64> {
        if self.samples.len() < 2 {
            return None;
        }
        let (first, last) = self.time_bounds()?;
        let period = (last - first) / (self.samples.len() - 1) as f64;
        (period.is_finite() && period > 0.0).then_some(period)
    }
}
/// An opened record stream, or the error that prevented opening it.
pub struct SourceStream {
    pub label: String,
    pub reader: io::Result<Box<dyn BufRead>>,
}
/// Anything that can hand out waveform record streams one at a time.
pub trait WaveformSource {
    fn next_stream(&mut self) -> Option<SourceStream>;
}
enum ManualEntry {
    Text { label: String, content: String },
    Unreadable { label: String },
}
/// In-memory source useful for tests and deterministic playback.
pub struct ManualSource {
    queue: VecDeque<ManualEntry>,
}
impl ManualSource {
    pub fn new<L, C>(streams: impl IntoIterator<Item = (L, C)>) -> Self
    where
        L: Into<String>,
        C: Into<String>,
    {
        Self {
            queue: streams
                .into_iter()
                .map(|(label, content)| ManualEntry::Text {
                    label: label.into(),
                    content: content.into(),
                })
                .collect(),
        }
    }
    /// Queue an entry that fails to open, like a file deleted mid-batch.
    pub fn push_unreadable(&mut self, label: impl Into<String>) {
        self.queue.push_back(ManualEntry::Unreadable {
            label: label.into(),
        });
    }
}
impl WaveformSource for ManualSource {
    fn next_stream(&mut self) -> Option<SourceStream> {
        let stream = match self.queue.pop_front()? {
            ManualEntry::Text { label, content } => SourceStream {
                label,
                reader: Ok(Box::new(Cursor::new(content.into_bytes()))),
            },
            ManualEntry::Unreadable { label } => SourceStream {
                label,
                reader: Err(io::Error::new(io::ErrorKind::NotFound, "source unavailable")),
            },
        };
        Some(stream)
    }
}
/// Opens an explicit list of files in order. Discovery happens elsewhere.
pub struct FileListSource {
    paths: VecDeque<PathBuf>,
}
impl FileListSource {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }
    pub fn remaining(&self) -> usize {
        self.paths.len()
    }
}
impl WaveformSource for FileListSource {
    fn next_stream(&mut self) -> Option<SourceStream> {
        let path = self.paths.pop_front()?;
        let reader = File::open(&path).map(|f| Box::new(BufReader::new(f)) as Box<dyn BufRead>);
        Some(SourceStream {
            label: path.display().to_string(),
            reader,
        })
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn record(points: &[(f64, f64)]) -> WaveformRecord {
        WaveformRecord::from_samples(
            points
                .iter()
                .map(|&(time_ns, voltage_mv)| Sample {
                    time_ns,
                    voltage_mv,
                })
                .collect(),
        )
    }
    #[test]
    fn sample_period_is_mean_spacing() {
        let wf = record(&[(0.0, 0.0), (0.5, 1.0), (1.0, 2.0), (1.5, 0.0)]);
        assert!((wf.sample_period_ns().unwrap() - 0.5).abs() < 1e-12);
        assert_eq!(record(&[(3.0, 1.0)]).sample_period_ns(), None);
        assert_eq!(record(&[(1.0, 1.0), (1.0, 2.0)]).sample_period_ns(), None);
    }
    #[test]
    fn voltage_bounds_cover_all_samples() {
        let wf = record(&[(0.0, -3.0), (1.0, 7.5), (2.0, 0.25)]);
        assert_eq!(wf.voltage_bounds(), Some((-3.0, 7.5)));
        assert_eq!(WaveformRecord::empty().voltage_bounds(), None);
    }
    #[test]
    fn manual_source_yields_in_order_then_none() {
        let mut source = ManualSource::new(vec![("a", "0,1\n"), ("b", "")]);
        source.push_unreadable("c");
        let labels: Vec<String> = std::iter::from_fn(|| source.next_stream())
            .map(|s| {
                let ok = s.reader.is_ok();
                format!("{}:{ok}", s.label)
            })
            .collect();
        assert_eq!(labels, vec!["a:true", "b:true", "c:false"]);
    }
    #[test]
    fn file_list_source_reports_missing_files() {
        let missing = std::env::temp_dir().join("toa-scope-definitely-missing.csv");
        let mut source = FileListSource::new(vec![missing]);
        let stream = source.next_stream().unwrap();
        assert!(stream.reader.is_err());
        assert!(source.next_stream().is_none());
    }
}
