use std::io::BufRead;
use log::{debug, warn};
use crate::analysis::error::AnalysisError;
use crate::analysis::source::{Sample, WaveformRecord};
pub const SECONDS_TO_NANOSECONDS: f64 = 1e9;
pub const VOLTS_TO_MILLIVOLTS: f64 = 1e3;
/// Parses `<time_s>,<voltage_V>` lines into a normalized [`WaveformRecord`].
#[derive(Clone, Copy, Debug)]
pub struct WaveformIngestor {
    separator: char,
}
impl Default for WaveformIngestor {
    fn default() -> Self {
        Self { separator: ',' }
    }
}
impl WaveformIngestor {
    pub fn with_separator(separator: char) -> Self {
        Self { separator }
    }
    /// Parse one line; `line_no` is 1-based and only used for reporting.
    pub fn parse_line(&self, line_no: usize, line: &str) -> Result<Sample, AnalysisError> {
        let malformed = || AnalysisError::MalformedRecord {
            line: line_no,
            content: line.to_owned(),
        };
        let mut fields = line.trim().split(self.separator);
        let (Some(time), Some(voltage), None) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(malformed());
        };
        let time: f64 = time.trim().parse().map_err(|_| malformed())?;
        let voltage: f64 = voltage.trim().parse().map_err(|_| malformed())?;
        if !time.is_finite() || !voltage.is_finite() {
            return Err(malformed());
        }
        Ok(Sample {
            time_ns: time * SECONDS_TO_NANOSECONDS,
            voltage_mv: voltage * VOLTS_TO_MILLIVOLTS,
        })
    }
    /// Read every line of `reader`. Malformed lines are skipped; a read error
    /// ends the stream and keeps the samples gathered so far.
    pub fn ingest<R: BufRead>(&self, mut reader: R) -> WaveformRecord {
        let mut samples = Vec::new();
        let mut skipped = 0usize;
        let mut raw = Vec::new();
        let mut line_no = 0usize;
        loop {
            raw.clear();
            match reader.read_until(b'\n', &mut raw) {
                Ok(0) => break,
                Ok(_) => {}
                Err(err) => {
                    warn!("stopping after line {line_no}: {err}");
                    break;
                }
            }
            line_no += 1;
            let text = String::from_utf8_lossy(&raw);
            let line = text.trim_end_matches(|c: char| c == '\r' || c == '\n');
            if line.trim().is_empty() {
                continue;
            }
            match self.parse_line(line_no, line) {
                Ok(sample) => samples.push(sample),
                Err(err) => {
                    skipped += 1;
                    debug!("{err}");
                }
            }
        }
        if skipped > 0 {
            debug!("skipped {skipped} malformed line(s), kept {}", samples.len());
        }
        WaveformRecord::from_samples(samples)
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    fn ingest(text: &str) -> WaveformRecord {
        WaveformIngestor::default().ingest(Cursor::new(text.as_bytes().to_vec()))
    }
    #[test]
    fn converts_seconds_and_volts() {
        let wf = ingest("1e-9,0.002\n2.5e-9,-0.0015\n");
        let times: Vec<f64> = wf.times().collect();
        let volts: Vec<f64> = wf.voltages().collect();
        assert_eq!(times.len(), 2);
        assert!((times[0] - 1.0).abs() < 1e-9);
        assert!((times[1] - 2.5).abs() < 1e-9);
        assert!((volts[0] - 2.0).abs() < 1e-9);
        assert!((volts[1] + 1.5).abs() < 1e-9);
    }
    #[test]
    fn skips_headers_and_garbage_but_keeps_order() {
        let wf = ingest("Time,Ampl\n3e-9,0.001\nnot,a,number\n1e-9, 0.004 \r\n\n,\n2e-9,nan\n");
        let times: Vec<f64> = wf.times().collect();
        assert_eq!(times.len(), 2);
        assert!((times[0] - 3.0).abs() < 1e-9, "input order is preserved");
        assert!((times[1] - 1.0).abs() < 1e-9);
    }
    #[test]
    fn malformed_line_reports_its_position() {
        let err = WaveformIngestor::default()
            .parse_line(7, "0.1;0.2")
            .unwrap_err();
        match err {
            AnalysisError::MalformedRecord { line, content } => {
                assert_eq!(line, 7);
                assert_eq!(content, "0.1;0.2");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }
    #[test]
    fn custom_separator() {
        let wf = WaveformIngestor::with_separator(';').ingest(Cursor::new(b"1e-9;1e-3\n".to_vec()));
        assert_eq!(wf.len(), 1);
    }
    #[test]
    fn empty_stream_gives_empty_record() {
        assert!(ingest("").is_empty());
        assert!(ingest("header only\n").is_empty());
    }
    #[test]
    fn invalid_utf8_line_is_skipped() {
        let mut bytes = b"1e-9,1e-3\n".to_vec();
        bytes.extend_from_slice(&[0xff, 0xfe, b'\n']);
        bytes.extend_from_slice(b"2e-9,2e-3\n");
        let wf = WaveformIngestor::default().ingest(Cursor::new(bytes));
        assert_eq!(wf.len(), 2);
    }
}
