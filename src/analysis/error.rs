use thiserror::Error;
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("line {line} is not a `<time>,<voltage>` record: {content:?}")]
    MalformedRecord { line: usize, content: String },
    #[error("waveform source yielded no valid samples")]
    EmptySource,
    #[error("sample count mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("no waveforms were accumulated")]
    EmptyAggregate,
    #[error("no feature values to summarize")]
    EmptyDistribution,
    #[error("gaussian fit did not converge: {reason}")]
    FitNonConvergence { reason: String },
    #[error("cannot read waveform source {label}: {source}")]
    Source {
        label: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to render plot: {0}")]
    Plot(String),
}
impl AnalysisError {
    pub(crate) fn fit(reason: impl Into<String>) -> Self {
        AnalysisError::FitNonConvergence {
            reason: reason.into(),
        }
    }
}
impl<E: std::error::Error + Send + Sync + 'static> From<plotters::drawing::DrawingAreaErrorKind<E>>
    for AnalysisError
{
    fn from(value: plotters::drawing::DrawingAreaErrorKind<E>) -> Self {
        AnalysisError::Plot(format!("{value:?}"))
    }
}
impl From<image::ImageError> for AnalysisError {
    fn from(value: image::ImageError) -> Self {
        AnalysisError::Plot(value.to_string())
    }
}
