// Repository trait for time-series store access
use crate::domain::telemetry::{MetricSample, RawSeries};
use async_trait::async_trait;
use std::time::Duration;

/// Failure talking to the store. Callers decide on fallback; nothing here
/// is fatal to the process.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum QueryError {
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("store returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unexpected response shape: {0}")]
    DataShape(String),
}

impl QueryError {
    /// Timeouts, network errors and non-2xx statuses. A malformed body is
    /// not a transport failure: it means "no data".
    pub fn is_transport(&self) -> bool {
        !matches!(self, QueryError::DataShape(_))
    }
}

/// Time window and resolution for a range query, in unix seconds.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeWindow {
    pub start: i64,
    pub end: i64,
    pub step: &'static str,
}

#[async_trait]
pub trait TimeSeriesRepository: Send + Sync {
    /// Latest value of `metric` at `at`, one sample per matching series.
    /// `device = None` matches every device. An empty vector means the
    /// store answered but has no data.
    async fn instant(
        &self,
        metric: &str,
        device: Option<&str>,
        at: i64,
    ) -> Result<Vec<MetricSample>, QueryError>;

    /// Values of `metric` over `window`, one raw series per matching series.
    async fn range(
        &self,
        metric: &str,
        device: Option<&str>,
        window: &RangeWindow,
    ) -> Result<Vec<RawSeries>, QueryError>;
}
