// Range service - Historical queries with adaptive resolution
use crate::application::timeseries_repository::{RangeWindow, TimeSeriesRepository};
use crate::domain::telemetry::{RangeSeries, RawSeries, is_valid_metric_name};
use chrono::Utc;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::Arc;

pub const DEFAULT_WINDOW_MINUTES: i64 = 1440;
pub const MAX_WINDOW_MINUTES: i64 = 525_600;

/// Query resolution for a window. Thresholds keep any window at roughly
/// 80-100 points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Step {
    OneMinute,
    EightMinutes,
    FifteenMinutes,
    TwoHours,
}

impl Step {
    pub fn resolve(window_minutes: i64) -> Self {
        match window_minutes {
            m if m >= 10_080 => Step::TwoHours,
            m if m >= 1_440 => Step::FifteenMinutes,
            m if m >= 720 => Step::EightMinutes,
            _ => Step::OneMinute,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Step::OneMinute => "1m",
            Step::EightMinutes => "8m",
            Step::FifteenMinutes => "15m",
            Step::TwoHours => "2h",
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RangeError {
    #[error("invalid metric name: {0:?}")]
    InvalidMetric(String),
}

/// Normalize the first series of a range result. Extra series (several
/// devices matching an unfiltered query) are ignored.
pub fn normalize(metric: &str, raw: Vec<RawSeries>) -> RangeSeries {
    match raw.first() {
        Some(series) => RangeSeries::from_raw(metric, &series.values),
        None => RangeSeries::empty(metric),
    }
}

#[derive(Clone)]
pub struct RangeService {
    repository: Arc<dyn TimeSeriesRepository>,
    default_metrics: Vec<String>,
}

impl RangeService {
    pub fn new(repository: Arc<dyn TimeSeriesRepository>, default_metrics: Vec<String>) -> Self {
        Self {
            repository,
            default_metrics,
        }
    }

    pub fn default_metrics(&self) -> &[String] {
        &self.default_metrics
    }

    /// One metric over the last `minutes`. Store failures yield an empty
    /// series.
    pub async fn query(
        &self,
        metric: &str,
        device: Option<&str>,
        minutes: i64,
    ) -> Result<RangeSeries, RangeError> {
        if !is_valid_metric_name(metric) {
            return Err(RangeError::InvalidMetric(metric.to_string()));
        }
        let window = window_for(minutes, Utc::now().timestamp());
        Ok(self.fetch(metric, device, &window).await)
    }

    /// Several metrics over the same window, fetched concurrently. Blank
    /// names are skipped; invalid names and failing queries come back as
    /// empty series.
    pub async fn trends(
        &self,
        metrics: &[String],
        device: Option<&str>,
        minutes: i64,
    ) -> BTreeMap<String, RangeSeries> {
        let window = window_for(minutes, Utc::now().timestamp());
        let names: Vec<&str> = metrics
            .iter()
            .map(|m| m.trim())
            .filter(|m| !m.is_empty())
            .collect();

        tracing::info!(
            "Trends request: metrics={:?}, device={:?}, minutes={}",
            names,
            device,
            minutes
        );

        let series = join_all(names.iter().map(|name| {
            let window = &window;
            async move {
                if is_valid_metric_name(name) {
                    self.fetch(name, device, window).await
                } else {
                    tracing::warn!("Skipping invalid metric name {:?}", name);
                    RangeSeries::empty(*name)
                }
            }
        }))
        .await;

        series.into_iter().map(|s| (s.metric.clone(), s)).collect()
    }

    async fn fetch(&self, metric: &str, device: Option<&str>, window: &RangeWindow) -> RangeSeries {
        match self.repository.range(metric, device, window).await {
            Ok(raw) => {
                tracing::debug!(
                    "Range query for {} returned {} series (first device {:?})",
                    metric,
                    raw.len(),
                    raw.first().and_then(|s| s.device.as_deref())
                );
                normalize(metric, raw)
            }
            Err(e) => {
                tracing::warn!("Range query for {} failed: {}", metric, e);
                RangeSeries::empty(metric)
            }
        }
    }
}

/// Window ending at `now`, with `minutes` clamped to a sane range.
pub fn window_for(minutes: i64, now: i64) -> RangeWindow {
    let minutes = minutes.clamp(1, MAX_WINDOW_MINUTES);
    RangeWindow {
        start: now - minutes * 60,
        end: now,
        step: Step::resolve(minutes).as_str(),
    }
}
