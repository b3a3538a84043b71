// Scripted in-memory repository for service tests
use crate::application::timeseries_repository::{QueryError, RangeWindow, TimeSeriesRepository};
use crate::domain::telemetry::{MetricSample, RawSeries, RawValue};
use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

type InstantReply = Result<Vec<MetricSample>, QueryError>;
type RangeReply = Result<Vec<RawSeries>, QueryError>;

/// Device-filtered instant queries consume a per-metric script; the last
/// reply repeats once the script runs out. Unfiltered queries (discovery)
/// get the anchor reply.
#[derive(Default)]
pub struct FakeRepository {
    anchor: Mutex<Option<InstantReply>>,
    instant: Mutex<HashMap<String, VecDeque<InstantReply>>>,
    range: Mutex<HashMap<String, RangeReply>>,
    windows: Mutex<Vec<RangeWindow>>,
}

pub fn sample(name: &str, value: Option<f64>, ts: i64, device: &str) -> MetricSample {
    MetricSample::new(name.to_string(), value, ts, device.to_string())
}

impl FakeRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_devices(self, devices: &[&str]) -> Self {
        let samples = devices
            .iter()
            .map(|d| sample("temperature", Some(20.0), 1, d))
            .collect();
        self.with_anchor(Ok(samples))
    }

    pub fn with_anchor(self, reply: InstantReply) -> Self {
        *self.anchor.lock().unwrap() = Some(reply);
        self
    }

    pub fn with_value(self, metric: &str, value: Option<f64>, ts: i64) -> Self {
        self.with_instant(metric, Ok(vec![sample(metric, value, ts, "d1")]))
    }

    pub fn with_instant(self, metric: &str, reply: InstantReply) -> Self {
        self.instant
            .lock()
            .unwrap()
            .entry(metric.to_string())
            .or_default()
            .push_back(reply);
        self
    }

    pub fn with_range(self, metric: &str, reply: RangeReply) -> Self {
        self.range.lock().unwrap().insert(metric.to_string(), reply);
        self
    }

    pub fn range_windows(&self) -> Vec<RangeWindow> {
        self.windows.lock().unwrap().clone()
    }
}

#[async_trait]
impl TimeSeriesRepository for FakeRepository {
    async fn instant(
        &self,
        metric: &str,
        device: Option<&str>,
        _at: i64,
    ) -> Result<Vec<MetricSample>, QueryError> {
        if device.is_none() {
            return self.anchor.lock().unwrap().clone().unwrap_or(Ok(Vec::new()));
        }

        let mut scripts = self.instant.lock().unwrap();
        match scripts.get_mut(metric) {
            Some(queue) if queue.len() > 1 => queue.pop_front().unwrap(),
            Some(queue) => queue.front().cloned().unwrap_or(Ok(Vec::new())),
            None => Ok(Vec::new()),
        }
    }

    async fn range(
        &self,
        metric: &str,
        _device: Option<&str>,
        window: &RangeWindow,
    ) -> Result<Vec<RawSeries>, QueryError> {
        self.windows.lock().unwrap().push(window.clone());
        self.range
            .lock()
            .unwrap()
            .get(metric)
            .cloned()
            .unwrap_or(Ok(Vec::new()))
    }
}

pub fn raw_series(values: &[(i64, &str)]) -> RawSeries {
    RawSeries {
        device: Some("d1".to_string()),
        values: values
            .iter()
            .map(|(ts, v)| (*ts, RawValue::Text(v.to_string())))
            .collect(),
    }
}
