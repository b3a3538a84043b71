// VictoriaMetrics repository implementation (Prometheus query API)
use crate::application::timeseries_repository::{QueryError, RangeWindow, TimeSeriesRepository};
use crate::domain::telemetry::{MetricSample, RawSeries, RawValue};
use anyhow::Context;
use async_trait::async_trait;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::time::Duration;

const DEVICE_LABEL: &str = "device";

#[derive(Debug, Clone, Copy)]
pub struct StoreTimeouts {
    pub instant: Duration,
    /// Used for unfiltered instant queries, which return every device.
    pub discovery: Duration,
    pub range: Duration,
}

#[derive(Debug, Clone)]
pub struct VictoriaRepository {
    base_url: String,
    client: reqwest::Client,
    timeouts: StoreTimeouts,
}

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    status: String,
    #[serde(default)]
    error: Option<String>,
    data: Option<QueryData<T>>,
}

#[derive(Debug, Deserialize)]
struct QueryData<T> {
    result: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct InstantResult {
    #[serde(default)]
    metric: HashMap<String, String>,
    #[serde(default)]
    value: Option<(f64, RawValue)>,
}

#[derive(Debug, Deserialize)]
struct RangeResult {
    #[serde(default)]
    metric: HashMap<String, String>,
    #[serde(default)]
    values: Vec<(f64, RawValue)>,
}

impl<T> QueryResponse<T> {
    fn into_result(self) -> Result<Vec<T>, QueryError> {
        if self.status != "success" {
            let reason = self
                .error
                .unwrap_or_else(|| format!("status {:?}", self.status));
            return Err(QueryError::DataShape(reason));
        }
        self.data
            .map(|d| d.result)
            .ok_or_else(|| QueryError::DataShape("response has no data".to_string()))
    }
}

impl VictoriaRepository {
    pub fn new(base_url: String, timeouts: StoreTimeouts) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeouts.instant)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            timeouts,
        })
    }

    fn build_instant_url(&self, expr: &str, at: i64) -> String {
        format!(
            "{}/api/v1/query?query={}&time={}",
            self.base_url,
            urlencoding::encode(expr),
            at
        )
    }

    fn build_range_url(&self, expr: &str, window: &RangeWindow) -> String {
        format!(
            "{}/api/v1/query_range?query={}&start={}&end={}&step={}",
            self.base_url,
            urlencoding::encode(expr),
            window.start,
            window.end,
            window.step
        )
    }

    async fn execute_query<T: DeserializeOwned>(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<T>, QueryError> {
        tracing::debug!("Store query: {}", url);

        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(QueryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<QueryResponse<T>>()
            .await
            .map_err(|e| classify(e, timeout))?
            .into_result()
    }
}

#[async_trait]
impl TimeSeriesRepository for VictoriaRepository {
    async fn instant(
        &self,
        metric: &str,
        device: Option<&str>,
        at: i64,
    ) -> Result<Vec<MetricSample>, QueryError> {
        let url = self.build_instant_url(&selector(metric, device), at);
        let timeout = match device {
            Some(_) => self.timeouts.instant,
            None => self.timeouts.discovery,
        };

        let results = self.execute_query::<InstantResult>(&url, timeout).await?;
        Ok(to_samples(metric, results))
    }

    async fn range(
        &self,
        metric: &str,
        device: Option<&str>,
        window: &RangeWindow,
    ) -> Result<Vec<RawSeries>, QueryError> {
        let url = self.build_range_url(&selector(metric, device), window);
        let results = self
            .execute_query::<RangeResult>(&url, self.timeouts.range)
            .await?;
        Ok(to_series(results))
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> QueryError {
    if error.is_timeout() {
        QueryError::Timeout(timeout)
    } else if error.is_decode() {
        QueryError::DataShape(error.to_string())
    } else {
        QueryError::Transport(error.to_string())
    }
}

/// `metric` alone, or `metric{device="..."}` with the label value escaped.
pub fn selector(metric: &str, device: Option<&str>) -> String {
    match device {
        Some(device) => format!("{}{{{}=\"{}\"}}", metric, DEVICE_LABEL, escape_label(device)),
        None => metric.to_string(),
    }
}

fn escape_label(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

// Store timestamps are float seconds; whole seconds are enough here.
fn to_samples(metric: &str, results: Vec<InstantResult>) -> Vec<MetricSample> {
    results
        .into_iter()
        .filter_map(|mut r| {
            let (ts, value) = r.value?;
            let device = r.metric.remove(DEVICE_LABEL).unwrap_or_default();
            Some(MetricSample::new(
                metric.to_string(),
                value.to_f64(),
                ts as i64,
                device,
            ))
        })
        .collect()
}

fn to_series(results: Vec<RangeResult>) -> Vec<RawSeries> {
    results
        .into_iter()
        .map(|mut r| RawSeries {
            device: r.metric.remove(DEVICE_LABEL),
            values: r
                .values
                .into_iter()
                .map(|(ts, value)| (ts as i64, value))
                .collect(),
        })
        .collect()
}
