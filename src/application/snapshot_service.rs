// Snapshot service - Use case for building the "current values" document
use crate::application::device_registry::DeviceRegistry;
use crate::application::metric_cache::MetricCache;
use crate::application::tank_settings::TankSettingsService;
use crate::application::timeseries_repository::TimeSeriesRepository;
use crate::domain::snapshot::{Snapshot, mode_timestamp};
use crate::domain::tank::NEUTRAL_LEVEL;
use chrono::Utc;
use futures::future::join_all;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Metric whose value drives the derived tank fill level.
pub const DISTANCE_METRIC: &str = "distance";

/// What to show for a metric when the store answers with no series at all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyResultPolicy {
    /// Leave the metric out of the snapshot.
    #[default]
    NoData,
    /// Serve the cached value, as for a transport failure.
    UseCache,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Reading {
    Live { value: Option<f64>, timestamp: i64 },
    Cached(f64),
    Unknown,
}

#[derive(Clone)]
pub struct SnapshotService {
    repository: Arc<dyn TimeSeriesRepository>,
    cache: Arc<MetricCache>,
    devices: DeviceRegistry,
    tank: TankSettingsService,
    metrics: Vec<String>,
    empty_policy: EmptyResultPolicy,
}

impl SnapshotService {
    pub fn new(
        repository: Arc<dyn TimeSeriesRepository>,
        cache: Arc<MetricCache>,
        devices: DeviceRegistry,
        tank: TankSettingsService,
        metrics: Vec<String>,
        empty_policy: EmptyResultPolicy,
    ) -> Self {
        Self {
            repository,
            cache,
            devices,
            tank,
            metrics,
            empty_policy,
        }
    }

    /// Query every tracked metric for the default device and assemble one
    /// snapshot. Store failures degrade the result, they never fail it.
    pub async fn build_snapshot(&self) -> Snapshot {
        let now = Utc::now();
        let at = now.timestamp();

        let devices = self.devices.discover(at).await;
        let Some(device) = DeviceRegistry::select_default(&devices) else {
            return Snapshot::minimal(now);
        };

        let readings = join_all(
            self.metrics
                .iter()
                .map(|metric| self.read_metric(metric, device, at)),
        )
        .await;

        let mut metrics = BTreeMap::new();
        let mut timestamps = Vec::new();
        for (name, reading) in self.metrics.iter().zip(readings) {
            match reading {
                Reading::Live { value, timestamp } => {
                    metrics.insert(name.clone(), value);
                    timestamps.push(timestamp);
                }
                Reading::Cached(value) => {
                    metrics.insert(name.clone(), Some(value));
                }
                Reading::Unknown => {}
            }
        }

        let mut snapshot = Snapshot {
            device_id: Some(device.to_string()),
            timestamp: mode_timestamp(&timestamps).unwrap_or(at),
            last_update: now.to_rfc3339(),
            metrics,
            water_level: NEUTRAL_LEVEL,
            stale: timestamps.is_empty(),
        };
        if let Some(distance) = snapshot.metric(DISTANCE_METRIC) {
            snapshot.water_level = self.tank.current().await.percent_from_distance(distance);
        }
        snapshot
    }

    async fn read_metric(&self, metric: &str, device: &str, at: i64) -> Reading {
        match self.repository.instant(metric, Some(device), at).await {
            Ok(samples) => match samples.into_iter().next() {
                Some(sample) => {
                    if let Some(value) = sample.value {
                        self.cache.record_success(metric, value, sample.timestamp).await;
                    }
                    Reading::Live {
                        value: sample.value,
                        timestamp: sample.timestamp,
                    }
                }
                None if self.empty_policy == EmptyResultPolicy::UseCache => {
                    self.cached(metric).await
                }
                None => Reading::Unknown,
            },
            Err(e) if e.is_transport() => {
                tracing::warn!("Error querying {} for {}: {}", metric, device, e);
                self.cached(metric).await
            }
            Err(e) => {
                tracing::warn!("Discarding {} for {}: {}", metric, device, e);
                Reading::Unknown
            }
        }
    }

    async fn cached(&self, metric: &str) -> Reading {
        match self.cache.fallback(metric).await {
            Some(entry) => {
                tracing::debug!("Serving cached {} from {}", metric, entry.timestamp);
                Reading::Cached(entry.value)
            }
            None => Reading::Unknown,
        }
    }
}
