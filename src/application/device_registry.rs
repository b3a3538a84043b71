// Device registry - Discovers device ids from the store's labels
use crate::application::timeseries_repository::TimeSeriesRepository;
use std::sync::Arc;

#[derive(Clone)]
pub struct DeviceRegistry {
    repository: Arc<dyn TimeSeriesRepository>,
    anchor_metric: String,
    fallback_id: String,
}

impl DeviceRegistry {
    pub fn new(
        repository: Arc<dyn TimeSeriesRepository>,
        anchor_metric: String,
        fallback_id: String,
    ) -> Self {
        Self {
            repository,
            anchor_metric,
            fallback_id,
        }
    }

    /// Query the anchor metric across all devices and collect the `device`
    /// label of each series, deduplicated in discovery order. Falls back to
    /// the configured id when the query fails or finds nothing.
    pub async fn discover(&self, at: i64) -> Vec<String> {
        let devices = match self.repository.instant(&self.anchor_metric, None, at).await {
            Ok(samples) => {
                let mut devices: Vec<String> = Vec::new();
                for sample in samples {
                    if !sample.device.is_empty() && !devices.contains(&sample.device) {
                        devices.push(sample.device);
                    }
                }
                devices
            }
            Err(e) => {
                tracing::warn!("Device discovery via {} failed: {}", self.anchor_metric, e);
                Vec::new()
            }
        };

        if devices.is_empty() {
            tracing::debug!("No devices discovered, using fallback {}", self.fallback_id);
            return vec![self.fallback_id.clone()];
        }
        devices
    }

    pub fn select_default(devices: &[String]) -> Option<&str> {
        devices.first().map(String::as_str)
    }
}
