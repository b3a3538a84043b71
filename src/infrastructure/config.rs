use crate::application::snapshot_service::EmptyResultPolicy;
use crate::application::streaming_service::StreamSettings;
use crate::domain::tank::TankCalibration;
use crate::infrastructure::victoria_repository::StoreTimeouts;
use config::builder::DefaultState;
use config::{ConfigBuilder, Environment, File};
use serde::Deserialize;
use std::time::Duration;

const DEFAULT_CONFIG_PATH: &str = "config/gateway";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub devices: DeviceSettings,
    pub metrics: MetricSettings,
    pub stream: StreamConfig,
    pub tank: TankSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreSettings {
    pub base_url: String,
    pub instant_timeout_ms: u64,
    pub discovery_timeout_ms: u64,
    pub range_timeout_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DeviceSettings {
    pub anchor_metric: String,
    pub fallback_id: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MetricSettings {
    pub tracked: Vec<String>,
    pub empty_result_policy: EmptyResultPolicy,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamConfig {
    pub poll_interval_secs: u64,
    pub session_max_secs: u64,
    pub reconnect_ms: u64,
    pub error_retry_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TankSettings {
    pub max_distance: f64,
    pub min_distance: f64,
    pub alert_level: f64,
}

impl StoreSettings {
    pub fn timeouts(&self) -> StoreTimeouts {
        StoreTimeouts {
            instant: Duration::from_millis(self.instant_timeout_ms),
            discovery: Duration::from_millis(self.discovery_timeout_ms),
            range: Duration::from_millis(self.range_timeout_ms),
        }
    }
}

impl StreamConfig {
    pub fn settings(&self) -> StreamSettings {
        StreamSettings {
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
            session_max: Duration::from_secs(self.session_max_secs),
            reconnect_after: Duration::from_millis(self.reconnect_ms),
            error_retry: Duration::from_millis(self.error_retry_ms),
        }
    }
}

impl TankSettings {
    pub fn calibration(&self) -> TankCalibration {
        TankCalibration {
            max_distance: self.max_distance,
            min_distance: self.min_distance,
            alert_level: self.alert_level,
        }
    }
}

/// Defaults, then `config/gateway.*` (or `$GATEWAY_CONFIG`), then
/// `GATEWAY_*` environment variables with `__` between path segments.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    let path = std::env::var("GATEWAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());

    let settings = with_defaults()?
        .add_source(File::with_name(&path).required(false))
        .add_source(
            Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("metrics.tracked"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

fn with_defaults() -> anyhow::Result<ConfigBuilder<DefaultState>> {
    let defaults = config::Config::builder()
        .set_default("server.bind", "0.0.0.0:5000")?
        .set_default("store.base_url", "http://localhost:8428")?
        .set_default("store.instant_timeout_ms", 2000)?
        .set_default("store.discovery_timeout_ms", 3000)?
        .set_default("store.range_timeout_ms", 10000)?
        .set_default("devices.anchor_metric", "temperature")?
        .set_default("devices.fallback_id", "plt-404cca470da0")?
        .set_default(
            "metrics.tracked",
            vec!["temperature", "pH", "EC", "TDS", "distance", "ORP"],
        )?
        .set_default("metrics.empty_result_policy", "no_data")?
        .set_default("stream.poll_interval_secs", 5)?
        .set_default("stream.session_max_secs", 25)?
        .set_default("stream.reconnect_ms", 100)?
        .set_default("stream.error_retry_ms", 5000)?
        .set_default("tank.max_distance", 3.0)?
        .set_default("tank.min_distance", 0.3)?
        .set_default("tank.alert_level", 10.0)?;
    Ok(defaults)
}
