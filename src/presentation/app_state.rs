// Application state for HTTP handlers
use crate::application::device_registry::DeviceRegistry;
use crate::application::range_service::RangeService;
use crate::application::snapshot_service::SnapshotService;
use crate::application::streaming_service::StreamingService;
use crate::application::tank_settings::TankSettingsService;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub snapshot_service: SnapshotService,
    pub range_service: RangeService,
    pub device_registry: DeviceRegistry,
    pub tank_settings: TankSettingsService,
    pub streaming_service: StreamingService,
    /// Parent of every stream session's token; cancelled on shutdown.
    pub shutdown: CancellationToken,
}
