// Tank settings service - Shared, validated calibration
use crate::domain::tank::{CalibrationError, CalibrationUpdate, TankCalibration};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Clone)]
pub struct TankSettingsService {
    calibration: Arc<RwLock<TankCalibration>>,
}

impl TankSettingsService {
    pub fn new(initial: TankCalibration) -> Self {
        Self {
            calibration: Arc::new(RwLock::new(initial)),
        }
    }

    pub async fn current(&self) -> TankCalibration {
        *self.calibration.read().await
    }

    /// All fields are validated against the same prior calibration and
    /// written in one step, so readers never see a half-applied update.
    pub async fn update(&self, input: &Value) -> Result<CalibrationUpdate, CalibrationError> {
        let mut calibration = self.calibration.write().await;
        let update = calibration.apply(input)?;
        *calibration = update.calibration;

        if !update.rejected.is_empty() {
            tracing::warn!("Rejected tank settings fields: {:?}", update.rejected);
        }
        tracing::info!(
            "Tank settings now max={} min={} alert={}",
            calibration.max_distance,
            calibration.min_distance,
            calibration.alert_level
        );
        Ok(update)
    }
}
