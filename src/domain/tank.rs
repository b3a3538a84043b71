// Tank calibration domain model
use serde::Serialize;
use serde_json::{Map, Value};

/// Fill level reported when the calibration cannot produce a meaningful one.
pub const NEUTRAL_LEVEL: f64 = 50.0;

/// Distance-to-fill mapping for the ultrasonic tank sensor.
///
/// `max_distance` is the reading when the tank is empty (0%),
/// `min_distance` the reading when it is full (100%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TankCalibration {
    pub max_distance: f64,
    pub min_distance: f64,
    pub alert_level: f64,
}

impl Default for TankCalibration {
    fn default() -> Self {
        Self {
            max_distance: 3.0,
            min_distance: 0.3,
            alert_level: 10.0,
        }
    }
}

/// Result of applying a partial update.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibrationUpdate {
    pub calibration: TankCalibration,
    pub applied: Vec<&'static str>,
    pub rejected: Vec<String>,
}

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CalibrationError {
    #[error("tank settings must be a JSON object")]
    NotAnObject,
}

impl TankCalibration {
    pub fn percent_from_distance(&self, distance: f64) -> f64 {
        if self.max_distance <= self.min_distance {
            return NEUTRAL_LEVEL;
        }
        let level = (self.max_distance - distance) / (self.max_distance - self.min_distance) * 100.0;
        level.clamp(0.0, 100.0)
    }

    /// Apply every field of `input` that passes its own bound check and
    /// return the resulting calibration. Invalid fields are skipped; only a
    /// non-object input fails.
    pub fn apply(&self, input: &Value) -> Result<CalibrationUpdate, CalibrationError> {
        let fields = input.as_object().ok_or(CalibrationError::NotAnObject)?;
        let mut next = *self;
        let mut applied = Vec::new();
        let mut rejected = Vec::new();

        let checks: [(&'static str, fn(f64) -> bool, &mut f64); 3] = [
            ("maxDistance", |v| v > 0.0, &mut next.max_distance),
            ("minDistance", |v| v >= 0.0, &mut next.min_distance),
            ("alertLevel", |v| (0.0..=100.0).contains(&v), &mut next.alert_level),
        ];

        for (key, valid, slot) in checks {
            match number_field(fields, key) {
                None => {}
                Some(Some(v)) if valid(v) => {
                    *slot = v;
                    applied.push(key);
                }
                Some(_) => rejected.push(key.to_string()),
            }
        }

        Ok(CalibrationUpdate {
            calibration: next,
            applied,
            rejected,
        })
    }
}

/// `None` when the key is missing, `Some(None)` when present but not a
/// finite JSON number.
fn number_field(fields: &Map<String, Value>, key: &str) -> Option<Option<f64>> {
    let value = fields.get(key)?;
    Some(value.as_f64().filter(|v| v.is_finite()))
}
