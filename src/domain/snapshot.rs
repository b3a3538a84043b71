// Snapshot domain model
use super::tank::NEUTRAL_LEVEL;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

/// Point-in-time view of every tracked metric for the active device.
///
/// A metric key is absent when nothing is known about it; it is present
/// with `null` when the store reported a non-numeric reading.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(rename = "deviceID")]
    pub device_id: Option<String>,
    pub timestamp: i64,
    pub last_update: String,
    pub metrics: BTreeMap<String, Option<f64>>,
    pub water_level: f64,
    /// No metric in this snapshot came from a live query.
    pub stale: bool,
}

impl Snapshot {
    /// Device-less snapshot used before any device is known.
    pub fn minimal(now: DateTime<Utc>) -> Self {
        Self {
            device_id: None,
            timestamp: now.timestamp(),
            last_update: now.to_rfc3339(),
            metrics: BTreeMap::new(),
            water_level: NEUTRAL_LEVEL,
            stale: true,
        }
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied().flatten()
    }
}

/// Most frequent timestamp; ties go to the one seen first.
pub fn mode_timestamp(timestamps: &[i64]) -> Option<i64> {
    let mut counts: Vec<(i64, usize)> = Vec::new();
    for ts in timestamps {
        match counts.iter_mut().find(|(seen, _)| seen == ts) {
            Some((_, count)) => *count += 1,
            None => counts.push((*ts, 1)),
        }
    }

    let mut best: Option<(i64, usize)> = None;
    for (ts, count) in counts {
        if best.is_none_or(|(_, c)| count > c) {
            best = Some((ts, count));
        }
    }
    best.map(|(ts, _)| ts)
}
