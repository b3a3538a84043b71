// Telemetry data domain models
use serde::{Deserialize, Serialize, Serializer};
use std::collections::HashSet;

/// One reading of a metric for a device, as returned by an instant query.
///
/// `value` is `None` when the store reported a not-a-number or otherwise
/// non-numeric reading. It is never coerced to zero.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSample {
    pub name: String,
    pub value: Option<f64>,
    pub timestamp: i64,
    pub device: String,
}

impl MetricSample {
    pub fn new(name: String, value: Option<f64>, timestamp: i64, device: String) -> Self {
        Self {
            name,
            value,
            timestamp,
            device,
        }
    }
}

/// A sample value exactly as the store encoded it.
///
/// Prometheus-style stores send values as strings (`"22.5"`, `"NaN"`), but
/// a bare JSON number is accepted as well.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
}

impl RawValue {
    /// Numeric coercion. NaN sentinels, unparsable text and non-finite
    /// numbers all map to `None`.
    pub fn to_f64(&self) -> Option<f64> {
        let value = match self {
            RawValue::Number(n) => *n,
            RawValue::Text(s) => {
                let s = s.trim();
                if s.eq_ignore_ascii_case("nan") {
                    return None;
                }
                s.parse::<f64>().ok()?
            }
        };
        value.is_finite().then_some(value)
    }
}

/// A series from a range query before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawSeries {
    pub device: Option<String>,
    pub values: Vec<(i64, RawValue)>,
}

/// A normalized range series: ascending timestamps, one point per timestamp.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RangeSeries {
    pub metric: String,
    #[serde(serialize_with = "serialize_points")]
    pub points: Vec<RangePoint>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangePoint {
    pub timestamp: i64,
    pub value: Option<f64>,
}

impl RangeSeries {
    pub fn empty(metric: impl Into<String>) -> Self {
        Self {
            metric: metric.into(),
            points: Vec::new(),
        }
    }

    /// Build a series from raw store values: coerce every value, keep the
    /// first point seen for any timestamp, then order by timestamp.
    pub fn from_raw(metric: impl Into<String>, raw: &[(i64, RawValue)]) -> Self {
        let mut seen = HashSet::with_capacity(raw.len());
        let mut points: Vec<RangePoint> = raw
            .iter()
            .filter(|(ts, _)| seen.insert(*ts))
            .map(|(ts, value)| RangePoint {
                timestamp: *ts,
                value: value.to_f64(),
            })
            .collect();
        points.sort_by_key(|p| p.timestamp);

        Self {
            metric: metric.into(),
            points,
        }
    }
}

// Points go over the wire as `[ts, value]` pairs, which is what chart
// libraries on the dashboard consume directly.
fn serialize_points<S: Serializer>(points: &[RangePoint], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(points.iter().map(|p| (p.timestamp, p.value)))
}

/// Metric names are embedded into query expressions, so only plain
/// identifiers are accepted.
pub fn is_valid_metric_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == ':' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == ':')
}
